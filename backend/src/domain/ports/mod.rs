//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driving ports (`*Command`, `*Query`) are consumed by inbound adapters.
//! Driven ports (`*Repository`, [`ActorResolver`]) are implemented by
//! outbound adapters. Each port ships a `Fixture*` implementation and, in
//! tests, a `mockall` double.

mod macros;
pub(crate) use macros::define_port_error;

mod actor_resolver;
mod ticket_intake_command;
mod ticket_workflow_command;
mod ticket_workflow_query;
mod ticket_workflow_repository;
mod xp_ledger_query;
mod xp_ledger_repository;

use ticket_workflow_query::fixture_ticket;

#[cfg(test)]
pub use actor_resolver::MockActorResolver;
pub use actor_resolver::{ActorResolver, ActorResolverError, FixtureActorResolver};
#[cfg(test)]
pub use ticket_intake_command::MockTicketIntakeCommand;
pub use ticket_intake_command::{
    CreateTicketRequest, FixtureTicketIntakeCommand, TicketIntakeCommand,
};
#[cfg(test)]
pub use ticket_workflow_command::MockTicketWorkflowCommand;
pub use ticket_workflow_command::{
    FixtureTicketWorkflowCommand, TicketWorkflowCommand, WorkflowCommandRequest,
};
#[cfg(test)]
pub use ticket_workflow_query::MockTicketWorkflowQuery;
pub use ticket_workflow_query::{
    FixtureTicketWorkflowQuery, SessionHistory, TicketDetail, TicketWorkflowQuery,
};
#[cfg(test)]
pub use ticket_workflow_repository::MockTicketWorkflowRepository;
pub use ticket_workflow_repository::{
    CreatedTicket, FixtureTicketWorkflowRepository, TicketWorkflowRepository,
    TicketWorkflowRepositoryError,
};
#[cfg(test)]
pub use xp_ledger_query::MockXpLedgerQuery;
pub use xp_ledger_query::{FixtureXpLedgerQuery, XpLedgerQuery, XpLedgerQueryRequest};
#[cfg(test)]
pub use xp_ledger_repository::MockXpLedgerRepository;
pub use xp_ledger_repository::{
    FixtureXpLedgerRepository, XpLedgerRepository, XpLedgerRepositoryError,
};

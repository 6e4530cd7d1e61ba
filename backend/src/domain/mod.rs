//! Domain primitives, planners, and services.
//!
//! Purpose: model repair tickets, their workflow, technician work sessions,
//! and the XP side effects of quality control without depending on any
//! transport or storage crate. Planners are pure functions of their inputs;
//! the current time and actor are always passed in explicitly.
//!
//! Public surface:
//! - Error (alias to `error::Error`): transport-agnostic error payload.
//! - Ticket, Transition, SessionEvent, XpLedgerEntry: persisted records.
//! - WorkflowDecision: the ticket state machine.
//! - SessionTimeline: work-session fold and control planner.
//! - Service types implementing the driving ports in [`ports`].

pub mod actor;
pub mod authorization;
pub mod error;
pub mod ids;
pub mod intake;
pub mod inventory;
pub mod ports;
pub mod ticket;
mod ticket_intake_service;
mod ticket_workflow_service;
pub mod trace_id;
pub mod transition;
pub mod work_session;
pub mod workflow;
pub mod xp;
mod xp_ledger_service;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use self::actor::{Actor, Role, UnknownRoleError};
pub use self::authorization::{Authorization, WorkflowAction, authorize, authorize_on_ticket};
pub use self::error::{Error, ErrorCode};
pub use self::ids::{
    IdParseError, InventoryItemId, SessionEventId, TicketId, TransitionId, UserId, XpEntryId,
};
pub use self::intake::{
    DEFAULT_CHECKLIST_MIN_ITEMS, IntakePlan, IntakeRequest, IntakeRules, InventoryItemRef,
    ItemResolution, NewItemConfirmation, ValidatedIntake, normalise_serial, plan_intake,
    resolve_item, validate_request,
};
pub use self::inventory::{InventoryItem, InventoryItemStatus, UnknownItemStatusError};
pub use self::ticket::{
    Checklist, ChecklistError, SrtMetadata, Ticket, TicketStatus, UnknownTicketStatusError,
};
pub use self::ticket_intake_service::TicketIntakeService;
pub use self::ticket_workflow_service::TicketWorkflowService;
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::transition::{NewTransition, Transition, has_rework};
pub use self::work_session::{
    NewSessionEvent, PlannedSessionEvent, Segment, SessionControl, SessionEvent,
    SessionEventKind, SessionState, SessionSummary, SessionTimeline, SessionTransitionError,
    UnknownSessionEventKindError, WorkSession,
};
pub use self::workflow::{
    AppliedWorkflowChange, TicketSnapshot, WorkflowChange, WorkflowCommand, WorkflowDecision,
    session_summary_after,
};
pub use self::xp::{
    ConfiguredXpPolicy, DEFAULT_XP_BASE_AMOUNT, DEFAULT_XP_FIRST_PASS_BONUS, NewXpLedgerEntry,
    UnknownXpEntryTypeError, XpEntryType, XpLedgerEntry, XpLedgerFilter, XpRewardPolicy,
    XpSummary,
};
pub use self::xp_ledger_service::XpLedgerService;

/// Convenient result alias for domain operations.
///
/// # Examples
/// ```
/// use repair_desk::domain::{DomainResult, Error};
///
/// fn reject() -> DomainResult<()> {
///     Err(Error::forbidden("nope"))
/// }
/// assert!(reject().is_err());
/// ```
pub type DomainResult<T> = Result<T, Error>;

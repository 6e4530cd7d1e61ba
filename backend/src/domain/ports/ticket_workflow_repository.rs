//! Port for ticket persistence and atomic workflow units of work.
//!
//! Every write goes through [`TicketWorkflowRepository::create_ticket`] or
//! [`TicketWorkflowRepository::apply`]. Implementations must run each call as
//! one all-or-nothing unit of work and must serialise calls on the same
//! ticket. The decision itself is delegated back to the domain through
//! [`WorkflowDecision::decide`], so adapters only lock, load, and write.

use async_trait::async_trait;
use pagination::{Page, PageRequest};

use crate::domain::{
    AppliedWorkflowChange, Error, IntakePlan, InventoryItem, InventoryItemId, SessionEvent,
    Ticket, TicketId, Transition, WorkflowDecision,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by ticket workflow repository adapters.
    pub enum TicketWorkflowRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "ticket repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "ticket repository query failed: {message}",
        /// The ticket does not exist.
        TicketNotFound { ticket_id: TicketId } =>
            "ticket {ticket_id} not found",
        /// A cross-ticket invariant rejected the write at commit.
        Conflict { message: String } =>
            "ticket write conflicted: {message}",
        /// The domain rejected the command against the locked state.
        Rejected { error: Error } =>
            "workflow command rejected: {error}",
    }
}

/// Result of a committed intake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTicket {
    /// Ticket in `NEW`.
    pub ticket: Ticket,
    /// Item the ticket was opened for, now `in_service`.
    pub item: InventoryItem,
    /// Intake transition with no source status.
    pub transition: Transition,
    /// Whether the item was created by this intake.
    pub item_created: bool,
}

/// Port for ticket state and its append-only history.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TicketWorkflowRepository: Send + Sync {
    /// Find an inventory item by id.
    async fn find_item(
        &self,
        item_id: &InventoryItemId,
    ) -> Result<Option<InventoryItem>, TicketWorkflowRepositoryError>;

    /// Find an inventory item by serial number.
    async fn find_item_by_serial(
        &self,
        serial_number: &str,
    ) -> Result<Option<InventoryItem>, TicketWorkflowRepositoryError>;

    /// Commit an intake: optional item insert, ticket, transition, and item
    /// status.
    ///
    /// Fails with `Conflict` when the item already has an active ticket.
    async fn create_ticket(
        &self,
        plan: &IntakePlan,
    ) -> Result<CreatedTicket, TicketWorkflowRepositoryError>;

    /// Read a ticket without locking it.
    async fn find_ticket(
        &self,
        ticket_id: &TicketId,
    ) -> Result<Option<Ticket>, TicketWorkflowRepositoryError>;

    /// Lock the ticket, decide, and write the resulting change atomically.
    async fn apply(
        &self,
        ticket_id: &TicketId,
        decision: &WorkflowDecision,
    ) -> Result<AppliedWorkflowChange, TicketWorkflowRepositoryError>;

    /// Page through a ticket's transitions, oldest first.
    async fn list_transitions(
        &self,
        ticket_id: &TicketId,
        page: PageRequest,
    ) -> Result<Page<Transition>, TicketWorkflowRepositoryError>;

    /// Read every session event of a ticket, oldest first.
    async fn list_session_events(
        &self,
        ticket_id: &TicketId,
    ) -> Result<Vec<SessionEvent>, TicketWorkflowRepositoryError>;
}

/// Fixture implementation for tests that do not exercise ticket storage.
///
/// Reads find nothing and writes report the ticket as missing.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureTicketWorkflowRepository;

#[async_trait]
impl TicketWorkflowRepository for FixtureTicketWorkflowRepository {
    async fn find_item(
        &self,
        _item_id: &InventoryItemId,
    ) -> Result<Option<InventoryItem>, TicketWorkflowRepositoryError> {
        Ok(None)
    }

    async fn find_item_by_serial(
        &self,
        _serial_number: &str,
    ) -> Result<Option<InventoryItem>, TicketWorkflowRepositoryError> {
        Ok(None)
    }

    async fn create_ticket(
        &self,
        _plan: &IntakePlan,
    ) -> Result<CreatedTicket, TicketWorkflowRepositoryError> {
        Err(TicketWorkflowRepositoryError::query(
            "fixture repository does not store tickets",
        ))
    }

    async fn find_ticket(
        &self,
        _ticket_id: &TicketId,
    ) -> Result<Option<Ticket>, TicketWorkflowRepositoryError> {
        Ok(None)
    }

    async fn apply(
        &self,
        ticket_id: &TicketId,
        _decision: &WorkflowDecision,
    ) -> Result<AppliedWorkflowChange, TicketWorkflowRepositoryError> {
        Err(TicketWorkflowRepositoryError::ticket_not_found(*ticket_id))
    }

    async fn list_transitions(
        &self,
        _ticket_id: &TicketId,
        page: PageRequest,
    ) -> Result<Page<Transition>, TicketWorkflowRepositoryError> {
        Ok(Page::new(Vec::new(), page, 0))
    }

    async fn list_session_events(
        &self,
        _ticket_id: &TicketId,
    ) -> Result<Vec<SessionEvent>, TicketWorkflowRepositoryError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn errors_render_context() {
        let err = TicketWorkflowRepositoryError::ticket_not_found(TicketId::new(4));
        assert_eq!(err.to_string(), "ticket 4 not found");

        let rejected = TicketWorkflowRepositoryError::rejected(Error::conflict("busy"));
        assert!(rejected.to_string().contains("busy"));
    }

    #[tokio::test]
    async fn fixture_reports_missing_tickets() {
        let repo = FixtureTicketWorkflowRepository;
        let found = repo
            .find_ticket(&TicketId::new(1))
            .await
            .expect("fixture read succeeds");
        assert!(found.is_none());

        let page = repo
            .list_transitions(&TicketId::new(1), PageRequest::default())
            .await
            .expect("fixture page");
        assert_eq!(page.total_items(), 0);
    }
}

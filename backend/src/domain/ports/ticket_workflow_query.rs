//! Driving port for ticket reads: detail, transition log, session history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::{Page, PageRequest};

use crate::domain::{
    Actor, Checklist, Error, InventoryItemId, Segment, SessionSummary, SessionState,
    SrtMetadata, Ticket, TicketId, TicketStatus, Transition, TransitionId, UserId,
};

/// Ticket with its live session summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketDetail {
    /// Ticket row.
    pub ticket: Ticket,
    /// Session state, active seconds measured at read time.
    pub session: SessionSummary,
}

/// Paginated session segments with the current session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHistory {
    /// Segments across every session, oldest first.
    pub segments: Page<Segment>,
    /// Current state and total active seconds.
    pub summary: SessionSummary,
}

/// Driving port for ticket read models.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TicketWorkflowQuery: Send + Sync {
    /// Read one ticket with its session summary.
    async fn ticket_detail(
        &self,
        actor: &Actor,
        ticket_id: &TicketId,
    ) -> Result<TicketDetail, Error>;

    /// Page through a ticket's transition log, oldest first.
    async fn transitions(
        &self,
        actor: &Actor,
        ticket_id: &TicketId,
        page: PageRequest,
    ) -> Result<Page<Transition>, Error>;

    /// Page through a ticket's work-session segments.
    async fn session_history(
        &self,
        actor: &Actor,
        ticket_id: &TicketId,
        page: PageRequest,
    ) -> Result<SessionHistory, Error>;
}

/// Ticket returned by fixture ports, already in `status`.
pub(super) fn fixture_ticket(ticket_id: TicketId, status: TicketStatus) -> Ticket {
    let now = DateTime::<Utc>::UNIX_EPOCH;
    let master = UserId::new(1);
    Ticket {
        id: ticket_id,
        inventory_item_id: InventoryItemId::new(1),
        status,
        assigned_technician_id: (status != TicketStatus::New).then_some(UserId::new(2)),
        title: None,
        checklist: Checklist::from_stored(vec![
            "power on".to_owned(),
            "visual inspection".to_owned(),
            "functional test".to_owned(),
        ]),
        srt: SrtMetadata {
            code: "SRT-GENERAL".to_owned(),
            approved_by: master,
            approved_at: now,
        },
        created_by: master,
        created_at: now,
        updated_at: now,
    }
}

fn empty_summary() -> SessionSummary {
    SessionSummary {
        state: SessionState::None,
        session_number: None,
        technician_id: None,
        active_seconds: 0,
        running_since: None,
    }
}

/// Fixture implementation returning a freshly opened ticket.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureTicketWorkflowQuery;

#[async_trait]
impl TicketWorkflowQuery for FixtureTicketWorkflowQuery {
    async fn ticket_detail(
        &self,
        _actor: &Actor,
        ticket_id: &TicketId,
    ) -> Result<TicketDetail, Error> {
        Ok(TicketDetail {
            ticket: fixture_ticket(*ticket_id, TicketStatus::New),
            session: empty_summary(),
        })
    }

    async fn transitions(
        &self,
        _actor: &Actor,
        ticket_id: &TicketId,
        page: PageRequest,
    ) -> Result<Page<Transition>, Error> {
        let ticket = fixture_ticket(*ticket_id, TicketStatus::New);
        let intake = Transition {
            id: TransitionId::new(1),
            ticket_id: *ticket_id,
            from_status: None,
            to_status: TicketStatus::New,
            actor_id: ticket.created_by,
            reason: None,
            created_at: ticket.created_at,
        };
        Ok(Page::from_items(vec![intake], page))
    }

    async fn session_history(
        &self,
        _actor: &Actor,
        _ticket_id: &TicketId,
        page: PageRequest,
    ) -> Result<SessionHistory, Error> {
        Ok(SessionHistory {
            segments: Page::new(Vec::new(), page, 0),
            summary: empty_summary(),
        })
    }
}

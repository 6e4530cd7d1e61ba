//! Append-only transition log records.

use chrono::{DateTime, Utc};

use super::{TicketId, TicketStatus, TransitionId, UserId};

/// Committed status change of a ticket.
///
/// Rows are never updated or deleted. Ordering by [`TransitionId`] defines
/// ticket history; corrections are recorded as new transitions with a reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Monotonic identifier.
    pub id: TransitionId,
    /// Ticket that changed.
    pub ticket_id: TicketId,
    /// Previous status; absent for the intake transition.
    pub from_status: Option<TicketStatus>,
    /// New status.
    pub to_status: TicketStatus,
    /// User who performed the change.
    pub actor_id: UserId,
    /// Optional explanation, required for QC failures.
    pub reason: Option<String>,
    /// Commit instant.
    pub created_at: DateTime<Utc>,
}

/// Transition awaiting insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransition {
    /// Previous status; absent for the intake transition.
    pub from_status: Option<TicketStatus>,
    /// New status.
    pub to_status: TicketStatus,
    /// User who performed the change.
    pub actor_id: UserId,
    /// Optional explanation.
    pub reason: Option<String>,
    /// Instant of the change.
    pub created_at: DateTime<Utc>,
}

impl NewTransition {
    /// Attach the ticket and sequence id assigned by storage.
    #[must_use]
    pub fn into_transition(self, id: TransitionId, ticket_id: TicketId) -> Transition {
        Transition {
            id,
            ticket_id,
            from_status: self.from_status,
            to_status: self.to_status,
            actor_id: self.actor_id,
            reason: self.reason,
            created_at: self.created_at,
        }
    }
}

/// Whether the history contains a QC failure.
///
/// First-pass bonus eligibility is derived from this, never from the ledger.
#[must_use]
pub fn has_rework(transitions: &[Transition]) -> bool {
    transitions
        .iter()
        .any(|transition| transition.to_status == TicketStatus::Rework)
}

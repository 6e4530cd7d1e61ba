//! Repair ticket aggregate.
//!
//! A ticket moves `NEW → ASSIGNED → IN_PROGRESS → WAITING_QC → DONE`, with the
//! quality-control loop `WAITING_QC → REWORK → ASSIGNED` on the same ticket.
//! Only the workflow state machine mutates tickets; everything else reads
//! them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{InventoryItemId, TicketId, UserId};

/// Lifecycle status of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    /// Created at intake, awaiting assignment.
    New,
    /// A technician is assigned but has not started.
    Assigned,
    /// The technician is working; a work session exists.
    InProgress,
    /// Work is finished and awaits quality control.
    WaitingQc,
    /// Quality control passed. Terminal.
    Done,
    /// Quality control failed; awaiting reassignment.
    Rework,
}

impl TicketStatus {
    /// Wire representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Assigned => "ASSIGNED",
            Self::InProgress => "IN_PROGRESS",
            Self::WaitingQc => "WAITING_QC",
            Self::Done => "DONE",
            Self::Rework => "REWORK",
        }
    }

    /// Whether the ticket has left the active workflow.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a persisted status label is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown ticket status: {0}")]
pub struct UnknownTicketStatusError(pub String);

impl FromStr for TicketStatus {
    type Err = UnknownTicketStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "ASSIGNED" => Ok(Self::Assigned),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "WAITING_QC" => Ok(Self::WaitingQc),
            "DONE" => Ok(Self::Done),
            "REWORK" => Ok(Self::Rework),
            other => Err(UnknownTicketStatusError(other.to_owned())),
        }
    }
}

/// Validation failures for checklist construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChecklistError {
    /// Fewer entries than the configured minimum.
    #[error("checklist needs at least {minimum} entries, got {actual}")]
    TooShort {
        /// Configured minimum.
        minimum: usize,
        /// Entries supplied.
        actual: usize,
    },
    /// An entry is empty after trimming.
    #[error("checklist entry {index} is blank")]
    BlankEntry {
        /// Zero-based position of the blank entry.
        index: usize,
    },
}

/// Ordered list of checks the technician must perform.
///
/// ## Invariants
/// - Entries are trimmed and non-empty.
/// - The entry count meets the minimum enforced at intake.
///
/// # Examples
/// ```
/// use repair_desk::domain::Checklist;
///
/// let checklist = Checklist::new(vec![" power ".into(), "fan".into(), "ports".into()], 3)
///     .expect("valid checklist");
/// assert_eq!(checklist.items()[0], "power");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checklist(Vec<String>);

impl Checklist {
    /// Validate and normalise checklist entries.
    pub fn new(items: Vec<String>, minimum: usize) -> Result<Self, ChecklistError> {
        let trimmed = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let value = item.trim();
                if value.is_empty() {
                    Err(ChecklistError::BlankEntry { index })
                } else {
                    Ok(value.to_owned())
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        if trimmed.len() < minimum {
            return Err(ChecklistError::TooShort {
                minimum,
                actual: trimmed.len(),
            });
        }
        Ok(Self(trimmed))
    }

    /// Rebuild a checklist already validated at intake.
    #[must_use]
    pub const fn from_stored(items: Vec<String>) -> Self {
        Self(items)
    }

    /// Checklist entries in order.
    #[must_use]
    pub fn items(&self) -> &[String] {
        &self.0
    }
}

/// Service request type approved at intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SrtMetadata {
    /// Service request type code.
    pub code: String,
    /// User who approved the request type.
    pub approved_by: UserId,
    /// Approval instant.
    pub approved_at: DateTime<Utc>,
}

/// Repair ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    /// Ticket identifier.
    pub id: TicketId,
    /// Item under repair.
    pub inventory_item_id: InventoryItemId,
    /// Current lifecycle status.
    pub status: TicketStatus,
    /// Technician on record. Kept through `REWORK` until the next assignment.
    pub assigned_technician_id: Option<UserId>,
    /// Optional problem description.
    pub title: Option<String>,
    /// Required checks.
    pub checklist: Checklist,
    /// Approved service request type.
    pub srt: SrtMetadata,
    /// User who opened the ticket.
    pub created_by: UserId,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last mutation instant.
    pub updated_at: DateTime<Utc>,
}

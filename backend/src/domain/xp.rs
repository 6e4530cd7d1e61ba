//! XP ledger records and reward policy.
//!
//! The ledger is append-only: a user's balance is the sum of their entries
//! and is never stored. The engine only produces entries, as a side effect of
//! a quality-control pass, and never reads them back to make decisions.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Ticket, TicketId, UserId, XpEntryId};

/// Category of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XpEntryType {
    /// Attendance reward written by the attendance subsystem.
    AttendancePunctuality,
    /// Base reward for a passed ticket.
    TicketBaseXp,
    /// Bonus for passing QC without rework.
    TicketQcFirstPassBonus,
}

impl XpEntryType {
    /// Wire representation of the entry type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AttendancePunctuality => "attendance_punctuality",
            Self::TicketBaseXp => "ticket_base_xp",
            Self::TicketQcFirstPassBonus => "ticket_qc_first_pass_bonus",
        }
    }
}

impl fmt::Display for XpEntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an entry type label is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown XP entry type: {0}")]
pub struct UnknownXpEntryTypeError(pub String);

impl FromStr for XpEntryType {
    type Err = UnknownXpEntryTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "attendance_punctuality" => Ok(Self::AttendancePunctuality),
            "ticket_base_xp" => Ok(Self::TicketBaseXp),
            "ticket_qc_first_pass_bonus" => Ok(Self::TicketQcFirstPassBonus),
            other => Err(UnknownXpEntryTypeError(other.to_owned())),
        }
    }
}

/// Immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XpLedgerEntry {
    /// Monotonic identifier.
    pub id: XpEntryId,
    /// User credited or debited.
    pub user_id: UserId,
    /// Ticket that produced the entry, if any.
    pub ticket_id: Option<TicketId>,
    /// Entry category.
    pub entry_type: XpEntryType,
    /// Signed amount.
    pub amount: i64,
    /// Free-text reference.
    pub reference: String,
    /// Append instant.
    pub created_at: DateTime<Utc>,
}

/// Ledger entry awaiting insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewXpLedgerEntry {
    /// User credited or debited.
    pub user_id: UserId,
    /// Ticket that produced the entry, if any.
    pub ticket_id: Option<TicketId>,
    /// Entry category.
    pub entry_type: XpEntryType,
    /// Signed amount.
    pub amount: i64,
    /// Free-text reference.
    pub reference: String,
    /// Append instant.
    pub created_at: DateTime<Utc>,
}

impl NewXpLedgerEntry {
    /// Attach the sequence id assigned by storage.
    #[must_use]
    pub fn into_entry(self, id: XpEntryId) -> XpLedgerEntry {
        XpLedgerEntry {
            id,
            user_id: self.user_id,
            ticket_id: self.ticket_id,
            entry_type: self.entry_type,
            amount: self.amount,
            reference: self.reference,
            created_at: self.created_at,
        }
    }
}

/// Source of XP amounts awarded on a quality-control pass.
pub trait XpRewardPolicy: Send + Sync {
    /// Base reward for a passed ticket given its total active work time.
    fn base_amount(&self, ticket: &Ticket, active_seconds: i64) -> i64;

    /// Bonus for passing without any rework.
    fn first_pass_bonus(&self, ticket: &Ticket) -> i64;
}

/// Default base reward when none is configured.
pub const DEFAULT_XP_BASE_AMOUNT: i64 = 10;
/// Default first-pass bonus when none is configured.
pub const DEFAULT_XP_FIRST_PASS_BONUS: i64 = 5;

/// Reward policy driven by configuration.
///
/// The base reward is a flat amount. When a divisor is configured, one extra
/// point is granted per full `divisor_minutes` of active work.
///
/// # Examples
/// ```
/// use repair_desk::domain::ConfiguredXpPolicy;
///
/// let policy = ConfiguredXpPolicy::new(10, Some(30), 5);
/// assert_eq!(policy.base_for_seconds(95 * 60), 13);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfiguredXpPolicy {
    base_amount: i64,
    divisor_minutes: Option<u32>,
    first_pass_bonus: i64,
}

impl Default for ConfiguredXpPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_XP_BASE_AMOUNT, None, DEFAULT_XP_FIRST_PASS_BONUS)
    }
}

impl ConfiguredXpPolicy {
    /// Build a policy. A zero divisor is treated as absent.
    #[must_use]
    pub fn new(base_amount: i64, divisor_minutes: Option<u32>, first_pass_bonus: i64) -> Self {
        Self {
            base_amount,
            divisor_minutes: divisor_minutes.filter(|minutes| *minutes > 0),
            first_pass_bonus,
        }
    }

    /// Base reward for `active_seconds` of work.
    #[must_use]
    pub fn base_for_seconds(&self, active_seconds: i64) -> i64 {
        let time_points = self
            .divisor_minutes
            .and_then(|minutes| {
                let divisor = i64::from(minutes).checked_mul(60)?;
                active_seconds.max(0).checked_div(divisor)
            })
            .unwrap_or(0);
        self.base_amount.saturating_add(time_points)
    }
}

impl XpRewardPolicy for ConfiguredXpPolicy {
    fn base_amount(&self, _ticket: &Ticket, active_seconds: i64) -> i64 {
        self.base_for_seconds(active_seconds)
    }

    fn first_pass_bonus(&self, _ticket: &Ticket) -> i64 {
        self.first_pass_bonus
    }
}

/// Filters accepted by ledger reads. Absent fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XpLedgerFilter {
    /// Restrict to one user.
    pub user_id: Option<UserId>,
    /// Restrict to one ticket.
    pub ticket_id: Option<TicketId>,
    /// Restrict to one entry type.
    pub entry_type: Option<XpEntryType>,
    /// Case-insensitive substring of the reference.
    pub reference: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub created_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub created_to: Option<DateTime<Utc>>,
    /// Inclusive lower bound on `amount`.
    pub amount_min: Option<i64>,
    /// Inclusive upper bound on `amount`.
    pub amount_max: Option<i64>,
}

impl XpLedgerFilter {
    /// Whether `entry` satisfies every present filter.
    #[must_use]
    pub fn matches(&self, entry: &XpLedgerEntry) -> bool {
        let reference_matches = self.reference.as_deref().is_none_or(|needle| {
            entry
                .reference
                .to_lowercase()
                .contains(&needle.to_lowercase())
        });
        self.user_id.is_none_or(|id| id == entry.user_id)
            && self.ticket_id.is_none_or(|id| Some(id) == entry.ticket_id)
            && self.entry_type.is_none_or(|kind| kind == entry.entry_type)
            && reference_matches
            && self.created_from.is_none_or(|from| entry.created_at >= from)
            && self.created_to.is_none_or(|to| entry.created_at <= to)
            && self.amount_min.is_none_or(|min| entry.amount >= min)
            && self.amount_max.is_none_or(|max| entry.amount <= max)
    }
}

/// Aggregate balance of one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XpSummary {
    /// User the aggregate belongs to.
    pub user_id: UserId,
    /// Sum of matching entry amounts.
    pub total_amount: i64,
    /// Number of matching entries.
    pub entry_count: u64,
}

//! Interface view of inventory items.
//!
//! The inventory catalogue is owned elsewhere. The engine reads items during
//! intake, creates items during the confirmed unknown-serial flow, and moves
//! item status as tickets open and pass quality control.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::InventoryItemId;

/// Availability status of an inventory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryItemStatus {
    /// Available for rental.
    Ready,
    /// Under repair.
    InService,
    /// Out with a customer.
    Rented,
    /// Withheld from use.
    Blocked,
    /// Retired. Terminal; cannot accept new tickets.
    WriteOff,
}

impl InventoryItemStatus {
    /// Wire representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::InService => "in_service",
            Self::Rented => "rented",
            Self::Blocked => "blocked",
            Self::WriteOff => "write_off",
        }
    }

    /// Whether new tickets may be opened for the item.
    #[must_use]
    pub const fn accepts_tickets(self) -> bool {
        !matches!(self, Self::WriteOff)
    }
}

impl fmt::Display for InventoryItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a persisted item status is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown inventory item status: {0}")]
pub struct UnknownItemStatusError(pub String);

impl FromStr for InventoryItemStatus {
    type Err = UnknownItemStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(Self::Ready),
            "in_service" => Ok(Self::InService),
            "rented" => Ok(Self::Rented),
            "blocked" => Ok(Self::Blocked),
            "write_off" => Ok(Self::WriteOff),
            other => Err(UnknownItemStatusError(other.to_owned())),
        }
    }
}

/// Inventory item as seen by the workflow engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    /// Item identifier.
    pub id: InventoryItemId,
    /// Unique serial number.
    pub serial_number: String,
    /// Display name.
    pub name: String,
    /// Availability status.
    pub status: InventoryItemStatus,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

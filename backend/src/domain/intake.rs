//! Ticket intake validation.
//!
//! Intake resolves the inventory item before anything else. A reference
//! either names an item id or a serial number. Unknown serials are only
//! accepted when the caller explicitly confirms creating a new item and gives
//! a reason, so typos do not silently create phantom inventory.

use chrono::{DateTime, Utc};
use serde_json::json;

use super::{
    Actor, Checklist, ChecklistError, Error, InventoryItem, InventoryItemId, SrtMetadata, UserId,
};

/// Default minimum number of checklist entries.
pub const DEFAULT_CHECKLIST_MIN_ITEMS: usize = 3;

/// How the caller identifies the item under repair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryItemRef {
    /// Existing item id.
    Id(InventoryItemId),
    /// Serial number, possibly unknown to inventory.
    Serial(String),
}

/// Explicit confirmation to create an item for an unknown serial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItemConfirmation {
    /// Why the item is missing from inventory.
    pub reason: String,
    /// Display name for the new item; defaults to the serial.
    pub name: Option<String>,
}

/// Intake request as received from a driving adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeRequest {
    /// Item under repair.
    pub item: InventoryItemRef,
    /// Required checks, in order.
    pub checklist: Vec<String>,
    /// Service request type code.
    pub srt_code: String,
    /// Optional problem description.
    pub title: Option<String>,
    /// Confirmation for the unknown-serial flow.
    pub confirm_new_item: Option<NewItemConfirmation>,
}

/// Rules applied at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeRules {
    /// Minimum checklist entries.
    pub checklist_min_items: usize,
}

impl Default for IntakeRules {
    fn default() -> Self {
        Self {
            checklist_min_items: DEFAULT_CHECKLIST_MIN_ITEMS,
        }
    }
}

/// Resolved item for a new ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemResolution {
    /// The item exists and accepts tickets.
    Existing(InventoryItem),
    /// Create the item in the same unit of work as the ticket.
    Create {
        /// Serial of the new item.
        serial_number: String,
        /// Display name of the new item.
        name: String,
        /// Confirmation reason, recorded on the intake transition.
        reason: String,
    },
}

/// Validated intake, ready to be committed atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakePlan {
    /// Item resolution.
    pub item: ItemResolution,
    /// Normalised checklist.
    pub checklist: Checklist,
    /// Approved service request type.
    pub srt: SrtMetadata,
    /// Trimmed, non-empty problem description.
    pub title: Option<String>,
    /// User opening the ticket.
    pub created_by: UserId,
    /// Intake instant.
    pub created_at: DateTime<Utc>,
}

impl IntakePlan {
    /// Reason stored on the intake transition.
    #[must_use]
    pub fn transition_reason(&self) -> Option<String> {
        match &self.item {
            ItemResolution::Existing(_) => None,
            ItemResolution::Create { reason, .. } => {
                Some(format!("new inventory item confirmed: {reason}"))
            }
        }
    }
}

/// Validated request fields that do not depend on inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedIntake {
    checklist: Checklist,
    srt_code: String,
    title: Option<String>,
}

fn checklist_error(error: &ChecklistError) -> Error {
    let details = match error {
        ChecklistError::TooShort { minimum, actual } => json!({
            "field": "checklist",
            "code": "checklist_too_short",
            "minimum": minimum,
            "actual": actual,
        }),
        ChecklistError::BlankEntry { index } => json!({
            "field": "checklist",
            "code": "blank_checklist_entry",
            "index": index,
        }),
    };
    Error::invalid_request(error.to_string()).with_details(details)
}

/// Validate checklist, SRT code, and title.
pub fn validate_request(
    request: &IntakeRequest,
    rules: IntakeRules,
) -> Result<ValidatedIntake, Error> {
    let checklist = Checklist::new(request.checklist.clone(), rules.checklist_min_items)
        .map_err(|error| checklist_error(&error))?;

    let srt_code = request.srt_code.trim();
    if srt_code.is_empty() {
        return Err(Error::invalid_request("srtCode must not be blank").with_details(json!({
            "field": "srtCode",
            "code": "missing_field",
        })));
    }

    let title = request
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_owned);

    Ok(ValidatedIntake {
        checklist,
        srt_code: srt_code.to_owned(),
        title,
    })
}

fn written_off(item: &InventoryItem) -> Error {
    Error::invalid_request(format!(
        "inventory item {} is written off and cannot accept tickets",
        item.serial_number
    ))
    .with_details(json!({
        "field": "inventoryItem",
        "code": "item_written_off",
        "inventoryItemId": item.id.get(),
    }))
}

/// Resolve the item for `reference` given the lookup result.
///
/// `found` is the item matching the id or serial, if inventory knows it.
pub fn resolve_item(
    reference: &InventoryItemRef,
    found: Option<InventoryItem>,
    confirmation: Option<&NewItemConfirmation>,
) -> Result<ItemResolution, Error> {
    if let Some(item) = found {
        if !item.status.accepts_tickets() {
            return Err(written_off(&item));
        }
        return Ok(ItemResolution::Existing(item));
    }

    match reference {
        InventoryItemRef::Id(id) => Err(Error::not_found(format!("inventory item {id} not found"))),
        InventoryItemRef::Serial(serial) => {
            let Some(confirmation) = confirmation else {
                return Err(Error::invalid_request(format!(
                    "serial {serial} is not in inventory; confirm creating a new item"
                ))
                .with_details(json!({
                    "field": "serialNumber",
                    "code": "unknown_serial",
                    "value": serial,
                })));
            };
            let reason = confirmation.reason.trim();
            if reason.is_empty() {
                return Err(Error::invalid_request(
                    "a reason is required to create a new inventory item",
                )
                .with_details(json!({
                    "field": "confirmNewItem.reason",
                    "code": "missing_field",
                })));
            }
            let name = confirmation
                .name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(serial.as_str());
            Ok(ItemResolution::Create {
                serial_number: serial.clone(),
                name: name.to_owned(),
                reason: reason.to_owned(),
            })
        }
    }
}

/// Combine validated fields and item resolution into a committed plan.
#[must_use]
pub fn plan_intake(
    validated: ValidatedIntake,
    item: ItemResolution,
    actor: &Actor,
    now: DateTime<Utc>,
) -> IntakePlan {
    let ValidatedIntake {
        checklist,
        srt_code,
        title,
    } = validated;
    IntakePlan {
        item,
        checklist,
        srt: SrtMetadata {
            code: srt_code,
            approved_by: actor.user_id(),
            approved_at: now,
        },
        title,
        created_by: actor.user_id(),
        created_at: now,
    }
}

/// Normalise a serial reference: trimmed and non-empty.
pub fn normalise_serial(serial: &str) -> Result<String, Error> {
    let trimmed = serial.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_request("serialNumber must not be blank").with_details(
            json!({ "field": "serialNumber", "code": "missing_field" }),
        ));
    }
    Ok(trimmed.to_owned())
}

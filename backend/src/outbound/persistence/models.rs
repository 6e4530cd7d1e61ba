//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Rows decode into domain types through
//! `into_domain`, which reports unrecognised labels as [`RowDecodeError`].

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::{
    Checklist, InventoryItem, InventoryItemId, SessionEvent, SessionEventId, SrtMetadata, Ticket,
    TicketId, TicketStatus, Transition, TransitionId, UnknownTicketStatusError, UserId, XpEntryId,
    XpLedgerEntry,
};

use super::schema::{
    inventory_items, ticket_transitions, tickets, work_session_events, xp_ledger_entries,
};

/// A stored row that does not decode into its domain type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{table} row {id}: {message}")]
pub(crate) struct RowDecodeError {
    table: &'static str,
    id: i64,
    message: String,
}

impl RowDecodeError {
    fn new(table: &'static str, id: i64, message: impl ToString) -> Self {
        Self {
            table,
            id,
            message: message.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Inventory items
// ---------------------------------------------------------------------------

/// Row struct for reading from the inventory_items table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = inventory_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct InventoryItemRow {
    pub id: i64,
    pub serial_number: String,
    pub name: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItemRow {
    pub(crate) fn into_domain(self) -> Result<InventoryItem, RowDecodeError> {
        let status = self
            .status
            .parse()
            .map_err(|err| RowDecodeError::new("inventory_items", self.id, err))?;
        Ok(InventoryItem {
            id: InventoryItemId::new(self.id),
            serial_number: self.serial_number,
            name: self.name,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Insertable struct for items created during intake.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = inventory_items)]
pub(crate) struct NewInventoryItemRow<'a> {
    pub serial_number: &'a str,
    pub name: &'a str,
    pub status: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

/// Row struct for reading from the tickets table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tickets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TicketRow {
    pub id: i64,
    pub inventory_item_id: i64,
    pub status: String,
    pub assigned_technician_id: Option<i64>,
    pub title: Option<String>,
    pub checklist: serde_json::Value,
    pub srt_code: String,
    pub srt_approved_by: i64,
    pub srt_approved_at: DateTime<Utc>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TicketRow {
    pub(crate) fn into_domain(self) -> Result<Ticket, RowDecodeError> {
        let status = self
            .status
            .parse()
            .map_err(|err| RowDecodeError::new("tickets", self.id, err))?;
        let checklist: Vec<String> = serde_json::from_value(self.checklist)
            .map_err(|err| RowDecodeError::new("tickets", self.id, err))?;
        Ok(Ticket {
            id: TicketId::new(self.id),
            inventory_item_id: InventoryItemId::new(self.inventory_item_id),
            status,
            assigned_technician_id: self.assigned_technician_id.map(UserId::new),
            title: self.title,
            checklist: Checklist::from_stored(checklist),
            srt: SrtMetadata {
                code: self.srt_code,
                approved_by: UserId::new(self.srt_approved_by),
                approved_at: self.srt_approved_at,
            },
            created_by: UserId::new(self.created_by),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Insertable struct for creating tickets at intake.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tickets)]
pub(crate) struct NewTicketRow<'a> {
    pub inventory_item_id: i64,
    pub status: &'a str,
    pub title: Option<&'a str>,
    pub checklist: &'a serde_json::Value,
    pub srt_code: &'a str,
    pub srt_approved_by: i64,
    pub srt_approved_at: DateTime<Utc>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Changeset applied by workflow transitions.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = tickets)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct TicketUpdate<'a> {
    pub status: &'a str,
    pub assigned_technician_id: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// Row struct for reading from the ticket_transitions table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = ticket_transitions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TransitionRow {
    pub id: i64,
    pub ticket_id: i64,
    pub from_status: Option<String>,
    pub to_status: String,
    pub actor_id: i64,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TransitionRow {
    pub(crate) fn into_domain(self) -> Result<Transition, RowDecodeError> {
        let decode =
            |err: UnknownTicketStatusError| RowDecodeError::new("ticket_transitions", self.id, err);
        let from_status = self
            .from_status
            .as_deref()
            .map(str::parse::<TicketStatus>)
            .transpose()
            .map_err(decode)?;
        let to_status = self.to_status.parse().map_err(decode)?;
        Ok(Transition {
            id: TransitionId::new(self.id),
            ticket_id: TicketId::new(self.ticket_id),
            from_status,
            to_status,
            actor_id: UserId::new(self.actor_id),
            reason: self.reason,
            created_at: self.created_at,
        })
    }
}

/// Insertable struct for appending transitions.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = ticket_transitions)]
pub(crate) struct NewTransitionRow<'a> {
    pub ticket_id: i64,
    pub from_status: Option<&'a str>,
    pub to_status: &'a str,
    pub actor_id: i64,
    pub reason: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Work-session events
// ---------------------------------------------------------------------------

/// Row struct for reading from the work_session_events table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = work_session_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SessionEventRow {
    pub id: i64,
    pub ticket_id: i64,
    pub technician_id: i64,
    pub kind: String,
    pub actor_id: i64,
    pub occurred_at: DateTime<Utc>,
}

impl SessionEventRow {
    pub(crate) fn into_domain(self) -> Result<SessionEvent, RowDecodeError> {
        let kind = self
            .kind
            .parse()
            .map_err(|err| RowDecodeError::new("work_session_events", self.id, err))?;
        Ok(SessionEvent {
            id: SessionEventId::new(self.id),
            ticket_id: TicketId::new(self.ticket_id),
            technician_id: UserId::new(self.technician_id),
            kind,
            actor_id: UserId::new(self.actor_id),
            occurred_at: self.occurred_at,
        })
    }
}

/// Insertable struct for appending session events.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = work_session_events)]
pub(crate) struct NewSessionEventRow<'a> {
    pub ticket_id: i64,
    pub technician_id: i64,
    pub kind: &'a str,
    pub actor_id: i64,
    pub occurred_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// XP ledger
// ---------------------------------------------------------------------------

/// Row struct for reading from the xp_ledger_entries table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = xp_ledger_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct XpEntryRow {
    pub id: i64,
    pub user_id: i64,
    pub ticket_id: Option<i64>,
    pub entry_type: String,
    pub amount: i64,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

impl XpEntryRow {
    pub(crate) fn into_domain(self) -> Result<XpLedgerEntry, RowDecodeError> {
        let entry_type = self
            .entry_type
            .parse()
            .map_err(|err| RowDecodeError::new("xp_ledger_entries", self.id, err))?;
        Ok(XpLedgerEntry {
            id: XpEntryId::new(self.id),
            user_id: UserId::new(self.user_id),
            ticket_id: self.ticket_id.map(TicketId::new),
            entry_type,
            amount: self.amount,
            reference: self.reference,
            created_at: self.created_at,
        })
    }
}

/// Insertable struct for appending ledger entries.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = xp_ledger_entries)]
pub(crate) struct NewXpEntryRow<'a> {
    pub user_id: i64,
    pub ticket_id: Option<i64>,
    pub entry_type: &'a str,
    pub amount: i64,
    pub reference: &'a str,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use rstest::rstest;

    use super::*;
    use crate::domain::XpEntryType;
    use crate::test_support::fixed_now;

    fn ticket_row(status: &str) -> TicketRow {
        TicketRow {
            id: 4,
            inventory_item_id: 12,
            status: status.to_owned(),
            assigned_technician_id: Some(7),
            title: None,
            checklist: serde_json::json!(["power", "fan", "ports"]),
            srt_code: "SRT-1".to_owned(),
            srt_approved_by: 2,
            srt_approved_at: fixed_now(),
            created_by: 2,
            created_at: fixed_now(),
            updated_at: fixed_now(),
        }
    }

    #[rstest]
    fn ticket_row_decodes() {
        let ticket = ticket_row("WAITING_QC").into_domain().expect("decode");
        assert_eq!(ticket.status, TicketStatus::WaitingQc);
        assert_eq!(ticket.assigned_technician_id, Some(UserId::new(7)));
        assert_eq!(ticket.checklist.items().len(), 3);
    }

    #[rstest]
    fn unknown_status_names_the_row() {
        let err = ticket_row("LOST").into_domain().expect_err("bad status");
        assert!(err.to_string().starts_with("tickets row 4"));
    }

    #[rstest]
    fn initial_transition_has_no_source() {
        let row = TransitionRow {
            id: 1,
            ticket_id: 4,
            from_status: None,
            to_status: "NEW".to_owned(),
            actor_id: 2,
            reason: None,
            created_at: fixed_now(),
        };
        let transition = row.into_domain().expect("decode");
        assert_eq!(transition.from_status, None);
        assert_eq!(transition.to_status, TicketStatus::New);
    }

    #[rstest]
    fn xp_entry_row_decodes_type() {
        let row = XpEntryRow {
            id: 3,
            user_id: 7,
            ticket_id: Some(4),
            entry_type: "ticket_qc_first_pass_bonus".to_owned(),
            amount: 5,
            reference: "ticket:4:first_pass".to_owned(),
            created_at: fixed_now(),
        };
        let entry = row.into_domain().expect("decode");
        assert_eq!(entry.entry_type, XpEntryType::TicketQcFirstPassBonus);
    }
}

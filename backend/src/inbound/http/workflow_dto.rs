//! Response DTOs shared by ticket and work-session handlers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::CreatedTicket;
use crate::domain::{
    AppliedWorkflowChange, InventoryItem, Segment, SessionEvent, SessionSummary, Ticket,
    Transition, XpLedgerEntry,
};

/// Ticket as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketBody {
    pub id: i64,
    pub inventory_item_id: i64,
    #[schema(example = "IN_PROGRESS")]
    pub status: String,
    pub assigned_technician_id: Option<i64>,
    pub title: Option<String>,
    pub checklist: Vec<String>,
    pub srt_code: String,
    pub srt_approved_by: i64,
    #[schema(format = "date-time")]
    pub srt_approved_at: String,
    pub created_by: i64,
    #[schema(format = "date-time")]
    pub created_at: String,
    #[schema(format = "date-time")]
    pub updated_at: String,
}

impl From<Ticket> for TicketBody {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id.get(),
            inventory_item_id: ticket.inventory_item_id.get(),
            status: ticket.status.as_str().to_owned(),
            assigned_technician_id: ticket.assigned_technician_id.map(|id| id.get()),
            title: ticket.title,
            checklist: ticket.checklist.items().to_vec(),
            srt_code: ticket.srt.code,
            srt_approved_by: ticket.srt.approved_by.get(),
            srt_approved_at: ticket.srt.approved_at.to_rfc3339(),
            created_by: ticket.created_by.get(),
            created_at: ticket.created_at.to_rfc3339(),
            updated_at: ticket.updated_at.to_rfc3339(),
        }
    }
}

/// Inventory item touched by intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemBody {
    pub id: i64,
    pub serial_number: String,
    pub name: String,
    #[schema(example = "in_service")]
    pub status: String,
}

impl From<InventoryItem> for InventoryItemBody {
    fn from(item: InventoryItem) -> Self {
        Self {
            id: item.id.get(),
            serial_number: item.serial_number,
            name: item.name,
            status: item.status.as_str().to_owned(),
        }
    }
}

/// Transition log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionBody {
    pub id: i64,
    pub ticket_id: i64,
    pub from_status: Option<String>,
    pub to_status: String,
    pub actor_id: i64,
    pub reason: Option<String>,
    #[schema(format = "date-time")]
    pub created_at: String,
}

impl From<Transition> for TransitionBody {
    fn from(transition: Transition) -> Self {
        Self {
            id: transition.id.get(),
            ticket_id: transition.ticket_id.get(),
            from_status: transition.from_status.map(|status| status.as_str().to_owned()),
            to_status: transition.to_status.as_str().to_owned(),
            actor_id: transition.actor_id.get(),
            reason: transition.reason,
            created_at: transition.created_at.to_rfc3339(),
        }
    }
}

/// Work-session event appended by a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionEventBody {
    pub id: i64,
    pub technician_id: i64,
    #[schema(example = "PAUSED")]
    pub kind: String,
    pub actor_id: i64,
    #[schema(format = "date-time")]
    pub occurred_at: String,
}

impl From<SessionEvent> for SessionEventBody {
    fn from(event: SessionEvent) -> Self {
        Self {
            id: event.id.get(),
            technician_id: event.technician_id.get(),
            kind: event.kind.as_str().to_owned(),
            actor_id: event.actor_id.get(),
            occurred_at: event.occurred_at.to_rfc3339(),
        }
    }
}

/// Live view of the latest work session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummaryBody {
    #[schema(example = "RUNNING")]
    pub state: String,
    pub session_number: Option<u32>,
    pub technician_id: Option<i64>,
    pub active_seconds: i64,
    #[schema(format = "date-time")]
    pub running_since: Option<String>,
}

impl From<SessionSummary> for SessionSummaryBody {
    fn from(summary: SessionSummary) -> Self {
        Self {
            state: summary.state.as_str().to_owned(),
            session_number: summary.session_number,
            technician_id: summary.technician_id.map(|id| id.get()),
            active_seconds: summary.active_seconds,
            running_since: summary.running_since.map(|at| at.to_rfc3339()),
        }
    }
}

/// One active-work segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SegmentBody {
    pub session_number: u32,
    #[schema(format = "date-time")]
    pub started_at: String,
    #[schema(format = "date-time")]
    pub ended_at: Option<String>,
}

impl From<Segment> for SegmentBody {
    fn from(segment: Segment) -> Self {
        Self {
            session_number: segment.session_number,
            started_at: segment.started_at.to_rfc3339(),
            ended_at: segment.ended_at.map(|at| at.to_rfc3339()),
        }
    }
}

/// XP ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct XpEntryBody {
    pub id: i64,
    pub user_id: i64,
    pub ticket_id: Option<i64>,
    #[schema(example = "ticket_base_xp")]
    pub entry_type: String,
    pub amount: i64,
    pub reference: String,
    #[schema(format = "date-time")]
    pub created_at: String,
}

impl From<XpLedgerEntry> for XpEntryBody {
    fn from(entry: XpLedgerEntry) -> Self {
        Self {
            id: entry.id.get(),
            user_id: entry.user_id.get(),
            ticket_id: entry.ticket_id.map(|id| id.get()),
            entry_type: entry.entry_type.as_str().to_owned(),
            amount: entry.amount,
            reference: entry.reference,
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

/// Result of intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTicketBody {
    pub ticket: TicketBody,
    pub item: InventoryItemBody,
    pub transition: TransitionBody,
    pub item_created: bool,
}

impl From<CreatedTicket> for CreatedTicketBody {
    fn from(created: CreatedTicket) -> Self {
        Self {
            ticket: created.ticket.into(),
            item: created.item.into(),
            transition: created.transition.into(),
            item_created: created.item_created,
        }
    }
}

/// Result of a workflow command or session control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowResultBody {
    pub ticket: TicketBody,
    pub transition: Option<TransitionBody>,
    pub session_event: Option<SessionEventBody>,
    pub xp_entries: Vec<XpEntryBody>,
    pub session: SessionSummaryBody,
}

impl From<AppliedWorkflowChange> for WorkflowResultBody {
    fn from(applied: AppliedWorkflowChange) -> Self {
        Self {
            ticket: applied.ticket.into(),
            transition: applied.transition.map(TransitionBody::from),
            session_event: applied.session_event.map(SessionEventBody::from),
            xp_entries: applied.xp_entries.into_iter().map(XpEntryBody::from).collect(),
            session: applied.session.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::domain::{TicketId, TicketStatus, TransitionId, UserId};

    #[test]
    fn intake_transition_has_null_source() {
        let body = TransitionBody::from(Transition {
            id: TransitionId::new(1),
            ticket_id: TicketId::new(4),
            from_status: None,
            to_status: TicketStatus::New,
            actor_id: UserId::new(2),
            reason: None,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        });
        let value = serde_json::to_value(body).expect("serialise");
        assert_eq!(value["fromStatus"], serde_json::Value::Null);
        assert_eq!(value["toStatus"], "NEW");
        assert_eq!(value["createdAt"], "1970-01-01T00:00:00+00:00");
    }
}

//! Shared builders for domain unit tests.

use chrono::{DateTime, Duration, TimeZone, Utc};

use super::{
    Checklist, InventoryItemId, SessionEvent, SessionEventId, SessionEventKind, SrtMetadata,
    Ticket, TicketId, TicketStatus, Transition, TransitionId, UserId,
};

pub(crate) const TICKET_ID: TicketId = TicketId::new(1);
pub(crate) const ITEM_ID: InventoryItemId = InventoryItemId::new(500);
pub(crate) const MASTER_ID: UserId = UserId::new(2);
pub(crate) const TECHNICIAN_ID: UserId = UserId::new(7);

/// Base instant shared by domain tests.
pub(crate) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

/// Instant `minutes` after [`base_time`].
pub(crate) fn at_minute(minutes: i64) -> DateTime<Utc> {
    base_time() + Duration::minutes(minutes)
}

pub(crate) fn ticket_in(status: TicketStatus) -> Ticket {
    let assigned = !matches!(status, TicketStatus::New);
    Ticket {
        id: TICKET_ID,
        inventory_item_id: ITEM_ID,
        status,
        assigned_technician_id: assigned.then_some(TECHNICIAN_ID),
        title: Some("Screen flickers".to_owned()),
        checklist: Checklist::from_stored(vec![
            "power".to_owned(),
            "display".to_owned(),
            "ports".to_owned(),
        ]),
        srt: SrtMetadata {
            code: "SRT-SCREEN".to_owned(),
            approved_by: MASTER_ID,
            approved_at: base_time(),
        },
        created_by: MASTER_ID,
        created_at: base_time(),
        updated_at: base_time(),
    }
}

pub(crate) fn session_event(id: i64, kind: SessionEventKind, minute: i64) -> SessionEvent {
    SessionEvent {
        id: SessionEventId::new(id),
        ticket_id: TICKET_ID,
        technician_id: TECHNICIAN_ID,
        kind,
        actor_id: TECHNICIAN_ID,
        occurred_at: at_minute(minute),
    }
}

pub(crate) fn transition(id: i64, from: Option<TicketStatus>, to: TicketStatus) -> Transition {
    Transition {
        id: TransitionId::new(id),
        ticket_id: TICKET_ID,
        from_status: from,
        to_status: to,
        actor_id: MASTER_ID,
        reason: None,
        created_at: at_minute(id),
    }
}

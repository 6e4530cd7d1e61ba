//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Status and kind
//! columns are stored as text constrained by `CHECK` clauses and parsed into
//! domain enums when rows are read.

diesel::table! {
    /// Inventory items known to the workflow engine.
    inventory_items (id) {
        id -> Int8,
        /// Unique serial number.
        serial_number -> Text,
        name -> Text,
        /// `ready`, `in_service`, `rented`, `blocked`, or `write_off`.
        status -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Repair tickets.
    ///
    /// Partial unique indexes allow one non-`DONE` ticket per item and one
    /// `IN_PROGRESS` ticket per technician.
    tickets (id) {
        id -> Int8,
        inventory_item_id -> Int8,
        status -> Text,
        assigned_technician_id -> Nullable<Int8>,
        title -> Nullable<Text>,
        /// JSON array of checklist entries.
        checklist -> Jsonb,
        srt_code -> Text,
        srt_approved_by -> Int8,
        srt_approved_at -> Timestamptz,
        created_by -> Int8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only ticket status history.
    ticket_transitions (id) {
        id -> Int8,
        ticket_id -> Int8,
        from_status -> Nullable<Text>,
        to_status -> Text,
        actor_id -> Int8,
        reason -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only work-session event stream.
    work_session_events (id) {
        id -> Int8,
        ticket_id -> Int8,
        technician_id -> Int8,
        kind -> Text,
        actor_id -> Int8,
        occurred_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only XP ledger.
    xp_ledger_entries (id) {
        id -> Int8,
        user_id -> Int8,
        ticket_id -> Nullable<Int8>,
        entry_type -> Text,
        amount -> Int8,
        reference -> Text,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(tickets -> inventory_items (inventory_item_id));
diesel::joinable!(ticket_transitions -> tickets (ticket_id));
diesel::joinable!(work_session_events -> tickets (ticket_id));
diesel::joinable!(xp_ledger_entries -> tickets (ticket_id));

diesel::allow_tables_to_appear_in_same_query!(
    inventory_items,
    tickets,
    ticket_transitions,
    work_session_events,
    xp_ledger_entries,
);

//! Shared Diesel error mapping for the workflow repositories.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Human-readable reasons for the unique indexes backing cross-ticket rules.
const CONSTRAINT_MESSAGES: &[(&str, &str)] = &[
    (
        "tickets_one_active_per_item",
        "inventory item already has an active ticket",
    ),
    (
        "tickets_one_in_progress_per_technician",
        "technician already has a ticket in progress",
    ),
    (
        "inventory_items_serial_number_key",
        "serial number is already registered",
    ),
];

/// Map pool errors into a repository-specific connection error constructor.
pub(crate) fn map_basic_pool_error<E, C>(error: PoolError, connection: C) -> E
where
    C: FnOnce(String) -> E,
{
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    connection(message)
}

fn conflict_message(constraint: Option<&str>) -> String {
    constraint
        .and_then(|name| {
            CONSTRAINT_MESSAGES
                .iter()
                .find(|(known, _)| *known == name)
                .map(|(_, message)| (*message).to_owned())
        })
        .unwrap_or_else(|| "unique constraint violated".to_owned())
}

/// Map Diesel errors into query, connection, and conflict constructors.
///
/// Unique violations become conflicts named after the violated rule. A
/// repository with no unique constraints passes its query constructor as
/// `conflict`.
pub(crate) fn map_diesel_error<E, Q, C, K>(
    error: DieselError,
    query: Q,
    connection: C,
    conflict: K,
) -> E
where
    Q: FnOnce(String) -> E,
    C: FnOnce(String) -> E,
    K: FnOnce(String) -> E,
{
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(
                ?kind,
                message = info.message(),
                constraint = info.constraint_name(),
                "diesel operation failed"
            );
        }
        _ => debug!(error = %error, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            conflict(conflict_message(info.constraint_name()))
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            connection("database connection error".to_owned())
        }
        DieselError::NotFound => query("record not found".to_owned()),
        DieselError::QueryBuilderError(_) => query("database query error".to_owned()),
        _ => query("database error".to_owned()),
    }
}

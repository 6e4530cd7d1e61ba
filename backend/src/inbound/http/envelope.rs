//! Success envelope shared by every REST endpoint.
//!
//! Successful responses are wrapped as `{success: true, message, data}`;
//! failures use the mirror shape produced in [`super::error`].

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Successful response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ApiEnvelope<T> {
    /// Always `true`.
    pub success: bool,
    /// Human-readable summary of the outcome.
    pub message: String,
    /// Endpoint payload.
    pub data: T,
}

impl<T> ApiEnvelope<T> {
    /// Wrap `data` with a success message.
    ///
    /// # Examples
    /// ```
    /// use repair_desk::inbound::http::envelope::ApiEnvelope;
    ///
    /// let body = ApiEnvelope::ok("ticket created", 7);
    /// assert!(body.success);
    /// assert_eq!(body.data, 7);
    /// ```
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

//! Actix middleware shared by every route.
//!
//! [`Trace`] assigns each request a [`crate::domain::TraceId`], echoes it in
//! the `trace-id` response header, and keeps it in scope so error envelopes
//! and workflow logs carry the same identifier.

mod trace;

pub use trace::{Trace, TraceMiddleware};

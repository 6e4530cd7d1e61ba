//! Repair desk backend library.
//!
//! Ticket intake, the repair workflow state machine, technician work sessions,
//! and the XP ledger, arranged as a domain core with inbound HTTP and outbound
//! persistence adapters.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;

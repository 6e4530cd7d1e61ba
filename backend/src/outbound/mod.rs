//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed repositories using Diesel ORM
//! - **memory**: in-process repositories for running without a database
//! - **identity**: static bearer-token registry
//!
//! Adapters translate between domain types and storage representations. They
//! contain no workflow rules: decisions are taken by the domain inside each
//! adapter's unit of work.

pub mod identity;
pub mod memory;
pub mod persistence;

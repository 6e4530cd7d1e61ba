//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Repository implementations are thin: they lock, load, and write, and
//! delegate every workflow decision back to the domain. Row structs
//! (`models.rs`) and table definitions (`schema.rs`) never leave this module.
//!
//! ```ignore
//! use repair_desk::outbound::persistence::{DbPool, DieselTicketWorkflowRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/repair_desk")).await?;
//! let tickets = DieselTicketWorkflowRepository::new(pool);
//! ```

mod diesel_error_mapping;
mod diesel_ticket_workflow_repository;
mod diesel_xp_ledger_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_ticket_workflow_repository::DieselTicketWorkflowRepository;
pub use diesel_xp_ledger_repository::DieselXpLedgerRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};

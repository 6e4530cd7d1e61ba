//! In-process adapters for running without external infrastructure.

mod workflow_store;

pub use workflow_store::InMemoryWorkflowStore;

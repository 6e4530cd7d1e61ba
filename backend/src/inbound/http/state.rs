//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    ActorResolver, FixtureActorResolver, FixtureTicketIntakeCommand,
    FixtureTicketWorkflowCommand, FixtureTicketWorkflowQuery, FixtureXpLedgerQuery,
    TicketIntakeCommand, TicketWorkflowCommand, TicketWorkflowQuery, XpLedgerQuery,
};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub intake: Arc<dyn TicketIntakeCommand>,
    pub workflow: Arc<dyn TicketWorkflowCommand>,
    pub workflow_query: Arc<dyn TicketWorkflowQuery>,
    pub xp_ledger: Arc<dyn XpLedgerQuery>,
    pub actors: Arc<dyn ActorResolver>,
}

impl HttpState {
    /// Construct state from port implementations.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use repair_desk::domain::ports::{
    ///     FixtureActorResolver, FixtureTicketIntakeCommand, FixtureTicketWorkflowCommand,
    ///     FixtureTicketWorkflowQuery, FixtureXpLedgerQuery,
    /// };
    /// use repair_desk::inbound::http::state::HttpState;
    ///
    /// let state = HttpState::new(
    ///     Arc::new(FixtureTicketIntakeCommand),
    ///     Arc::new(FixtureTicketWorkflowCommand),
    ///     Arc::new(FixtureTicketWorkflowQuery),
    ///     Arc::new(FixtureXpLedgerQuery),
    ///     Arc::new(FixtureActorResolver),
    /// );
    /// let _intake = state.intake.clone();
    /// ```
    pub fn new(
        intake: Arc<dyn TicketIntakeCommand>,
        workflow: Arc<dyn TicketWorkflowCommand>,
        workflow_query: Arc<dyn TicketWorkflowQuery>,
        xp_ledger: Arc<dyn XpLedgerQuery>,
        actors: Arc<dyn ActorResolver>,
    ) -> Self {
        Self {
            intake,
            workflow,
            workflow_query,
            xp_ledger,
            actors,
        }
    }

    /// Replace the actor resolver.
    #[must_use]
    pub fn with_actors(mut self, actors: Arc<dyn ActorResolver>) -> Self {
        self.actors = actors;
        self
    }
}

impl Default for HttpState {
    fn default() -> Self {
        Self::new(
            Arc::new(FixtureTicketIntakeCommand),
            Arc::new(FixtureTicketWorkflowCommand),
            Arc::new(FixtureTicketWorkflowQuery),
            Arc::new(FixtureXpLedgerQuery),
            Arc::new(FixtureActorResolver),
        )
    }
}

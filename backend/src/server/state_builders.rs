//! Builders wiring domain services onto a storage adapter.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};

use repair_desk::domain::ports::{TicketWorkflowRepository, XpLedgerRepository};
use repair_desk::domain::{TicketIntakeService, TicketWorkflowService, XpLedgerService};
use repair_desk::inbound::http::state::HttpState;
use repair_desk::outbound::memory::InMemoryWorkflowStore;
use repair_desk::outbound::persistence::{DieselTicketWorkflowRepository, DieselXpLedgerRepository};

use super::ServerConfig;

fn wire<T, X>(config: &ServerConfig, tickets: Arc<T>, ledger: Arc<X>) -> HttpState
where
    T: TicketWorkflowRepository + 'static,
    X: XpLedgerRepository + 'static,
{
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let intake = Arc::new(TicketIntakeService::new(
        tickets.clone(),
        clock.clone(),
        config.intake_rules,
    ));
    let workflow = Arc::new(TicketWorkflowService::new(
        tickets,
        clock,
        Arc::new(config.xp_policy),
    ));
    HttpState::new(
        intake,
        workflow.clone(),
        workflow,
        Arc::new(XpLedgerService::new(ledger)),
        config.actors.clone(),
    )
}

/// Build HTTP state over PostgreSQL when a pool is configured, otherwise over
/// a process-local store.
pub(crate) fn build_http_state(config: &ServerConfig) -> web::Data<HttpState> {
    let state = match &config.db_pool {
        Some(pool) => wire(
            config,
            Arc::new(DieselTicketWorkflowRepository::new(pool.clone())),
            Arc::new(DieselXpLedgerRepository::new(pool.clone())),
        ),
        None => {
            tracing::warn!("no database configured; tickets are kept in memory only");
            let store = Arc::new(InMemoryWorkflowStore::new());
            wire(config, store.clone(), store)
        }
    };
    web::Data::new(state)
}

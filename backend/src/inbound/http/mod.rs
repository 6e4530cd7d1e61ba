//! HTTP inbound adapter exposing REST endpoints.
//!
//! Handlers translate requests into driving-port calls and map results into
//! the `{success, message, data}` envelope. Every path lives under `/api/v1`
//! and is registered by [`configure_api`].

use actix_web::web;

pub mod auth;
pub mod envelope;
pub mod error;
pub mod health;
pub mod paging;
pub mod schemas;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod tickets;
pub mod validation;
pub mod work_sessions;
pub mod workflow_dto;
pub mod xp_ledger;

pub use error::ApiResult;

/// Register extractor error handlers and every `/api/v1` handler.
///
/// # Examples
/// ```
/// use actix_web::{App, web};
/// use repair_desk::inbound::http::configure_api;
///
/// let _app = App::new().service(web::scope("/api/v1").configure(configure_api));
/// ```
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(validation::json_config())
        .app_data(validation::query_config())
        .app_data(validation::path_config())
        .service(tickets::create_ticket)
        .service(tickets::get_ticket)
        .service(tickets::assign_ticket)
        .service(tickets::start_ticket)
        .service(tickets::to_waiting_qc)
        .service(tickets::qc_pass)
        .service(tickets::qc_fail)
        .service(tickets::list_transitions)
        .service(work_sessions::pause_session)
        .service(work_sessions::resume_session)
        .service(work_sessions::stop_session)
        .service(work_sessions::session_history)
        .service(xp_ledger::list_ledger)
        .service(xp_ledger::ledger_summary);
}

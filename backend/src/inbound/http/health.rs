//! Liveness and readiness probes.
//!
//! Both probes answer with a small JSON body naming the probe phase and, once
//! the listener is bound, the storage backend tickets are written to. An
//! in-memory desk is ready but loses tickets on restart, so operators can
//! tell the two apart without reading logs.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::{HttpResponse, get, http::header, web};
use serde::Serialize;
use utoipa::ToSchema;

/// Where ticket history and the XP ledger are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// PostgreSQL through the Diesel adapters.
    Postgres,
    /// Process-local store; contents vanish on restart.
    InMemory,
}

/// Lifecycle phase reported by the probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProbePhase {
    /// Listener not yet bound.
    Starting,
    /// Accepting traffic.
    Ready,
    /// Shutting down; liveness fails.
    Draining,
}

/// Probe response body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProbeBody {
    /// Current lifecycle phase.
    pub phase: ProbePhase,
    /// Storage backend, known once the server is ready.
    pub storage: Option<StorageBackend>,
}

/// Shared probe state, owned by `main` and cloned into every worker.
#[derive(Debug, Default)]
pub struct HealthState {
    storage: OnceLock<StorageBackend>,
    draining: AtomicBool,
}

impl HealthState {
    /// Fresh state: starting, not draining.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the bound storage backend; readiness passes from here on.
    /// Later calls keep the first backend.
    pub fn mark_ready(&self, storage: StorageBackend) {
        let _ = self.storage.set(storage);
    }

    /// Fail both probes while the server drains.
    pub fn mark_unhealthy(&self) {
        self.draining.store(true, Ordering::Release);
    }

    /// Snapshot of the state as probe output.
    #[must_use]
    pub fn body(&self) -> ProbeBody {
        let storage = self.storage.get().copied();
        let phase = if self.draining.load(Ordering::Acquire) {
            ProbePhase::Draining
        } else if storage.is_some() {
            ProbePhase::Ready
        } else {
            ProbePhase::Starting
        };
        ProbeBody { phase, storage }
    }
}

fn probe_response(healthy: bool, body: ProbeBody) -> HttpResponse {
    let mut response = if healthy {
        HttpResponse::Ok()
    } else {
        HttpResponse::ServiceUnavailable()
    };
    response
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(body)
}

/// Readiness: 200 once the listener is bound and not draining.
#[utoipa::path(
    get,
    path = "/health/ready",
    tags = ["health"],
    security([]),
    responses(
        (status = 200, description = "Accepting traffic", body = ProbeBody),
        (status = 503, description = "Starting or draining", body = ProbeBody)
    )
)]
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    let body = state.body();
    probe_response(body.phase == ProbePhase::Ready, body)
}

/// Liveness: 200 until the server starts draining.
#[utoipa::path(
    get,
    path = "/health/live",
    tags = ["health"],
    security([]),
    responses(
        (status = 200, description = "Process is alive", body = ProbeBody),
        (status = 503, description = "Draining", body = ProbeBody)
    )
)]
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    let body = state.body();
    probe_response(body.phase != ProbePhase::Draining, body)
}

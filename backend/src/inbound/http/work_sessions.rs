//! Work-session control and history HTTP handlers.
//!
//! ```text
//! POST /api/v1/tickets/{id}/work-session/pause/
//! POST /api/v1/tickets/{id}/work-session/resume/
//! POST /api/v1/tickets/{id}/work-session/stop/
//! GET  /api/v1/tickets/{id}/work-session/history/
//! ```

use actix_web::{HttpRequest, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::WorkflowCommand;
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthenticatedActor;
use crate::inbound::http::envelope::ApiEnvelope;
use crate::inbound::http::paging::{PageBody, PageQuery};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::tickets::{parse_ticket_id, run_command};
use crate::inbound::http::workflow_dto::{SegmentBody, SessionSummaryBody, WorkflowResultBody};

/// Segments of every session on the ticket plus the current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionHistoryBody {
    pub segments: PageBody<SegmentBody>,
    pub summary: SessionSummaryBody,
}

/// Pause the running work session.
#[utoipa::path(
    post,
    path = "/api/v1/tickets/{id}/work-session/pause/",
    params(("id" = i64, Path, description = "Ticket identifier")),
    responses(
        (status = 200, description = "Session paused", body = ApiEnvelope<WorkflowResultBody>),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Ticket not found", body = ErrorSchema),
        (status = 409, description = "Session is not running", body = ErrorSchema)
    ),
    tags = ["work-sessions"],
    operation_id = "pauseWorkSession",
    security(("BearerToken" = []))
)]
#[post("/tickets/{id}/work-session/pause/")]
pub async fn pause_session(
    state: web::Data<HttpState>,
    actor: AuthenticatedActor,
    path: web::Path<String>,
) -> ApiResult<web::Json<ApiEnvelope<WorkflowResultBody>>> {
    let ticket_id = parse_ticket_id(&path)?;
    run_command(
        &state,
        actor.into_inner(),
        ticket_id,
        WorkflowCommand::PauseSession,
        "work session paused",
    )
    .await
}

/// Resume a paused work session.
#[utoipa::path(
    post,
    path = "/api/v1/tickets/{id}/work-session/resume/",
    params(("id" = i64, Path, description = "Ticket identifier")),
    responses(
        (status = 200, description = "Session resumed", body = ApiEnvelope<WorkflowResultBody>),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Ticket not found", body = ErrorSchema),
        (status = 409, description = "Session is not paused", body = ErrorSchema)
    ),
    tags = ["work-sessions"],
    operation_id = "resumeWorkSession",
    security(("BearerToken" = []))
)]
#[post("/tickets/{id}/work-session/resume/")]
pub async fn resume_session(
    state: web::Data<HttpState>,
    actor: AuthenticatedActor,
    path: web::Path<String>,
) -> ApiResult<web::Json<ApiEnvelope<WorkflowResultBody>>> {
    let ticket_id = parse_ticket_id(&path)?;
    run_command(
        &state,
        actor.into_inner(),
        ticket_id,
        WorkflowCommand::ResumeSession,
        "work session resumed",
    )
    .await
}

/// Stop the open work session.
#[utoipa::path(
    post,
    path = "/api/v1/tickets/{id}/work-session/stop/",
    params(("id" = i64, Path, description = "Ticket identifier")),
    responses(
        (status = 200, description = "Session stopped", body = ApiEnvelope<WorkflowResultBody>),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Ticket not found", body = ErrorSchema),
        (status = 409, description = "No open session", body = ErrorSchema)
    ),
    tags = ["work-sessions"],
    operation_id = "stopWorkSession",
    security(("BearerToken" = []))
)]
#[post("/tickets/{id}/work-session/stop/")]
pub async fn stop_session(
    state: web::Data<HttpState>,
    actor: AuthenticatedActor,
    path: web::Path<String>,
) -> ApiResult<web::Json<ApiEnvelope<WorkflowResultBody>>> {
    let ticket_id = parse_ticket_id(&path)?;
    run_command(
        &state,
        actor.into_inner(),
        ticket_id,
        WorkflowCommand::StopSession,
        "work session stopped",
    )
    .await
}

/// Page through work segments and read the current session state.
#[utoipa::path(
    get,
    path = "/api/v1/tickets/{id}/work-session/history/",
    params(("id" = i64, Path, description = "Ticket identifier"), PageQuery),
    responses(
        (status = 200, description = "Session history", body = ApiEnvelope<SessionHistoryBody>),
        (status = 400, description = "Invalid pagination", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 404, description = "Ticket not found", body = ErrorSchema)
    ),
    tags = ["work-sessions"],
    operation_id = "getWorkSessionHistory",
    security(("BearerToken" = []))
)]
#[get("/tickets/{id}/work-session/history/")]
pub async fn session_history(
    req: HttpRequest,
    state: web::Data<HttpState>,
    actor: AuthenticatedActor,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> ApiResult<web::Json<ApiEnvelope<SessionHistoryBody>>> {
    let ticket_id = parse_ticket_id(&path)?;
    let page = query.into_inner().to_request()?;
    let history = state
        .workflow_query
        .session_history(&actor, &ticket_id, page)
        .await?;
    Ok(web::Json(ApiEnvelope::ok(
        "work session history loaded",
        SessionHistoryBody {
            segments: PageBody::from_page(history.segments, &req),
            summary: history.summary.into(),
        },
    )))
}

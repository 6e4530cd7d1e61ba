//! Ticket intake, workflow, and transition-log HTTP handlers.
//!
//! ```text
//! POST /api/v1/tickets/create/
//! GET  /api/v1/tickets/{id}/
//! POST /api/v1/tickets/{id}/assign/
//! POST /api/v1/tickets/{id}/start/
//! POST /api/v1/tickets/{id}/to-waiting-qc/
//! POST /api/v1/tickets/{id}/qc-pass/
//! POST /api/v1/tickets/{id}/qc-fail/
//! GET  /api/v1/tickets/{id}/transitions/
//! ```

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{CreateTicketRequest, WorkflowCommandRequest};
use crate::domain::{
    Actor, Error, IntakeRequest, InventoryItemId, InventoryItemRef, NewItemConfirmation,
    TicketId, UserId, WorkflowCommand,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthenticatedActor;
use crate::inbound::http::envelope::ApiEnvelope;
use crate::inbound::http::paging::{PageBody, PageQuery};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, invalid_value_error, missing_field_error, parse_id, parse_raw_id,
};
use crate::inbound::http::workflow_dto::{
    CreatedTicketBody, SessionSummaryBody, TicketBody, TransitionBody, WorkflowResultBody,
};

/// Confirmation for creating an item from an unknown serial.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewItemConfirmationBody {
    /// Why the item is being added during intake.
    pub reason: Option<String>,
    /// Display name for the new item; defaults to the serial.
    pub name: Option<String>,
}

/// Request payload for ticket intake.
///
/// Exactly one of `inventoryItemId` and `serialNumber` must be supplied.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequestBody {
    pub inventory_item_id: Option<i64>,
    pub serial_number: Option<String>,
    #[schema(min_items = 1)]
    pub checklist: Option<Vec<String>>,
    pub srt_code: Option<String>,
    pub title: Option<String>,
    pub confirm_new_item: Option<NewItemConfirmationBody>,
}

/// Request payload for `assign`.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequestBody {
    pub technician_id: Option<i64>,
}

/// Request payload for `qc-fail`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QcFailRequestBody {
    pub reason: Option<String>,
}

/// Ticket with its live session summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketDetailBody {
    pub ticket: TicketBody,
    pub session: SessionSummaryBody,
}

fn parse_item_ref(body: &CreateTicketRequestBody) -> Result<InventoryItemRef, Error> {
    match (body.inventory_item_id, body.serial_number.as_deref()) {
        (Some(id), None) => Ok(InventoryItemRef::Id(parse_raw_id::<InventoryItemId>(
            id,
            FieldName::new("inventoryItemId"),
        )?)),
        (None, Some(serial)) => Ok(InventoryItemRef::Serial(serial.to_owned())),
        (None, None) => Err(missing_field_error(FieldName::new("inventoryItemId"))),
        (Some(id), Some(_)) => Err(invalid_value_error(
            FieldName::new("inventoryItemId"),
            "supply either inventoryItemId or serialNumber, not both",
            &id.to_string(),
        )),
    }
}

fn parse_intake(body: CreateTicketRequestBody) -> Result<IntakeRequest, Error> {
    let item = parse_item_ref(&body)?;
    let checklist = body
        .checklist
        .ok_or_else(|| missing_field_error(FieldName::new("checklist")))?;
    let srt_code = body
        .srt_code
        .ok_or_else(|| missing_field_error(FieldName::new("srtCode")))?;
    let confirm_new_item = body.confirm_new_item.map(|confirmation| NewItemConfirmation {
        reason: confirmation.reason.unwrap_or_default(),
        name: confirmation.name,
    });
    Ok(IntakeRequest {
        item,
        checklist,
        srt_code,
        title: body.title,
        confirm_new_item,
    })
}

pub(crate) fn parse_ticket_id(raw: &str) -> Result<TicketId, Error> {
    parse_id(raw, FieldName::new("id"))
}

pub(crate) async fn run_command(
    state: &HttpState,
    actor: Actor,
    ticket_id: TicketId,
    command: WorkflowCommand,
    message: &str,
) -> ApiResult<web::Json<ApiEnvelope<WorkflowResultBody>>> {
    let applied = state
        .workflow
        .execute(WorkflowCommandRequest {
            actor,
            ticket_id,
            command,
        })
        .await?;
    Ok(web::Json(ApiEnvelope::ok(
        message,
        WorkflowResultBody::from(applied),
    )))
}

/// Open a ticket for an inventory item.
#[utoipa::path(
    post,
    path = "/api/v1/tickets/create/",
    request_body = CreateTicketRequestBody,
    responses(
        (status = 201, description = "Ticket created", body = ApiEnvelope<CreatedTicketBody>),
        (status = 400, description = "Invalid request or unknown serial", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Inventory item not found", body = ErrorSchema),
        (status = 409, description = "Item already has an active ticket", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["tickets"],
    operation_id = "createTicket",
    security(("BearerToken" = []))
)]
#[post("/tickets/create/")]
pub async fn create_ticket(
    state: web::Data<HttpState>,
    actor: AuthenticatedActor,
    payload: web::Json<CreateTicketRequestBody>,
) -> ApiResult<HttpResponse> {
    let intake = parse_intake(payload.into_inner())?;
    let created = state
        .intake
        .create_ticket(CreateTicketRequest {
            actor: actor.into_inner(),
            intake,
        })
        .await?;
    Ok(HttpResponse::Created().json(ApiEnvelope::ok(
        "ticket created",
        CreatedTicketBody::from(created),
    )))
}

/// Fetch a ticket and its live session summary.
#[utoipa::path(
    get,
    path = "/api/v1/tickets/{id}/",
    params(("id" = i64, Path, description = "Ticket identifier")),
    responses(
        (status = 200, description = "Ticket detail", body = ApiEnvelope<TicketDetailBody>),
        (status = 400, description = "Invalid identifier", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 404, description = "Ticket not found", body = ErrorSchema)
    ),
    tags = ["tickets"],
    operation_id = "getTicket",
    security(("BearerToken" = []))
)]
#[get("/tickets/{id}/")]
pub async fn get_ticket(
    state: web::Data<HttpState>,
    actor: AuthenticatedActor,
    path: web::Path<String>,
) -> ApiResult<web::Json<ApiEnvelope<TicketDetailBody>>> {
    let ticket_id = parse_ticket_id(&path)?;
    let detail = state.workflow_query.ticket_detail(&actor, &ticket_id).await?;
    Ok(web::Json(ApiEnvelope::ok(
        "ticket loaded",
        TicketDetailBody {
            ticket: detail.ticket.into(),
            session: detail.session.into(),
        },
    )))
}

/// Assign a technician to a `NEW` or `REWORK` ticket.
#[utoipa::path(
    post,
    path = "/api/v1/tickets/{id}/assign/",
    params(("id" = i64, Path, description = "Ticket identifier")),
    request_body = AssignRequestBody,
    responses(
        (status = 200, description = "Ticket assigned", body = ApiEnvelope<WorkflowResultBody>),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Ticket not found", body = ErrorSchema),
        (status = 409, description = "Wrong status or technician busy", body = ErrorSchema)
    ),
    tags = ["tickets"],
    operation_id = "assignTicket",
    security(("BearerToken" = []))
)]
#[post("/tickets/{id}/assign/")]
pub async fn assign_ticket(
    state: web::Data<HttpState>,
    actor: AuthenticatedActor,
    path: web::Path<String>,
    payload: web::Json<AssignRequestBody>,
) -> ApiResult<web::Json<ApiEnvelope<WorkflowResultBody>>> {
    let ticket_id = parse_ticket_id(&path)?;
    let raw = payload
        .technician_id
        .ok_or_else(|| missing_field_error(FieldName::new("technicianId")))?;
    let technician_id = parse_raw_id::<UserId>(raw, FieldName::new("technicianId"))?;
    run_command(
        &state,
        actor.into_inner(),
        ticket_id,
        WorkflowCommand::Assign { technician_id },
        "ticket assigned",
    )
    .await
}

/// Start work on an assigned ticket and open a work session.
#[utoipa::path(
    post,
    path = "/api/v1/tickets/{id}/start/",
    params(("id" = i64, Path, description = "Ticket identifier")),
    responses(
        (status = 200, description = "Work started", body = ApiEnvelope<WorkflowResultBody>),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Ticket not found", body = ErrorSchema),
        (status = 409, description = "Wrong status or technician busy", body = ErrorSchema)
    ),
    tags = ["tickets"],
    operation_id = "startTicket",
    security(("BearerToken" = []))
)]
#[post("/tickets/{id}/start/")]
pub async fn start_ticket(
    state: web::Data<HttpState>,
    actor: AuthenticatedActor,
    path: web::Path<String>,
) -> ApiResult<web::Json<ApiEnvelope<WorkflowResultBody>>> {
    let ticket_id = parse_ticket_id(&path)?;
    run_command(
        &state,
        actor.into_inner(),
        ticket_id,
        WorkflowCommand::Start,
        "work started",
    )
    .await
}

/// Hand a ticket over to quality control once its session is stopped.
#[utoipa::path(
    post,
    path = "/api/v1/tickets/{id}/to-waiting-qc/",
    params(("id" = i64, Path, description = "Ticket identifier")),
    responses(
        (status = 200, description = "Ticket awaiting QC", body = ApiEnvelope<WorkflowResultBody>),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Ticket not found", body = ErrorSchema),
        (status = 409, description = "Wrong status or session still open", body = ErrorSchema)
    ),
    tags = ["tickets"],
    operation_id = "moveTicketToWaitingQc",
    security(("BearerToken" = []))
)]
#[post("/tickets/{id}/to-waiting-qc/")]
pub async fn to_waiting_qc(
    state: web::Data<HttpState>,
    actor: AuthenticatedActor,
    path: web::Path<String>,
) -> ApiResult<web::Json<ApiEnvelope<WorkflowResultBody>>> {
    let ticket_id = parse_ticket_id(&path)?;
    run_command(
        &state,
        actor.into_inner(),
        ticket_id,
        WorkflowCommand::ToWaitingQc,
        "ticket awaiting quality control",
    )
    .await
}

/// Pass quality control, closing the ticket and awarding XP.
#[utoipa::path(
    post,
    path = "/api/v1/tickets/{id}/qc-pass/",
    params(("id" = i64, Path, description = "Ticket identifier")),
    responses(
        (status = 200, description = "Ticket done", body = ApiEnvelope<WorkflowResultBody>),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Ticket not found", body = ErrorSchema),
        (status = 409, description = "Ticket is not awaiting QC", body = ErrorSchema)
    ),
    tags = ["tickets"],
    operation_id = "passTicketQc",
    security(("BearerToken" = []))
)]
#[post("/tickets/{id}/qc-pass/")]
pub async fn qc_pass(
    state: web::Data<HttpState>,
    actor: AuthenticatedActor,
    path: web::Path<String>,
) -> ApiResult<web::Json<ApiEnvelope<WorkflowResultBody>>> {
    let ticket_id = parse_ticket_id(&path)?;
    run_command(
        &state,
        actor.into_inner(),
        ticket_id,
        WorkflowCommand::QcPass,
        "quality control passed",
    )
    .await
}

/// Fail quality control and send the ticket to rework.
#[utoipa::path(
    post,
    path = "/api/v1/tickets/{id}/qc-fail/",
    params(("id" = i64, Path, description = "Ticket identifier")),
    request_body = QcFailRequestBody,
    responses(
        (status = 200, description = "Ticket in rework", body = ApiEnvelope<WorkflowResultBody>),
        (status = 400, description = "Reason missing", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Ticket not found", body = ErrorSchema),
        (status = 409, description = "Ticket is not awaiting QC", body = ErrorSchema)
    ),
    tags = ["tickets"],
    operation_id = "failTicketQc",
    security(("BearerToken" = []))
)]
#[post("/tickets/{id}/qc-fail/")]
pub async fn qc_fail(
    state: web::Data<HttpState>,
    actor: AuthenticatedActor,
    path: web::Path<String>,
    payload: web::Json<QcFailRequestBody>,
) -> ApiResult<web::Json<ApiEnvelope<WorkflowResultBody>>> {
    let ticket_id = parse_ticket_id(&path)?;
    // Blank reasons are rejected by the workflow after the role and status checks.
    let reason = payload.into_inner().reason.unwrap_or_default();
    run_command(
        &state,
        actor.into_inner(),
        ticket_id,
        WorkflowCommand::QcFail { reason },
        "quality control failed",
    )
    .await
}

/// List a ticket's transitions, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/tickets/{id}/transitions/",
    params(("id" = i64, Path, description = "Ticket identifier"), PageQuery),
    responses(
        (
            status = 200,
            description = "Transition log page",
            body = ApiEnvelope<PageBody<TransitionBody>>
        ),
        (status = 400, description = "Invalid pagination", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 404, description = "Ticket not found", body = ErrorSchema)
    ),
    tags = ["tickets"],
    operation_id = "listTicketTransitions",
    security(("BearerToken" = []))
)]
#[get("/tickets/{id}/transitions/")]
pub async fn list_transitions(
    req: HttpRequest,
    state: web::Data<HttpState>,
    actor: AuthenticatedActor,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> ApiResult<web::Json<ApiEnvelope<PageBody<TransitionBody>>>> {
    let ticket_id = parse_ticket_id(&path)?;
    let page = query.into_inner().to_request()?;
    let transitions = state
        .workflow_query
        .transitions(&actor, &ticket_id, page)
        .await?;
    Ok(web::Json(ApiEnvelope::ok(
        "transitions loaded",
        PageBody::from_page(transitions, &req),
    )))
}

#[cfg(test)]
#[path = "tickets_tests.rs"]
mod tests;

//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every `/api/v1` handler, the health probes, the
//! request and response bodies, and the `BearerToken` security scheme. The
//! document backs Swagger UI in debug builds and is exported with
//! `cargo run --bin openapi-dump`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::inbound::http::health::{ProbeBody, ProbePhase, StorageBackend};
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use crate::inbound::http::tickets::{
    AssignRequestBody, CreateTicketRequestBody, NewItemConfirmationBody, QcFailRequestBody,
    TicketDetailBody,
};
use crate::inbound::http::work_sessions::SessionHistoryBody;
use crate::inbound::http::workflow_dto::{
    CreatedTicketBody, InventoryItemBody, SegmentBody, SessionEventBody, SessionSummaryBody,
    TicketBody, TransitionBody, WorkflowResultBody, XpEntryBody,
};
use crate::inbound::http::xp_ledger::XpSummaryBody;

/// Register the bearer token scheme referenced by the handlers.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "BearerToken",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .description(Some(
                        "Opaque token registered in the identity file; see `hash-token`.",
                    ))
                    .build(),
            ),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Repair desk API",
        description = "Ticket intake, repair workflow, technician work sessions, and the XP ledger."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("BearerToken" = [])),
    paths(
        crate::inbound::http::tickets::create_ticket,
        crate::inbound::http::tickets::get_ticket,
        crate::inbound::http::tickets::assign_ticket,
        crate::inbound::http::tickets::start_ticket,
        crate::inbound::http::tickets::to_waiting_qc,
        crate::inbound::http::tickets::qc_pass,
        crate::inbound::http::tickets::qc_fail,
        crate::inbound::http::tickets::list_transitions,
        crate::inbound::http::work_sessions::pause_session,
        crate::inbound::http::work_sessions::resume_session,
        crate::inbound::http::work_sessions::stop_session,
        crate::inbound::http::work_sessions::session_history,
        crate::inbound::http::xp_ledger::list_ledger,
        crate::inbound::http::xp_ledger::ledger_summary,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        CreateTicketRequestBody,
        NewItemConfirmationBody,
        AssignRequestBody,
        QcFailRequestBody,
        TicketDetailBody,
        TicketBody,
        InventoryItemBody,
        TransitionBody,
        SessionEventBody,
        SessionSummaryBody,
        SegmentBody,
        SessionHistoryBody,
        XpEntryBody,
        XpSummaryBody,
        CreatedTicketBody,
        WorkflowResultBody,
        ProbeBody,
        ProbePhase,
        StorageBackend,
    )),
    tags(
        (name = "tickets", description = "Ticket intake and workflow transitions"),
        (name = "work-sessions", description = "Technician work-session controls and history"),
        (name = "xp", description = "Experience point ledger"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

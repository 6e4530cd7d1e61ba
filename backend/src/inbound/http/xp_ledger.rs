//! XP ledger read endpoints.
//!
//! ```text
//! GET /api/v1/xp/ledger/
//! GET /api/v1/xp/ledger/summary/
//! ```

use actix_web::{HttpRequest, get, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::XpLedgerQueryRequest;
use crate::domain::{Error, TicketId, UserId, XpEntryType, XpLedgerFilter, XpSummary};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthenticatedActor;
use crate::inbound::http::envelope::ApiEnvelope;
use crate::inbound::http::paging::PageBody;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, invalid_value_error, page_request, parse_id, parse_optional_enum,
    parse_optional_rfc3339_timestamp,
};
use crate::inbound::http::workflow_dto::XpEntryBody;

const ENTRY_TYPES: &str = "attendance_punctuality, ticket_base_xp, ticket_qc_first_pass_bonus";

/// Ledger filters shared by the list and summary endpoints.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct XpLedgerQueryParams {
    /// Owner of the entries; defaults to the caller.
    pub user_id: Option<String>,
    pub ticket_id: Option<String>,
    /// One of `attendance_punctuality`, `ticket_base_xp`, `ticket_qc_first_pass_bonus`.
    pub entry_type: Option<String>,
    /// Case-insensitive substring of the reference.
    pub reference: Option<String>,
    /// Inclusive lower bound on `createdAt` (RFC 3339).
    pub created_from: Option<String>,
    /// Inclusive upper bound on `createdAt` (RFC 3339).
    pub created_to: Option<String>,
    pub amount_min: Option<i64>,
    pub amount_max: Option<i64>,
    /// 1-based page number; ignored by the summary.
    pub page: Option<u32>,
    /// Items per page; ignored by the summary.
    pub page_size: Option<u32>,
}

impl XpLedgerQueryParams {
    fn into_filter(self) -> Result<XpLedgerFilter, Error> {
        let filter = XpLedgerFilter {
            user_id: self
                .user_id
                .as_deref()
                .map(|raw| parse_id::<UserId>(raw, FieldName::new("userId")))
                .transpose()?,
            ticket_id: self
                .ticket_id
                .as_deref()
                .map(|raw| parse_id::<TicketId>(raw, FieldName::new("ticketId")))
                .transpose()?,
            entry_type: parse_optional_enum::<XpEntryType>(
                self.entry_type,
                FieldName::new("entryType"),
                ENTRY_TYPES,
            )?,
            reference: self
                .reference
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty()),
            created_from: parse_optional_rfc3339_timestamp(
                self.created_from,
                FieldName::new("createdFrom"),
            )?,
            created_to: parse_optional_rfc3339_timestamp(
                self.created_to,
                FieldName::new("createdTo"),
            )?,
            amount_min: self.amount_min,
            amount_max: self.amount_max,
        };
        if let (Some(from), Some(to)) = (filter.created_from, filter.created_to)
            && from > to
        {
            return Err(invalid_value_error(
                FieldName::new("createdTo"),
                "createdTo must not precede createdFrom",
                &to.to_rfc3339(),
            ));
        }
        if let (Some(min), Some(max)) = (filter.amount_min, filter.amount_max)
            && min > max
        {
            return Err(invalid_value_error(
                FieldName::new("amountMax"),
                "amountMax must not be below amountMin",
                &max.to_string(),
            ));
        }
        Ok(filter)
    }
}

/// Per-user XP aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct XpSummaryBody {
    pub user_id: i64,
    pub total_amount: i64,
    pub entry_count: u64,
}

impl From<XpSummary> for XpSummaryBody {
    fn from(summary: XpSummary) -> Self {
        Self {
            user_id: summary.user_id.get(),
            total_amount: summary.total_amount,
            entry_count: summary.entry_count,
        }
    }
}

/// List XP ledger entries, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/xp/ledger/",
    params(XpLedgerQueryParams),
    responses(
        (status = 200, description = "Ledger page", body = ApiEnvelope<PageBody<XpEntryBody>>),
        (status = 400, description = "Invalid filter", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Reading another user's ledger", body = ErrorSchema)
    ),
    tags = ["xp"],
    operation_id = "listXpLedger",
    security(("BearerToken" = []))
)]
#[get("/xp/ledger/")]
pub async fn list_ledger(
    req: HttpRequest,
    state: web::Data<HttpState>,
    actor: AuthenticatedActor,
    query: web::Query<XpLedgerQueryParams>,
) -> ApiResult<web::Json<ApiEnvelope<PageBody<XpEntryBody>>>> {
    let params = query.into_inner();
    let page = page_request(params.page, params.page_size)?;
    let filter = params.into_filter()?;
    let entries = state
        .xp_ledger
        .list(XpLedgerQueryRequest {
            actor: actor.into_inner(),
            filter,
            page,
        })
        .await?;
    Ok(web::Json(ApiEnvelope::ok(
        "xp ledger loaded",
        PageBody::from_page(entries, &req),
    )))
}

/// Sum a user's XP entries matching the filters.
#[utoipa::path(
    get,
    path = "/api/v1/xp/ledger/summary/",
    params(XpLedgerQueryParams),
    responses(
        (status = 200, description = "Ledger aggregate", body = ApiEnvelope<XpSummaryBody>),
        (status = 400, description = "Invalid filter", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Reading another user's ledger", body = ErrorSchema)
    ),
    tags = ["xp"],
    operation_id = "summarizeXpLedger",
    security(("BearerToken" = []))
)]
#[get("/xp/ledger/summary/")]
pub async fn ledger_summary(
    state: web::Data<HttpState>,
    actor: AuthenticatedActor,
    query: web::Query<XpLedgerQueryParams>,
) -> ApiResult<web::Json<ApiEnvelope<XpSummaryBody>>> {
    let filter = query.into_inner().into_filter()?;
    let summary = state.xp_ledger.summary(&actor, filter).await?;
    Ok(web::Json(ApiEnvelope::ok(
        "xp summary loaded",
        XpSummaryBody::from(summary),
    )))
}

//! XP ledger read service.
//!
//! Callers without cross-user read roles are scoped to their own entries:
//! omitting the user selects the caller and naming anyone else is forbidden.

use std::sync::Arc;

use async_trait::async_trait;
use pagination::Page;
use tracing::{debug, error, warn};

use crate::domain::ports::{
    XpLedgerQuery, XpLedgerQueryRequest, XpLedgerRepository, XpLedgerRepositoryError,
};
use crate::domain::{
    Actor, Error, WorkflowAction, XpLedgerEntry, XpLedgerFilter, XpSummary, authorize,
};

/// Ledger service implementing [`XpLedgerQuery`].
#[derive(Clone)]
pub struct XpLedgerService<R> {
    repo: Arc<R>,
}

impl<R> XpLedgerService<R> {
    /// Create a service over `repo`.
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }
}

fn map_ledger_error(error: XpLedgerRepositoryError) -> Error {
    match error {
        XpLedgerRepositoryError::Connection { message } => {
            warn!(%message, "xp ledger unavailable");
            Error::service_unavailable(format!("xp ledger unavailable: {message}"))
        }
        XpLedgerRepositoryError::Query { message } => {
            error!(%message, "xp ledger query failed");
            Error::internal(format!("xp ledger error: {message}"))
        }
    }
}

/// Restrict `filter` to what `actor` may read.
fn scoped_filter(actor: &Actor, mut filter: XpLedgerFilter) -> Result<XpLedgerFilter, Error> {
    let guard = authorize(actor, WorkflowAction::ReadOthersXp);
    if guard.is_allowed() {
        return Ok(filter);
    }
    match filter.user_id {
        None => filter.user_id = Some(actor.user_id()),
        Some(user_id) if user_id == actor.user_id() => {}
        Some(user_id) => {
            debug!(actor = %actor.user_id(), requested = %user_id, "cross-user ledger read denied");
            guard.into_result()?;
        }
    }
    Ok(filter)
}

#[async_trait]
impl<R> XpLedgerQuery for XpLedgerService<R>
where
    R: XpLedgerRepository,
{
    async fn list(&self, request: XpLedgerQueryRequest) -> Result<Page<XpLedgerEntry>, Error> {
        let filter = scoped_filter(&request.actor, request.filter)?;
        self.repo
            .list(&filter, request.page)
            .await
            .map_err(map_ledger_error)
    }

    async fn summary(&self, actor: &Actor, filter: XpLedgerFilter) -> Result<XpSummary, Error> {
        let mut filter = scoped_filter(actor, filter)?;
        let user_id = *filter.user_id.get_or_insert_with(|| actor.user_id());
        self.repo
            .summarize(&user_id, &filter)
            .await
            .map_err(map_ledger_error)
    }
}

//! Driving port for XP ledger reads.

use async_trait::async_trait;
use pagination::{Page, PageRequest};

use crate::domain::{Actor, Error, XpLedgerEntry, XpLedgerFilter, XpSummary};

/// Request to list ledger entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XpLedgerQueryRequest {
    /// Caller; scopes the query when it lacks cross-user read roles.
    pub actor: Actor,
    /// Requested filters.
    pub filter: XpLedgerFilter,
    /// Requested page.
    pub page: PageRequest,
}

/// Driving port for XP ledger reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait XpLedgerQuery: Send + Sync {
    /// List matching entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `forbidden` when the caller names another user without
    /// cross-user read roles.
    async fn list(&self, request: XpLedgerQueryRequest) -> Result<Page<XpLedgerEntry>, Error>;

    /// Aggregate matching entries of one user.
    async fn summary(&self, actor: &Actor, filter: XpLedgerFilter) -> Result<XpSummary, Error>;
}

/// Fixture implementation backed by an empty ledger.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureXpLedgerQuery;

#[async_trait]
impl XpLedgerQuery for FixtureXpLedgerQuery {
    async fn list(&self, request: XpLedgerQueryRequest) -> Result<Page<XpLedgerEntry>, Error> {
        Ok(Page::new(Vec::new(), request.page, 0))
    }

    async fn summary(&self, actor: &Actor, filter: XpLedgerFilter) -> Result<XpSummary, Error> {
        Ok(XpSummary {
            user_id: filter.user_id.unwrap_or_else(|| actor.user_id()),
            total_amount: 0,
            entry_count: 0,
        })
    }
}

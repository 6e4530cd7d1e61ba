//! Port for XP ledger reads.
//!
//! Ledger entries are appended inside workflow units of work through
//! [`super::TicketWorkflowRepository::apply`]. This port only reads.

use async_trait::async_trait;
use pagination::{Page, PageRequest};

use crate::domain::{UserId, XpLedgerEntry, XpLedgerFilter, XpSummary};

use super::define_port_error;

define_port_error! {
    /// Errors raised by XP ledger repository adapters.
    pub enum XpLedgerRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "xp ledger connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } =>
            "xp ledger query failed: {message}",
    }
}

/// Port for reading the append-only XP ledger.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait XpLedgerRepository: Send + Sync {
    /// Page through matching entries, newest first.
    async fn list(
        &self,
        filter: &XpLedgerFilter,
        page: PageRequest,
    ) -> Result<Page<XpLedgerEntry>, XpLedgerRepositoryError>;

    /// Sum matching entries of `user_id`.
    async fn summarize(
        &self,
        user_id: &UserId,
        filter: &XpLedgerFilter,
    ) -> Result<XpSummary, XpLedgerRepositoryError>;
}

/// Fixture implementation backed by an empty ledger.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureXpLedgerRepository;

#[async_trait]
impl XpLedgerRepository for FixtureXpLedgerRepository {
    async fn list(
        &self,
        _filter: &XpLedgerFilter,
        page: PageRequest,
    ) -> Result<Page<XpLedgerEntry>, XpLedgerRepositoryError> {
        Ok(Page::new(Vec::new(), page, 0))
    }

    async fn summarize(
        &self,
        user_id: &UserId,
        _filter: &XpLedgerFilter,
    ) -> Result<XpSummary, XpLedgerRepositoryError> {
        Ok(XpSummary {
            user_id: *user_id,
            total_amount: 0,
            entry_count: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;

    #[tokio::test]
    async fn fixture_ledger_is_empty() {
        let repo = FixtureXpLedgerRepository;
        let summary = repo
            .summarize(&UserId::new(3), &XpLedgerFilter::default())
            .await
            .expect("fixture summary");
        assert_eq!(summary.total_amount, 0);
        assert_eq!(summary.entry_count, 0);
    }
}

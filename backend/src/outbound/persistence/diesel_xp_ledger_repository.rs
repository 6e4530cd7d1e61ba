//! PostgreSQL-backed `XpLedgerRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use diesel::dsl::sql;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use diesel_async::RunQueryDsl;
use pagination::{Page, PageRequest};

use crate::domain::ports::{XpLedgerRepository, XpLedgerRepositoryError};
use crate::domain::{UserId, XpLedgerEntry, XpLedgerFilter, XpSummary};

use super::diesel_error_mapping::{map_basic_pool_error, map_diesel_error};
use super::models::XpEntryRow;
use super::pool::{DbPool, PoolError};
use super::schema::xp_ledger_entries;

/// Diesel-backed implementation of the XP ledger repository port.
#[derive(Clone)]
pub struct DieselXpLedgerRepository {
    pool: DbPool,
}

impl DieselXpLedgerRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> XpLedgerRepositoryError {
    map_basic_pool_error(error, XpLedgerRepositoryError::connection)
}

fn map_query_error(error: diesel::result::Error) -> XpLedgerRepositoryError {
    map_diesel_error(
        error,
        XpLedgerRepositoryError::query,
        XpLedgerRepositoryError::connection,
        XpLedgerRepositoryError::query,
    )
}

/// Build an `ILIKE` pattern matching `needle` anywhere, escaping wildcards.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn filtered_entries(filter: &XpLedgerFilter) -> xp_ledger_entries::BoxedQuery<'static, Pg> {
    let mut query = xp_ledger_entries::table.into_boxed();
    if let Some(user_id) = filter.user_id {
        query = query.filter(xp_ledger_entries::user_id.eq(user_id.get()));
    }
    if let Some(ticket_id) = filter.ticket_id {
        query = query.filter(xp_ledger_entries::ticket_id.eq(ticket_id.get()));
    }
    if let Some(entry_type) = filter.entry_type {
        query = query.filter(xp_ledger_entries::entry_type.eq(entry_type.as_str()));
    }
    if let Some(reference) = filter.reference.as_deref() {
        query = query.filter(xp_ledger_entries::reference.ilike(contains_pattern(reference)));
    }
    if let Some(from) = filter.created_from {
        query = query.filter(xp_ledger_entries::created_at.ge(from));
    }
    if let Some(to) = filter.created_to {
        query = query.filter(xp_ledger_entries::created_at.le(to));
    }
    if let Some(min) = filter.amount_min {
        query = query.filter(xp_ledger_entries::amount.ge(min));
    }
    if let Some(max) = filter.amount_max {
        query = query.filter(xp_ledger_entries::amount.le(max));
    }
    query
}

#[async_trait]
impl XpLedgerRepository for DieselXpLedgerRepository {
    async fn list(
        &self,
        filter: &XpLedgerFilter,
        page: PageRequest,
    ) -> Result<Page<XpLedgerEntry>, XpLedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let total = filtered_entries(filter)
            .count()
            .get_result::<i64>(&mut conn)
            .await
            .map_err(map_query_error)?;
        let rows = filtered_entries(filter)
            .order_by(xp_ledger_entries::id.desc())
            .offset(i64::try_from(page.offset()).unwrap_or(i64::MAX))
            .limit(i64::try_from(page.limit()).unwrap_or(i64::MAX))
            .select(XpEntryRow::as_select())
            .load::<XpEntryRow>(&mut conn)
            .await
            .map_err(map_query_error)?;
        let items = rows
            .into_iter()
            .map(XpEntryRow::into_domain)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| XpLedgerRepositoryError::query(err.to_string()))?;
        Ok(Page::new(items, page, u64::try_from(total).unwrap_or(0)))
    }

    async fn summarize(
        &self,
        user_id: &UserId,
        filter: &XpLedgerFilter,
    ) -> Result<XpSummary, XpLedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let (total_amount, entry_count) = filtered_entries(filter)
            .filter(xp_ledger_entries::user_id.eq(user_id.get()))
            .select((
                sql::<BigInt>("COALESCE(SUM(amount), 0)::BIGINT"),
                sql::<BigInt>("COUNT(*)"),
            ))
            .get_result::<(i64, i64)>(&mut conn)
            .await
            .map_err(map_query_error)?;
        Ok(XpSummary {
            user_id: *user_id,
            total_amount,
            entry_count: u64::try_from(entry_count).unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("qc_pass", "%qc\\_pass%")]
    #[case("100%", "%100\\%%")]
    #[case("ticket:4", "%ticket:4%")]
    fn reference_filter_escapes_wildcards(#[case] needle: &str, #[case] expected: &str) {
        assert_eq!(contains_pattern(needle), expected);
    }

    #[rstest]
    fn filters_render_as_bound_predicates() {
        let filter = XpLedgerFilter {
            user_id: Some(UserId::new(7)),
            reference: Some("first_pass".to_owned()),
            ..XpLedgerFilter::default()
        };
        let sql = diesel::debug_query::<Pg, _>(&filtered_entries(&filter)).to_string();
        assert!(sql.contains("\"xp_ledger_entries\".\"user_id\" = $1"));
        assert!(sql.contains("ILIKE $2"));
    }
}

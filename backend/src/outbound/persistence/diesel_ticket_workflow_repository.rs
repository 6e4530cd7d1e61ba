//! PostgreSQL-backed `TicketWorkflowRepository` implementation using Diesel.
//!
//! Intake and workflow commands each run in one transaction. Workflow
//! commands lock the ticket row with `SELECT ... FOR UPDATE` before loading
//! history, so concurrent commands on the same ticket are serialised and the
//! domain decision always sees committed state.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::AsyncConnection as _;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use pagination::{Page, PageRequest};

use crate::domain::ports::{
    CreatedTicket, TicketWorkflowRepository, TicketWorkflowRepositoryError,
};
use crate::domain::{
    AppliedWorkflowChange, IntakePlan, InventoryItem, InventoryItemId, InventoryItemStatus,
    ItemResolution, SessionEvent, Ticket, TicketId, TicketSnapshot, TicketStatus, Transition,
    UserId, WorkflowChange, WorkflowDecision, XpLedgerEntry, session_summary_after,
};

use super::diesel_error_mapping::{map_basic_pool_error, map_diesel_error};
use super::models::{
    InventoryItemRow, NewInventoryItemRow, NewSessionEventRow, NewTicketRow, NewTransitionRow,
    NewXpEntryRow, RowDecodeError, SessionEventRow, TicketRow, TicketUpdate, TransitionRow,
    XpEntryRow,
};
use super::pool::{DbPool, PoolError};
use super::schema::{
    inventory_items, ticket_transitions, tickets, work_session_events, xp_ledger_entries,
};

/// Diesel-backed implementation of the ticket workflow repository port.
#[derive(Clone)]
pub struct DieselTicketWorkflowRepository {
    pool: DbPool,
}

impl DieselTicketWorkflowRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> TicketWorkflowRepositoryError {
    map_basic_pool_error(error, TicketWorkflowRepositoryError::connection)
}

fn map_query_error(error: diesel::result::Error) -> TicketWorkflowRepositoryError {
    map_diesel_error(
        error,
        TicketWorkflowRepositoryError::query,
        TicketWorkflowRepositoryError::connection,
        TicketWorkflowRepositoryError::conflict,
    )
}

fn map_decode_error(error: RowDecodeError) -> TicketWorkflowRepositoryError {
    TicketWorkflowRepositoryError::query(error.to_string())
}

/// Failure inside a unit of work: either Diesel itself or a repository
/// outcome decided mid-transaction. Both roll the transaction back.
#[derive(Debug, thiserror::Error)]
enum UnitOfWorkError {
    #[error(transparent)]
    Diesel(#[from] diesel::result::Error),
    #[error(transparent)]
    Repository(#[from] TicketWorkflowRepositoryError),
}

impl From<RowDecodeError> for UnitOfWorkError {
    fn from(error: RowDecodeError) -> Self {
        Self::Repository(map_decode_error(error))
    }
}

impl From<UnitOfWorkError> for TicketWorkflowRepositoryError {
    fn from(error: UnitOfWorkError) -> Self {
        match error {
            UnitOfWorkError::Diesel(err) => map_query_error(err),
            UnitOfWorkError::Repository(err) => err,
        }
    }
}

fn to_i64_offset(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn checklist_json(plan: &IntakePlan) -> Result<serde_json::Value, TicketWorkflowRepositoryError> {
    serde_json::to_value(plan.checklist.items())
        .map_err(|err| TicketWorkflowRepositoryError::query(format!("serialise checklist: {err}")))
}

async fn lock_item(
    conn: &mut AsyncPgConnection,
    item_id: InventoryItemId,
) -> Result<InventoryItem, UnitOfWorkError> {
    let row = inventory_items::table
        .filter(inventory_items::id.eq(item_id.get()))
        .select(InventoryItemRow::as_select())
        .for_update()
        .first::<InventoryItemRow>(conn)
        .await
        .optional()?
        .ok_or_else(|| {
            TicketWorkflowRepositoryError::query(format!("inventory item {item_id} is missing"))
        })?;
    let item = row.into_domain()?;
    if !item.status.accepts_tickets() {
        return Err(TicketWorkflowRepositoryError::conflict(format!(
            "inventory item {item_id} was written off"
        ))
        .into());
    }
    Ok(item)
}

async fn insert_item(
    conn: &mut AsyncPgConnection,
    plan: &IntakePlan,
    serial_number: &str,
    name: &str,
) -> Result<InventoryItem, UnitOfWorkError> {
    let row = diesel::insert_into(inventory_items::table)
        .values(&NewInventoryItemRow {
            serial_number,
            name,
            status: InventoryItemStatus::InService.as_str(),
            created_at: plan.created_at,
            updated_at: plan.created_at,
        })
        .returning(InventoryItemRow::as_returning())
        .get_result::<InventoryItemRow>(conn)
        .await?;
    Ok(row.into_domain()?)
}

async fn active_ticket_for_item(
    conn: &mut AsyncPgConnection,
    item_id: InventoryItemId,
) -> Result<Option<i64>, diesel::result::Error> {
    tickets::table
        .filter(tickets::inventory_item_id.eq(item_id.get()))
        .filter(tickets::status.ne(TicketStatus::Done.as_str()))
        .select(tickets::id)
        .first::<i64>(conn)
        .await
        .optional()
}

async fn in_progress_ticket_for(
    conn: &mut AsyncPgConnection,
    technician_id: UserId,
    except: TicketId,
) -> Result<Option<TicketId>, diesel::result::Error> {
    let id = tickets::table
        .filter(tickets::status.eq(TicketStatus::InProgress.as_str()))
        .filter(tickets::assigned_technician_id.eq(technician_id.get()))
        .filter(tickets::id.ne(except.get()))
        .select(tickets::id)
        .first::<i64>(conn)
        .await
        .optional()?;
    Ok(id.map(TicketId::new))
}

async fn set_item_status(
    conn: &mut AsyncPgConnection,
    item_id: InventoryItemId,
    status: InventoryItemStatus,
    at: chrono::DateTime<chrono::Utc>,
) -> Result<InventoryItemRow, diesel::result::Error> {
    diesel::update(inventory_items::table.filter(inventory_items::id.eq(item_id.get())))
        .set((
            inventory_items::status.eq(status.as_str()),
            inventory_items::updated_at.eq(at),
        ))
        .returning(InventoryItemRow::as_returning())
        .get_result(conn)
        .await
}

async fn insert_transition(
    conn: &mut AsyncPgConnection,
    row: &NewTransitionRow<'_>,
) -> Result<Transition, UnitOfWorkError> {
    let stored = diesel::insert_into(ticket_transitions::table)
        .values(row)
        .returning(TransitionRow::as_returning())
        .get_result::<TransitionRow>(conn)
        .await?;
    Ok(stored.into_domain()?)
}

async fn load_snapshot(
    conn: &mut AsyncPgConnection,
    ticket_id: TicketId,
    decision: &WorkflowDecision,
) -> Result<TicketSnapshot, UnitOfWorkError> {
    let ticket = tickets::table
        .filter(tickets::id.eq(ticket_id.get()))
        .select(TicketRow::as_select())
        .for_update()
        .first::<TicketRow>(conn)
        .await
        .optional()?
        .ok_or(TicketWorkflowRepositoryError::TicketNotFound { ticket_id })?
        .into_domain()?;

    let transitions = ticket_transitions::table
        .filter(ticket_transitions::ticket_id.eq(ticket_id.get()))
        .order_by(ticket_transitions::id)
        .select(TransitionRow::as_select())
        .load::<TransitionRow>(conn)
        .await?
        .into_iter()
        .map(TransitionRow::into_domain)
        .collect::<Result<Vec<_>, _>>()?;
    let session_events = load_session_events(conn, ticket_id).await?;

    let technician_active_ticket = match decision.workload_technician(&ticket) {
        Some(technician_id) => in_progress_ticket_for(conn, technician_id, ticket_id).await?,
        None => None,
    };
    Ok(TicketSnapshot {
        ticket,
        transitions,
        session_events,
        technician_active_ticket,
    })
}

async fn load_session_events(
    conn: &mut AsyncPgConnection,
    ticket_id: TicketId,
) -> Result<Vec<SessionEvent>, UnitOfWorkError> {
    let events = work_session_events::table
        .filter(work_session_events::ticket_id.eq(ticket_id.get()))
        .order_by(work_session_events::id)
        .select(SessionEventRow::as_select())
        .load::<SessionEventRow>(conn)
        .await?
        .into_iter()
        .map(SessionEventRow::into_domain)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(events)
}

struct WrittenChange {
    ticket: Ticket,
    transition: Option<Transition>,
    session_event: Option<SessionEvent>,
    xp_entries: Vec<XpLedgerEntry>,
}

/// Write every part of `change`; the caller's transaction makes it atomic.
async fn write_change(
    conn: &mut AsyncPgConnection,
    mut ticket: Ticket,
    change: &WorkflowChange,
) -> Result<WrittenChange, UnitOfWorkError> {
    let ticket_id = ticket.id.get();
    if change.changes_ticket() {
        change.apply_to(&mut ticket);
        diesel::update(tickets::table.filter(tickets::id.eq(ticket_id)))
            .set(&TicketUpdate {
                status: ticket.status.as_str(),
                assigned_technician_id: ticket.assigned_technician_id.map(UserId::get),
                updated_at: ticket.updated_at,
            })
            .execute(conn)
            .await?;
    }

    let transition = match &change.transition {
        Some(planned) => Some(
            insert_transition(
                conn,
                &NewTransitionRow {
                    ticket_id,
                    from_status: planned.from_status.map(TicketStatus::as_str),
                    to_status: planned.to_status.as_str(),
                    actor_id: planned.actor_id.get(),
                    reason: planned.reason.as_deref(),
                    created_at: planned.created_at,
                },
            )
            .await?,
        ),
        None => None,
    };

    let session_event = match &change.session_event {
        Some(planned) => {
            let row = diesel::insert_into(work_session_events::table)
                .values(&NewSessionEventRow {
                    ticket_id,
                    technician_id: planned.technician_id.get(),
                    kind: planned.kind.as_str(),
                    actor_id: planned.actor_id.get(),
                    occurred_at: planned.occurred_at,
                })
                .returning(SessionEventRow::as_returning())
                .get_result::<SessionEventRow>(conn)
                .await?;
            Some(row.into_domain()?)
        }
        None => None,
    };

    if let Some(status) = change.item_status {
        set_item_status(conn, ticket.inventory_item_id, status, change.occurred_at).await?;
    }

    let mut xp_entries = Vec::with_capacity(change.xp_entries.len());
    for entry in &change.xp_entries {
        let row = diesel::insert_into(xp_ledger_entries::table)
            .values(&NewXpEntryRow {
                user_id: entry.user_id.get(),
                ticket_id: entry.ticket_id.map(TicketId::get),
                entry_type: entry.entry_type.as_str(),
                amount: entry.amount,
                reference: &entry.reference,
                created_at: entry.created_at,
            })
            .returning(XpEntryRow::as_returning())
            .get_result::<XpEntryRow>(conn)
            .await?;
        xp_entries.push(row.into_domain()?);
    }
    Ok(WrittenChange {
        ticket,
        transition,
        session_event,
        xp_entries,
    })
}

#[async_trait]
impl TicketWorkflowRepository for DieselTicketWorkflowRepository {
    async fn find_item(
        &self,
        item_id: &InventoryItemId,
    ) -> Result<Option<InventoryItem>, TicketWorkflowRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = inventory_items::table
            .filter(inventory_items::id.eq(item_id.get()))
            .select(InventoryItemRow::as_select())
            .first::<InventoryItemRow>(&mut conn)
            .await
            .optional()
            .map_err(map_query_error)?;
        row.map(InventoryItemRow::into_domain)
            .transpose()
            .map_err(map_decode_error)
    }

    async fn find_item_by_serial(
        &self,
        serial_number: &str,
    ) -> Result<Option<InventoryItem>, TicketWorkflowRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = inventory_items::table
            .filter(inventory_items::serial_number.eq(serial_number))
            .select(InventoryItemRow::as_select())
            .first::<InventoryItemRow>(&mut conn)
            .await
            .optional()
            .map_err(map_query_error)?;
        row.map(InventoryItemRow::into_domain)
            .transpose()
            .map_err(map_decode_error)
    }

    async fn create_ticket(
        &self,
        plan: &IntakePlan,
    ) -> Result<CreatedTicket, TicketWorkflowRepositoryError> {
        let checklist = checklist_json(plan)?;
        let reason = plan.transition_reason();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let created = conn
            .transaction::<_, UnitOfWorkError, _>(|conn| {
                async move {
                    let (item, item_created) = match &plan.item {
                        ItemResolution::Existing(item) => (lock_item(conn, item.id).await?, false),
                        ItemResolution::Create {
                            serial_number,
                            name,
                            ..
                        } => (insert_item(conn, plan, serial_number, name).await?, true),
                    };
                    if let Some(active) = active_ticket_for_item(conn, item.id).await? {
                        return Err(TicketWorkflowRepositoryError::conflict(format!(
                            "inventory item {} already has active ticket {active}",
                            item.id
                        ))
                        .into());
                    }

                    let item_row = set_item_status(
                        conn,
                        item.id,
                        InventoryItemStatus::InService,
                        plan.created_at,
                    )
                    .await?;
                    let ticket_row = diesel::insert_into(tickets::table)
                        .values(&NewTicketRow {
                            inventory_item_id: item.id.get(),
                            status: TicketStatus::New.as_str(),
                            title: plan.title.as_deref(),
                            checklist: &checklist,
                            srt_code: &plan.srt.code,
                            srt_approved_by: plan.srt.approved_by.get(),
                            srt_approved_at: plan.srt.approved_at,
                            created_by: plan.created_by.get(),
                            created_at: plan.created_at,
                            updated_at: plan.created_at,
                        })
                        .returning(TicketRow::as_returning())
                        .get_result::<TicketRow>(conn)
                        .await?;
                    let ticket = ticket_row.into_domain()?;
                    let transition = insert_transition(
                        conn,
                        &NewTransitionRow {
                            ticket_id: ticket.id.get(),
                            from_status: None,
                            to_status: TicketStatus::New.as_str(),
                            actor_id: plan.created_by.get(),
                            reason: reason.as_deref(),
                            created_at: plan.created_at,
                        },
                    )
                    .await?;
                    Ok(CreatedTicket {
                        ticket,
                        item: item_row.into_domain()?,
                        transition,
                        item_created,
                    })
                }
                .scope_boxed()
            })
            .await?;
        Ok(created)
    }

    async fn find_ticket(
        &self,
        ticket_id: &TicketId,
    ) -> Result<Option<Ticket>, TicketWorkflowRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = tickets::table
            .filter(tickets::id.eq(ticket_id.get()))
            .select(TicketRow::as_select())
            .first::<TicketRow>(&mut conn)
            .await
            .optional()
            .map_err(map_query_error)?;
        row.map(TicketRow::into_domain)
            .transpose()
            .map_err(map_decode_error)
    }

    async fn apply(
        &self,
        ticket_id: &TicketId,
        decision: &WorkflowDecision,
    ) -> Result<AppliedWorkflowChange, TicketWorkflowRepositoryError> {
        let ticket_id = *ticket_id;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let applied = conn
            .transaction::<_, UnitOfWorkError, _>(|conn| {
                async move {
                    let snapshot = load_snapshot(conn, ticket_id, decision).await?;
                    let change = decision
                        .decide(&snapshot)
                        .map_err(TicketWorkflowRepositoryError::rejected)?;
                    let written = write_change(conn, snapshot.ticket.clone(), &change).await?;
                    Ok(AppliedWorkflowChange {
                        session: session_summary_after(
                            &snapshot.session_events,
                            written.session_event.as_ref(),
                            decision.now(),
                        ),
                        ticket: written.ticket,
                        transition: written.transition,
                        session_event: written.session_event,
                        xp_entries: written.xp_entries,
                    })
                }
                .scope_boxed()
            })
            .await?;
        Ok(applied)
    }

    async fn list_transitions(
        &self,
        ticket_id: &TicketId,
        page: PageRequest,
    ) -> Result<Page<Transition>, TicketWorkflowRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let total = ticket_transitions::table
            .filter(ticket_transitions::ticket_id.eq(ticket_id.get()))
            .count()
            .get_result::<i64>(&mut conn)
            .await
            .map_err(map_query_error)?;
        let rows = ticket_transitions::table
            .filter(ticket_transitions::ticket_id.eq(ticket_id.get()))
            .order_by(ticket_transitions::id)
            .offset(to_i64_offset(page.offset()))
            .limit(to_i64_offset(page.limit()))
            .select(TransitionRow::as_select())
            .load::<TransitionRow>(&mut conn)
            .await
            .map_err(map_query_error)?;
        let items = rows
            .into_iter()
            .map(TransitionRow::into_domain)
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_decode_error)?;
        Ok(Page::new(items, page, u64::try_from(total).unwrap_or(0)))
    }

    async fn list_session_events(
        &self,
        ticket_id: &TicketId,
    ) -> Result<Vec<SessionEvent>, TicketWorkflowRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        load_session_events(&mut conn, *ticket_id)
            .await
            .map_err(TicketWorkflowRepositoryError::from)
    }
}

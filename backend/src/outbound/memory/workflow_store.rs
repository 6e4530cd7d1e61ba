//! In-process implementation of the ticket and XP ledger repositories.
//!
//! All state sits behind one mutex. Each unit of work takes the lock once and
//! checks every precondition, including that referenced rows exist, before
//! its first write, so a rejected command leaves nothing behind.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::{Page, PageRequest};

use crate::domain::ports::{
    CreatedTicket, TicketWorkflowRepository, TicketWorkflowRepositoryError, XpLedgerRepository,
    XpLedgerRepositoryError,
};
use crate::domain::{
    AppliedWorkflowChange, IntakePlan, InventoryItem, InventoryItemId, InventoryItemStatus,
    ItemResolution, NewTransition, NewXpLedgerEntry, SessionEvent, SessionEventId, Ticket,
    TicketId, TicketSnapshot, TicketStatus, Transition, TransitionId, UserId, WorkflowChange,
    WorkflowDecision, XpEntryId, XpLedgerEntry, XpLedgerFilter, XpSummary, session_summary_after,
};

#[derive(Debug, Default)]
struct StoreState {
    items: BTreeMap<InventoryItemId, InventoryItem>,
    tickets: BTreeMap<TicketId, Ticket>,
    transitions: Vec<Transition>,
    session_events: Vec<SessionEvent>,
    xp_entries: Vec<XpLedgerEntry>,
    last_item_id: i64,
    last_ticket_id: i64,
    last_transition_id: i64,
    last_session_event_id: i64,
    last_xp_entry_id: i64,
}

struct WrittenChange {
    ticket: Ticket,
    transition: Option<Transition>,
    session_event: Option<SessionEvent>,
    xp_entries: Vec<XpLedgerEntry>,
}

fn missing_item(item_id: InventoryItemId) -> TicketWorkflowRepositoryError {
    TicketWorkflowRepositoryError::query(format!("inventory item {item_id} is missing"))
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl StoreState {
    fn item_by_serial(&self, serial_number: &str) -> Option<&InventoryItem> {
        self.items
            .values()
            .find(|item| item.serial_number == serial_number)
    }

    fn active_ticket_for_item(&self, item_id: InventoryItemId) -> Option<TicketId> {
        self.tickets
            .values()
            .find(|ticket| ticket.inventory_item_id == item_id && !ticket.status.is_terminal())
            .map(|ticket| ticket.id)
    }

    fn in_progress_ticket_for(&self, technician_id: UserId, except: TicketId) -> Option<TicketId> {
        self.tickets
            .values()
            .find(|ticket| {
                ticket.id != except
                    && ticket.status == TicketStatus::InProgress
                    && ticket.assigned_technician_id == Some(technician_id)
            })
            .map(|ticket| ticket.id)
    }

    fn ticket_transitions(&self, ticket_id: TicketId) -> Vec<Transition> {
        self.transitions
            .iter()
            .filter(|transition| transition.ticket_id == ticket_id)
            .cloned()
            .collect()
    }

    fn ticket_session_events(&self, ticket_id: TicketId) -> Vec<SessionEvent> {
        self.session_events
            .iter()
            .filter(|event| event.ticket_id == ticket_id)
            .cloned()
            .collect()
    }

    fn append_transition(&mut self, ticket_id: TicketId, transition: NewTransition) -> Transition {
        let id = TransitionId::new(next_id(&mut self.last_transition_id));
        let stored = transition.into_transition(id, ticket_id);
        self.transitions.push(stored.clone());
        stored
    }

    fn append_xp_entry(&mut self, entry: NewXpLedgerEntry) -> XpLedgerEntry {
        let id = XpEntryId::new(next_id(&mut self.last_xp_entry_id));
        let stored = entry.into_entry(id);
        self.xp_entries.push(stored.clone());
        stored
    }

    fn set_item_status(
        &mut self,
        item_id: InventoryItemId,
        status: InventoryItemStatus,
        now: DateTime<Utc>,
    ) -> Result<(), TicketWorkflowRepositoryError> {
        let item = self
            .items
            .get_mut(&item_id)
            .ok_or_else(|| missing_item(item_id))?;
        item.status = status;
        item.updated_at = now;
        Ok(())
    }

    /// Check every cross-ticket write constraint before anything is written.
    fn check_change(&self, change: &WorkflowChange) -> Result<(), TicketWorkflowRepositoryError> {
        if change.to_status != TicketStatus::InProgress {
            return Ok(());
        }
        let Some(technician_id) = change.assigned_technician_id else {
            return Ok(());
        };
        match self.in_progress_ticket_for(technician_id, change.ticket_id) {
            Some(active) => Err(TicketWorkflowRepositoryError::conflict(format!(
                "technician {technician_id} already has ticket {active} in progress"
            ))),
            None => Ok(()),
        }
    }

    fn write_change(
        &mut self,
        ticket_id: TicketId,
        change: WorkflowChange,
    ) -> Result<WrittenChange, TicketWorkflowRepositoryError> {
        self.check_change(&change)?;
        let item_id = self
            .tickets
            .get(&ticket_id)
            .ok_or(TicketWorkflowRepositoryError::TicketNotFound { ticket_id })?
            .inventory_item_id;
        if change.item_status.is_some() && !self.items.contains_key(&item_id) {
            return Err(missing_item(item_id));
        }

        let ticket = self
            .tickets
            .get_mut(&ticket_id)
            .ok_or(TicketWorkflowRepositoryError::TicketNotFound { ticket_id })?;
        change.apply_to(ticket);
        let ticket = ticket.clone();

        if let Some(status) = change.item_status {
            self.set_item_status(item_id, status, change.occurred_at)?;
        }
        let transition = change
            .transition
            .map(|transition| self.append_transition(ticket_id, transition));
        let session_event = change.session_event.map(|event| {
            let id = SessionEventId::new(next_id(&mut self.last_session_event_id));
            let stored = event.into_event(id, ticket_id);
            self.session_events.push(stored.clone());
            stored
        });
        let xp_entries = change
            .xp_entries
            .into_iter()
            .map(|entry| self.append_xp_entry(entry))
            .collect();
        Ok(WrittenChange {
            ticket,
            transition,
            session_event,
            xp_entries,
        })
    }
}

/// Repository adapter that keeps tickets, history, and the ledger in memory.
///
/// Used when no database is configured and by integration tests.
#[derive(Debug, Default)]
pub struct InMemoryWorkflowStore {
    state: Mutex<StoreState>,
}

impl InMemoryWorkflowStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_ticket_state(
        &self,
    ) -> Result<MutexGuard<'_, StoreState>, TicketWorkflowRepositoryError> {
        self.state
            .lock()
            .map_err(|_| TicketWorkflowRepositoryError::query("in-memory store lock poisoned"))
    }

    fn lock_ledger_state(&self) -> Result<MutexGuard<'_, StoreState>, XpLedgerRepositoryError> {
        self.state
            .lock()
            .map_err(|_| XpLedgerRepositoryError::query("in-memory store lock poisoned"))
    }

    /// Register an inventory item, as the catalogue owner would.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` when the serial number is already registered.
    pub fn insert_item(
        &self,
        serial_number: &str,
        name: &str,
        status: InventoryItemStatus,
        now: DateTime<Utc>,
    ) -> Result<InventoryItem, TicketWorkflowRepositoryError> {
        let mut state = self.lock_ticket_state()?;
        if state.item_by_serial(serial_number).is_some() {
            return Err(TicketWorkflowRepositoryError::conflict(format!(
                "serial number {serial_number} is already registered"
            )));
        }
        let item = InventoryItem {
            id: InventoryItemId::new(next_id(&mut state.last_item_id)),
            serial_number: serial_number.to_owned(),
            name: name.to_owned(),
            status,
            created_at: now,
            updated_at: now,
        };
        state.items.insert(item.id, item.clone());
        Ok(item)
    }

    /// Append a ledger entry written outside the ticket workflow, such as
    /// attendance rewards.
    ///
    /// # Errors
    ///
    /// Fails only when the store lock is poisoned.
    pub fn record_xp_entry(
        &self,
        entry: NewXpLedgerEntry,
    ) -> Result<XpLedgerEntry, XpLedgerRepositoryError> {
        let mut state = self.lock_ledger_state()?;
        Ok(state.append_xp_entry(entry))
    }
}

fn resolve_plan_item(
    state: &mut StoreState,
    plan: &IntakePlan,
) -> Result<(InventoryItem, bool), TicketWorkflowRepositoryError> {
    match &plan.item {
        ItemResolution::Existing(item) => {
            let current = state
                .items
                .get(&item.id)
                .ok_or_else(|| missing_item(item.id))?;
            if !current.status.accepts_tickets() {
                return Err(TicketWorkflowRepositoryError::conflict(format!(
                    "inventory item {} was written off",
                    item.id
                )));
            }
            Ok((current.clone(), false))
        }
        ItemResolution::Create {
            serial_number,
            name,
            ..
        } => {
            if state.item_by_serial(serial_number).is_some() {
                return Err(TicketWorkflowRepositoryError::conflict(format!(
                    "serial number {serial_number} is already registered"
                )));
            }
            let item = InventoryItem {
                id: InventoryItemId::new(next_id(&mut state.last_item_id)),
                serial_number: serial_number.clone(),
                name: name.clone(),
                status: InventoryItemStatus::InService,
                created_at: plan.created_at,
                updated_at: plan.created_at,
            };
            Ok((item, true))
        }
    }
}

#[async_trait]
impl TicketWorkflowRepository for InMemoryWorkflowStore {
    async fn find_item(
        &self,
        item_id: &InventoryItemId,
    ) -> Result<Option<InventoryItem>, TicketWorkflowRepositoryError> {
        let state = self.lock_ticket_state()?;
        Ok(state.items.get(item_id).cloned())
    }

    async fn find_item_by_serial(
        &self,
        serial_number: &str,
    ) -> Result<Option<InventoryItem>, TicketWorkflowRepositoryError> {
        let state = self.lock_ticket_state()?;
        Ok(state.item_by_serial(serial_number).cloned())
    }

    async fn create_ticket(
        &self,
        plan: &IntakePlan,
    ) -> Result<CreatedTicket, TicketWorkflowRepositoryError> {
        let mut state = self.lock_ticket_state()?;
        let (mut item, item_created) = resolve_plan_item(&mut state, plan)?;
        if let Some(active) = state.active_ticket_for_item(item.id) {
            return Err(TicketWorkflowRepositoryError::conflict(format!(
                "inventory item {} already has active ticket {active}",
                item.id
            )));
        }

        item.status = InventoryItemStatus::InService;
        item.updated_at = plan.created_at;
        state.items.insert(item.id, item.clone());

        let ticket = Ticket {
            id: TicketId::new(next_id(&mut state.last_ticket_id)),
            inventory_item_id: item.id,
            status: TicketStatus::New,
            assigned_technician_id: None,
            title: plan.title.clone(),
            checklist: plan.checklist.clone(),
            srt: plan.srt.clone(),
            created_by: plan.created_by,
            created_at: plan.created_at,
            updated_at: plan.created_at,
        };
        state.tickets.insert(ticket.id, ticket.clone());
        let transition = state.append_transition(
            ticket.id,
            NewTransition {
                from_status: None,
                to_status: TicketStatus::New,
                actor_id: plan.created_by,
                reason: plan.transition_reason(),
                created_at: plan.created_at,
            },
        );
        Ok(CreatedTicket {
            ticket,
            item,
            transition,
            item_created,
        })
    }

    async fn find_ticket(
        &self,
        ticket_id: &TicketId,
    ) -> Result<Option<Ticket>, TicketWorkflowRepositoryError> {
        let state = self.lock_ticket_state()?;
        Ok(state.tickets.get(ticket_id).cloned())
    }

    async fn apply(
        &self,
        ticket_id: &TicketId,
        decision: &WorkflowDecision,
    ) -> Result<AppliedWorkflowChange, TicketWorkflowRepositoryError> {
        let mut state = self.lock_ticket_state()?;
        let ticket = state
            .tickets
            .get(ticket_id)
            .cloned()
            .ok_or(TicketWorkflowRepositoryError::TicketNotFound {
                ticket_id: *ticket_id,
            })?;
        let technician_active_ticket = decision
            .workload_technician(&ticket)
            .and_then(|technician_id| state.in_progress_ticket_for(technician_id, *ticket_id));
        let snapshot = TicketSnapshot {
            transitions: state.ticket_transitions(*ticket_id),
            session_events: state.ticket_session_events(*ticket_id),
            technician_active_ticket,
            ticket,
        };

        let change = decision
            .decide(&snapshot)
            .map_err(TicketWorkflowRepositoryError::rejected)?;
        let written = state.write_change(*ticket_id, change)?;
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

    async fn list_transitions(
        &self,
        ticket_id: &TicketId,
        page: PageRequest,
    ) -> Result<Page<Transition>, TicketWorkflowRepositoryError> {
        let state = self.lock_ticket_state()?;
        Ok(Page::from_items(state.ticket_transitions(*ticket_id), page))
    }

    async fn list_session_events(
        &self,
        ticket_id: &TicketId,
    ) -> Result<Vec<SessionEvent>, TicketWorkflowRepositoryError> {
        let state = self.lock_ticket_state()?;
        Ok(state.ticket_session_events(*ticket_id))
    }
}

#[async_trait]
impl XpLedgerRepository for InMemoryWorkflowStore {
    async fn list(
        &self,
        filter: &XpLedgerFilter,
        page: PageRequest,
    ) -> Result<Page<XpLedgerEntry>, XpLedgerRepositoryError> {
        let state = self.lock_ledger_state()?;
        let matching = state
            .xp_entries
            .iter()
            .rev()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect();
        Ok(Page::from_items(matching, page))
    }

    async fn summarize(
        &self,
        user_id: &UserId,
        filter: &XpLedgerFilter,
    ) -> Result<XpSummary, XpLedgerRepositoryError> {
        let state = self.lock_ledger_state()?;
        let (total_amount, entry_count) = state
            .xp_entries
            .iter()
            .filter(|entry| entry.user_id == *user_id && filter.matches(entry))
            .fold((0_i64, 0_u64), |(total, count), entry| {
                (total.saturating_add(entry.amount), count.saturating_add(1))
            });
        Ok(XpSummary {
            user_id: *user_id,
            total_amount,
            entry_count,
        })
    }
}

#[cfg(test)]
#[path = "workflow_store_tests.rs"]
mod tests;

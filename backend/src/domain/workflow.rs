//! Ticket workflow state machine.
//!
//! A [`WorkflowDecision`] is built by the service before any storage access:
//! the command, the acting user, the instant, and the XP policy. Adapters
//! lock the ticket, load its history into a [`TicketSnapshot`], and ask the
//! decision for a [`WorkflowChange`]. The change lists every write of the
//! unit of work, so adapters apply it verbatim inside one transaction and the
//! planner never touches storage.
//!
//! ```text
//! NEW -> ASSIGNED -> IN_PROGRESS -> WAITING_QC -> DONE
//!                         ^               |
//!          REWORK <-------+---------------+ (qc fail)
//!            |
//!            +--> ASSIGNED
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::debug;

use super::{
    Actor, Error, InventoryItemStatus, NewSessionEvent, NewTransition, NewXpLedgerEntry,
    SessionControl, SessionEvent, SessionState, SessionSummary, SessionTimeline, Ticket,
    TicketId, TicketStatus, Transition, UserId, WorkflowAction, XpEntryType, XpLedgerEntry,
    XpRewardPolicy, authorize_on_ticket, has_rework,
};

/// Command issued against an existing ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowCommand {
    /// Assign or reassign a technician.
    Assign {
        /// Technician receiving the ticket.
        technician_id: UserId,
    },
    /// Begin work and open a work session.
    Start,
    /// Hand finished work to quality control.
    ToWaitingQc,
    /// Accept the repair.
    QcPass,
    /// Reject the repair.
    QcFail {
        /// Why the repair failed inspection.
        reason: String,
    },
    /// Pause the running session.
    PauseSession,
    /// Resume the paused session.
    ResumeSession,
    /// Stop the session.
    StopSession,
}

impl WorkflowCommand {
    /// Guarded action behind the command.
    #[must_use]
    pub const fn action(&self) -> WorkflowAction {
        match self {
            Self::Assign { .. } => WorkflowAction::Assign,
            Self::Start => WorkflowAction::Start,
            Self::ToWaitingQc => WorkflowAction::ToWaitingQc,
            Self::QcPass => WorkflowAction::QcPass,
            Self::QcFail { .. } => WorkflowAction::QcFail,
            Self::PauseSession => WorkflowAction::PauseSession,
            Self::ResumeSession => WorkflowAction::ResumeSession,
            Self::StopSession => WorkflowAction::StopSession,
        }
    }

    const fn allowed_from(&self) -> &'static [TicketStatus] {
        match self {
            Self::Assign { .. } => &[TicketStatus::New, TicketStatus::Rework],
            Self::Start => &[TicketStatus::Assigned],
            Self::ToWaitingQc
            | Self::PauseSession
            | Self::ResumeSession
            | Self::StopSession => &[TicketStatus::InProgress],
            Self::QcPass | Self::QcFail { .. } => &[TicketStatus::WaitingQc],
        }
    }

    const fn session_control(&self) -> Option<SessionControl> {
        match self {
            Self::Start => Some(SessionControl::Start),
            Self::PauseSession => Some(SessionControl::Pause),
            Self::ResumeSession => Some(SessionControl::Resume),
            Self::StopSession => Some(SessionControl::Stop),
            _ => None,
        }
    }
}

/// Locked ticket state handed to the planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketSnapshot {
    /// Ticket row, read under the per-ticket lock.
    pub ticket: Ticket,
    /// Transition history ordered by id.
    pub transitions: Vec<Transition>,
    /// Session events ordered by id.
    pub session_events: Vec<SessionEvent>,
    /// Another ticket the checked technician currently has in progress.
    pub technician_active_ticket: Option<TicketId>,
}

/// Every write of one workflow unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowChange {
    /// Ticket being changed.
    pub ticket_id: TicketId,
    /// Status before the change.
    pub from_status: TicketStatus,
    /// Status after the change.
    pub to_status: TicketStatus,
    /// Assignee after the change.
    pub assigned_technician_id: Option<UserId>,
    /// Transition to append; absent for session-only controls.
    pub transition: Option<NewTransition>,
    /// Session event to append.
    pub session_event: Option<NewSessionEvent>,
    /// New status for the ticket's inventory item.
    pub item_status: Option<InventoryItemStatus>,
    /// XP entries to append.
    pub xp_entries: Vec<NewXpLedgerEntry>,
    /// Change instant.
    pub occurred_at: DateTime<Utc>,
}

impl WorkflowChange {
    /// Whether the ticket row itself changes.
    #[must_use]
    pub const fn changes_ticket(&self) -> bool {
        self.transition.is_some()
    }

    /// Apply the ticket-row part of the change.
    pub fn apply_to(&self, ticket: &mut Ticket) {
        if !self.changes_ticket() {
            return;
        }
        ticket.status = self.to_status;
        ticket.assigned_technician_id = self.assigned_technician_id;
        ticket.updated_at = self.occurred_at;
    }
}

/// Committed outcome of a workflow command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedWorkflowChange {
    /// Ticket after the change.
    pub ticket: Ticket,
    /// Appended transition.
    pub transition: Option<Transition>,
    /// Appended session event.
    pub session_event: Option<SessionEvent>,
    /// Appended XP entries.
    pub xp_entries: Vec<XpLedgerEntry>,
    /// Session state after the change.
    pub session: SessionSummary,
}

/// Summarise sessions after appending `appended` to the locked `events`.
#[must_use]
pub fn session_summary_after(
    events: &[SessionEvent],
    appended: Option<&SessionEvent>,
    now: DateTime<Utc>,
) -> SessionSummary {
    let mut all = events.to_vec();
    all.extend(appended.cloned());
    SessionTimeline::from_events(&all).summary(now)
}

/// A command bound to its actor, instant, and reward policy.
#[derive(Clone)]
pub struct WorkflowDecision {
    command: WorkflowCommand,
    actor: Actor,
    now: DateTime<Utc>,
    policy: Arc<dyn XpRewardPolicy>,
}

impl std::fmt::Debug for WorkflowDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowDecision")
            .field("command", &self.command)
            .field("actor", &self.actor)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

impl WorkflowDecision {
    /// Bind `command` to its execution context.
    #[must_use]
    pub fn new(
        command: WorkflowCommand,
        actor: Actor,
        now: DateTime<Utc>,
        policy: Arc<dyn XpRewardPolicy>,
    ) -> Self {
        Self {
            command,
            actor,
            now,
            policy,
        }
    }

    /// Command being decided.
    #[must_use]
    pub const fn command(&self) -> &WorkflowCommand {
        &self.command
    }

    /// Acting user.
    #[must_use]
    pub const fn actor(&self) -> &Actor {
        &self.actor
    }

    /// Decision instant.
    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Technician whose in-progress workload must be checked before
    /// deciding, if the command needs it.
    #[must_use]
    pub fn workload_technician(&self, ticket: &Ticket) -> Option<UserId> {
        match &self.command {
            WorkflowCommand::Assign { technician_id } => Some(*technician_id),
            WorkflowCommand::Start => ticket.assigned_technician_id,
            _ => None,
        }
    }

    /// Validate the command against `snapshot` and plan its writes.
    ///
    /// Checks run in order: source status, ticket ownership, then the
    /// command's guards.
    pub fn decide(&self, snapshot: &TicketSnapshot) -> Result<WorkflowChange, Error> {
        let ticket = &snapshot.ticket;
        let action = self.command.action();

        if !self.command.allowed_from().contains(&ticket.status) {
            debug!(
                ticket_id = %ticket.id,
                status = %ticket.status,
                action = action.as_str(),
                "workflow command rejected for current status"
            );
            return Err(invalid_status(ticket, action.as_str()));
        }
        authorize_on_ticket(&self.actor, action, ticket).into_result()?;

        let mut change = WorkflowChange {
            ticket_id: ticket.id,
            from_status: ticket.status,
            to_status: ticket.status,
            assigned_technician_id: ticket.assigned_technician_id,
            transition: None,
            session_event: None,
            item_status: None,
            xp_entries: Vec::new(),
            occurred_at: self.now,
        };
        let timeline = SessionTimeline::from_events(&snapshot.session_events);

        match &self.command {
            WorkflowCommand::Assign { technician_id } => {
                ensure_not_busy(*technician_id, ticket.id, snapshot.technician_active_ticket)?;
                change.assigned_technician_id = Some(*technician_id);
                self.transition_to(&mut change, TicketStatus::Assigned, None);
            }
            WorkflowCommand::Start => {
                let technician = assignee(ticket)?;
                ensure_not_busy(technician, ticket.id, snapshot.technician_active_ticket)?;
                self.plan_session(&mut change, &timeline, SessionControl::Start, technician)?;
                self.transition_to(&mut change, TicketStatus::InProgress, None);
            }
            WorkflowCommand::ToWaitingQc => {
                let state = timeline.state();
                if state != SessionState::Stopped {
                    return Err(Error::invalid_transition(format!(
                        "work session must be STOPPED before handing over to QC; it is {}",
                        state.as_str()
                    ))
                    .with_details(json!({
                        "currentStatus": ticket.status.as_str(),
                        "sessionState": state.as_str(),
                    })));
                }
                self.transition_to(&mut change, TicketStatus::WaitingQc, None);
            }
            WorkflowCommand::QcPass => {
                change.item_status = Some(InventoryItemStatus::Ready);
                change.xp_entries = self.qc_pass_rewards(snapshot, &timeline);
                self.transition_to(&mut change, TicketStatus::Done, None);
            }
            WorkflowCommand::QcFail { reason } => {
                let reason = reason.trim();
                if reason.is_empty() {
                    return Err(Error::invalid_request("a reason is required to fail QC")
                        .with_details(json!({ "field": "reason", "code": "missing_field" })));
                }
                self.transition_to(&mut change, TicketStatus::Rework, Some(reason.to_owned()));
            }
            WorkflowCommand::PauseSession
            | WorkflowCommand::ResumeSession
            | WorkflowCommand::StopSession => {
                let technician = timeline
                    .current()
                    .map(|session| session.technician_id)
                    .or(ticket.assigned_technician_id)
                    .unwrap_or_else(|| self.actor.user_id());
                if let Some(control) = self.command.session_control() {
                    self.plan_session(&mut change, &timeline, control, technician)?;
                }
            }
        }

        Ok(change)
    }

    fn transition_to(&self, change: &mut WorkflowChange, to: TicketStatus, reason: Option<String>) {
        change.to_status = to;
        change.transition = Some(NewTransition {
            from_status: Some(change.from_status),
            to_status: to,
            actor_id: self.actor.user_id(),
            reason,
            created_at: self.now,
        });
    }

    fn plan_session(
        &self,
        change: &mut WorkflowChange,
        timeline: &SessionTimeline,
        control: SessionControl,
        technician_id: UserId,
    ) -> Result<(), Error> {
        let planned = timeline.plan(control, self.now)?;
        change.session_event = Some(NewSessionEvent {
            technician_id,
            kind: planned.kind,
            actor_id: self.actor.user_id(),
            occurred_at: planned.occurred_at,
        });
        Ok(())
    }

    fn qc_pass_rewards(
        &self,
        snapshot: &TicketSnapshot,
        timeline: &SessionTimeline,
    ) -> Vec<NewXpLedgerEntry> {
        let ticket = &snapshot.ticket;
        let Some(technician) = ticket.assigned_technician_id else {
            return Vec::new();
        };
        let entry = |entry_type, amount, suffix: &str| NewXpLedgerEntry {
            user_id: technician,
            ticket_id: Some(ticket.id),
            entry_type,
            amount,
            reference: format!("ticket:{}:{suffix}", ticket.id),
            created_at: self.now,
        };

        let active_seconds = timeline.active_seconds(self.now);
        let mut entries = vec![entry(
            XpEntryType::TicketBaseXp,
            self.policy.base_amount(ticket, active_seconds),
            "qc_pass",
        )];
        if !has_rework(&snapshot.transitions) {
            entries.push(entry(
                XpEntryType::TicketQcFirstPassBonus,
                self.policy.first_pass_bonus(ticket),
                "first_pass",
            ));
        }
        entries
    }
}

fn invalid_status(ticket: &Ticket, action: &str) -> Error {
    Error::invalid_transition(format!(
        "cannot {action} a ticket that is {}",
        ticket.status
    ))
    .with_details(json!({
        "action": action,
        "currentStatus": ticket.status.as_str(),
    }))
}

fn assignee(ticket: &Ticket) -> Result<UserId, Error> {
    ticket.assigned_technician_id.ok_or_else(|| {
        Error::invalid_request("ticket has no assigned technician")
            .with_details(json!({ "field": "assignedTechnicianId", "code": "missing_field" }))
    })
}

fn ensure_not_busy(
    technician_id: UserId,
    ticket_id: TicketId,
    active: Option<TicketId>,
) -> Result<(), Error> {
    match active {
        Some(other) if other != ticket_id => Err(Error::conflict(format!(
            "technician {technician_id} already has ticket {other} in progress"
        ))
        .with_details(json!({
            "technicianId": technician_id.get(),
            "activeTicketId": other.get(),
        }))),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;

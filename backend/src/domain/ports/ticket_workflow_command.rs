//! Driving port for workflow commands on existing tickets.
//!
//! Status transitions and work-session controls share this port because they
//! share the same per-ticket lock and unit of work.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Actor, AppliedWorkflowChange, ConfiguredXpPolicy, Error, SessionEvent, SessionEventId,
    SessionEventKind, Ticket, TicketId, TicketSnapshot, TicketStatus, TransitionId,
    WorkflowCommand, WorkflowDecision, XpEntryId, authorize, session_summary_after,
};

use super::fixture_ticket;

/// Request to run one workflow command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowCommandRequest {
    /// Acting user.
    pub actor: Actor,
    /// Target ticket.
    pub ticket_id: TicketId,
    /// Command to run.
    pub command: WorkflowCommand,
}

/// Driving port for the ticket state machine and session controls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TicketWorkflowCommand: Send + Sync {
    /// Authorise, validate, and commit one command.
    ///
    /// # Errors
    ///
    /// Returns `forbidden` for role or ownership failures,
    /// `invalid_transition` for a wrong ticket or session state, `conflict`
    /// for cross-ticket invariant violations, `invalid_request` for guard
    /// failures and `not_found` for unknown tickets.
    async fn execute(
        &self,
        request: WorkflowCommandRequest,
    ) -> Result<AppliedWorkflowChange, Error>;
}

/// Fixture implementation for handler tests.
///
/// Decides the command against a ticket that is already in the command's
/// source status and returns the outcome without persisting it.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureTicketWorkflowCommand;

const fn fixture_source_status(command: &WorkflowCommand) -> TicketStatus {
    match command {
        WorkflowCommand::Assign { .. } => TicketStatus::New,
        WorkflowCommand::Start => TicketStatus::Assigned,
        WorkflowCommand::QcPass | WorkflowCommand::QcFail { .. } => TicketStatus::WaitingQc,
        WorkflowCommand::ToWaitingQc
        | WorkflowCommand::PauseSession
        | WorkflowCommand::ResumeSession
        | WorkflowCommand::StopSession => TicketStatus::InProgress,
    }
}

fn fixture_session_events(command: &WorkflowCommand, ticket: &Ticket) -> Vec<SessionEvent> {
    let kinds: &[SessionEventKind] = match command {
        WorkflowCommand::PauseSession | WorkflowCommand::StopSession => {
            &[SessionEventKind::Started]
        }
        WorkflowCommand::ResumeSession => &[SessionEventKind::Started, SessionEventKind::Paused],
        WorkflowCommand::ToWaitingQc | WorkflowCommand::QcPass | WorkflowCommand::QcFail { .. } => {
            &[SessionEventKind::Started, SessionEventKind::Stopped]
        }
        WorkflowCommand::Assign { .. } | WorkflowCommand::Start => &[],
    };
    let technician_id = ticket.assigned_technician_id.unwrap_or(ticket.created_by);
    kinds
        .iter()
        .zip(1_i64..)
        .map(|(kind, id)| SessionEvent {
            id: SessionEventId::new(id),
            ticket_id: ticket.id,
            technician_id,
            kind: *kind,
            actor_id: technician_id,
            occurred_at: DateTime::<Utc>::UNIX_EPOCH,
        })
        .collect()
}

#[async_trait]
impl TicketWorkflowCommand for FixtureTicketWorkflowCommand {
    async fn execute(
        &self,
        request: WorkflowCommandRequest,
    ) -> Result<AppliedWorkflowChange, Error> {
        let action = request.command.action();
        authorize(&request.actor, action).into_result()?;
        let now = DateTime::<Utc>::UNIX_EPOCH;
        let mut ticket = fixture_ticket(request.ticket_id, fixture_source_status(&request.command));
        if action.requires_assignee() && !request.actor.is_super_admin() {
            ticket.assigned_technician_id = Some(request.actor.user_id());
        }
        let snapshot = TicketSnapshot {
            session_events: fixture_session_events(&request.command, &ticket),
            ticket: ticket.clone(),
            transitions: Vec::new(),
            technician_active_ticket: None,
        };
        let decision = WorkflowDecision::new(
            request.command,
            request.actor,
            now,
            Arc::new(ConfiguredXpPolicy::default()),
        );
        let change = decision.decide(&snapshot)?;
        change.apply_to(&mut ticket);

        let next_event_id = i64::try_from(snapshot.session_events.len() + 1).unwrap_or(i64::MAX);
        let session_event = change
            .session_event
            .clone()
            .map(|event| event.into_event(SessionEventId::new(next_event_id), ticket.id));
        let transition = change
            .transition
            .clone()
            .map(|transition| transition.into_transition(TransitionId::new(1), ticket.id));
        let xp_entries = change
            .xp_entries
            .into_iter()
            .zip(1_i64..)
            .map(|(entry, id)| entry.into_entry(XpEntryId::new(id)))
            .collect();
        Ok(AppliedWorkflowChange {
            session: session_summary_after(&snapshot.session_events, session_event.as_ref(), now),
            ticket,
            transition,
            session_event,
            xp_entries,
        })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use rstest::rstest;

    use super::*;
    use crate::domain::{ErrorCode, Role, SessionState, UserId};

    fn request(command: WorkflowCommand, role: Role) -> WorkflowCommandRequest {
        WorkflowCommandRequest {
            actor: Actor::new(UserId::new(7), [role]),
            ticket_id: TicketId::new(3),
            command,
        }
    }

    #[rstest]
    #[case(WorkflowCommand::Start, Role::Technician, TicketStatus::InProgress)]
    #[case(WorkflowCommand::QcPass, Role::QcInspector, TicketStatus::Done)]
    #[case(
        WorkflowCommand::Assign { technician_id: UserId::new(8) },
        Role::Master,
        TicketStatus::Assigned
    )]
    #[tokio::test]
    async fn fixture_moves_ticket_forward(
        #[case] command: WorkflowCommand,
        #[case] role: Role,
        #[case] expected: TicketStatus,
    ) {
        let applied = FixtureTicketWorkflowCommand
            .execute(request(command, role))
            .await
            .expect("fixture command");
        assert_eq!(applied.ticket.status, expected);
        assert_eq!(applied.ticket.id, TicketId::new(3));
    }

    #[tokio::test]
    async fn fixture_start_reports_running_session() {
        let applied = FixtureTicketWorkflowCommand
            .execute(request(WorkflowCommand::Start, Role::Technician))
            .await
            .expect("fixture start");
        assert_eq!(applied.session.state, SessionState::Running);
    }

    #[tokio::test]
    async fn fixture_stop_closes_session() {
        let applied = FixtureTicketWorkflowCommand
            .execute(request(WorkflowCommand::StopSession, Role::Technician))
            .await
            .expect("fixture stop");
        assert_eq!(applied.session.state, SessionState::Stopped);
        assert_eq!(applied.ticket.status, TicketStatus::InProgress);
    }

    #[tokio::test]
    async fn fixture_rejects_wrong_role() {
        let err = FixtureTicketWorkflowCommand
            .execute(request(WorkflowCommand::QcPass, Role::Technician))
            .await
            .expect_err("technicians cannot pass QC");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }
}

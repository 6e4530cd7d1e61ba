//! Ticket workflow domain service.
//!
//! Implements the workflow command and read ports. Role checks run before
//! the repository is touched; the state machine itself runs inside the
//! repository's unit of work through [`WorkflowDecision`].

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use pagination::{Page, PageRequest};
use tracing::{debug, error, info, warn};

use crate::domain::ports::{
    SessionHistory, TicketDetail, TicketWorkflowCommand, TicketWorkflowQuery,
    TicketWorkflowRepository, TicketWorkflowRepositoryError, WorkflowCommandRequest,
};
use crate::domain::{
    Actor, AppliedWorkflowChange, Error, SessionTimeline, Ticket, TicketId, Transition,
    WorkflowAction, WorkflowDecision, XpRewardPolicy, authorize,
};

/// Map ticket repository failures onto domain errors.
pub(crate) fn map_ticket_repository_error(error: TicketWorkflowRepositoryError) -> Error {
    match error {
        TicketWorkflowRepositoryError::Connection { message } => {
            warn!(%message, "ticket repository unavailable");
            Error::service_unavailable(format!("ticket repository unavailable: {message}"))
        }
        TicketWorkflowRepositoryError::Query { message } => {
            error!(%message, "ticket repository query failed");
            Error::internal(format!("ticket repository error: {message}"))
        }
        TicketWorkflowRepositoryError::TicketNotFound { ticket_id } => {
            Error::not_found(format!("ticket {ticket_id} not found"))
        }
        TicketWorkflowRepositoryError::Conflict { message } => Error::conflict(message),
        TicketWorkflowRepositoryError::Rejected { error } => error,
    }
}

/// Workflow service implementing the command and query ports.
#[derive(Clone)]
pub struct TicketWorkflowService<R> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
    policy: Arc<dyn XpRewardPolicy>,
}

impl<R> TicketWorkflowService<R> {
    /// Create a service over `repo`, reading time from `clock` and XP amounts
    /// from `policy`.
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>, policy: Arc<dyn XpRewardPolicy>) -> Self {
        Self {
            repo,
            clock,
            policy,
        }
    }
}

impl<R> TicketWorkflowService<R>
where
    R: TicketWorkflowRepository,
{
    async fn load_ticket(&self, actor: &Actor, ticket_id: &TicketId) -> Result<Ticket, Error> {
        authorize(actor, WorkflowAction::ReadTicket).into_result()?;
        self.repo
            .find_ticket(ticket_id)
            .await
            .map_err(map_ticket_repository_error)?
            .ok_or_else(|| Error::not_found(format!("ticket {ticket_id} not found")))
    }

    async fn load_timeline(&self, ticket_id: &TicketId) -> Result<SessionTimeline, Error> {
        let events = self
            .repo
            .list_session_events(ticket_id)
            .await
            .map_err(map_ticket_repository_error)?;
        Ok(SessionTimeline::from_events(&events))
    }
}

fn log_applied(request_actor: &Actor, applied: &AppliedWorkflowChange, action: WorkflowAction) {
    let ticket_id = applied.ticket.id;
    let actor = request_actor.user_id();
    if let Some(transition) = &applied.transition {
        info!(
            %ticket_id,
            from = transition.from_status.map(|status| status.as_str()),
            to = transition.to_status.as_str(),
            %actor,
            action = action.as_str(),
            xp_entries = applied.xp_entries.len(),
            "ticket transition committed"
        );
    } else if let Some(event) = &applied.session_event {
        info!(
            %ticket_id,
            session_event = event.kind.as_str(),
            %actor,
            "work session event committed"
        );
    }
}

#[async_trait]
impl<R> TicketWorkflowCommand for TicketWorkflowService<R>
where
    R: TicketWorkflowRepository,
{
    async fn execute(
        &self,
        request: WorkflowCommandRequest,
    ) -> Result<AppliedWorkflowChange, Error> {
        let WorkflowCommandRequest {
            actor,
            ticket_id,
            command,
        } = request;
        let action = command.action();
        if let Err(denied) = authorize(&actor, action).into_result() {
            debug!(
                %ticket_id,
                action = action.as_str(),
                actor = %actor.user_id(),
                "role check denied"
            );
            return Err(denied);
        }

        let decision = WorkflowDecision::new(
            command,
            actor.clone(),
            self.clock.utc(),
            Arc::clone(&self.policy),
        );
        match self.repo.apply(&ticket_id, &decision).await {
            Ok(applied) => {
                log_applied(&actor, &applied, action);
                Ok(applied)
            }
            Err(err) => {
                if matches!(
                    err,
                    TicketWorkflowRepositoryError::Rejected { .. }
                        | TicketWorkflowRepositoryError::Conflict { .. }
                        | TicketWorkflowRepositoryError::TicketNotFound { .. }
                ) {
                    debug!(
                        %ticket_id,
                        action = action.as_str(),
                        kind = err.kind(),
                        error = %err,
                        "workflow command rejected"
                    );
                }
                Err(map_ticket_repository_error(err))
            }
        }
    }
}

#[async_trait]
impl<R> TicketWorkflowQuery for TicketWorkflowService<R>
where
    R: TicketWorkflowRepository,
{
    async fn ticket_detail(
        &self,
        actor: &Actor,
        ticket_id: &TicketId,
    ) -> Result<TicketDetail, Error> {
        let ticket = self.load_ticket(actor, ticket_id).await?;
        let timeline = self.load_timeline(ticket_id).await?;
        Ok(TicketDetail {
            ticket,
            session: timeline.summary(self.clock.utc()),
        })
    }

    async fn transitions(
        &self,
        actor: &Actor,
        ticket_id: &TicketId,
        page: PageRequest,
    ) -> Result<Page<Transition>, Error> {
        self.load_ticket(actor, ticket_id).await?;
        self.repo
            .list_transitions(ticket_id, page)
            .await
            .map_err(map_ticket_repository_error)
    }

    async fn session_history(
        &self,
        actor: &Actor,
        ticket_id: &TicketId,
        page: PageRequest,
    ) -> Result<SessionHistory, Error> {
        self.load_ticket(actor, ticket_id).await?;
        let timeline = self.load_timeline(ticket_id).await?;
        Ok(SessionHistory {
            segments: Page::from_items(timeline.segments(), page),
            summary: timeline.summary(self.clock.utc()),
        })
    }
}

#[cfg(test)]
#[path = "ticket_workflow_service_tests.rs"]
mod tests;

//! Ticket intake domain service.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, info};

use crate::domain::ports::{
    CreateTicketRequest, CreatedTicket, TicketIntakeCommand, TicketWorkflowRepository,
};
use crate::domain::ticket_workflow_service::map_ticket_repository_error;
use crate::domain::{
    Error, IntakeRules, InventoryItemRef, WorkflowAction, authorize, normalise_serial,
    plan_intake, resolve_item, validate_request,
};

/// Intake service implementing [`TicketIntakeCommand`].
#[derive(Clone)]
pub struct TicketIntakeService<R> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
    rules: IntakeRules,
}

impl<R> TicketIntakeService<R> {
    /// Create a service over `repo` applying `rules`.
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>, rules: IntakeRules) -> Self {
        Self { repo, clock, rules }
    }
}

#[async_trait]
impl<R> TicketIntakeCommand for TicketIntakeService<R>
where
    R: TicketWorkflowRepository,
{
    async fn create_ticket(&self, request: CreateTicketRequest) -> Result<CreatedTicket, Error> {
        let CreateTicketRequest { actor, intake } = request;
        authorize(&actor, WorkflowAction::CreateTicket).into_result()?;
        let validated = validate_request(&intake, self.rules)?;

        let (reference, found) = match &intake.item {
            InventoryItemRef::Id(item_id) => {
                let found = self
                    .repo
                    .find_item(item_id)
                    .await
                    .map_err(map_ticket_repository_error)?;
                (InventoryItemRef::Id(*item_id), found)
            }
            InventoryItemRef::Serial(serial) => {
                let serial = normalise_serial(serial)?;
                let found = self
                    .repo
                    .find_item_by_serial(&serial)
                    .await
                    .map_err(map_ticket_repository_error)?;
                (InventoryItemRef::Serial(serial), found)
            }
        };
        let resolution = resolve_item(&reference, found, intake.confirm_new_item.as_ref())
            .inspect_err(|err| debug!(error = %err, "intake item resolution rejected"))?;

        let plan = plan_intake(validated, resolution, &actor, self.clock.utc());
        let created = self
            .repo
            .create_ticket(&plan)
            .await
            .map_err(map_ticket_repository_error)?;
        info!(
            ticket_id = %created.ticket.id,
            item_id = %created.item.id,
            item_created = created.item_created,
            actor = %actor.user_id(),
            to = created.ticket.status.as_str(),
            "ticket opened"
        );
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use rstest::{fixture, rstest};

    use super::*;
    use crate::domain::ports::{MockTicketWorkflowRepository, TicketWorkflowRepositoryError};
    use crate::domain::test_fixtures::{ITEM_ID, MASTER_ID, base_time, ticket_in, transition};
    use crate::domain::{
        Actor, ErrorCode, IntakeRequest, InventoryItem, InventoryItemStatus, ItemResolution,
        NewItemConfirmation, Role, TicketStatus,
    };
    use crate::test_support::MutableClock;

    #[fixture]
    fn master() -> Actor {
        Actor::new(MASTER_ID, [Role::Master])
    }

    fn intake(item: InventoryItemRef) -> IntakeRequest {
        IntakeRequest {
            item,
            checklist: vec!["power".into(), "display".into(), "ports".into()],
            srt_code: "SRT-SCREEN".to_owned(),
            title: Some("Screen flickers".to_owned()),
            confirm_new_item: None,
        }
    }

    fn item(status: InventoryItemStatus) -> InventoryItem {
        InventoryItem {
            id: ITEM_ID,
            serial_number: "SN-1".to_owned(),
            name: "Projector".to_owned(),
            status,
            created_at: base_time(),
            updated_at: base_time(),
        }
    }

    fn make_service(
        repo: MockTicketWorkflowRepository,
    ) -> TicketIntakeService<MockTicketWorkflowRepository> {
        TicketIntakeService::new(
            Arc::new(repo),
            Arc::new(MutableClock::new(base_time())),
            IntakeRules::default(),
        )
    }

    fn created() -> CreatedTicket {
        CreatedTicket {
            ticket: ticket_in(TicketStatus::New),
            item: item(InventoryItemStatus::InService),
            transition: transition(1, None, TicketStatus::New),
            item_created: false,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn existing_item_commits_plan(master: Actor) {
        let mut repo = MockTicketWorkflowRepository::new();
        repo.expect_find_item()
            .times(1)
            .return_once(|_| Ok(Some(item(InventoryItemStatus::Ready))));
        repo.expect_create_ticket()
            .withf(|plan| {
                matches!(plan.item, ItemResolution::Existing(_))
                    && plan.created_by == MASTER_ID
                    && plan.created_at == base_time()
            })
            .times(1)
            .return_once(|_| Ok(created()));

        let result = make_service(repo)
            .create_ticket(CreateTicketRequest {
                actor: master,
                intake: intake(InventoryItemRef::Id(ITEM_ID)),
            })
            .await
            .expect("intake succeeds");
        assert_eq!(result.ticket.status, TicketStatus::New);
    }

    #[rstest]
    #[tokio::test]
    async fn serial_is_trimmed_before_lookup(master: Actor) {
        let mut repo = MockTicketWorkflowRepository::new();
        repo.expect_find_item_by_serial()
            .withf(|serial| serial == "SN-1")
            .times(1)
            .return_once(|_| Ok(Some(item(InventoryItemStatus::Ready))));
        repo.expect_create_ticket().return_once(|_| Ok(created()));

        make_service(repo)
            .create_ticket(CreateTicketRequest {
                actor: master,
                intake: intake(InventoryItemRef::Serial("  SN-1 ".to_owned())),
            })
            .await
            .expect("intake succeeds");
    }

    #[rstest]
    #[tokio::test]
    async fn confirmed_unknown_serial_plans_item_creation(master: Actor) {
        let mut repo = MockTicketWorkflowRepository::new();
        repo.expect_find_item_by_serial().return_once(|_| Ok(None));
        repo.expect_create_ticket()
            .withf(|plan| {
                plan.transition_reason().as_deref()
                    == Some("new inventory item confirmed: not yet catalogued")
            })
            .times(1)
            .return_once(|_| {
                Ok(CreatedTicket {
                    item_created: true,
                    ..created()
                })
            });

        let mut request = intake(InventoryItemRef::Serial("SN-NEW".to_owned()));
        request.confirm_new_item = Some(NewItemConfirmation {
            reason: "not yet catalogued".to_owned(),
            name: None,
        });
        let result = make_service(repo)
            .create_ticket(CreateTicketRequest {
                actor: master,
                intake: request,
            })
            .await
            .expect("intake succeeds");
        assert!(result.item_created);
    }

    #[rstest]
    #[tokio::test]
    async fn active_ticket_conflict_is_reported(master: Actor) {
        let mut repo = MockTicketWorkflowRepository::new();
        repo.expect_find_item()
            .return_once(|_| Ok(Some(item(InventoryItemStatus::InService))));
        repo.expect_create_ticket().return_once(|_| {
            Err(TicketWorkflowRepositoryError::conflict(
                "inventory item already has an active ticket",
            ))
        });

        let err = make_service(repo)
            .create_ticket(CreateTicketRequest {
                actor: master,
                intake: intake(InventoryItemRef::Id(ITEM_ID)),
            })
            .await
            .expect_err("conflict");
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[rstest]
    #[tokio::test]
    async fn validation_runs_before_lookup(master: Actor) {
        let mut repo = MockTicketWorkflowRepository::new();
        repo.expect_find_item().never();
        repo.expect_create_ticket().never();

        let mut request = intake(InventoryItemRef::Id(ITEM_ID));
        request.checklist.truncate(2);
        let err = make_service(repo)
            .create_ticket(CreateTicketRequest {
                actor: master,
                intake: request,
            })
            .await
            .expect_err("short checklist");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[tokio::test]
    async fn technicians_cannot_open_tickets() {
        let mut repo = MockTicketWorkflowRepository::new();
        repo.expect_find_item().never();

        let err = make_service(repo)
            .create_ticket(CreateTicketRequest {
                actor: Actor::new(MASTER_ID, [Role::Technician]),
                intake: intake(InventoryItemRef::Id(ITEM_ID)),
            })
            .await
            .expect_err("forbidden");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }
}

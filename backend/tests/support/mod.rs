//! Shared harness for integration tests: domain services over the in-memory
//! store with a controllable clock.

#![allow(dead_code, reason = "each test binary uses a different subset")]

pub mod embedded_postgres;

use std::sync::Arc;

use mockable::Clock;
use repair_desk::domain::ports::{
    CreateTicketRequest, CreatedTicket, TicketIntakeCommand, TicketWorkflowCommand,
    WorkflowCommandRequest,
};
use repair_desk::domain::{
    Actor, AppliedWorkflowChange, ConfiguredXpPolicy, Error, InventoryItem, InventoryItemRef,
    InventoryItemStatus, IntakeRequest, IntakeRules, Role, TicketId, TicketIntakeService,
    TicketWorkflowService, UserId, WorkflowCommand, XpLedgerService,
};
use repair_desk::outbound::memory::InMemoryWorkflowStore;
use repair_desk::test_support::{MutableClock, fixed_now};

pub const TECHNICIAN_ID: i64 = 7;

pub fn master() -> Actor {
    Actor::new(UserId::new(1), [Role::Master])
}

pub fn technician() -> Actor {
    Actor::new(UserId::new(TECHNICIAN_ID), [Role::Technician])
}

pub fn qc_inspector() -> Actor {
    Actor::new(UserId::new(3), [Role::QcInspector])
}

pub fn ops_manager() -> Actor {
    Actor::new(UserId::new(4), [Role::OpsManager])
}

/// Intake for `serial` with a three-step checklist.
pub fn intake_for(serial: &str) -> IntakeRequest {
    IntakeRequest {
        item: InventoryItemRef::Serial(serial.to_owned()),
        checklist: vec![
            "power on".to_owned(),
            "inspect casing".to_owned(),
            "run diagnostics".to_owned(),
        ],
        srt_code: "SRT-SCREEN".to_owned(),
        title: Some("Cracked screen".to_owned()),
        confirm_new_item: None,
    }
}

/// Services wired as the server wires them when no database is configured.
pub struct Desk {
    pub store: Arc<InMemoryWorkflowStore>,
    pub clock: Arc<MutableClock>,
    pub intake: TicketIntakeService<InMemoryWorkflowStore>,
    pub workflow: TicketWorkflowService<InMemoryWorkflowStore>,
    pub ledger: XpLedgerService<InMemoryWorkflowStore>,
}

impl Desk {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryWorkflowStore::new());
        let clock = Arc::new(MutableClock::new(fixed_now()));
        let shared_clock: Arc<dyn Clock> = clock.clone();
        Self {
            intake: TicketIntakeService::new(
                store.clone(),
                shared_clock.clone(),
                IntakeRules::default(),
            ),
            workflow: TicketWorkflowService::new(
                store.clone(),
                shared_clock,
                Arc::new(ConfiguredXpPolicy::default()),
            ),
            ledger: XpLedgerService::new(store.clone()),
            store,
            clock,
        }
    }

    pub fn register_item(&self, serial: &str) -> InventoryItem {
        self.store
            .insert_item(serial, "Phone", InventoryItemStatus::Ready, fixed_now())
            .expect("item registers")
    }

    pub async fn open_ticket(&self, serial: &str) -> Result<CreatedTicket, Error> {
        self.intake
            .create_ticket(CreateTicketRequest {
                actor: master(),
                intake: intake_for(serial),
            })
            .await
    }

    pub async fn run(
        &self,
        actor: Actor,
        ticket_id: TicketId,
        command: WorkflowCommand,
    ) -> Result<AppliedWorkflowChange, Error> {
        self.workflow
            .execute(WorkflowCommandRequest {
                actor,
                ticket_id,
                command,
            })
            .await
    }

    /// Assign to the technician, start, work `minutes`, and stop.
    pub async fn work_on(&self, ticket_id: TicketId, minutes: i64) {
        self.run(
            master(),
            ticket_id,
            WorkflowCommand::Assign {
                technician_id: UserId::new(TECHNICIAN_ID),
            },
        )
        .await
        .expect("assign");
        self.run(technician(), ticket_id, WorkflowCommand::Start)
            .await
            .expect("start");
        self.clock.advance_minutes(minutes);
        self.run(technician(), ticket_id, WorkflowCommand::StopSession)
            .await
            .expect("stop");
    }
}

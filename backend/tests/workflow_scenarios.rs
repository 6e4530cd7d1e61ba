//! End-to-end workflow scenarios over the in-memory store.

use pagination::PageRequest;
use repair_desk::domain::ports::{
    TicketWorkflowQuery, TicketWorkflowRepository, XpLedgerQuery, XpLedgerQueryRequest,
};
use repair_desk::domain::{
    ErrorCode, InventoryItemStatus, SessionState, TicketStatus, UserId, WorkflowCommand,
    XpEntryType, XpLedgerFilter,
};
use rstest::{fixture, rstest};

mod support;

use support::{Desk, TECHNICIAN_ID, master, ops_manager, qc_inspector, technician};

#[fixture]
fn desk() -> Desk {
    let desk = Desk::new();
    desk.register_item("SN-100");
    desk
}

#[rstest]
#[tokio::test]
async fn intake_opens_new_ticket_with_one_transition(desk: Desk) {
    let created = desk.open_ticket("SN-100").await.expect("ticket opens");

    assert_eq!(created.ticket.status, TicketStatus::New);
    assert!(!created.item_created);
    assert_eq!(created.item.status, InventoryItemStatus::InService);

    let transitions = desk
        .workflow
        .transitions(&master(), &created.ticket.id, PageRequest::default())
        .await
        .expect("transitions");
    assert_eq!(transitions.total_items(), 1);
    let intake = transitions.items().first().expect("intake transition");
    assert_eq!(intake.from_status, None);
    assert_eq!(intake.to_status, TicketStatus::New);
}

#[rstest]
#[tokio::test]
async fn second_active_ticket_for_item_conflicts(desk: Desk) {
    let first = desk.open_ticket("SN-100").await.expect("first ticket");
    desk.run(
        master(),
        first.ticket.id,
        WorkflowCommand::Assign {
            technician_id: UserId::new(TECHNICIAN_ID),
        },
    )
    .await
    .expect("assign");

    let error = desk
        .open_ticket("SN-100")
        .await
        .expect_err("item already has an active ticket");

    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn start_runs_work_session(desk: Desk) {
    let ticket_id = desk.open_ticket("SN-100").await.expect("ticket").ticket.id;
    desk.run(
        master(),
        ticket_id,
        WorkflowCommand::Assign {
            technician_id: UserId::new(TECHNICIAN_ID),
        },
    )
    .await
    .expect("assign");

    let started = desk
        .run(technician(), ticket_id, WorkflowCommand::Start)
        .await
        .expect("start");

    assert_eq!(started.ticket.status, TicketStatus::InProgress);
    assert_eq!(started.session.state, SessionState::Running);
    assert_eq!(
        started.session.technician_id,
        Some(UserId::new(TECHNICIAN_ID))
    );
}

#[rstest]
#[tokio::test]
async fn waiting_qc_requires_stopped_session(desk: Desk) {
    let ticket_id = desk.open_ticket("SN-100").await.expect("ticket").ticket.id;
    desk.run(
        master(),
        ticket_id,
        WorkflowCommand::Assign {
            technician_id: UserId::new(TECHNICIAN_ID),
        },
    )
    .await
    .expect("assign");
    desk.run(technician(), ticket_id, WorkflowCommand::Start)
        .await
        .expect("start");

    let rejected = desk
        .run(technician(), ticket_id, WorkflowCommand::ToWaitingQc)
        .await
        .expect_err("session still running");
    assert_eq!(rejected.code(), ErrorCode::InvalidTransition);

    desk.run(technician(), ticket_id, WorkflowCommand::StopSession)
        .await
        .expect("stop");
    let moved = desk
        .run(technician(), ticket_id, WorkflowCommand::ToWaitingQc)
        .await
        .expect("to waiting qc");
    assert_eq!(moved.ticket.status, TicketStatus::WaitingQc);
}

#[rstest]
#[tokio::test]
async fn first_pass_earns_base_and_bonus(desk: Desk) {
    let created = desk.open_ticket("SN-100").await.expect("ticket");
    let ticket_id = created.ticket.id;
    desk.work_on(ticket_id, 45).await;
    desk.run(technician(), ticket_id, WorkflowCommand::ToWaitingQc)
        .await
        .expect("to waiting qc");

    let passed = desk
        .run(qc_inspector(), ticket_id, WorkflowCommand::QcPass)
        .await
        .expect("qc pass");

    assert_eq!(passed.ticket.status, TicketStatus::Done);
    let kinds: Vec<_> = passed.xp_entries.iter().map(|e| e.entry_type).collect();
    assert_eq!(
        kinds,
        [
            XpEntryType::TicketBaseXp,
            XpEntryType::TicketQcFirstPassBonus
        ]
    );
    assert!(
        passed
            .xp_entries
            .iter()
            .all(|entry| entry.user_id == UserId::new(TECHNICIAN_ID))
    );
    let item = desk
        .store
        .find_item(&created.item.id)
        .await
        .expect("item read")
        .expect("item exists");
    assert_eq!(item.status, InventoryItemStatus::Ready);
}

#[rstest]
#[tokio::test]
async fn rework_forfeits_first_pass_bonus(desk: Desk) {
    let ticket_id = desk.open_ticket("SN-100").await.expect("ticket").ticket.id;
    desk.work_on(ticket_id, 30).await;
    desk.run(technician(), ticket_id, WorkflowCommand::ToWaitingQc)
        .await
        .expect("to waiting qc");
    let failed = desk
        .run(
            qc_inspector(),
            ticket_id,
            WorkflowCommand::QcFail {
                reason: "bad solder".to_owned(),
            },
        )
        .await
        .expect("qc fail");
    assert_eq!(failed.ticket.status, TicketStatus::Rework);
    assert!(failed.xp_entries.is_empty());

    desk.work_on(ticket_id, 15).await;
    desk.run(technician(), ticket_id, WorkflowCommand::ToWaitingQc)
        .await
        .expect("to waiting qc again");
    let passed = desk
        .run(qc_inspector(), ticket_id, WorkflowCommand::QcPass)
        .await
        .expect("qc pass");

    assert_eq!(passed.ticket.status, TicketStatus::Done);
    assert_eq!(passed.xp_entries.len(), 1);
    assert_eq!(
        passed.xp_entries.first().map(|e| e.entry_type),
        Some(XpEntryType::TicketBaseXp)
    );

    let history = desk
        .workflow
        .transitions(&master(), &ticket_id, PageRequest::default())
        .await
        .expect("transitions");
    let statuses: Vec<_> = history.items().iter().map(|t| t.to_status).collect();
    assert_eq!(
        statuses,
        [
            TicketStatus::New,
            TicketStatus::Assigned,
            TicketStatus::InProgress,
            TicketStatus::WaitingQc,
            TicketStatus::Rework,
            TicketStatus::Assigned,
            TicketStatus::InProgress,
            TicketStatus::WaitingQc,
            TicketStatus::Done,
        ]
    );
}

#[rstest]
#[tokio::test]
async fn pauses_do_not_count_as_active_time(desk: Desk) {
    let ticket_id = desk.open_ticket("SN-100").await.expect("ticket").ticket.id;
    desk.run(
        master(),
        ticket_id,
        WorkflowCommand::Assign {
            technician_id: UserId::new(TECHNICIAN_ID),
        },
    )
    .await
    .expect("assign");
    desk.run(technician(), ticket_id, WorkflowCommand::Start)
        .await
        .expect("start");

    desk.clock.advance_minutes(10);
    desk.run(technician(), ticket_id, WorkflowCommand::PauseSession)
        .await
        .expect("pause");
    desk.clock.advance_minutes(5);
    desk.run(technician(), ticket_id, WorkflowCommand::ResumeSession)
        .await
        .expect("resume");
    desk.clock.advance_minutes(20);
    desk.run(technician(), ticket_id, WorkflowCommand::PauseSession)
        .await
        .expect("second pause");
    desk.run(technician(), ticket_id, WorkflowCommand::ResumeSession)
        .await
        .expect("second resume");
    desk.clock.advance_minutes(5);

    let running = desk
        .workflow
        .ticket_detail(&qc_inspector(), &ticket_id)
        .await
        .expect("detail");
    assert_eq!(running.session.state, SessionState::Running);
    assert_eq!(running.session.active_seconds, 35 * 60);

    desk.run(technician(), ticket_id, WorkflowCommand::StopSession)
        .await
        .expect("stop");
    desk.clock.advance_minutes(60);
    let history = desk
        .workflow
        .session_history(&technician(), &ticket_id, PageRequest::default())
        .await
        .expect("history");
    assert_eq!(history.summary.state, SessionState::Stopped);
    assert_eq!(history.summary.active_seconds, 35 * 60);
    assert_eq!(history.segments.total_items(), 3);
}

#[rstest]
#[tokio::test]
async fn technician_holds_one_ticket_in_progress(desk: Desk) {
    desk.register_item("SN-200");
    let first = desk.open_ticket("SN-100").await.expect("first").ticket.id;
    let second = desk.open_ticket("SN-200").await.expect("second").ticket.id;
    for ticket_id in [first, second] {
        desk.run(
            master(),
            ticket_id,
            WorkflowCommand::Assign {
                technician_id: UserId::new(TECHNICIAN_ID),
            },
        )
        .await
        .expect("assign");
    }
    desk.run(technician(), first, WorkflowCommand::Start)
        .await
        .expect("start first");

    let error = desk
        .run(technician(), second, WorkflowCommand::Start)
        .await
        .expect_err("technician is busy");

    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn done_item_accepts_a_new_ticket(desk: Desk) {
    let ticket_id = desk.open_ticket("SN-100").await.expect("ticket").ticket.id;
    desk.work_on(ticket_id, 20).await;
    desk.run(technician(), ticket_id, WorkflowCommand::ToWaitingQc)
        .await
        .expect("to waiting qc");
    desk.run(qc_inspector(), ticket_id, WorkflowCommand::QcPass)
        .await
        .expect("qc pass");

    let reopened = desk.open_ticket("SN-100").await.expect("new ticket");

    assert_ne!(reopened.ticket.id, ticket_id);
    assert_eq!(reopened.ticket.status, TicketStatus::New);
}

#[rstest]
#[tokio::test]
async fn ledger_reads_are_scoped_to_the_caller(desk: Desk) {
    let ticket_id = desk.open_ticket("SN-100").await.expect("ticket").ticket.id;
    desk.work_on(ticket_id, 20).await;
    desk.run(technician(), ticket_id, WorkflowCommand::ToWaitingQc)
        .await
        .expect("to waiting qc");
    desk.run(qc_inspector(), ticket_id, WorkflowCommand::QcPass)
        .await
        .expect("qc pass");

    let own = desk
        .ledger
        .summary(&technician(), XpLedgerFilter::default())
        .await
        .expect("own summary");
    assert_eq!(own.user_id, UserId::new(TECHNICIAN_ID));
    assert_eq!(own.entry_count, 2);

    let inspector_view = desk
        .ledger
        .list(XpLedgerQueryRequest {
            actor: qc_inspector(),
            filter: XpLedgerFilter {
                user_id: Some(UserId::new(TECHNICIAN_ID)),
                ..XpLedgerFilter::default()
            },
            page: PageRequest::default(),
        })
        .await
        .expect_err("cross-user read");
    assert_eq!(inspector_view.code(), ErrorCode::Forbidden);

    let bonuses = desk
        .ledger
        .list(XpLedgerQueryRequest {
            actor: ops_manager(),
            filter: XpLedgerFilter {
                user_id: Some(UserId::new(TECHNICIAN_ID)),
                entry_type: Some(XpEntryType::TicketQcFirstPassBonus),
                ..XpLedgerFilter::default()
            },
            page: PageRequest::default(),
        })
        .await
        .expect("ops read");
    assert_eq!(bonuses.total_items(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_starts_for_one_technician_admit_one(desk: Desk) {
    desk.register_item("SN-200");
    let first = desk.open_ticket("SN-100").await.expect("first").ticket.id;
    let second = desk.open_ticket("SN-200").await.expect("second").ticket.id;
    for ticket_id in [first, second] {
        desk.run(
            master(),
            ticket_id,
            WorkflowCommand::Assign {
                technician_id: UserId::new(TECHNICIAN_ID),
            },
        )
        .await
        .expect("assign");
    }

    let (a, b) = tokio::join!(
        desk.run(technician(), first, WorkflowCommand::Start),
        desk.run(technician(), second, WorkflowCommand::Start),
    );

    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    let codes: Vec<_> = outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().err())
        .map(|error| error.code())
        .collect();
    assert_eq!(codes, [ErrorCode::Conflict]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_intakes_for_one_item_admit_one(desk: Desk) {
    let (a, b) = tokio::join!(desk.open_ticket("SN-100"), desk.open_ticket("SN-100"));

    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    let codes: Vec<_> = outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().err())
        .map(|error| error.code())
        .collect();
    assert_eq!(codes, [ErrorCode::Conflict]);
}

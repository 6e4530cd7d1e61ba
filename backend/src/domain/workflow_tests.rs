//! Regression coverage for this module.

use rstest::{fixture, rstest};

use super::*;
use crate::domain::test_fixtures::{
    MASTER_ID, TECHNICIAN_ID, TICKET_ID, at_minute, session_event, ticket_in, transition,
};
use crate::domain::{ConfiguredXpPolicy, ErrorCode, Role, SessionEventKind};

#[fixture]
fn policy() -> Arc<dyn XpRewardPolicy> {
    Arc::new(ConfiguredXpPolicy::new(10, None, 5))
}

fn technician() -> Actor {
    Actor::new(TECHNICIAN_ID, [Role::Technician])
}

fn inspector() -> Actor {
    Actor::new(UserId::new(30), [Role::QcInspector])
}

fn snapshot(status: TicketStatus) -> TicketSnapshot {
    TicketSnapshot {
        ticket: ticket_in(status),
        transitions: Vec::new(),
        session_events: Vec::new(),
        technician_active_ticket: None,
    }
}

fn decide(
    command: WorkflowCommand,
    actor: Actor,
    policy: &Arc<dyn XpRewardPolicy>,
    snapshot: &TicketSnapshot,
) -> Result<WorkflowChange, Error> {
    WorkflowDecision::new(command, actor, at_minute(60), Arc::clone(policy)).decide(snapshot)
}

#[rstest]
#[case(TicketStatus::New)]
#[case(TicketStatus::Rework)]
fn assign_moves_to_assigned(policy: Arc<dyn XpRewardPolicy>, #[case] status: TicketStatus) {
    let master = Actor::new(MASTER_ID, [Role::Master]);
    let change = decide(
        WorkflowCommand::Assign {
            technician_id: UserId::new(8),
        },
        master,
        &policy,
        &snapshot(status),
    )
    .expect("assign allowed");

    assert_eq!(change.to_status, TicketStatus::Assigned);
    assert_eq!(change.assigned_technician_id, Some(UserId::new(8)));
    let appended = change.transition.expect("transition appended");
    assert_eq!(appended.from_status, Some(status));
    assert_eq!(appended.actor_id, MASTER_ID);
}

#[rstest]
fn assign_to_busy_technician_conflicts(policy: Arc<dyn XpRewardPolicy>) {
    let mut locked = snapshot(TicketStatus::New);
    locked.technician_active_ticket = Some(TicketId::new(99));
    let err = decide(
        WorkflowCommand::Assign {
            technician_id: TECHNICIAN_ID,
        },
        Actor::new(MASTER_ID, [Role::Master]),
        &policy,
        &locked,
    )
    .expect_err("busy technician");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[case(WorkflowCommand::Start, TicketStatus::New)]
#[case(WorkflowCommand::ToWaitingQc, TicketStatus::Assigned)]
#[case(WorkflowCommand::QcPass, TicketStatus::InProgress)]
#[case(WorkflowCommand::PauseSession, TicketStatus::WaitingQc)]
#[case(WorkflowCommand::Assign { technician_id: TECHNICIAN_ID }, TicketStatus::Done)]
fn wrong_source_status_is_invalid_transition(
    policy: Arc<dyn XpRewardPolicy>,
    #[case] command: WorkflowCommand,
    #[case] status: TicketStatus,
) {
    let admin = Actor::new(UserId::new(1), [Role::SuperAdmin]);
    let err = decide(command, admin, &policy, &snapshot(status)).expect_err("wrong status");
    assert_eq!(err.code(), ErrorCode::InvalidTransition);
    assert_eq!(
        err.details().map(|details| details["currentStatus"].clone()),
        Some(serde_json::json!(status.as_str()))
    );
}

#[rstest]
fn start_opens_session_for_assignee(policy: Arc<dyn XpRewardPolicy>) {
    let change = decide(
        WorkflowCommand::Start,
        technician(),
        &policy,
        &snapshot(TicketStatus::Assigned),
    )
    .expect("start allowed");

    assert_eq!(change.to_status, TicketStatus::InProgress);
    let event = change.session_event.expect("session started");
    assert_eq!(event.kind, SessionEventKind::Started);
    assert_eq!(event.technician_id, TECHNICIAN_ID);
}

#[rstest]
fn super_admin_starts_on_behalf_of_assignee(policy: Arc<dyn XpRewardPolicy>) {
    let admin = Actor::new(UserId::new(1), [Role::SuperAdmin]);
    let change = decide(
        WorkflowCommand::Start,
        admin,
        &policy,
        &snapshot(TicketStatus::Assigned),
    )
    .expect("admin may start");
    let event = change.session_event.expect("session started");
    assert_eq!(event.technician_id, TECHNICIAN_ID);
    assert_eq!(event.actor_id, UserId::new(1));
}

#[rstest]
fn other_technician_cannot_start(policy: Arc<dyn XpRewardPolicy>) {
    let stranger = Actor::new(UserId::new(55), [Role::Technician]);
    let err = decide(
        WorkflowCommand::Start,
        stranger,
        &policy,
        &snapshot(TicketStatus::Assigned),
    )
    .expect_err("not the assignee");
    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[rstest]
fn start_rechecks_technician_workload(policy: Arc<dyn XpRewardPolicy>) {
    let mut locked = snapshot(TicketStatus::Assigned);
    locked.technician_active_ticket = Some(TicketId::new(42));
    let err = decide(WorkflowCommand::Start, technician(), &policy, &locked)
        .expect_err("technician busy");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
fn start_after_rework_opens_second_session(policy: Arc<dyn XpRewardPolicy>) {
    let mut locked = snapshot(TicketStatus::Assigned);
    locked.session_events = vec![
        session_event(1, SessionEventKind::Started, 0),
        session_event(2, SessionEventKind::Stopped, 20),
    ];
    let change = decide(WorkflowCommand::Start, technician(), &policy, &locked)
        .expect("second session");
    assert_eq!(
        change.session_event.map(|event| event.kind),
        Some(SessionEventKind::Started)
    );
}

#[rstest]
#[case(&[])]
#[case(&[SessionEventKind::Started])]
#[case(&[SessionEventKind::Started, SessionEventKind::Paused])]
fn waiting_qc_requires_stopped_session(
    policy: Arc<dyn XpRewardPolicy>,
    #[case] kinds: &[SessionEventKind],
) {
    let mut locked = snapshot(TicketStatus::InProgress);
    locked.session_events = kinds
        .iter()
        .zip(1_i64..)
        .map(|(kind, id)| session_event(id, *kind, id))
        .collect();

    let err = decide(WorkflowCommand::ToWaitingQc, technician(), &policy, &locked)
        .expect_err("session still open");
    assert_eq!(err.code(), ErrorCode::InvalidTransition);
    assert!(
        err.details()
            .is_some_and(|details| details.get("sessionState").is_some())
    );
}

#[rstest]
fn waiting_qc_after_stop_succeeds(policy: Arc<dyn XpRewardPolicy>) {
    let mut locked = snapshot(TicketStatus::InProgress);
    locked.session_events = vec![
        session_event(1, SessionEventKind::Started, 0),
        session_event(2, SessionEventKind::Stopped, 30),
    ];
    let change = decide(WorkflowCommand::ToWaitingQc, technician(), &policy, &locked)
        .expect("handover allowed");
    assert_eq!(change.to_status, TicketStatus::WaitingQc);
    assert!(change.session_event.is_none());
}

#[rstest]
fn qc_pass_without_rework_awards_bonus(policy: Arc<dyn XpRewardPolicy>) {
    let mut locked = snapshot(TicketStatus::WaitingQc);
    locked.transitions = vec![
        transition(1, None, TicketStatus::New),
        transition(2, Some(TicketStatus::New), TicketStatus::Assigned),
    ];
    let change = decide(WorkflowCommand::QcPass, inspector(), &policy, &locked).expect("pass");

    assert_eq!(change.to_status, TicketStatus::Done);
    assert_eq!(change.item_status, Some(InventoryItemStatus::Ready));
    let awarded: Vec<_> = change
        .xp_entries
        .iter()
        .map(|entry| (entry.entry_type, entry.amount, entry.user_id))
        .collect();
    assert_eq!(
        awarded,
        vec![
            (XpEntryType::TicketBaseXp, 10, TECHNICIAN_ID),
            (XpEntryType::TicketQcFirstPassBonus, 5, TECHNICIAN_ID),
        ]
    );
    assert_eq!(change.xp_entries[0].reference, format!("ticket:{TICKET_ID}:qc_pass"));
}

#[rstest]
fn qc_pass_after_rework_skips_bonus(policy: Arc<dyn XpRewardPolicy>) {
    let mut locked = snapshot(TicketStatus::WaitingQc);
    locked.transitions = vec![
        transition(1, None, TicketStatus::New),
        transition(5, Some(TicketStatus::WaitingQc), TicketStatus::Rework),
    ];
    let change = decide(WorkflowCommand::QcPass, inspector(), &policy, &locked).expect("pass");
    assert_eq!(change.xp_entries.len(), 1);
    assert_eq!(change.xp_entries[0].entry_type, XpEntryType::TicketBaseXp);
}

#[rstest]
fn qc_pass_feeds_active_seconds_to_policy() {
    let policy: Arc<dyn XpRewardPolicy> = Arc::new(ConfiguredXpPolicy::new(10, Some(15), 0));
    let mut locked = snapshot(TicketStatus::WaitingQc);
    locked.session_events = vec![
        session_event(1, SessionEventKind::Started, 0),
        session_event(2, SessionEventKind::Stopped, 45),
    ];
    let change = decide(WorkflowCommand::QcPass, inspector(), &policy, &locked).expect("pass");
    assert_eq!(change.xp_entries[0].amount, 13);
}

#[rstest]
#[case("")]
#[case("   ")]
fn qc_fail_requires_reason(policy: Arc<dyn XpRewardPolicy>, #[case] reason: &str) {
    let err = decide(
        WorkflowCommand::QcFail {
            reason: reason.to_owned(),
        },
        inspector(),
        &policy,
        &snapshot(TicketStatus::WaitingQc),
    )
    .expect_err("reason required");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
fn qc_fail_keeps_assignee_and_records_reason(policy: Arc<dyn XpRewardPolicy>) {
    let change = decide(
        WorkflowCommand::QcFail {
            reason: " fan still loud ".to_owned(),
        },
        inspector(),
        &policy,
        &snapshot(TicketStatus::WaitingQc),
    )
    .expect("fail allowed");

    assert_eq!(change.to_status, TicketStatus::Rework);
    assert_eq!(change.assigned_technician_id, Some(TECHNICIAN_ID));
    assert_eq!(
        change.transition.and_then(|appended| appended.reason),
        Some("fan still loud".to_owned())
    );
    assert!(change.xp_entries.is_empty());
}

#[rstest]
fn session_controls_do_not_change_status(policy: Arc<dyn XpRewardPolicy>) {
    let mut locked = snapshot(TicketStatus::InProgress);
    locked.session_events = vec![session_event(1, SessionEventKind::Started, 0)];
    let change = decide(WorkflowCommand::PauseSession, technician(), &policy, &locked)
        .expect("pause allowed");

    assert!(!change.changes_ticket());
    assert_eq!(change.to_status, TicketStatus::InProgress);
    assert_eq!(
        change.session_event.map(|event| event.kind),
        Some(SessionEventKind::Paused)
    );
}

#[rstest]
fn resume_while_running_is_invalid(policy: Arc<dyn XpRewardPolicy>) {
    let mut locked = snapshot(TicketStatus::InProgress);
    locked.session_events = vec![session_event(1, SessionEventKind::Started, 0)];
    let err = decide(WorkflowCommand::ResumeSession, technician(), &policy, &locked)
        .expect_err("already running");
    assert_eq!(err.code(), ErrorCode::InvalidTransition);
}

#[rstest]
fn apply_to_updates_ticket_row_only_for_transitions(policy: Arc<dyn XpRewardPolicy>) {
    let locked = snapshot(TicketStatus::New);
    let change = decide(
        WorkflowCommand::Assign {
            technician_id: UserId::new(8),
        },
        Actor::new(MASTER_ID, [Role::Master]),
        &policy,
        &locked,
    )
    .expect("assign allowed");

    let mut ticket = locked.ticket.clone();
    change.apply_to(&mut ticket);
    assert_eq!(ticket.status, TicketStatus::Assigned);
    assert_eq!(ticket.updated_at, at_minute(60));
}

#[rstest]
#[case(WorkflowCommand::Assign { technician_id: UserId::new(8) }, Some(UserId::new(8)))]
#[case(WorkflowCommand::Start, Some(TECHNICIAN_ID))]
#[case(WorkflowCommand::QcPass, None)]
fn workload_technician_matches_the_command(
    policy: Arc<dyn XpRewardPolicy>,
    #[case] command: WorkflowCommand,
    #[case] expected: Option<UserId>,
) {
    let decision = WorkflowDecision::new(command, technician(), at_minute(0), policy);
    assert_eq!(
        decision.workload_technician(&ticket_in(TicketStatus::Assigned)),
        expected
    );
}

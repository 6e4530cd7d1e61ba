//! Regression coverage for this module.

use std::sync::Arc;

use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::MockTicketWorkflowRepository;
use crate::domain::test_fixtures::{
    TECHNICIAN_ID, TICKET_ID, at_minute, base_time, session_event, ticket_in,
};
use crate::domain::{
    ConfiguredXpPolicy, ErrorCode, Role, SessionEventId, SessionEventKind, SessionState,
    TicketSnapshot, TicketStatus, TransitionId, UserId, WorkflowCommand, session_summary_after,
};
use crate::test_support::MutableClock;

fn make_service(
    repo: MockTicketWorkflowRepository,
) -> TicketWorkflowService<MockTicketWorkflowRepository> {
    TicketWorkflowService::new(
        Arc::new(repo),
        Arc::new(MutableClock::new(at_minute(90))),
        Arc::new(ConfiguredXpPolicy::default()),
    )
}

#[fixture]
fn technician() -> Actor {
    Actor::new(TECHNICIAN_ID, [Role::Technician])
}

/// Repository double that decides against `snapshot` like a real adapter.
fn deciding_repo(snapshot: TicketSnapshot) -> MockTicketWorkflowRepository {
    let mut repo = MockTicketWorkflowRepository::new();
    repo.expect_apply()
        .times(1)
        .returning(move |_, decision| {
            let change = decision
                .decide(&snapshot)
                .map_err(TicketWorkflowRepositoryError::rejected)?;
            let mut ticket = snapshot.ticket.clone();
            change.apply_to(&mut ticket);
            let session_event = change
                .session_event
                .clone()
                .map(|event| event.into_event(SessionEventId::new(9), ticket.id));
            Ok(AppliedWorkflowChange {
                session: session_summary_after(
                    &snapshot.session_events,
                    session_event.as_ref(),
                    decision.now(),
                ),
                transition: change.transition.clone().map(|transition| {
                    transition.into_transition(TransitionId::new(3), ticket.id)
                }),
                ticket,
                session_event,
                xp_entries: Vec::new(),
            })
        });
    repo
}

fn request(actor: Actor, command: WorkflowCommand) -> WorkflowCommandRequest {
    WorkflowCommandRequest {
        actor,
        ticket_id: TICKET_ID,
        command,
    }
}

#[rstest]
#[tokio::test]
async fn role_check_runs_before_repository(technician: Actor) {
    let mut repo = MockTicketWorkflowRepository::new();
    repo.expect_apply().never();
    repo.expect_find_ticket().never();

    let err = make_service(repo)
        .execute(request(technician, WorkflowCommand::QcPass))
        .await
        .expect_err("technicians cannot pass QC");
    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[rstest]
#[tokio::test]
async fn start_commits_transition_and_session(technician: Actor) {
    let snapshot = TicketSnapshot {
        ticket: ticket_in(TicketStatus::Assigned),
        transitions: Vec::new(),
        session_events: Vec::new(),
        technician_active_ticket: None,
    };
    let applied = make_service(deciding_repo(snapshot))
        .execute(request(technician, WorkflowCommand::Start))
        .await
        .expect("start succeeds");

    assert_eq!(applied.ticket.status, TicketStatus::InProgress);
    assert_eq!(applied.session.state, SessionState::Running);
    assert_eq!(applied.session.running_since, Some(at_minute(90)));
}

#[rstest]
#[tokio::test]
async fn decision_uses_clock_instant(technician: Actor) {
    let mut repo = MockTicketWorkflowRepository::new();
    repo.expect_apply()
        .withf(|ticket_id, decision| *ticket_id == TICKET_ID && decision.now() == at_minute(90))
        .times(1)
        .returning(|_, _| Err(TicketWorkflowRepositoryError::ticket_not_found(TICKET_ID)));

    let err = make_service(repo)
        .execute(request(technician, WorkflowCommand::PauseSession))
        .await
        .expect_err("missing ticket");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn domain_rejection_surfaces_unchanged(technician: Actor) {
    let snapshot = TicketSnapshot {
        ticket: ticket_in(TicketStatus::InProgress),
        transitions: Vec::new(),
        session_events: vec![session_event(1, SessionEventKind::Started, 0)],
        technician_active_ticket: None,
    };
    let err = make_service(deciding_repo(snapshot))
        .execute(request(technician, WorkflowCommand::ToWaitingQc))
        .await
        .expect_err("session still running");
    assert_eq!(err.code(), ErrorCode::InvalidTransition);
}

#[rstest]
#[case(TicketWorkflowRepositoryError::connection("down"), ErrorCode::ServiceUnavailable)]
#[case(TicketWorkflowRepositoryError::query("broken"), ErrorCode::InternalError)]
#[case(TicketWorkflowRepositoryError::conflict("busy"), ErrorCode::Conflict)]
#[case(
    TicketWorkflowRepositoryError::rejected(Error::forbidden("not yours")),
    ErrorCode::Forbidden
)]
fn repository_errors_map_to_domain_codes(
    #[case] error: TicketWorkflowRepositoryError,
    #[case] expected: ErrorCode,
) {
    assert_eq!(map_ticket_repository_error(error).code(), expected);
}

#[rstest]
#[tokio::test]
async fn ticket_detail_measures_running_session(technician: Actor) {
    let mut repo = MockTicketWorkflowRepository::new();
    repo.expect_find_ticket()
        .times(1)
        .return_once(|_| Ok(Some(ticket_in(TicketStatus::InProgress))));
    repo.expect_list_session_events().times(1).return_once(|_| {
        Ok(vec![
            session_event(1, SessionEventKind::Started, 0),
            session_event(2, SessionEventKind::Paused, 30),
            session_event(3, SessionEventKind::Resumed, 60),
        ])
    });

    let detail = make_service(repo)
        .ticket_detail(&technician, &TICKET_ID)
        .await
        .expect("detail");
    assert_eq!(detail.session.state, SessionState::Running);
    assert_eq!(detail.session.active_seconds, 60 * 60);
}

#[rstest]
#[tokio::test]
async fn unknown_ticket_reads_are_not_found(technician: Actor) {
    let mut repo = MockTicketWorkflowRepository::new();
    repo.expect_find_ticket().times(1).return_once(|_| Ok(None));
    repo.expect_list_transitions().never();

    let err = make_service(repo)
        .transitions(&technician, &TicketId::new(404), PageRequest::default())
        .await
        .expect_err("unknown ticket");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn session_history_pages_segments(technician: Actor) {
    let mut repo = MockTicketWorkflowRepository::new();
    repo.expect_find_ticket()
        .return_once(|_| Ok(Some(ticket_in(TicketStatus::WaitingQc))));
    repo.expect_list_session_events().return_once(|_| {
        Ok(vec![
            session_event(1, SessionEventKind::Started, 0),
            session_event(2, SessionEventKind::Paused, 10),
            session_event(3, SessionEventKind::Resumed, 20),
            session_event(4, SessionEventKind::Stopped, 25),
        ])
    });

    let page = PageRequest::new(2, 1).expect("valid page");
    let history = make_service(repo)
        .session_history(&technician, &TICKET_ID, page)
        .await
        .expect("history");

    assert_eq!(history.segments.total_items(), 2);
    assert_eq!(history.segments.items().len(), 1);
    assert_eq!(history.segments.items()[0].started_at, at_minute(20));
    assert_eq!(history.summary.state, SessionState::Stopped);
    assert_eq!(history.summary.active_seconds, 15 * 60);
}

#[rstest]
#[tokio::test]
async fn other_technicians_can_read_tickets() {
    let reader = Actor::new(UserId::new(77), [Role::Technician]);
    let mut repo = MockTicketWorkflowRepository::new();
    repo.expect_find_ticket()
        .return_once(|_| Ok(Some(ticket_in(TicketStatus::New))));
    repo.expect_list_session_events()
        .return_once(|_| Ok(Vec::new()));

    let detail = make_service(repo)
        .ticket_detail(&reader, &TICKET_ID)
        .await
        .expect("read allowed");
    assert_eq!(detail.ticket.created_at, base_time());
}

//! Work session tracking.
//!
//! Technician time is never stored as a counter. Storage keeps an append-only
//! stream of `STARTED`, `PAUSED`, `RESUMED` and `STOPPED` events per ticket;
//! [`SessionTimeline`] folds that stream into sessions and segments and
//! derives elapsed active time on read.
//!
//! A ticket may accumulate several sessions across rework loops. Each
//! `STARTED` event opens a new session, numbered from one.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{Error, SessionEventId, TicketId, UserId};

/// Kind of a persisted session event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEventKind {
    /// A new session opened with the ticket entering `IN_PROGRESS`.
    Started,
    /// The running segment closed.
    Paused,
    /// A new segment opened after a pause.
    Resumed,
    /// The session closed for good.
    Stopped,
}

impl SessionEventKind {
    /// Wire representation of the event kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "STARTED",
            Self::Paused => "PAUSED",
            Self::Resumed => "RESUMED",
            Self::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for SessionEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a persisted event kind is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown session event kind: {0}")]
pub struct UnknownSessionEventKindError(pub String);

impl FromStr for SessionEventKind {
    type Err = UnknownSessionEventKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STARTED" => Ok(Self::Started),
            "PAUSED" => Ok(Self::Paused),
            "RESUMED" => Ok(Self::Resumed),
            "STOPPED" => Ok(Self::Stopped),
            other => Err(UnknownSessionEventKindError(other.to_owned())),
        }
    }
}

/// Persisted session event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    /// Monotonic identifier.
    pub id: SessionEventId,
    /// Ticket the session belongs to.
    pub ticket_id: TicketId,
    /// Technician whose time is tracked.
    pub technician_id: UserId,
    /// Event kind.
    pub kind: SessionEventKind,
    /// User who triggered the event.
    pub actor_id: UserId,
    /// Event instant.
    pub occurred_at: DateTime<Utc>,
}

/// Session event awaiting insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSessionEvent {
    /// Technician whose time is tracked.
    pub technician_id: UserId,
    /// Event kind.
    pub kind: SessionEventKind,
    /// User who triggered the event.
    pub actor_id: UserId,
    /// Event instant, already clamped against the previous event.
    pub occurred_at: DateTime<Utc>,
}

impl NewSessionEvent {
    /// Attach the ticket and sequence id assigned by storage.
    #[must_use]
    pub fn into_event(self, id: SessionEventId, ticket_id: TicketId) -> SessionEvent {
        SessionEvent {
            id,
            ticket_id,
            technician_id: self.technician_id,
            kind: self.kind,
            actor_id: self.actor_id,
            occurred_at: self.occurred_at,
        }
    }
}

/// State of the latest session on a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// No session has been started.
    None,
    /// A segment is open.
    Running,
    /// The session is open without a running segment.
    Paused,
    /// The session is closed.
    Stopped,
}

impl SessionState {
    /// Wire representation of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Stopped => "STOPPED",
        }
    }

    /// Whether a session is open (running or paused).
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

/// Session controls that append events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionControl {
    /// Open a new session.
    Start,
    /// Close the running segment.
    Pause,
    /// Open a new segment.
    Resume,
    /// Close the session.
    Stop,
}

impl SessionControl {
    /// Verb used in messages and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
        }
    }
}

/// Rejected session control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionTransitionError {
    /// A session is already running or paused.
    #[error("a work session is already {}", .state.as_str())]
    AlreadyOpen {
        /// Current session state.
        state: SessionState,
    },
    /// The control is not allowed from the current state.
    #[error("cannot {} a work session that is {}", .control.as_str(), .state.as_str())]
    NotAllowed {
        /// Attempted control.
        control: SessionControl,
        /// Current session state.
        state: SessionState,
    },
}

impl From<SessionTransitionError> for Error {
    fn from(value: SessionTransitionError) -> Self {
        match value {
            SessionTransitionError::AlreadyOpen { state } => Self::conflict(value.to_string())
                .with_details(json!({ "sessionState": state.as_str() })),
            SessionTransitionError::NotAllowed { state, .. } => {
                Self::invalid_transition(value.to_string())
                    .with_details(json!({ "sessionState": state.as_str() }))
            }
        }
    }
}

/// Contiguous stretch of active work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Session the segment belongs to.
    pub session_number: u32,
    /// Segment start.
    pub started_at: DateTime<Utc>,
    /// Segment end; absent while running.
    pub ended_at: Option<DateTime<Utc>>,
}

impl Segment {
    /// Active seconds contributed by the segment. An open segment counts up
    /// to `now`; negative spans count as zero.
    #[must_use]
    pub fn active_seconds(&self, now: DateTime<Utc>) -> i64 {
        let end = self.ended_at.unwrap_or(now);
        (end - self.started_at).num_seconds().max(0)
    }
}

/// One session: the span between a `STARTED` and its `STOPPED`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkSession {
    /// One-based session number within the ticket.
    pub number: u32,
    /// Technician whose time is tracked.
    pub technician_id: UserId,
    /// Current state.
    pub state: SessionState,
    /// Segments in chronological order.
    pub segments: Vec<Segment>,
}

impl WorkSession {
    fn close_open_segment(&mut self, at: DateTime<Utc>) {
        if let Some(segment) = self.segments.last_mut() {
            if segment.ended_at.is_none() {
                segment.ended_at = Some(at);
            }
        }
    }
}

/// Read-model summary of a ticket's work sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// State of the latest session.
    pub state: SessionState,
    /// Number of the latest session, if any.
    pub session_number: Option<u32>,
    /// Technician of the latest session, if any.
    pub technician_id: Option<UserId>,
    /// Active seconds across every session of the ticket.
    pub active_seconds: i64,
    /// Start of the running segment, when running.
    pub running_since: Option<DateTime<Utc>>,
}

/// Event to append, produced by [`SessionTimeline::plan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedSessionEvent {
    /// Event kind.
    pub kind: SessionEventKind,
    /// Event instant, clamped so it never precedes the previous event.
    pub occurred_at: DateTime<Utc>,
}

/// Sessions of one ticket folded from its event stream.
///
/// # Examples
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use repair_desk::domain::{SessionControl, SessionState, SessionTimeline};
///
/// let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).single().expect("valid time");
/// let timeline = SessionTimeline::default();
/// assert_eq!(timeline.state(), SessionState::None);
/// let planned = timeline.plan(SessionControl::Start, t0).expect("start allowed");
/// assert_eq!(planned.occurred_at, t0);
/// assert_eq!(timeline.active_seconds(t0 + Duration::minutes(5)), 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTimeline {
    sessions: Vec<WorkSession>,
    last_event_at: Option<DateTime<Utc>>,
}

impl SessionTimeline {
    /// Fold events ordered by id into sessions.
    ///
    /// Event instants earlier than their predecessor are clamped forward so a
    /// segment never has a negative duration. Events that do not fit the
    /// current state are ignored.
    #[must_use]
    pub fn from_events(events: &[SessionEvent]) -> Self {
        let mut timeline = Self::default();
        for event in events {
            timeline.apply(event);
        }
        timeline
    }

    fn apply(&mut self, event: &SessionEvent) {
        let at = self.clamp(event.occurred_at);
        self.last_event_at = Some(at);

        if event.kind == SessionEventKind::Started {
            if let Some(previous) = self.sessions.last_mut() {
                if previous.state.is_open() {
                    previous.close_open_segment(at);
                    previous.state = SessionState::Stopped;
                }
            }
            let number = u32::try_from(self.sessions.len())
                .unwrap_or(u32::MAX)
                .saturating_add(1);
            self.sessions.push(WorkSession {
                number,
                technician_id: event.technician_id,
                state: SessionState::Running,
                segments: vec![Segment {
                    session_number: number,
                    started_at: at,
                    ended_at: None,
                }],
            });
            return;
        }

        let Some(session) = self.sessions.last_mut() else {
            return;
        };
        match (event.kind, session.state) {
            (SessionEventKind::Paused, SessionState::Running) => {
                session.close_open_segment(at);
                session.state = SessionState::Paused;
            }
            (SessionEventKind::Resumed, SessionState::Paused) => {
                let number = session.number;
                session.segments.push(Segment {
                    session_number: number,
                    started_at: at,
                    ended_at: None,
                });
                session.state = SessionState::Running;
            }
            (SessionEventKind::Stopped, SessionState::Running | SessionState::Paused) => {
                session.close_open_segment(at);
                session.state = SessionState::Stopped;
            }
            _ => {}
        }
    }

    fn clamp(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        match self.last_event_at {
            Some(previous) if at < previous => previous,
            _ => at,
        }
    }

    /// Sessions in chronological order.
    #[must_use]
    pub fn sessions(&self) -> &[WorkSession] {
        &self.sessions
    }

    /// Latest session, if any.
    #[must_use]
    pub fn current(&self) -> Option<&WorkSession> {
        self.sessions.last()
    }

    /// State of the latest session.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.current()
            .map_or(SessionState::None, |session| session.state)
    }

    /// Every segment across sessions, oldest first.
    #[must_use]
    pub fn segments(&self) -> Vec<Segment> {
        self.sessions
            .iter()
            .flat_map(|session| session.segments.iter().copied())
            .collect()
    }

    /// Active seconds across all sessions: closed segments plus the running
    /// segment measured up to `now`.
    #[must_use]
    pub fn active_seconds(&self, now: DateTime<Utc>) -> i64 {
        let now = self.clamp(now);
        self.sessions
            .iter()
            .flat_map(|session| session.segments.iter())
            .map(|segment| segment.active_seconds(now))
            .sum()
    }

    /// Summarise the timeline for read models.
    #[must_use]
    pub fn summary(&self, now: DateTime<Utc>) -> SessionSummary {
        let current = self.current();
        SessionSummary {
            state: self.state(),
            session_number: current.map(|session| session.number),
            technician_id: current.map(|session| session.technician_id),
            active_seconds: self.active_seconds(now),
            running_since: current
                .filter(|session| session.state == SessionState::Running)
                .and_then(|session| session.segments.last())
                .map(|segment| segment.started_at),
        }
    }

    /// Validate a control against the latest session and plan its event.
    pub fn plan(
        &self,
        control: SessionControl,
        now: DateTime<Utc>,
    ) -> Result<PlannedSessionEvent, SessionTransitionError> {
        let state = self.state();
        let kind = match (control, state) {
            (SessionControl::Start, SessionState::None | SessionState::Stopped) => {
                SessionEventKind::Started
            }
            (SessionControl::Start, _) => {
                return Err(SessionTransitionError::AlreadyOpen { state });
            }
            (SessionControl::Pause, SessionState::Running) => SessionEventKind::Paused,
            (SessionControl::Resume, SessionState::Paused) => SessionEventKind::Resumed,
            (SessionControl::Stop, SessionState::Running | SessionState::Paused) => {
                SessionEventKind::Stopped
            }
            _ => return Err(SessionTransitionError::NotAllowed { control, state }),
        };
        Ok(PlannedSessionEvent {
            kind,
            occurred_at: self.clamp(now),
        })
    }
}

#[cfg(test)]
#[path = "work_session_tests.rs"]
mod tests;

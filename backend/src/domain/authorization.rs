//! Role guards for workflow actions.
//!
//! Every action is checked by [`authorize`] before any ticket is read. Actions
//! that belong to the assigned technician are checked a second time against
//! the locked ticket with [`authorize_on_ticket`]. Both return a tagged
//! [`Authorization`] instead of a bare boolean so callers cannot forget the
//! reason a request was denied.

use serde_json::json;

use super::{Actor, Error, Role, Ticket, UserId};

/// Actions guarded by the role matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowAction {
    /// Open a ticket through intake.
    CreateTicket,
    /// Assign or reassign a technician.
    Assign,
    /// Begin work and open a work session.
    Start,
    /// Hand finished work to quality control.
    ToWaitingQc,
    /// Accept the repair.
    QcPass,
    /// Reject the repair and send it to rework.
    QcFail,
    /// Pause the running work session.
    PauseSession,
    /// Resume a paused work session.
    ResumeSession,
    /// Stop the work session.
    StopSession,
    /// Read ticket detail, transitions, and session history.
    ReadTicket,
    /// Read XP ledger entries of another user.
    ReadOthersXp,
}

const INTAKE_ROLES: &[Role] = &[Role::Master, Role::SuperAdmin];
const ASSIGN_ROLES: &[Role] = &[Role::SuperAdmin, Role::OpsManager, Role::Master];
const WORK_ROLES: &[Role] = &[Role::Technician, Role::SuperAdmin];
const QC_ROLES: &[Role] = &[Role::QcInspector, Role::SuperAdmin];
const LEDGER_ROLES: &[Role] = &[Role::SuperAdmin, Role::OpsManager];
const ANY_ROLE: &[Role] = &[];

impl WorkflowAction {
    /// Stable name used in logs and error details.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateTicket => "create_ticket",
            Self::Assign => "assign",
            Self::Start => "start",
            Self::ToWaitingQc => "to_waiting_qc",
            Self::QcPass => "qc_pass",
            Self::QcFail => "qc_fail",
            Self::PauseSession => "pause_session",
            Self::ResumeSession => "resume_session",
            Self::StopSession => "stop_session",
            Self::ReadTicket => "read_ticket",
            Self::ReadOthersXp => "read_others_xp",
        }
    }

    /// Roles permitted to perform the action. An empty slice admits any
    /// authenticated actor.
    #[must_use]
    pub const fn allowed_roles(self) -> &'static [Role] {
        match self {
            Self::CreateTicket => INTAKE_ROLES,
            Self::Assign => ASSIGN_ROLES,
            Self::Start
            | Self::ToWaitingQc
            | Self::PauseSession
            | Self::ResumeSession
            | Self::StopSession => WORK_ROLES,
            Self::QcPass | Self::QcFail => QC_ROLES,
            Self::ReadOthersXp => LEDGER_ROLES,
            Self::ReadTicket => ANY_ROLE,
        }
    }

    /// Whether the action is reserved to the ticket's assigned technician.
    #[must_use]
    pub const fn requires_assignee(self) -> bool {
        matches!(
            self,
            Self::Start
                | Self::ToWaitingQc
                | Self::PauseSession
                | Self::ResumeSession
                | Self::StopSession
        )
    }
}

/// Outcome of a guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// The actor may proceed.
    Allowed,
    /// The actor holds none of the required roles.
    MissingRole {
        /// Action that was attempted.
        action: WorkflowAction,
        /// Roles that would have been accepted.
        required: &'static [Role],
    },
    /// The action belongs to another technician.
    NotAssignee {
        /// Action that was attempted.
        action: WorkflowAction,
        /// Technician currently assigned, if any.
        assignee: Option<UserId>,
    },
}

impl Authorization {
    /// Whether the guard admitted the actor.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Convert a denial into a `forbidden` domain error.
    ///
    /// # Examples
    /// ```
    /// use repair_desk::domain::{Actor, ErrorCode, Role, UserId, WorkflowAction, authorize};
    ///
    /// let actor = Actor::new(UserId::new(1), [Role::Technician]);
    /// let err = authorize(&actor, WorkflowAction::QcPass)
    ///     .into_result()
    ///     .expect_err("technicians cannot pass QC");
    /// assert_eq!(err.code(), ErrorCode::Forbidden);
    /// ```
    pub fn into_result(self) -> Result<(), Error> {
        match self {
            Self::Allowed => Ok(()),
            Self::MissingRole { action, required } => {
                let roles: Vec<&str> = required.iter().map(|role| role.as_str()).collect();
                Err(
                    Error::forbidden(format!("role not permitted to {}", action.as_str()))
                        .with_details(json!({
                            "action": action.as_str(),
                            "requiredRoles": roles,
                        })),
                )
            }
            Self::NotAssignee { action, assignee } => Err(Error::forbidden(format!(
                "only the assigned technician may {}",
                action.as_str()
            ))
            .with_details(json!({
                "action": action.as_str(),
                "assignedTechnicianId": assignee.map(UserId::get),
            }))),
        }
    }
}

/// Evaluate the role matrix for `action`.
#[must_use]
pub fn authorize(actor: &Actor, action: WorkflowAction) -> Authorization {
    let required = action.allowed_roles();
    if required.is_empty() || actor.has_any_role(required) {
        Authorization::Allowed
    } else {
        Authorization::MissingRole { action, required }
    }
}

/// Evaluate ticket ownership for actions reserved to the assignee.
///
/// Super admins may act on behalf of the assignee; everyone else must be the
/// assigned technician.
#[must_use]
pub fn authorize_on_ticket(
    actor: &Actor,
    action: WorkflowAction,
    ticket: &Ticket,
) -> Authorization {
    if !action.requires_assignee() || actor.is_super_admin() {
        return Authorization::Allowed;
    }
    if ticket.assigned_technician_id == Some(actor.user_id()) {
        Authorization::Allowed
    } else {
        Authorization::NotAssignee {
            action,
            assignee: ticket.assigned_technician_id,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for the role matrix.
    use rstest::rstest;

    use super::*;
    use crate::domain::test_fixtures::ticket_in;
    use crate::domain::{ErrorCode, TicketStatus};

    fn actor(roles: &[Role]) -> Actor {
        Actor::new(UserId::new(10), roles.iter().copied())
    }

    #[rstest]
    #[case(WorkflowAction::CreateTicket, Role::Master, true)]
    #[case(WorkflowAction::CreateTicket, Role::Technician, false)]
    #[case(WorkflowAction::Assign, Role::OpsManager, true)]
    #[case(WorkflowAction::Assign, Role::QcInspector, false)]
    #[case(WorkflowAction::Start, Role::Technician, true)]
    #[case(WorkflowAction::Start, Role::Master, false)]
    #[case(WorkflowAction::StopSession, Role::Technician, true)]
    #[case(WorkflowAction::QcPass, Role::QcInspector, true)]
    #[case(WorkflowAction::QcFail, Role::Technician, false)]
    #[case(WorkflowAction::ReadOthersXp, Role::OpsManager, true)]
    #[case(WorkflowAction::ReadOthersXp, Role::Master, false)]
    #[case(WorkflowAction::ReadTicket, Role::Technician, true)]
    fn role_matrix(#[case] action: WorkflowAction, #[case] role: Role, #[case] allowed: bool) {
        assert_eq!(authorize(&actor(&[role]), action).is_allowed(), allowed);
    }

    #[rstest]
    #[case(WorkflowAction::CreateTicket)]
    #[case(WorkflowAction::Assign)]
    #[case(WorkflowAction::Start)]
    #[case(WorkflowAction::QcPass)]
    #[case(WorkflowAction::ReadOthersXp)]
    fn super_admin_is_always_allowed(#[case] action: WorkflowAction) {
        assert!(authorize(&actor(&[Role::SuperAdmin]), action).is_allowed());
    }

    #[rstest]
    fn denial_lists_required_roles() {
        let err = authorize(&actor(&[Role::Technician]), WorkflowAction::Assign)
            .into_result()
            .expect_err("denied");
        assert_eq!(err.code(), ErrorCode::Forbidden);
        let details = err.details().expect("details present");
        assert_eq!(details["action"], "assign");
        assert_eq!(
            details["requiredRoles"],
            serde_json::json!(["super_admin", "ops_manager", "master"])
        );
    }

    #[rstest]
    fn technician_must_be_assignee() {
        let mut ticket = ticket_in(TicketStatus::Assigned);
        ticket.assigned_technician_id = Some(UserId::new(99));

        let outcome =
            authorize_on_ticket(&actor(&[Role::Technician]), WorkflowAction::Start, &ticket);

        assert_eq!(
            outcome,
            Authorization::NotAssignee {
                action: WorkflowAction::Start,
                assignee: Some(UserId::new(99)),
            }
        );
    }

    #[rstest]
    fn super_admin_acts_for_assignee() {
        let mut ticket = ticket_in(TicketStatus::Assigned);
        ticket.assigned_technician_id = Some(UserId::new(99));

        let outcome =
            authorize_on_ticket(&actor(&[Role::SuperAdmin]), WorkflowAction::Start, &ticket);

        assert!(outcome.is_allowed());
    }

    #[rstest]
    fn qc_actions_ignore_assignment() {
        let ticket = ticket_in(TicketStatus::WaitingQc);
        let outcome =
            authorize_on_ticket(&actor(&[Role::QcInspector]), WorkflowAction::QcPass, &ticket);
        assert!(outcome.is_allowed());
    }
}

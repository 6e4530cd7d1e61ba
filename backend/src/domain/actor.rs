//! Acting users and their roles.
//!
//! The identity service owns users and role assignments. The engine only sees
//! an [`Actor`]: the caller's id plus the role set resolved for the current
//! request.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::UserId;

/// Roles recognised by the workflow guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Unrestricted operator.
    SuperAdmin,
    /// Operations manager overseeing workload and rewards.
    OpsManager,
    /// Workshop master handling intake and assignment.
    Master,
    /// Technician performing repairs.
    Technician,
    /// Inspector resolving quality control.
    QcInspector,
}

impl Role {
    /// Wire representation of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::OpsManager => "ops_manager",
            Self::Master => "master",
            Self::Technician => "technician",
            Self::QcInspector => "qc_inspector",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRoleError(pub String);

impl FromStr for Role {
    type Err = UnknownRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Self::SuperAdmin),
            "ops_manager" => Ok(Self::OpsManager),
            "master" => Ok(Self::Master),
            "technician" => Ok(Self::Technician),
            "qc_inspector" => Ok(Self::QcInspector),
            other => Err(UnknownRoleError(other.to_owned())),
        }
    }
}

/// Authenticated caller of a workflow action.
///
/// # Examples
/// ```
/// use repair_desk::domain::{Actor, Role, UserId};
///
/// let actor = Actor::new(UserId::new(3), [Role::Technician]);
/// assert!(actor.has_role(Role::Technician));
/// assert!(!actor.is_super_admin());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    user_id: UserId,
    roles: BTreeSet<Role>,
}

impl Actor {
    /// Build an actor from a user id and role set.
    pub fn new(user_id: UserId, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            user_id,
            roles: roles.into_iter().collect(),
        }
    }

    /// Identifier of the acting user.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Roles held by the actor.
    #[must_use]
    pub const fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    /// Whether the actor holds `role`.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Whether the actor holds at least one of `roles`.
    #[must_use]
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|role| self.has_role(*role))
    }

    /// Whether the actor may act on behalf of any user.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.has_role(Role::SuperAdmin)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Role::SuperAdmin)]
    #[case(Role::OpsManager)]
    #[case(Role::Master)]
    #[case(Role::Technician)]
    #[case(Role::QcInspector)]
    fn role_names_round_trip(#[case] role: Role) {
        assert_eq!(role.as_str().parse::<Role>(), Ok(role));
    }

    #[rstest]
    fn unknown_role_is_rejected() {
        assert_eq!(
            "janitor".parse::<Role>(),
            Err(UnknownRoleError("janitor".to_owned()))
        );
    }

    #[rstest]
    fn has_any_role_checks_membership() {
        let actor = Actor::new(UserId::new(1), [Role::Master, Role::QcInspector]);
        assert!(actor.has_any_role(&[Role::SuperAdmin, Role::Master]));
        assert!(!actor.has_any_role(&[Role::Technician]));
    }
}

//! # Role-Based Access Control
//!
//! Every user profile holds at most one [`Role`]. The lifecycle manager only
//! consumes the read side ([`RoleDirectory::has_role`]); role changes go
//! through [`RoleRegistry`], where they are themselves administrator-gated.
//!
//! | Operation                     | Required role                 |
//! |-------------------------------|-------------------------------|
//! | `create_draft`                | Ambassador or Administrator   |
//! | `approve` / `deny` / `complete` | Administrator               |
//! | `record_update`               | Owning ambassador or Administrator |
//! | `assign` / `revoke`           | Administrator                 |

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::{LifecycleError, Result};
use crate::types::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Administrator,
    Ambassador,
    Donor,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::Ambassador => "ambassador",
            Role::Donor => "donor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "administrator" => Ok(Role::Administrator),
            "ambassador" => Ok(Role::Ambassador),
            "donor" => Ok(Role::Donor),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Capability lookup supplied by the hosting application.
pub trait RoleDirectory: Send + Sync {
    fn role_of(&self, user: &UserId) -> Option<Role>;

    fn has_role(&self, user: &UserId, role: Role) -> bool {
        self.role_of(user) == Some(role)
    }
}

/// Fails unless `user` holds one of `allowed`.
pub fn require_any<D: RoleDirectory + ?Sized>(
    directory: &D,
    user: &UserId,
    allowed: &[Role],
) -> Result<Role> {
    match directory.role_of(user) {
        Some(role) if allowed.contains(&role) => Ok(role),
        _ => {
            warn!(user = %user, "rejected: requires one of {:?}", allowed);
            Err(LifecycleError::unauthorized(user, allowed))
        }
    }
}

pub fn require_administrator<D: RoleDirectory + ?Sized>(directory: &D, user: &UserId) -> Result<()> {
    require_any(directory, user, &[Role::Administrator]).map(|_| ())
}

/// Ambassadors and administrators may author projects.
pub fn require_can_create<D: RoleDirectory + ?Sized>(directory: &D, user: &UserId) -> Result<()> {
    require_any(directory, user, &[Role::Ambassador, Role::Administrator]).map(|_| ())
}

/// The dashboard a user lands on when visiting `/dashboard/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dashboard {
    Administrator,
    Ambassador,
    Donor,
    /// Users without a role are sent back to the home page.
    Home,
}

impl Dashboard {
    pub fn path(self) -> &'static str {
        match self {
            Dashboard::Administrator => "/dashboard/admin/",
            Dashboard::Ambassador => "/dashboard/ambassador/",
            Dashboard::Donor => "/dashboard/donor/",
            Dashboard::Home => "/",
        }
    }
}

pub fn dashboard_for<D: RoleDirectory + ?Sized>(directory: &D, user: Option<&UserId>) -> Dashboard {
    match user.and_then(|u| directory.role_of(u)) {
        Some(Role::Administrator) => Dashboard::Administrator,
        Some(Role::Ambassador) => Dashboard::Ambassador,
        Some(Role::Donor) => Dashboard::Donor,
        None => Dashboard::Home,
    }
}

/// In-process role table.
#[derive(Debug, Default)]
pub struct RoleRegistry {
    roles: RwLock<HashMap<UserId, Role>>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `role` without an authorization check. Used for bootstrap and
    /// for restoring persisted roles.
    pub fn grant(&self, user: UserId, role: Role) {
        self.roles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user, role);
    }

    /// Fails unless `actor` may give `target` the role `role`.
    ///
    /// Only administrators assign roles, and an administrator cannot demote
    /// themselves.
    pub fn check_assign(&self, actor: &UserId, target: &UserId, role: Role) -> Result<()> {
        require_administrator(self, actor)?;
        if actor == target && role != Role::Administrator {
            warn!(actor = %actor, role = %role, "rejected self-demotion");
            return Err(LifecycleError::validation(
                "target",
                "administrators cannot demote themselves",
            ));
        }
        Ok(())
    }

    /// Fails unless `actor` may remove `target`'s role.
    pub fn check_revoke(&self, actor: &UserId, target: &UserId) -> Result<()> {
        require_administrator(self, actor)?;
        if actor == target {
            warn!(actor = %actor, "rejected self-revocation");
            return Err(LifecycleError::validation(
                "target",
                "administrators cannot revoke their own role",
            ));
        }
        Ok(())
    }

    /// Set `target`'s role, replacing any previous one.
    pub fn assign(&self, actor: &UserId, target: UserId, role: Role) -> Result<()> {
        self.check_assign(actor, &target, role)?;
        info!(actor = %actor, target = %target, role = %role, "role assigned");
        self.grant(target, role);
        Ok(())
    }

    /// Remove `target`'s role.
    pub fn revoke(&self, actor: &UserId, target: &UserId) -> Result<Option<Role>> {
        self.check_revoke(actor, target)?;
        info!(actor = %actor, target = %target, "role revoked");
        Ok(self.remove(target))
    }

    /// Remove `user`'s role without an authorization check.
    pub fn remove(&self, user: &UserId) -> Option<Role> {
        self.roles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(user)
    }

    pub fn members(&self) -> Vec<(UserId, Role)> {
        let mut members: Vec<_> = self
            .roles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(user, role)| (user.clone(), *role))
            .collect();
        members.sort();
        members
    }
}

impl RoleDirectory for RoleRegistry {
    fn role_of(&self, user: &UserId) -> Option<Role> {
        self.roles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user)
            .copied()
    }
}

//! Error types for lifecycle operations.
//!
//! Every variant carries a stable code for programmatic handling; callers
//! decide how to present them. Nothing in this crate retries on error.

use thiserror::Error;

use crate::rbac::Role;
use crate::types::{Action, ProjectId, ProjectStatus, UserId};

pub type Result<T> = std::result::Result<T, LifecycleError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LifecycleError {
    /// Input attributes were missing or out of range.
    #[error("Validation error on `{field}`: {reason}")]
    Validation { field: &'static str, reason: String },

    /// The acting user lacks the role the operation requires.
    #[error("User {user} is not authorized: requires {required}")]
    Authorization { user: UserId, required: String },

    /// The project's status does not permit the action.
    #[error("Cannot {action} a project in status {from}")]
    InvalidTransition { from: ProjectStatus, action: Action },

    #[error("Project {0} not found")]
    NotFound(ProjectId),

    /// Optimistic version check failed on save.
    #[error("Project {id} was modified concurrently (expected version {expected}, found {found})")]
    Conflict {
        id: ProjectId,
        expected: u64,
        found: u64,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl LifecycleError {
    pub fn code(&self) -> &'static str {
        match self {
            LifecycleError::Validation { .. } => "VALIDATION",
            LifecycleError::Authorization { .. } => "AUTHORIZATION",
            LifecycleError::InvalidTransition { .. } => "INVALID_TRANSITION",
            LifecycleError::NotFound(_) => "NOT_FOUND",
            LifecycleError::Conflict { .. } => "CONFLICT",
            LifecycleError::Storage(_) => "STORAGE",
        }
    }

    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        LifecycleError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn unauthorized(user: &UserId, required: &[Role]) -> Self {
        let required = required
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(" or ");
        LifecycleError::Authorization {
            user: user.clone(),
            required,
        }
    }
}

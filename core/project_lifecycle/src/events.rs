//! Domain events emitted by the lifecycle manager.
//!
//! The manager publishes to an [`EventSink`] after a change has been saved.
//! Forwarding them as email or dashboard notifications is up to the host.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Project, ProjectId, ProjectStatus, UserId};

/// All event kinds the manager emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A draft was created.
    ProjectCreated,
    /// A project moved between statuses.
    StatusChanged,
    /// Repayment or energy totals were updated.
    ProgressRecorded,
}

impl EventKind {
    /// Short identifier suitable for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectCreated => "project_created",
            Self::StatusChanged => "status_changed",
            Self::ProgressRecorded => "progress_recorded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectStatusChanged {
    /// Snapshot after the transition.
    pub project: Project,
    pub old_status: ProjectStatus,
    pub new_status: ProjectStatus,
    pub actor: UserId,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LifecycleEvent {
    ProjectCreated {
        project_id: ProjectId,
        ambassador: UserId,
        at: DateTime<Utc>,
    },
    StatusChanged(ProjectStatusChanged),
    ProgressRecorded {
        project_id: ProjectId,
        actor: UserId,
        amount_repaid: f64,
        actual_energy: f64,
        at: DateTime<Utc>,
    },
}

impl LifecycleEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ProjectCreated { .. } => EventKind::ProjectCreated,
            Self::StatusChanged(_) => EventKind::StatusChanged,
            Self::ProgressRecorded { .. } => EventKind::ProgressRecorded,
        }
    }

    pub fn project_id(&self) -> ProjectId {
        match self {
            Self::ProjectCreated { project_id, .. } => *project_id,
            Self::StatusChanged(change) => change.project.id,
            Self::ProgressRecorded { project_id, .. } => *project_id,
        }
    }

    pub fn actor(&self) -> &UserId {
        match self {
            Self::ProjectCreated { ambassador, .. } => ambassador,
            Self::StatusChanged(change) => &change.actor,
            Self::ProgressRecorded { actor, .. } => actor,
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Self::ProjectCreated { at, .. } => *at,
            Self::StatusChanged(change) => change.at,
            Self::ProgressRecorded { at, .. } => *at,
        }
    }
}

pub trait EventSink: Send + Sync {
    fn publish(&self, event: LifecycleEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: LifecycleEvent) {}
}

/// Keeps every event in memory, in publish order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Status changes only, as `(project, old, new)`.
    pub fn status_changes(&self) -> Vec<(ProjectId, ProjectStatus, ProjectStatus)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                LifecycleEvent::StatusChanged(change) => {
                    Some((change.project.id, change.old_status, change.new_status))
                }
                _ => None,
            })
            .collect()
    }
}

impl EventSink for MemorySink {
    fn publish(&self, event: LifecycleEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

//! Lifecycle events as written to and read from the `events` table.

use project_lifecycle::LifecycleEvent;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// A decoded lifecycle event, ready to be stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub event_type: String,
    pub project_id: i64,
    pub actor: String,
    pub old_status: Option<String>,
    pub new_status: Option<String>,
    /// Full event as JSON.
    pub payload: String,
    pub occurred_at: String,
}

impl NewEvent {
    pub fn from_lifecycle(event: &LifecycleEvent) -> Result<Self> {
        let (old_status, new_status) = match event {
            LifecycleEvent::StatusChanged(change) => (
                Some(change.old_status.as_str().to_string()),
                Some(change.new_status.as_str().to_string()),
            ),
            _ => (None, None),
        };
        Ok(NewEvent {
            event_type: event.kind().as_str().to_string(),
            project_id: event.project_id().0 as i64,
            actor: event.actor().to_string(),
            old_status,
            new_status,
            payload: serde_json::to_string(event)?,
            occurred_at: event.at().to_rfc3339(),
        })
    }
}

/// An event record as stored in / read from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventRecord {
    pub id: i64,
    pub event_type: String,
    pub project_id: i64,
    pub actor: String,
    pub old_status: Option<String>,
    pub new_status: Option<String>,
    pub payload: String,
    pub occurred_at: String,
    pub created_at: i64,
}

//! SQLite write-through project store.
//!
//! Wraps the in-memory store the lifecycle manager reads from. A `save`
//! reaches SQLite first and is only committed in memory once the row is
//! written, so a failed write leaves both copies at the old version and no
//! event is published.
//!
//! The lifecycle manager is synchronous: `save` blocks on the database
//! future. Call lifecycle operations from `spawn_blocking` or a
//! multi-threaded runtime worker, never from a current-thread runtime.

use std::sync::{Mutex, PoisonError};

use project_lifecycle::{
    InMemoryStore, LifecycleError, Project, ProjectId, ProjectStore, UserId,
};
use sqlx::SqlitePool;
use tokio::runtime::Handle;
use tracing::error;

use crate::db;

pub struct SqliteStore {
    memory: InMemoryStore,
    pool: SqlitePool,
    runtime: Handle,
    /// Serializes check, write and commit across all projects.
    writes: Mutex<()>,
}

impl SqliteStore {
    pub fn new(memory: InMemoryStore, pool: SqlitePool, runtime: Handle) -> Self {
        Self {
            memory,
            pool,
            runtime,
            writes: Mutex::new(()),
        }
    }

    fn persist(&self, snapshot: &Project) -> project_lifecycle::Result<()> {
        let pool = &self.pool;
        let runtime = &self.runtime;
        tokio::task::block_in_place(|| runtime.block_on(db::upsert_project(pool, snapshot)))
            .map_err(|e| {
                error!(project = %snapshot.id, "write-through failed: {e}");
                LifecycleError::Storage(e.to_string())
            })
    }
}

impl ProjectStore for SqliteStore {
    fn next_id(&self) -> ProjectId {
        self.memory.next_id()
    }

    fn get(&self, id: ProjectId) -> project_lifecycle::Result<Option<Project>> {
        self.memory.get(id)
    }

    fn save(&self, project: &Project) -> project_lifecycle::Result<u64> {
        let _guard = self.writes.lock().unwrap_or_else(PoisonError::into_inner);

        let found = self.memory.get(project.id)?.map_or(0, |p| p.version);
        if found != project.version {
            return Err(LifecycleError::Conflict {
                id: project.id,
                expected: project.version,
                found,
            });
        }

        let mut snapshot = project.clone();
        snapshot.version = found + 1;
        self.persist(&snapshot)?;
        self.memory.save(project)
    }

    fn query_by_owner(&self, owner: &UserId) -> project_lifecycle::Result<Vec<Project>> {
        self.memory.query_by_owner(owner)
    }

    fn all(&self) -> project_lifecycle::Result<Vec<Project>> {
        self.memory.all()
    }
}

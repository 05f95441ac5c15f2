//! # Storage
//!
//! The lifecycle manager reads and writes projects through [`ProjectStore`].
//! [`InMemoryStore`] is the in-process implementation. A host that persists
//! elsewhere restores it with [`InMemoryStore::from_projects`] and wraps it
//! in a store that writes each change through before committing it here.
//!
//! ## Versioning
//!
//! `save` is an optimistic compare-and-swap on [`Project::version`]: the
//! caller passes the project as it read it, the store accepts the write only
//! if the stored version still matches, and returns the bumped version.
//! A project that does not exist yet must be saved with version `0`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::errors::{LifecycleError, Result};
use crate::types::{Project, ProjectId, UserId};

pub trait ProjectStore: Send + Sync {
    /// Reserve the next project id.
    fn next_id(&self) -> ProjectId;

    fn get(&self, id: ProjectId) -> Result<Option<Project>>;

    /// Write `project` if its version matches the stored one. Returns the
    /// new version.
    fn save(&self, project: &Project) -> Result<u64>;

    fn query_by_owner(&self, owner: &UserId) -> Result<Vec<Project>>;

    fn all(&self) -> Result<Vec<Project>>;
}

#[derive(Debug)]
pub struct InMemoryStore {
    projects: RwLock<BTreeMap<ProjectId, Project>>,
    /// Last id handed out; ids start at 1.
    counter: AtomicU64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            projects: RwLock::new(BTreeMap::new()),
            counter: AtomicU64::new(0),
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from previously persisted projects. The id counter
    /// resumes after the highest id seen.
    pub fn from_projects(projects: impl IntoIterator<Item = Project>) -> Self {
        let projects: BTreeMap<_, _> = projects.into_iter().map(|p| (p.id, p)).collect();
        let last_id = projects.keys().next_back().map(|id| id.0).unwrap_or(0);
        Self {
            projects: RwLock::new(projects),
            counter: AtomicU64::new(last_id),
        }
    }

    pub fn len(&self) -> usize {
        self.projects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProjectStore for InMemoryStore {
    fn next_id(&self) -> ProjectId {
        ProjectId(self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn get(&self, id: ProjectId) -> Result<Option<Project>> {
        let projects = self.projects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(projects.get(&id).cloned())
    }

    fn save(&self, project: &Project) -> Result<u64> {
        let mut projects = self.projects.write().unwrap_or_else(PoisonError::into_inner);
        let found = projects.get(&project.id).map(|p| p.version).unwrap_or(0);
        if found != project.version {
            return Err(LifecycleError::Conflict {
                id: project.id,
                expected: project.version,
                found,
            });
        }

        let mut stored = project.clone();
        stored.version = found + 1;
        projects.insert(stored.id, stored);
        Ok(found + 1)
    }

    fn query_by_owner(&self, owner: &UserId) -> Result<Vec<Project>> {
        let projects = self.projects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(projects
            .values()
            .filter(|p| p.is_owned_by(owner))
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<Project>> {
        let projects = self.projects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(projects.values().cloned().collect())
    }
}

//! # Project Lifecycle
//!
//! Guarded status transitions for Revolv's crowdfunded projects.
//! [`ProjectLifecycle`] is the single entry point; every operation takes the
//! acting user explicitly:
//!
//! | Phase        | Operation(s)                                   |
//! |--------------|------------------------------------------------|
//! | Drafting     | [`ProjectLifecycle::create_draft`]             |
//! | Review       | [`ProjectLifecycle::approve`], [`ProjectLifecycle::deny`] |
//! | Closing      | [`ProjectLifecycle::complete`]                 |
//! | Progress     | [`ProjectLifecycle::record_update`]            |
//! | Queries      | `get_project`, `get_visible_project`, `visible_projects_for`, `dashboard_for` |
//!
//! ## Architecture
//!
//! Authorization is delegated to [`rbac`], persistence to [`storage`] and
//! notification to [`events`]. Transition edges live in
//! [`ProjectStatus::after`]; this file only sequences checks, saves and
//! event emission.
//!
//! ## Concurrency
//!
//! Writes to one project are serialized by a per-project mutex, so of two
//! racing `approve`/`deny` calls exactly one succeeds and the other sees the
//! new status. The store's version check catches writers that bypass this
//! manager.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

pub mod errors;
pub mod events;
pub mod rbac;
pub mod storage;
pub mod types;
pub mod validation;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_lifecycle;
#[cfg(test)]
mod test_visibility;

pub use errors::{LifecycleError, Result};
pub use events::{EventKind, EventSink, LifecycleEvent, MemorySink, NullSink, ProjectStatusChanged};
pub use rbac::{Dashboard, Role, RoleDirectory, RoleRegistry};
pub use storage::{InMemoryStore, ProjectStore};
pub use types::{Action, Category, Project, ProjectDraft, ProjectId, ProjectStatus, UserId};

type Clock = Box<dyn Fn() -> NaiveDate + Send + Sync>;

/// Guarded lifecycle operations over a [`ProjectStore`] and a [`RoleDirectory`].
pub struct ProjectLifecycle<S, R> {
    store: S,
    roles: R,
    sink: Arc<dyn EventSink>,
    today: Clock,
    locks: Mutex<HashMap<ProjectId, Arc<Mutex<()>>>>,
}

impl<S: ProjectStore, R: RoleDirectory> ProjectLifecycle<S, R> {
    pub fn new(store: S, roles: R, sink: Arc<dyn EventSink>) -> Self {
        Self {
            store,
            roles,
            sink,
            today: Box::new(|| Utc::now().date_naive()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the date source used to validate `end_date`.
    pub fn with_clock(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Box::new(today);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn roles(&self) -> &R {
        &self.roles
    }

    // ─────────────────────────────────────────────────────────
    // Drafting
    // ─────────────────────────────────────────────────────────

    /// Create a project in `Drafted` status owned by `ambassador`.
    ///
    /// The author must be an ambassador or administrator.
    pub fn create_draft(&self, ambassador: &UserId, draft: ProjectDraft) -> Result<Project> {
        rbac::require_can_create(&self.roles, ambassador)?;
        let category = validation::validate_draft(&draft, (self.today)())?;

        let now = Utc::now();
        let mut project = Project {
            id: self.store.next_id(),
            status: ProjectStatus::Drafted,
            ambassador: ambassador.clone(),
            title: draft.title,
            tagline: draft.tagline,
            mission_statement: draft.mission_statement,
            org_about: draft.org_about,
            category,
            funding_goal: draft.funding_goal,
            actual_energy: 0.0,
            amount_repaid: 0.0,
            end_date: draft.end_date,
            org_start_date: draft.org_start_date,
            org_name: draft.org_name,
            video_url: draft.video_url,
            impact_power: draft.impact_power,
            location: draft.location,
            location_latitude: draft.location_latitude,
            location_longitude: draft.location_longitude,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        project.version = self.store.save(&project)?;

        info!(project = %project.id, ambassador = %ambassador, "project drafted");
        self.sink.publish(LifecycleEvent::ProjectCreated {
            project_id: project.id,
            ambassador: ambassador.clone(),
            at: now,
        });
        Ok(project)
    }

    // ─────────────────────────────────────────────────────────
    // Administrator transitions
    // ─────────────────────────────────────────────────────────

    /// `Drafted` → `Active`.
    pub fn approve(&self, id: ProjectId, actor: &UserId) -> Result<Project> {
        self.transition(id, actor, Action::Approve)
    }

    /// `Drafted` → `Denied`.
    pub fn deny(&self, id: ProjectId, actor: &UserId) -> Result<Project> {
        self.transition(id, actor, Action::Deny)
    }

    /// `Active` → `Completed`.
    pub fn complete(&self, id: ProjectId, actor: &UserId) -> Result<Project> {
        self.transition(id, actor, Action::Complete)
    }

    fn transition(&self, id: ProjectId, actor: &UserId, action: Action) -> Result<Project> {
        // Checked before the load: non-administrators fail the same way in any state.
        rbac::require_administrator(&self.roles, actor)?;

        let lock = self.lock_for(id)?;
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut project = self.load(id)?;
        let old_status = project.status;
        let new_status = Self::target(&project, action)?;

        let now = Utc::now();
        project.status = new_status;
        project.updated_at = now;
        project.version = self.store.save(&project)?;

        info!(
            project = %id,
            actor = %actor,
            "status {} -> {}",
            old_status,
            new_status
        );
        self.sink
            .publish(LifecycleEvent::StatusChanged(ProjectStatusChanged {
                project: project.clone(),
                old_status,
                new_status,
                actor: actor.clone(),
                at: now,
            }));
        Ok(project)
    }

    // ─────────────────────────────────────────────────────────
    // Progress
    // ─────────────────────────────────────────────────────────

    /// Add to a project's repaid amount and generated energy.
    ///
    /// Allowed on `Active` and `Completed` projects, by the owning ambassador
    /// or an administrator. Deltas may be negative as long as both totals
    /// stay non-negative; otherwise nothing is written.
    pub fn record_update(
        &self,
        id: ProjectId,
        actor: &UserId,
        amount_repaid_delta: f64,
        energy_delta: f64,
    ) -> Result<Project> {
        let lock = self.lock_for(id)?;
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut project = self.load(id)?;
        Self::target(&project, Action::RecordUpdate)?;

        let is_admin = self.roles.has_role(actor, Role::Administrator);
        let is_owner =
            project.is_owned_by(actor) && self.roles.has_role(actor, Role::Ambassador);
        if !is_admin && !is_owner {
            warn!(project = %id, actor = %actor, "rejected update from non-owner");
            return Err(LifecycleError::Authorization {
                user: actor.clone(),
                required: "owning ambassador or administrator".to_string(),
            });
        }

        let (amount_repaid, actual_energy) =
            validation::apply_progress(&project, amount_repaid_delta, energy_delta)?;

        let now = Utc::now();
        project.amount_repaid = amount_repaid;
        project.actual_energy = actual_energy;
        project.updated_at = now;
        project.version = self.store.save(&project)?;

        info!(
            project = %id,
            actor = %actor,
            amount_repaid,
            actual_energy,
            "progress recorded"
        );
        self.sink.publish(LifecycleEvent::ProgressRecorded {
            project_id: id,
            actor: actor.clone(),
            amount_repaid,
            actual_energy,
            at: now,
        });
        Ok(project)
    }

    // ─────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────

    pub fn get_project(&self, id: ProjectId) -> Result<Project> {
        self.load(id)
    }

    /// Projects `user` may see, ordered by id.
    ///
    /// Administrators see everything, ambassadors only what they own, and
    /// donors or users without a role only active and completed projects.
    pub fn visible_projects_for(&self, user: Option<&UserId>) -> Result<Vec<Project>> {
        let role = user.and_then(|u| self.roles.role_of(u));
        let mut projects = match (role, user) {
            (Some(Role::Administrator), _) => self.store.all()?,
            (Some(Role::Ambassador), Some(user)) => self.store.query_by_owner(user)?,
            _ => self
                .store
                .all()?
                .into_iter()
                .filter(|p| p.status.is_public())
                .collect(),
        };
        projects.sort_by_key(|p| p.id);
        debug!(user = ?user, count = projects.len(), "listed visible projects");
        Ok(projects)
    }

    /// Project `id` if `user` may see it under the same rules as
    /// [`Self::visible_projects_for`]. Hidden projects are reported as not found.
    pub fn get_visible_project(&self, id: ProjectId, user: Option<&UserId>) -> Result<Project> {
        let project = self.load(id)?;
        let visible = match user.and_then(|u| self.roles.role_of(u)) {
            Some(Role::Administrator) => true,
            Some(Role::Ambassador) => user.is_some_and(|u| project.is_owned_by(u)),
            _ => project.status.is_public(),
        };
        if !visible {
            debug!(project = %id, user = ?user, "project hidden from user");
            return Err(LifecycleError::NotFound(id));
        }
        Ok(project)
    }

    pub fn dashboard_for(&self, user: Option<&UserId>) -> Dashboard {
        rbac::dashboard_for(&self.roles, user)
    }

    // ─────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────

    fn load(&self, id: ProjectId) -> Result<Project> {
        self.store.get(id)?.ok_or(LifecycleError::NotFound(id))
    }

    fn target(project: &Project, action: Action) -> Result<ProjectStatus> {
        project.status.after(action).ok_or_else(|| {
            warn!(project = %project.id, status = %project.status, %action, "invalid transition");
            LifecycleError::InvalidTransition {
                from: project.status,
                action,
            }
        })
    }

    /// Write lock for an existing project. Unknown ids fail with `NotFound`
    /// and leave no entry behind.
    fn lock_for(&self, id: ProjectId) -> Result<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lock) = locks.get(&id) {
            return Ok(Arc::clone(lock));
        }
        self.load(id)?;
        Ok(Arc::clone(locks.entry(id).or_default()))
    }
}

//! Axum REST API handlers.
//!
//! The acting user is read from the `x-user-id` header; the hosting
//! application is responsible for authenticating it.
//!
//! Writes are persisted before they take effect in memory: project changes
//! through [`SqliteStore`], role changes by checking, saving, then applying.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use project_lifecycle::{
    rbac, Dashboard, Project, ProjectDraft, ProjectId, ProjectLifecycle, Role, RoleRegistry,
    UserId,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::db;
use crate::errors::{ApiError, Result};
use crate::events::EventRecord;
use crate::store::SqliteStore;

pub type Lifecycle = ProjectLifecycle<SqliteStore, RoleRegistry>;

pub const ACTOR_HEADER: &str = "x-user-id";

pub struct ApiState {
    pub lifecycle: Lifecycle,
    pub pool: SqlitePool,
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/dashboard", get(dashboard))
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/:id", get(get_project))
        .route("/projects/:id/approve", post(approve_project))
        .route("/projects/:id/deny", post(deny_project))
        .route("/projects/:id/complete", post(complete_project))
        .route("/projects/:id/updates", post(record_update))
        .route("/projects/:id/events", get(get_project_events))
        .route("/users", get(list_members))
        .route("/users/:id/role", put(assign_role).delete(revoke_role))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    pub amount_repaid_delta: f64,
    #[serde(default)]
    pub energy_delta: f64,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct DashboardResponse {
    pub dashboard: Dashboard,
    pub path: &'static str,
}

#[derive(Serialize)]
pub struct ProjectsResponse {
    pub count: usize,
    pub projects: Vec<Project>,
}

#[derive(Serialize)]
pub struct EventsResponse {
    pub project_id: ProjectId,
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct MembersResponse {
    pub count: usize,
    pub members: Vec<RoleResponse>,
}

#[derive(Serialize)]
pub struct RoleResponse {
    pub user_id: UserId,
    pub role: Option<Role>,
}

// ─────────────────────────────────────────────────────────
// Acting user
// ─────────────────────────────────────────────────────────

fn optional_actor(headers: &HeaderMap) -> Option<UserId> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| UserId(v.to_string()))
}

fn actor(headers: &HeaderMap) -> Result<UserId> {
    optional_actor(headers).ok_or(ApiError::Unauthenticated)
}

/// Run a lifecycle write on the blocking pool; its store waits on SQLite.
async fn write<T, F>(state: &Arc<ApiState>, op: F) -> Result<T>
where
    F: FnOnce(&Lifecycle) -> project_lifecycle::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    let result = tokio::task::spawn_blocking(move || op(&state.lifecycle)).await?;
    Ok(result?)
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /dashboard`
///
/// Where `/dashboard/` sends the current user.
pub async fn dashboard(State(state): State<Arc<ApiState>>, headers: HeaderMap) -> impl IntoResponse {
    let user = optional_actor(&headers);
    let dashboard = state.lifecycle.dashboard_for(user.as_ref());
    Json(DashboardResponse {
        dashboard,
        path: dashboard.path(),
    })
}

/// `GET /projects`
pub async fn list_projects(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<Json<ProjectsResponse>> {
    let user = optional_actor(&headers);
    let projects = state.lifecycle.visible_projects_for(user.as_ref())?;
    Ok(Json(ProjectsResponse {
        count: projects.len(),
        projects,
    }))
}

/// `POST /projects`
pub async fn create_project(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(draft): Json<ProjectDraft>,
) -> Result<(StatusCode, Json<Project>)> {
    let actor = actor(&headers)?;
    let project = write(&state, move |lifecycle| lifecycle.create_draft(&actor, draft)).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// `GET /projects/:id`
///
/// Projects the caller cannot list are reported as not found.
pub async fn get_project(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<Project>> {
    let user = optional_actor(&headers);
    let project = state
        .lifecycle
        .get_visible_project(ProjectId(id), user.as_ref())?;
    Ok(Json(project))
}

/// `POST /projects/:id/approve`
pub async fn approve_project(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<Project>> {
    let actor = actor(&headers)?;
    let project = write(&state, move |lifecycle| lifecycle.approve(ProjectId(id), &actor)).await?;
    Ok(Json(project))
}

/// `POST /projects/:id/deny`
pub async fn deny_project(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<Project>> {
    let actor = actor(&headers)?;
    let project = write(&state, move |lifecycle| lifecycle.deny(ProjectId(id), &actor)).await?;
    Ok(Json(project))
}

/// `POST /projects/:id/complete`
pub async fn complete_project(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<Project>> {
    let actor = actor(&headers)?;
    let project = write(&state, move |lifecycle| lifecycle.complete(ProjectId(id), &actor)).await?;
    Ok(Json(project))
}

/// `POST /projects/:id/updates`
pub async fn record_update(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(update): Json<UpdateRequest>,
) -> Result<Json<Project>> {
    let actor = actor(&headers)?;
    let project = write(&state, move |lifecycle| {
        lifecycle.record_update(
            ProjectId(id),
            &actor,
            update.amount_repaid_delta,
            update.energy_delta,
        )
    })
    .await?;
    Ok(Json(project))
}

/// `GET /projects/:id/events`
///
/// Journaled lifecycle events for a project the caller can see.
pub async fn get_project_events(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<EventsResponse>> {
    let project_id = ProjectId(id);
    let user = optional_actor(&headers);
    state
        .lifecycle
        .get_visible_project(project_id, user.as_ref())?;

    let events = db::get_events_for_project(&state.pool, project_id).await?;
    Ok(Json(EventsResponse {
        project_id,
        count: events.len(),
        events,
    }))
}

/// `GET /users`
///
/// Every user holding a role. Administrators only.
pub async fn list_members(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<Json<MembersResponse>> {
    let actor = actor(&headers)?;
    let roles = state.lifecycle.roles();
    rbac::require_administrator(roles, &actor)?;

    let members: Vec<_> = roles
        .members()
        .into_iter()
        .map(|(user_id, role)| RoleResponse {
            user_id,
            role: Some(role),
        })
        .collect();
    Ok(Json(MembersResponse {
        count: members.len(),
        members,
    }))
}

/// `PUT /users/:id/role`
pub async fn assign_role(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Json(request): Json<RoleRequest>,
) -> Result<Json<RoleResponse>> {
    let actor = actor(&headers)?;
    let target = UserId(user_id);
    let roles = state.lifecycle.roles();
    roles.check_assign(&actor, &target, request.role)?;
    db::save_role(&state.pool, &target, request.role).await?;
    roles.grant(target.clone(), request.role);
    info!(actor = %actor, target = %target, role = %request.role, "role assigned");
    Ok(Json(RoleResponse {
        user_id: target,
        role: Some(request.role),
    }))
}

/// `DELETE /users/:id/role`
pub async fn revoke_role(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Result<Json<RoleResponse>> {
    let actor = actor(&headers)?;
    let target = UserId(user_id);
    let roles = state.lifecycle.roles();
    roles.check_revoke(&actor, &target)?;
    db::delete_role(&state.pool, &target).await?;
    roles.remove(&target);
    info!(actor = %actor, target = %target, "role revoked");
    Ok(Json(RoleResponse {
        user_id: target,
        role: None,
    }))
}

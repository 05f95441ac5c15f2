//! Revolv dashboard API entry point.
//!
//! Hosts the project lifecycle manager in memory, restores it from SQLite
//! at startup and writes every changed project back. Lifecycle events are
//! journaled by a background task. The REST API serves the ambassador,
//! administrator and donor dashboards.

mod api;
mod config;
mod db;
mod errors;
mod events;
mod journal;
mod store;


use std::sync::Arc;

use project_lifecycle::{InMemoryStore, LifecycleEvent, ProjectLifecycle, Role, RoleRegistry, UserId};
use tokio::runtime::Handle;
use sqlx::SqlitePool;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;
use tracing_subscriber::EnvFilter;

use api::ApiState;
use config::Config;
use store::SqliteStore;

/// Restore roles and projects from `pool` and build the shared state.
///
/// Returns the receiving end of the event journal; hand it to
/// [`journal::run`].
async fn bootstrap(
    pool: SqlitePool,
    bootstrap_admin: Option<&UserId>,
) -> errors::Result<(Arc<ApiState>, UnboundedReceiver<LifecycleEvent>)> {
    let registry = RoleRegistry::new();
    for (user, role) in db::load_roles(&pool).await? {
        registry.grant(user, role);
    }
    if let Some(admin) = bootstrap_admin {
        registry.grant(admin.clone(), Role::Administrator);
        db::save_role(&pool, admin, Role::Administrator).await?;
        info!("Bootstrap administrator: {admin}");
    }

    let projects = db::load_projects(&pool).await?;
    info!("Restored {} projects", projects.len());
    let store = SqliteStore::new(
        InMemoryStore::from_projects(projects),
        pool.clone(),
        Handle::current(),
    );

    let (sink, rx) = journal::channel();
    let lifecycle = ProjectLifecycle::new(store, registry, Arc::new(sink));

    Ok((Arc::new(ApiState { lifecycle, pool }), rx))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    let pool = db::init_pool(&config.database_url).await?;
    let (state, events) = bootstrap(pool.clone(), config.bootstrap_admin.as_ref()).await?;

    // ─── Event journal ───────────────────────────────────
    tokio::spawn(journal::run(pool, events));

    // ─── REST API ─────────────────────────────────────────
    let app = api::router(state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

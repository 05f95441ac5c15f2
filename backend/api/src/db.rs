//! Database layer: migrations, project snapshots, roles and the event journal.

use chrono::{DateTime, NaiveDate, Utc};
use project_lifecycle::{Category, Project, ProjectId, ProjectStatus, Role, UserId};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::info;

use crate::errors::{ApiError, Result};
use crate::events::{EventRecord, NewEvent};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };
    // Create the file on first start.
    let url = if url.contains(":memory:") || url.contains('?') {
        url
    } else {
        format!("{url}?mode=rwc")
    };

    // Every connection to `:memory:` opens its own database, so keep exactly
    // one alive for the life of the pool.
    let options = if url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };
    let pool = options.connect(&url).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────
// Projects
// ─────────────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: i64,
    status: String,
    ambassador: String,
    title: String,
    tagline: String,
    mission_statement: String,
    org_about: String,
    category: String,
    funding_goal: f64,
    actual_energy: f64,
    amount_repaid: f64,
    end_date: String,
    org_start_date: String,
    org_name: Option<String>,
    video_url: Option<String>,
    impact_power: Option<f64>,
    location: Option<String>,
    location_latitude: Option<f64>,
    location_longitude: Option<f64>,
    version: i64,
    created_at: String,
    updated_at: String,
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    value
        .parse()
        .map_err(|e| ApiError::Corrupt(format!("{field} {value:?}: {e}")))
}

fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ApiError::Corrupt(format!("{field} {value:?}: {e}")))
}

impl TryFrom<ProjectRow> for Project {
    type Error = ApiError;

    fn try_from(row: ProjectRow) -> Result<Self> {
        Ok(Project {
            id: ProjectId(row.id as u64),
            status: row
                .status
                .parse::<ProjectStatus>()
                .map_err(ApiError::Corrupt)?,
            ambassador: UserId(row.ambassador),
            title: row.title,
            tagline: row.tagline,
            mission_statement: row.mission_statement,
            org_about: row.org_about,
            category: row.category.parse::<Category>().map_err(ApiError::Corrupt)?,
            funding_goal: row.funding_goal,
            actual_energy: row.actual_energy,
            amount_repaid: row.amount_repaid,
            end_date: parse_date("end_date", &row.end_date)?,
            org_start_date: parse_date("org_start_date", &row.org_start_date)?,
            org_name: row.org_name,
            video_url: row.video_url,
            impact_power: row.impact_power,
            location: row.location,
            location_latitude: row.location_latitude,
            location_longitude: row.location_longitude,
            version: row.version as u64,
            created_at: parse_timestamp("created_at", &row.created_at)?,
            updated_at: parse_timestamp("updated_at", &row.updated_at)?,
        })
    }
}

/// Load every persisted project, ordered by id.
pub async fn load_projects(pool: &SqlitePool) -> Result<Vec<Project>> {
    let rows = sqlx::query_as::<_, ProjectRow>("SELECT * FROM projects ORDER BY id ASC")
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(Project::try_from).collect()
}

/// Write the latest snapshot of a project. Older versions never overwrite
/// newer ones.
pub async fn upsert_project(pool: &SqlitePool, project: &Project) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO projects
            (id, status, ambassador, title, tagline, mission_statement, org_about, category,
             funding_goal, actual_energy, amount_repaid, end_date, org_start_date, org_name,
             video_url, impact_power, location, location_latitude, location_longitude,
             version, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                ?17, ?18, ?19, ?20, ?21, ?22)
        -- Only the fields the lifecycle mutates; extend this list when a
        -- project field becomes mutable.
        ON CONFLICT (id) DO UPDATE SET
            status         = excluded.status,
            actual_energy  = excluded.actual_energy,
            amount_repaid  = excluded.amount_repaid,
            version        = excluded.version,
            updated_at     = excluded.updated_at
        WHERE excluded.version > projects.version
        "#,
    )
    .bind(project.id.0 as i64)
    .bind(project.status.as_str())
    .bind(project.ambassador.as_str())
    .bind(&project.title)
    .bind(&project.tagline)
    .bind(&project.mission_statement)
    .bind(&project.org_about)
    .bind(project.category.as_str())
    .bind(project.funding_goal)
    .bind(project.actual_energy)
    .bind(project.amount_repaid)
    .bind(project.end_date.to_string())
    .bind(project.org_start_date.to_string())
    .bind(&project.org_name)
    .bind(&project.video_url)
    .bind(project.impact_power)
    .bind(&project.location)
    .bind(project.location_latitude)
    .bind(project.location_longitude)
    .bind(project.version as i64)
    .bind(project.created_at.to_rfc3339())
    .bind(project.updated_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Roles
// ─────────────────────────────────────────────────────────

pub async fn load_roles(pool: &SqlitePool) -> Result<Vec<(UserId, Role)>> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT user_id, role FROM user_roles ORDER BY user_id ASC")
            .fetch_all(pool)
            .await?;
    rows.into_iter()
        .map(|(user, role)| {
            let role = role.parse::<Role>().map_err(ApiError::Corrupt)?;
            Ok((UserId(user), role))
        })
        .collect()
}

pub async fn save_role(pool: &SqlitePool, user: &UserId, role: Role) -> Result<()> {
    sqlx::query(
        "INSERT INTO user_roles (user_id, role) VALUES (?1, ?2)
         ON CONFLICT (user_id) DO UPDATE SET role = excluded.role",
    )
    .bind(user.as_str())
    .bind(role.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_role(pool: &SqlitePool, user: &UserId) -> Result<()> {
    sqlx::query("DELETE FROM user_roles WHERE user_id = ?1")
        .bind(user.as_str())
        .execute(pool)
        .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Event writes
// ─────────────────────────────────────────────────────────

/// Append a batch of events to the journal.
pub async fn insert_events(pool: &SqlitePool, events: &[NewEvent]) -> Result<usize> {
    let mut count = 0usize;
    for ev in events {
        let rows_affected = sqlx::query(
            r#"
            INSERT INTO events
                (event_type, project_id, actor, old_status, new_status, payload, occurred_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&ev.event_type)
        .bind(ev.project_id)
        .bind(&ev.actor)
        .bind(&ev.old_status)
        .bind(&ev.new_status)
        .bind(&ev.payload)
        .bind(&ev.occurred_at)
        .execute(pool)
        .await?
        .rows_affected();

        count += rows_affected as usize;
    }
    Ok(count)
}

// ─────────────────────────────────────────────────────────
// Event reads
// ─────────────────────────────────────────────────────────

/// Fetch all events for a given project, oldest first.
pub async fn get_events_for_project(
    pool: &SqlitePool,
    project_id: ProjectId,
) -> Result<Vec<EventRecord>> {
    let rows = sqlx::query_as::<_, EventRecord>(
        r#"
        SELECT id, event_type, project_id, actor, old_status, new_status, payload,
               occurred_at, created_at
        FROM   events
        WHERE  project_id = ?1
        ORDER  BY id ASC
        "#,
    )
    .bind(project_id.0 as i64)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

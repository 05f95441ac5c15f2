//! # Types
//!
//! Shared data structures used across the lifecycle crate.
//!
//! ## Status as a Finite-State Machine
//!
//! [`ProjectStatus`] enforces a strict forward-only lifecycle:
//!
//! ```text
//! Drafted ──approve──► Active ──complete──► Completed
//!     └──────deny─────► Denied
//! ```
//!
//! `Completed` and `Denied` are terminal. [`ProjectStatus::after`] is the
//! single source of truth for which edges exist.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Auto-incremented project identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub u64);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a user profile, as resolved by the hosting application.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        UserId(value.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Authored by an ambassador, awaiting review.
    Drafted,
    /// Approved; accepting donations and progress updates.
    Active,
    /// Campaign finished; updates may still be posted.
    Completed,
    /// Rejected at review.
    Denied,
}

/// A status-affecting or status-guarded operation on a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Approve,
    Deny,
    Complete,
    RecordUpdate,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Approve => "approve",
            Action::Deny => "deny",
            Action::Complete => "complete",
            Action::RecordUpdate => "record an update on",
        };
        f.write_str(name)
    }
}

pub const ALL_STATUSES: &[ProjectStatus] = &[
    ProjectStatus::Drafted,
    ProjectStatus::Active,
    ProjectStatus::Completed,
    ProjectStatus::Denied,
];

impl ProjectStatus {
    /// The status reached by applying `action`, or `None` when the edge
    /// does not exist. `RecordUpdate` keeps the status where it is allowed.
    pub fn after(self, action: Action) -> Option<ProjectStatus> {
        match (self, action) {
            (ProjectStatus::Drafted, Action::Approve) => Some(ProjectStatus::Active),
            (ProjectStatus::Drafted, Action::Deny) => Some(ProjectStatus::Denied),
            (ProjectStatus::Active, Action::Complete) => Some(ProjectStatus::Completed),
            (ProjectStatus::Active | ProjectStatus::Completed, Action::RecordUpdate) => Some(self),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ProjectStatus::Completed | ProjectStatus::Denied)
    }

    /// Active and completed projects are shown to donors and visitors.
    pub fn is_public(self) -> bool {
        matches!(self, ProjectStatus::Active | ProjectStatus::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Drafted => "drafted",
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Denied => "denied",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_STATUSES
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown project status: {s}"))
    }
}

/// Fixed set of project categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Health,
    Arts,
    Faith,
    Education,
    Community,
}

pub const VALID_CATEGORIES: &[Category] = &[
    Category::Health,
    Category::Arts,
    Category::Faith,
    Category::Education,
    Category::Community,
];

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Health => "health",
            Category::Arts => "arts",
            Category::Faith => "faith",
            Category::Education => "education",
            Category::Community => "community",
        }
    }
}

impl FromStr for Category {
    type Err = String;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        VALID_CATEGORIES
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes submitted when an ambassador drafts a project.
///
/// `category` is kept as free text here so that an unknown value surfaces
/// as a validation error rather than a decode failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDraft {
    pub title: String,
    pub tagline: String,
    pub mission_statement: String,
    pub org_about: String,
    pub category: String,
    pub funding_goal: f64,
    pub end_date: NaiveDate,
    pub org_start_date: NaiveDate,
    #[serde(default)]
    pub org_name: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub impact_power: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub location_latitude: Option<f64>,
    #[serde(default)]
    pub location_longitude: Option<f64>,
}

/// A crowdfunded project and its lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub status: ProjectStatus,
    /// Profile that authored the project. Never changes after creation.
    pub ambassador: UserId,
    pub title: String,
    pub tagline: String,
    pub mission_statement: String,
    pub org_about: String,
    pub category: Category,
    pub funding_goal: f64,
    pub actual_energy: f64,
    pub amount_repaid: f64,
    pub end_date: NaiveDate,
    pub org_start_date: NaiveDate,
    pub org_name: Option<String>,
    pub video_url: Option<String>,
    pub impact_power: Option<f64>,
    pub location: Option<String>,
    pub location_latitude: Option<f64>,
    pub location_longitude: Option<f64>,
    /// Bumped by the store on every successful save.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.ambassador == user
    }
}

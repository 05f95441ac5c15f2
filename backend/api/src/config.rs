//! Application configuration loaded from environment variables.

use project_lifecycle::UserId;

use crate::errors::{ApiError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// User granted the administrator role at startup, if any
    pub bootstrap_admin: Option<UserId>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Config {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite:./revolv.db".to_string()),
            api_port: lookup("API_PORT")
                .unwrap_or_else(|| "3001".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid API_PORT".to_string()))?,
            bootstrap_admin: match lookup("BOOTSTRAP_ADMIN") {
                Some(id) if id.trim().is_empty() => {
                    return Err(ApiError::Config("BOOTSTRAP_ADMIN must not be blank".to_string()))
                }
                Some(id) => Some(UserId(id.trim().to_string())),
                None => None,
            },
        })
    }
}

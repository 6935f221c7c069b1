//! Database primitives: connection settings, the optional-predicate filter
//! builder and page handling shared by every list endpoint.

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

pub mod filter;
pub mod page;

pub use filter::{EqFilter, FilterSet, RangeFilter};
pub use page::{MAX_PAGE_SIZE, Page, PageRequest, fetch_page};

/// Shared connection pool handle.
pub type DbPool = DatabaseConnection;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database url missing (env {0})")]
    MissingUrl(String),
    #[error("database connection failed: {0}")]
    Connect(#[from] DbErr),
}

pub type DbResult<T> = Result<T, DbError>;

#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_url_key")]
    env_key: String,
    #[serde(default = "default_max_connections")]
    max_connections: u32,
    #[serde(default)]
    sql_logging: bool,
}

fn default_url_key() -> String {
    "DATABASE_URL".to_string()
}

fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            env_key: default_url_key(),
            max_connections: default_max_connections(),
            sql_logging: false,
        }
    }
}

impl DatabaseSettings {
    pub fn new(env_key: impl Into<String>) -> Self {
        Self {
            env_key: env_key.into(),
            ..Self::default()
        }
    }

    /// Reads `DB_MAX_CONNECTIONS` and `DB_SQL_LOGGING` on top of the defaults.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Some(max) = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
        {
            settings.max_connections = max;
        }
        settings.sql_logging = std::env::var("DB_SQL_LOGGING")
            .map(|val| matches!(val.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        settings
    }

    pub fn database_url(&self) -> DbResult<String> {
        std::env::var(&self.env_key).map_err(|_| DbError::MissingUrl(self.env_key.clone()))
    }

    pub fn max_connections(&self) -> u32 {
        self.max_connections
    }
}

pub async fn connect(settings: &DatabaseSettings) -> DbResult<DbPool> {
    let url = settings.database_url()?;
    connect_url(&url, settings).await
}

pub async fn connect_url(url: &str, settings: &DatabaseSettings) -> DbResult<DbPool> {
    let mut options = ConnectOptions::new(url.to_string());
    options
        .max_connections(settings.max_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(settings.sql_logging);
    let pool = Database::connect(options).await?;
    info!(max_connections = settings.max_connections, "database pool ready");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_url_names_the_variable() {
        let settings = DatabaseSettings::new("HR_SUITE_URL_THAT_IS_NEVER_SET");
        let err = settings.database_url().unwrap_err();
        assert_eq!(
            err.to_string(),
            "database url missing (env HR_SUITE_URL_THAT_IS_NEVER_SET)"
        );
    }

    #[test]
    fn settings_deserialize_with_defaults() {
        let settings: DatabaseSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.max_connections(), 10);
        assert_eq!(settings.env_key, "DATABASE_URL");
    }

    #[tokio::test]
    async fn connects_to_sqlite_memory() {
        let pool = connect_url("sqlite::memory:", &DatabaseSettings::default())
            .await
            .unwrap();
        assert!(pool.ping().await.is_ok());
    }
}

use std::time::Duration;

use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::gallery::OrderingError;

/// Errors from the record store
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),

    #[error(transparent)]
    Ordering(#[from] OrderingError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Connection setup for the gallery database
pub struct DatabaseManager;

impl DatabaseManager {
    /// Build the connection pool described by `config`, running migrations if enabled
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        if config.url.is_empty() {
            return Err(DatabaseError::ConfigMissing("DATABASE_URL"));
        }

        let url = Self::validate_url(&config.url)?;
        info!(
            "Database URL validation: host {}, port {}, database {}",
            url.host_str().unwrap_or("-"),
            url.port().unwrap_or(5432),
            url.path().trim_start_matches('/')
        );

        let options = Self::normalized_url(&url)
            .parse::<PgConnectOptions>()
            .map_err(|e| DatabaseError::InvalidDatabaseUrl(e.to_string()))?
            .application_name(&config.application_name);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .test_before_acquire(true)
            .max_lifetime(Duration::from_secs(3600))
            .connect_with(options)
            .await?;

        if config.run_migrations {
            Self::migrate(&pool).await?;
        }

        info!("Database connection established");
        Ok(pool)
    }

    /// Apply embedded migrations; also upgrades tables created by earlier deployments
    pub async fn migrate(pool: &PgPool) -> Result<(), DatabaseError> {
        MIGRATOR.run(pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Accepts `postgres://`, `postgresql://` and the SQLAlchemy-style `postgresql+asyncpg://`
    pub fn validate_url(raw: &str) -> Result<url::Url, DatabaseError> {
        let url = url::Url::parse(raw).map_err(|e| DatabaseError::InvalidDatabaseUrl(e.to_string()))?;

        match url.scheme() {
            "postgres" | "postgresql" | "postgresql+asyncpg" => {}
            other => {
                return Err(DatabaseError::InvalidDatabaseUrl(format!(
                    "expected postgres:// or postgresql://, got {}://",
                    other
                )))
            }
        }

        if url.host_str().map_or(true, str::is_empty) {
            return Err(DatabaseError::InvalidDatabaseUrl("no hostname".to_string()));
        }

        Ok(url)
    }

    fn normalized_url(url: &url::Url) -> String {
        let raw = url.as_str();
        match raw.strip_prefix("postgresql+asyncpg://") {
            Some(rest) => format!("postgres://{}", rest),
            None => raw.to_string(),
        }
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_database_urls() {
        assert!(DatabaseManager::validate_url("postgres://u:p@localhost:5432/gallery").is_ok());
        assert!(DatabaseManager::validate_url("postgresql://u:p@db.example.com/postgres").is_ok());
        assert!(DatabaseManager::validate_url("mysql://u:p@localhost/gallery").is_err());
        assert!(DatabaseManager::validate_url("not a url").is_err());
    }

    #[test]
    fn normalizes_asyncpg_scheme() {
        let url = DatabaseManager::validate_url("postgresql+asyncpg://u:p@localhost:5432/gallery").unwrap();
        assert_eq!(
            DatabaseManager::normalized_url(&url),
            "postgres://u:p@localhost:5432/gallery"
        );
    }
}

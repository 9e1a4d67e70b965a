//! Database layer for the reviewer service
//!
//! SQLite persistence for teams, users, pull requests and reviewer
//! assignments, exposed to the workflow service as an `EntityStore`.

pub mod error;
pub mod repos;
mod store;

use std::path::Path;
use std::time::Duration;

use reviewer_core::config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

pub use error::{DbError, Result};
pub use repos::{
    pull_requests::PullRequestRepository, statistics::StatisticsRepository, teams::TeamRepository,
    users::UserRepository,
};
pub use store::SqliteStore;

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the database described by `config`.
    ///
    /// Does not run migrations; call [`Database::migrate`] afterwards.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let db_path = config.path.as_path();

        // Create parent directory if needed
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| DbError::Io(format!("Failed to create database directory: {}", e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await?;

        tracing::debug!(path = %db_path.display(), "Database connected");
        Ok(Self { pool })
    }

    /// Open the database at `path` with default pool settings and migrate it
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let config = DatabaseConfig {
            path: path.as_ref().to_path_buf(),
            ..DatabaseConfig::default()
        };
        let db = Self::connect(&config).await?;
        db.migrate().await?;
        Ok(db)
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn teams(&self) -> TeamRepository<'_> {
        TeamRepository::new(&self.pool)
    }

    pub fn users(&self) -> UserRepository<'_> {
        UserRepository::new(&self.pool)
    }

    pub fn pull_requests(&self) -> PullRequestRepository<'_> {
        PullRequestRepository::new(&self.pool)
    }

    pub fn statistics(&self) -> StatisticsRepository<'_> {
        StatisticsRepository::new(&self.pool)
    }
}

//! Serve command - run the HTTP API

use std::sync::Arc;

use clap::Args;
use reviewer_api::AppState;
use reviewer_core::{Config, EntityStore, MemoryStore, ReviewService, WorkflowMetrics};
use reviewer_db::SqliteStore;

use super::open_database;

/// Run the HTTP server until Ctrl-C or SIGTERM
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Keep all data in memory instead of SQLite
    #[arg(long)]
    pub in_memory: bool,
}

impl ServeArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store: Arc<dyn EntityStore> = if self.in_memory {
            tracing::warn!("Using in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        } else {
            let db = open_database(config).await?;
            tracing::info!(path = %config.database.path.display(), "Database opened");
            Arc::new(SqliteStore::new(db))
        };

        let metrics = Arc::new(WorkflowMetrics::new());
        let service = ReviewService::from_config(store, metrics.clone(), config);
        tracing::info!(
            max_reviewers = config.assignment.max_reviewers,
            "Starting pr-reviewer {}",
            env!("CARGO_PKG_VERSION")
        );

        reviewer_api::serve(AppState::new(service, metrics), &config.server).await?;
        Ok(())
    }
}

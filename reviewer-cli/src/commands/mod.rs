//! CLI command implementations

pub mod migrate;
pub mod serve;
pub mod stats;
pub mod team;

use std::sync::Arc;

use reviewer_core::{Config, ReviewService, TracingSink};
use reviewer_db::{Database, SqliteStore};

pub use migrate::MigrateArgs;
pub use serve::ServeArgs;
pub use stats::StatsArgs;
pub use team::TeamArgs;

/// Open the configured database, migrate it, and wrap it in a service
pub(crate) async fn open_service(config: &Config) -> anyhow::Result<ReviewService> {
    let db = open_database(config).await?;
    let store = Arc::new(SqliteStore::new(db));
    Ok(ReviewService::from_config(store, Arc::new(TracingSink), config))
}

pub(crate) async fn open_database(config: &Config) -> anyhow::Result<Database> {
    let db = Database::connect(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open database {}: {}", config.database.path.display(), e))?;
    db.migrate().await?;
    Ok(db)
}

//! Migrate command - create or upgrade the database schema

use clap::Args;
use reviewer_core::Config;
use reviewer_db::Database;

/// Apply pending database migrations
#[derive(Args, Debug)]
pub struct MigrateArgs {}

impl MigrateArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let db = Database::connect(&config.database).await?;
        db.migrate().await?;
        println!("Database ready: {}", config.database.path.display());
        Ok(())
    }
}

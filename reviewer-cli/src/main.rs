//! pr-reviewer - reviewer assignment service and admin CLI

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reviewer_core::config::CliOverrides;
use reviewer_core::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{MigrateArgs, ServeArgs, StatsArgs, TeamArgs};

/// Assigns pull request reviewers from the author's team
#[derive(Parser, Debug)]
#[command(name = "pr-reviewer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.config/pr-reviewer/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path (overrides config and env)
    #[arg(long, global = true, env = "PR_REVIEWER_DATABASE_PATH")]
    database: Option<PathBuf>,

    /// HTTP port (overrides config and env)
    #[arg(long, global = true, env = "PR_REVIEWER_PORT")]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    #[command(visible_alias = "s")]
    Serve(ServeArgs),

    /// Apply database migrations
    Migrate(MigrateArgs),

    /// Print assignment statistics
    Stats(StatsArgs),

    /// Manage teams
    Team(TeamArgs),

    /// Show current configuration
    Config,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let overrides = CliOverrides {
        config_path: cli.config.clone(),
        database_path: cli.database.clone(),
        port: cli.port,
    };
    let config = Config::load_with_overrides(&overrides)?;

    let level = if cli.verbose { "debug" } else { config.log_level.as_str() };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    tracing::debug!(
        database = %config.database.path.display(),
        addr = %config.server.bind_addr(),
        "Configuration loaded"
    );

    match cli.command {
        Some(Commands::Serve(args)) => args.execute(&config).await?,
        Some(Commands::Migrate(args)) => args.execute(&config).await?,
        Some(Commands::Stats(args)) => args.execute(&config).await?,
        Some(Commands::Team(args)) => args.execute(&config).await?,
        Some(Commands::Config) => print_config(&config, cli.config.as_deref()),
        Some(Commands::Version) => {
            println!("pr-reviewer {}", env!("CARGO_PKG_VERSION"));
        }
        None => {
            println!("pr-reviewer - pull request reviewer assignment");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

fn print_config(config: &Config, explicit: Option<&std::path::Path>) {
    println!("pr-reviewer Configuration");
    println!("=========================");
    println!();
    println!("Server:");
    println!("  address: {}", config.server.bind_addr());
    println!("  request_timeout: {:?}", config.server.request_timeout);
    println!("  cors_origins: {}", config.server.cors_origins.join(", "));
    println!();
    println!("Database:");
    println!("  path: {}", config.database.path.display());
    println!("  max_connections: {}", config.database.max_connections);
    println!();
    println!("Assignment:");
    println!("  max_reviewers: {}", config.assignment.max_reviewers);
    println!("  statistics top_n: {}", config.statistics.top_n);
    println!();
    println!("log_level: {}", config.log_level);

    let path = explicit.map(std::path::Path::to_path_buf).or_else(Config::default_config_path);
    if let Some(path) = path {
        println!();
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }
}

//! Configuration management for the reviewer service
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (PR_REVIEWER_*)
//! 3. Config file (~/.config/pr-reviewer/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::assignment::DEFAULT_MAX_REVIEWERS;
use crate::{Error, Result};

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Per-request deadline
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Origins allowed by CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout: Duration::from_secs(15),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:80".to_string(),
            ],
        }
    }
}

impl ServerConfig {
    /// Socket address string for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: PathBuf,

    /// Maximum number of pooled connections
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let path = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pr-reviewer")
            .join("pr-reviewer.db");

        Self {
            path,
            max_connections: 5,
        }
    }
}

/// Reviewer assignment configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssignmentConfig {
    /// Reviewers auto-assigned when a pull request is opened
    pub max_reviewers: usize,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            max_reviewers: DEFAULT_MAX_REVIEWERS,
        }
    }
}

/// Statistics configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StatisticsConfig {
    /// Rows returned in the per-user and per-team rankings
    pub top_n: u32,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self { top_n: 20 }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Default log filter when RUST_LOG is unset
    pub log_level: String,

    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub assignment: AssignmentConfig,
    pub statistics: StatisticsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            assignment: AssignmentConfig::default(),
            statistics: StatisticsConfig::default(),
        }
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub port: Option<u16>,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        match Self::default_config_path() {
            Some(path) if path.exists() => Self::load_from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/pr-reviewer/config.toml` on Linux
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("pr-reviewer").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - PR_REVIEWER_HOST
    /// - PR_REVIEWER_PORT
    /// - PR_REVIEWER_DATABASE_PATH
    /// - PR_REVIEWER_MAX_REVIEWERS
    /// - PR_REVIEWER_LOG_LEVEL
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(host) = lookup("PR_REVIEWER_HOST") {
            self.server.host = host;
        }

        if let Some(port) = lookup("PR_REVIEWER_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| Error::Config(format!("PR_REVIEWER_PORT is not a port: {}", port)))?;
        }

        if let Some(path) = lookup("PR_REVIEWER_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("PR_REVIEWER_MAX_REVIEWERS") {
            self.assignment.max_reviewers = max.parse().map_err(|_| {
                Error::Config(format!("PR_REVIEWER_MAX_REVIEWERS is not a number: {}", max))
            })?;
        }

        if let Some(level) = lookup("PR_REVIEWER_LOG_LEVEL") {
            self.log_level = level;
        }

        Ok(self)
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, cli: &CliOverrides) -> Self {
        if let Some(path) = &cli.database_path {
            self.database.path = path.clone();
        }

        if let Some(port) = cli.port {
            self.server.port = port;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(cli: &CliOverrides) -> Result<Self> {
        let base = match &cli.config_path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load()?,
        };

        Ok(base.with_env_overrides()?.with_cli_overrides(cli))
    }
}

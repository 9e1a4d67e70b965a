//! Review workflow service
//!
//! Orchestrates the entity store and the assignment policy:
//! 1. Team and user CRUD with membership checks
//! 2. Pull request lifecycle (create, merge, close)
//! 3. Reviewer add / reassign, including the bulk deactivation cascade
//! 4. Relational enrichment of every returned user and pull request
//!
//! The service holds no state of its own beyond its injected collaborators.

mod enrich;
mod pull_requests;
mod teams;
mod users;

use std::sync::Arc;

use crate::assignment::AssignmentPolicy;
use crate::config::Config;
use crate::events::{EventSink, WorkflowEvent};
use crate::models::Statistics;
use crate::store::EntityStore;
use crate::{Error, Result};

/// Maximum length of team names, usernames and display names
pub const MAX_NAME_LEN: usize = 100;

/// Maximum length of pull request titles
pub const MAX_TITLE_LEN: usize = 255;

const DEFAULT_TOP_N: u32 = 20;

/// Entry point for every workflow operation
#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn EntityStore>,
    events: Arc<dyn EventSink>,
    policy: AssignmentPolicy,
    top_n: u32,
}

impl ReviewService {
    /// Create a service with the default policy and statistics size
    pub fn new(store: Arc<dyn EntityStore>, events: Arc<dyn EventSink>) -> Self {
        Self {
            store,
            events,
            policy: AssignmentPolicy::default(),
            top_n: DEFAULT_TOP_N,
        }
    }

    /// Create a service tuned by the loaded configuration
    pub fn from_config(store: Arc<dyn EntityStore>, events: Arc<dyn EventSink>, config: &Config) -> Self {
        Self::new(store, events)
            .with_policy(AssignmentPolicy::new(config.assignment.max_reviewers))
            .with_top_n(config.statistics.top_n)
    }

    pub fn with_policy(mut self, policy: AssignmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_top_n(mut self, top_n: u32) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub fn policy(&self) -> AssignmentPolicy {
        self.policy
    }

    /// Aggregate PR counts plus the busiest reviewers and teams
    pub async fn get_statistics(&self) -> Result<Statistics> {
        self.store.statistics(self.top_n).await
    }

    fn emit(&self, event: WorkflowEvent) {
        self.events.record(event);
    }
}

fn validate_text(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if value.trim().is_empty() || len > max {
        return Err(Error::Validation(format!(
            "{} must be between 1 and {} characters",
            field, max
        )));
    }
    Ok(())
}

fn validate_id(field: &str, id: i64) -> Result<()> {
    if id < 1 {
        return Err(Error::Validation(format!("{} must be a positive id", field)));
    }
    Ok(())
}

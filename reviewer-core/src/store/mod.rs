//! Entity store abstraction
//!
//! The review service reaches persistence only through [`EntityStore`].
//! Every multi-row write on this trait is atomic in the implementation:
//! a concurrent reader never sees a pull request without its reviewer rows,
//! or a reviewer swap with only one half applied.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{PrStatus, PullRequest, Statistics, Team, UpdateUserRequest, User};
use crate::Result;

/// Fields for a new user row
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub name: String,
    pub team_id: Option<i64>,
}

/// Fields for a new pull request together with its initial reviewers
#[derive(Debug, Clone)]
pub struct NewPullRequest {
    pub title: String,
    pub author_id: i64,
    pub reviewer_ids: Vec<i64>,
}

/// Optional filters for listing users
#[derive(Debug, Clone, Copy, Default)]
pub struct UserFilter {
    pub team_id: Option<i64>,
    pub is_active: Option<bool>,
}

/// Optional filters for listing pull requests
#[derive(Debug, Clone, Copy, Default)]
pub struct PullRequestFilter {
    /// Only PRs where this user is a reviewer
    pub reviewer_id: Option<i64>,
    pub author_id: Option<i64>,
    pub status: Option<PrStatus>,
}

/// Result of an atomic reviewer swap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    Replaced,
    PullRequestMissing,
    Merged,
    ReviewerNotAssigned,
    /// The proposed replacement is already on the PR; nothing changed
    ReplacementAssigned,
}

/// Persistence operations the review workflow depends on
#[async_trait]
pub trait EntityStore: Send + Sync {
    // Teams

    /// Insert a team; a duplicate name fails with `TeamAlreadyExists`
    async fn create_team(&self, name: &str) -> Result<Team>;

    async fn get_team(&self, id: i64) -> Result<Option<Team>>;

    async fn get_team_by_name(&self, name: &str) -> Result<Option<Team>>;

    /// All teams, newest first
    async fn list_teams(&self) -> Result<Vec<Team>>;

    /// Detach every member and delete the team. Returns false if no team row existed.
    async fn delete_team(&self, id: i64) -> Result<bool>;

    /// Move a user into a team. Returns false if the user was already in it.
    async fn add_user_to_team(&self, team_id: i64, user_id: i64) -> Result<bool>;

    /// Clear a user's team. Returns false if the user was not in that team.
    async fn remove_user_from_team(&self, team_id: i64, user_id: i64) -> Result<bool>;

    // Users

    /// Insert an active user; a duplicate username fails with `UserAlreadyExists`
    async fn create_user(&self, user: NewUser) -> Result<User>;

    async fn get_user(&self, id: i64) -> Result<Option<User>>;

    /// Users matching the filter, newest first
    async fn list_users(&self, filter: UserFilter) -> Result<Vec<User>>;

    /// Apply a partial update. Returns `None` if the user does not exist.
    async fn update_user(&self, id: i64, update: &UpdateUserRequest) -> Result<Option<User>>;

    /// Active members of a team other than `exclude_user_id`
    async fn active_team_members(&self, team_id: i64, exclude_user_id: i64) -> Result<Vec<User>>;

    /// Deactivate the listed users that are active members of the team.
    /// Returns how many rows flipped from active to inactive.
    async fn deactivate_users(&self, team_id: i64, user_ids: &[i64]) -> Result<u64>;

    // Pull requests

    /// Insert an OPEN pull request and its reviewer rows in one transaction
    async fn create_pull_request(&self, pr: NewPullRequest) -> Result<PullRequest>;

    async fn get_pull_request(&self, id: i64) -> Result<Option<PullRequest>>;

    /// Pull requests matching the filter, newest first
    async fn list_pull_requests(&self, filter: PullRequestFilter) -> Result<Vec<PullRequest>>;

    /// Transition OPEN to MERGED stamping `merged_at`. An already merged PR is
    /// returned unchanged. `None` when the PR is missing or CLOSED.
    async fn merge_pull_request(&self, id: i64, merged_at: DateTime<Utc>) -> Result<Option<PullRequest>>;

    /// Transition OPEN to CLOSED. `None` when the PR is missing or not OPEN.
    async fn close_pull_request(&self, id: i64) -> Result<Option<PullRequest>>;

    /// Insert a reviewer row while the persisted PR is OPEN.
    /// Returns false when the PR is missing or no longer OPEN.
    async fn add_reviewer(&self, pr_id: i64, reviewer_id: i64) -> Result<bool>;

    /// Remove `old_reviewer_id` and insert `new_reviewer_id` atomically.
    /// Leaves the PR untouched unless the outcome is `Replaced`.
    async fn replace_reviewer(
        &self,
        pr_id: i64,
        old_reviewer_id: i64,
        new_reviewer_id: i64,
    ) -> Result<ReplaceOutcome>;

    /// OPEN pull requests where the user is a reviewer
    async fn open_pull_requests_for_reviewer(&self, reviewer_id: i64) -> Result<Vec<PullRequest>>;

    // Reporting

    /// PR counts by status plus the top `top_n` users and teams
    async fn statistics(&self, top_n: u32) -> Result<Statistics>;

    /// Cheap liveness check
    async fn ping(&self) -> Result<()>;
}

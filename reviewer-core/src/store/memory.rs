//! In-memory implementation of `EntityStore`.
//!
//! All state lives behind one `RwLock`, so every operation, including the
//! multi-row ones, is applied atomically. State is lost on restart.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{EntityStore, NewPullRequest, NewUser, PullRequestFilter, ReplaceOutcome, UserFilter};
use crate::models::{
    PrStatus, PullRequest, Statistics, Team, TeamStatistic, UpdateUserRequest, User, UserStatistic,
};
use crate::{Error, Result};

#[derive(Debug, Clone)]
struct PrRow {
    id: i64,
    title: String,
    author_id: i64,
    status: PrStatus,
    created_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    teams: BTreeMap<i64, Team>,
    users: BTreeMap<i64, User>,
    prs: BTreeMap<i64, PrRow>,
    /// (pr_id, reviewer_id)
    reviewers: BTreeSet<(i64, i64)>,
    next_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn reviewers_of(&self, pr_id: i64) -> Vec<User> {
        self.reviewers
            .range((pr_id, i64::MIN)..=(pr_id, i64::MAX))
            .filter_map(|(_, uid)| self.users.get(uid).cloned())
            .collect()
    }

    fn materialize(&self, row: &PrRow) -> PullRequest {
        PullRequest {
            id: row.id,
            title: row.title.clone(),
            author_id: row.author_id,
            author: None,
            team: None,
            status: row.status,
            reviewers: self.reviewers_of(row.id),
            created_at: row.created_at,
            merged_at: row.merged_at,
            updated_at: row.updated_at,
        }
    }
}

/// In-memory entity store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn create_team(&self, name: &str) -> Result<Team> {
        let mut state = self.state.write().await;
        if state.teams.values().any(|t| t.name == name) {
            return Err(Error::TeamAlreadyExists(name.to_string()));
        }

        let now = Utc::now();
        let team = Team {
            id: state.next_id(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.teams.insert(team.id, team.clone());
        Ok(team)
    }

    async fn get_team(&self, id: i64) -> Result<Option<Team>> {
        Ok(self.state.read().await.teams.get(&id).cloned())
    }

    async fn get_team_by_name(&self, name: &str) -> Result<Option<Team>> {
        let state = self.state.read().await;
        Ok(state.teams.values().find(|t| t.name == name).cloned())
    }

    async fn list_teams(&self) -> Result<Vec<Team>> {
        let state = self.state.read().await;
        Ok(state.teams.values().rev().cloned().collect())
    }

    async fn delete_team(&self, id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.teams.remove(&id).is_none() {
            return Ok(false);
        }

        let now = Utc::now();
        for user in state.users.values_mut().filter(|u| u.team_id == Some(id)) {
            user.team_id = None;
            user.updated_at = now;
        }
        Ok(true)
    }

    async fn add_user_to_team(&self, team_id: i64, user_id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.users.get_mut(&user_id) {
            Some(user) if user.team_id != Some(team_id) => {
                user.team_id = Some(team_id);
                user.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn remove_user_from_team(&self, team_id: i64, user_id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.users.get_mut(&user_id) {
            Some(user) if user.team_id == Some(team_id) => {
                user.team_id = None;
                user.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn create_user(&self, new: NewUser) -> Result<User> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.username == new.username) {
            return Err(Error::UserAlreadyExists(new.username));
        }

        let now = Utc::now();
        let user = User {
            id: state.next_id(),
            username: new.username,
            name: new.name,
            is_active: true,
            team_id: new.team_id,
            teams: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn list_users(&self, filter: UserFilter) -> Result<Vec<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .rev()
            .filter(|u| filter.team_id.is_none_or(|t| u.team_id == Some(t)))
            .filter(|u| filter.is_active.is_none_or(|a| u.is_active == a))
            .cloned()
            .collect())
    }

    async fn update_user(&self, id: i64, update: &UpdateUserRequest) -> Result<Option<User>> {
        let mut state = self.state.write().await;
        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };

        if update.is_empty() {
            return Ok(Some(user.clone()));
        }
        if let Some(name) = &update.name {
            user.name = name.clone();
        }
        if let Some(active) = update.is_active {
            user.is_active = active;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn active_team_members(&self, team_id: i64, exclude_user_id: i64) -> Result<Vec<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .filter(|u| u.team_id == Some(team_id) && u.is_active && u.id != exclude_user_id)
            .cloned()
            .collect())
    }

    async fn deactivate_users(&self, team_id: i64, user_ids: &[i64]) -> Result<u64> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let mut flipped = 0;
        for user in state.users.values_mut() {
            if user.team_id == Some(team_id) && user.is_active && user_ids.contains(&user.id) {
                user.is_active = false;
                user.updated_at = now;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn create_pull_request(&self, new: NewPullRequest) -> Result<PullRequest> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&new.author_id) {
            return Err(Error::UserNotFound(new.author_id));
        }
        if let Some(missing) = new.reviewer_ids.iter().find(|id| !state.users.contains_key(id)) {
            return Err(Error::UserNotFound(*missing));
        }

        let now = Utc::now();
        let row = PrRow {
            id: state.next_id(),
            title: new.title,
            author_id: new.author_id,
            status: PrStatus::Open,
            created_at: now,
            merged_at: None,
            updated_at: now,
        };
        for reviewer_id in new.reviewer_ids {
            state.reviewers.insert((row.id, reviewer_id));
        }
        let pr = state.materialize(&row);
        state.prs.insert(row.id, row);
        Ok(pr)
    }

    async fn get_pull_request(&self, id: i64) -> Result<Option<PullRequest>> {
        let state = self.state.read().await;
        Ok(state.prs.get(&id).map(|row| state.materialize(row)))
    }

    async fn list_pull_requests(&self, filter: PullRequestFilter) -> Result<Vec<PullRequest>> {
        let state = self.state.read().await;
        Ok(state
            .prs
            .values()
            .rev()
            .filter(|p| filter.author_id.is_none_or(|a| p.author_id == a))
            .filter(|p| filter.status.is_none_or(|s| p.status == s))
            .filter(|p| {
                filter
                    .reviewer_id
                    .is_none_or(|r| state.reviewers.contains(&(p.id, r)))
            })
            .map(|row| state.materialize(row))
            .collect())
    }

    async fn merge_pull_request(&self, id: i64, merged_at: DateTime<Utc>) -> Result<Option<PullRequest>> {
        let mut state = self.state.write().await;
        let Some(row) = state.prs.get_mut(&id) else {
            return Ok(None);
        };

        match row.status {
            PrStatus::Open => {
                row.status = PrStatus::Merged;
                row.merged_at = Some(merged_at);
                row.updated_at = merged_at;
            }
            PrStatus::Merged => {}
            PrStatus::Closed => return Ok(None),
        }

        let row = row.clone();
        Ok(Some(state.materialize(&row)))
    }

    async fn close_pull_request(&self, id: i64) -> Result<Option<PullRequest>> {
        let mut state = self.state.write().await;
        let Some(row) = state.prs.get_mut(&id) else {
            return Ok(None);
        };
        if row.status != PrStatus::Open {
            return Ok(None);
        }

        row.status = PrStatus::Closed;
        row.updated_at = Utc::now();
        let row = row.clone();
        Ok(Some(state.materialize(&row)))
    }

    async fn add_reviewer(&self, pr_id: i64, reviewer_id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        let open = state
            .prs
            .get(&pr_id)
            .is_some_and(|p| p.status == PrStatus::Open);
        if !open {
            return Ok(false);
        }
        if !state.reviewers.insert((pr_id, reviewer_id)) {
            return Err(Error::AlreadyAssigned { pr_id, reviewer_id });
        }
        Ok(true)
    }

    async fn replace_reviewer(
        &self,
        pr_id: i64,
        old_reviewer_id: i64,
        new_reviewer_id: i64,
    ) -> Result<ReplaceOutcome> {
        let mut state = self.state.write().await;
        match state.prs.get(&pr_id).map(|p| p.status) {
            None => return Ok(ReplaceOutcome::PullRequestMissing),
            Some(PrStatus::Merged) => return Ok(ReplaceOutcome::Merged),
            Some(_) => {}
        }
        if state.reviewers.contains(&(pr_id, new_reviewer_id)) {
            return Ok(ReplaceOutcome::ReplacementAssigned);
        }
        if !state.reviewers.remove(&(pr_id, old_reviewer_id)) {
            return Ok(ReplaceOutcome::ReviewerNotAssigned);
        }

        state.reviewers.insert((pr_id, new_reviewer_id));
        Ok(ReplaceOutcome::Replaced)
    }

    async fn open_pull_requests_for_reviewer(&self, reviewer_id: i64) -> Result<Vec<PullRequest>> {
        self.list_pull_requests(PullRequestFilter {
            reviewer_id: Some(reviewer_id),
            status: Some(PrStatus::Open),
            author_id: None,
        })
        .await
    }

    async fn statistics(&self, top_n: u32) -> Result<Statistics> {
        let state = self.state.read().await;
        let count = |status: PrStatus| state.prs.values().filter(|p| p.status == status).count() as u64;

        let mut assignments: HashMap<i64, u64> = HashMap::new();
        for (_, reviewer_id) in &state.reviewers {
            *assignments.entry(*reviewer_id).or_default() += 1;
        }
        let mut user_stats: Vec<UserStatistic> = assignments
            .into_iter()
            .filter_map(|(id, n)| {
                state.users.get(&id).map(|u| UserStatistic {
                    user_id: id,
                    user_name: u.name.clone(),
                    assignment_count: n,
                })
            })
            .collect();
        user_stats.sort_by(|a, b| {
            b.assignment_count
                .cmp(&a.assignment_count)
                .then_with(|| a.user_name.cmp(&b.user_name))
        });
        user_stats.truncate(top_n as usize);

        let mut team_stats: Vec<TeamStatistic> = state
            .teams
            .values()
            .map(|t| TeamStatistic {
                team_id: t.id,
                team_name: t.name.clone(),
                pr_count: state
                    .prs
                    .values()
                    .filter(|p| {
                        state
                            .users
                            .get(&p.author_id)
                            .is_some_and(|u| u.team_id == Some(t.id))
                    })
                    .count() as u64,
            })
            .filter(|s| s.pr_count > 0)
            .collect();
        team_stats.sort_by(|a, b| {
            b.pr_count
                .cmp(&a.pr_count)
                .then_with(|| a.team_name.cmp(&b.team_name))
        });
        team_stats.truncate(top_n as usize);

        Ok(Statistics {
            total_prs: state.prs.len() as u64,
            open_prs: count(PrStatus::Open),
            merged_prs: count(PrStatus::Merged),
            closed_prs: count(PrStatus::Closed),
            user_stats,
            team_stats,
        })
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

//! Best-effort relational enrichment
//!
//! Lookups that fail leave the field unset; they never fail the operation.

use std::collections::HashMap;

use super::ReviewService;
use crate::models::{PullRequest, Team, User};

#[derive(Default)]
struct TeamCache {
    teams: HashMap<i64, Option<Team>>,
}

impl ReviewService {
    async fn cached_team(&self, cache: &mut TeamCache, team_id: i64) -> Option<Team> {
        if let Some(hit) = cache.teams.get(&team_id) {
            return hit.clone();
        }

        let team = match self.store.get_team(team_id).await {
            Ok(team) => team,
            Err(e) => {
                tracing::debug!(team_id, error = %e, "Team lookup failed during enrichment");
                None
            }
        };
        cache.teams.insert(team_id, team.clone());
        team
    }

    async fn attach_team(&self, cache: &mut TeamCache, mut user: User) -> User {
        if let Some(team_id) = user.team_id {
            if let Some(team) = self.cached_team(cache, team_id).await {
                user.teams = vec![team];
            }
        }
        user
    }

    /// Attach the user's team
    pub(crate) async fn enrich_user(&self, user: User) -> User {
        self.attach_team(&mut TeamCache::default(), user).await
    }

    pub(crate) async fn enrich_users(&self, users: Vec<User>) -> Vec<User> {
        let mut cache = TeamCache::default();
        let mut out = Vec::with_capacity(users.len());
        for user in users {
            out.push(self.attach_team(&mut cache, user).await);
        }
        out
    }

    /// Attach the author (with team), the PR's team and each reviewer's team
    pub(crate) async fn enrich_pull_request(&self, pr: PullRequest) -> PullRequest {
        self.enrich_with_cache(&mut TeamCache::default(), pr).await
    }

    pub(crate) async fn enrich_pull_requests(&self, prs: Vec<PullRequest>) -> Vec<PullRequest> {
        let mut cache = TeamCache::default();
        let mut out = Vec::with_capacity(prs.len());
        for pr in prs {
            out.push(self.enrich_with_cache(&mut cache, pr).await);
        }
        out
    }

    async fn enrich_with_cache(&self, cache: &mut TeamCache, mut pr: PullRequest) -> PullRequest {
        match self.store.get_user(pr.author_id).await {
            Ok(Some(author)) => {
                let author = self.attach_team(cache, author).await;
                pr.team = author.teams.first().cloned();
                pr.author = Some(author);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(pr_id = pr.id, error = %e, "Author lookup failed during enrichment");
            }
        }

        let reviewers = std::mem::take(&mut pr.reviewers);
        for reviewer in reviewers {
            let reviewer = self.attach_team(cache, reviewer).await;
            pr.reviewers.push(reviewer);
        }
        pr
    }
}

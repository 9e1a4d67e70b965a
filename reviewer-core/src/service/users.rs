//! User CRUD and bulk deactivation

use std::collections::HashSet;

use super::{validate_id, validate_text, ReviewService, MAX_NAME_LEN};
use crate::events::WorkflowEvent;
use crate::models::{BulkDeactivateRequest, BulkDeactivateResponse, CreateUserRequest, UpdateUserRequest, User};
use crate::store::{NewUser, UserFilter};
use crate::{Error, Result};

impl ReviewService {
    /// Create an active user, optionally inside a team
    pub async fn create_user(&self, req: CreateUserRequest) -> Result<User> {
        validate_text("username", &req.username, MAX_NAME_LEN)?;
        validate_text("name", &req.name, MAX_NAME_LEN)?;

        if let Some(team_id) = req.team_id {
            validate_id("teamId", team_id)?;
            if self.store.get_team(team_id).await?.is_none() {
                return Err(Error::TeamNotFound(team_id));
            }
        }

        let user = self
            .store
            .create_user(NewUser {
                username: req.username,
                name: req.name,
                team_id: req.team_id,
            })
            .await?;
        tracing::info!(user_id = user.id, username = %user.username, "User created");

        Ok(self.enrich_user(user).await)
    }

    pub async fn get_user(&self, user_id: i64) -> Result<User> {
        validate_id("userId", user_id)?;
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(Error::UserNotFound(user_id))?;
        Ok(self.enrich_user(user).await)
    }

    /// Users matching the filter, newest first
    pub async fn list_users(&self, filter: UserFilter) -> Result<Vec<User>> {
        let users = self.store.list_users(filter).await?;
        Ok(self.enrich_users(users).await)
    }

    /// Partial update; absent fields are untouched
    pub async fn update_user(&self, user_id: i64, req: UpdateUserRequest) -> Result<User> {
        validate_id("userId", user_id)?;
        if let Some(name) = &req.name {
            validate_text("name", name, MAX_NAME_LEN)?;
        }

        let user = self
            .store
            .update_user(user_id, &req)
            .await?
            .ok_or(Error::UserNotFound(user_id))?;
        tracing::info!(user_id, is_active = user.is_active, "User updated");

        Ok(self.enrich_user(user).await)
    }

    /// Deactivate users of a team and move their open reviews to teammates
    ///
    /// Best effort: a PR whose reviewer cannot be replaced is skipped and
    /// reported through the event sink, the rest carry on.
    pub async fn bulk_deactivate_users(
        &self,
        team_id: i64,
        req: BulkDeactivateRequest,
    ) -> Result<BulkDeactivateResponse> {
        validate_id("teamId", team_id)?;
        if req.user_ids.is_empty() {
            return Err(Error::Validation("userIds must not be empty".to_string()));
        }
        for id in &req.user_ids {
            validate_id("userIds", *id)?;
        }
        if self.store.get_team(team_id).await?.is_none() {
            return Err(Error::TeamNotFound(team_id));
        }

        let deactivated_count = self.store.deactivate_users(team_id, &req.user_ids).await?;

        let mut seen = HashSet::new();
        let mut reassigned_pr_count = 0;
        for user_id in req.user_ids.into_iter().filter(|id| seen.insert(*id)) {
            match self.store.get_user(user_id).await {
                Ok(Some(user)) if user.team_id == Some(team_id) && !user.is_active => {}
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(user_id, error = %e, "Skipping reassignment, user lookup failed");
                    continue;
                }
            }

            let open_prs = match self.store.open_pull_requests_for_reviewer(user_id).await {
                Ok(prs) => prs,
                Err(e) => {
                    tracing::warn!(user_id, error = %e, "Skipping reassignment, open PR lookup failed");
                    continue;
                }
            };

            for pr in open_prs {
                match self.swap_reviewer(&pr, user_id).await {
                    Ok(_) => reassigned_pr_count += 1,
                    Err(e) => self.emit(WorkflowEvent::ReassignmentSkipped {
                        pr_id: pr.id,
                        reviewer_id: user_id,
                        reason: e.to_string(),
                    }),
                }
            }
        }

        self.emit(WorkflowEvent::UsersDeactivated {
            team_id,
            deactivated: deactivated_count,
            reassigned: reassigned_pr_count,
        });

        Ok(BulkDeactivateResponse {
            deactivated_count,
            reassigned_pr_count,
        })
    }
}

//! Team CRUD and membership

use super::{validate_id, validate_text, ReviewService, MAX_NAME_LEN};
use crate::models::{CreateTeamRequest, Team};
use crate::{Error, Result};

impl ReviewService {
    /// Create a team with a unique name
    pub async fn create_team(&self, req: CreateTeamRequest) -> Result<Team> {
        validate_text("name", &req.name, MAX_NAME_LEN)?;

        // The store's unique constraint still catches a concurrent duplicate
        if self.store.get_team_by_name(&req.name).await?.is_some() {
            return Err(Error::TeamAlreadyExists(req.name));
        }

        let team = self.store.create_team(&req.name).await?;
        tracing::info!(team_id = team.id, name = %team.name, "Team created");
        Ok(team)
    }

    pub async fn get_team(&self, team_id: i64) -> Result<Team> {
        validate_id("teamId", team_id)?;
        self.store
            .get_team(team_id)
            .await?
            .ok_or(Error::TeamNotFound(team_id))
    }

    /// All teams, newest first
    pub async fn list_teams(&self) -> Result<Vec<Team>> {
        self.store.list_teams().await
    }

    /// Detach every member, then delete the team
    pub async fn delete_team(&self, team_id: i64) -> Result<()> {
        validate_id("teamId", team_id)?;
        if !self.store.delete_team(team_id).await? {
            return Err(Error::TeamNotFound(team_id));
        }

        tracing::info!(team_id, "Team deleted");
        Ok(())
    }

    /// Move a user into a team
    pub async fn add_user_to_team(&self, team_id: i64, user_id: i64) -> Result<()> {
        self.check_membership_refs(team_id, user_id).await?;
        if !self.store.add_user_to_team(team_id, user_id).await? {
            return Err(Error::AlreadyInTeam { team_id, user_id });
        }

        tracing::info!(team_id, user_id, "User added to team");
        Ok(())
    }

    /// Clear a user's team
    pub async fn remove_user_from_team(&self, team_id: i64, user_id: i64) -> Result<()> {
        self.check_membership_refs(team_id, user_id).await?;
        if !self.store.remove_user_from_team(team_id, user_id).await? {
            return Err(Error::NotInTeam { team_id, user_id });
        }

        tracing::info!(team_id, user_id, "User removed from team");
        Ok(())
    }

    async fn check_membership_refs(&self, team_id: i64, user_id: i64) -> Result<()> {
        validate_id("teamId", team_id)?;
        validate_id("userId", user_id)?;

        if self.store.get_team(team_id).await?.is_none() {
            return Err(Error::TeamNotFound(team_id));
        }
        if self.store.get_user(user_id).await?.is_none() {
            return Err(Error::UserNotFound(user_id));
        }
        Ok(())
    }
}

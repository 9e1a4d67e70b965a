//! `EntityStore` backed by SQLite

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reviewer_core::models::{PrStatus, PullRequest, Statistics, Team, UpdateUserRequest, User};
use reviewer_core::store::{EntityStore, NewPullRequest, NewUser, PullRequestFilter, ReplaceOutcome, UserFilter};
use reviewer_core::Result;

use crate::Database;

/// SQLite entity store
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl EntityStore for SqliteStore {
    async fn create_team(&self, name: &str) -> Result<Team> {
        Ok(self.db.teams().create(name).await?)
    }

    async fn get_team(&self, id: i64) -> Result<Option<Team>> {
        Ok(self.db.teams().get_by_id(id).await?)
    }

    async fn get_team_by_name(&self, name: &str) -> Result<Option<Team>> {
        Ok(self.db.teams().get_by_name(name).await?)
    }

    async fn list_teams(&self) -> Result<Vec<Team>> {
        Ok(self.db.teams().list().await?)
    }

    async fn delete_team(&self, id: i64) -> Result<bool> {
        Ok(self.db.teams().delete(id).await?)
    }

    async fn add_user_to_team(&self, team_id: i64, user_id: i64) -> Result<bool> {
        Ok(self.db.teams().add_member(team_id, user_id).await?)
    }

    async fn remove_user_from_team(&self, team_id: i64, user_id: i64) -> Result<bool> {
        Ok(self.db.teams().remove_member(team_id, user_id).await?)
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        Ok(self.db.users().create(user).await?)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.db.users().get_by_id(id).await?)
    }

    async fn list_users(&self, filter: UserFilter) -> Result<Vec<User>> {
        Ok(self.db.users().list(filter).await?)
    }

    async fn update_user(&self, id: i64, update: &UpdateUserRequest) -> Result<Option<User>> {
        Ok(self.db.users().update(id, update).await?)
    }

    async fn active_team_members(&self, team_id: i64, exclude_user_id: i64) -> Result<Vec<User>> {
        Ok(self.db.users().active_team_members(team_id, exclude_user_id).await?)
    }

    async fn deactivate_users(&self, team_id: i64, user_ids: &[i64]) -> Result<u64> {
        Ok(self.db.users().deactivate(team_id, user_ids).await?)
    }

    async fn create_pull_request(&self, pr: NewPullRequest) -> Result<PullRequest> {
        Ok(self.db.pull_requests().create(pr).await?)
    }

    async fn get_pull_request(&self, id: i64) -> Result<Option<PullRequest>> {
        Ok(self.db.pull_requests().get_by_id(id).await?)
    }

    async fn list_pull_requests(&self, filter: PullRequestFilter) -> Result<Vec<PullRequest>> {
        Ok(self.db.pull_requests().list(filter).await?)
    }

    async fn merge_pull_request(&self, id: i64, merged_at: DateTime<Utc>) -> Result<Option<PullRequest>> {
        Ok(self.db.pull_requests().merge(id, merged_at).await?)
    }

    async fn close_pull_request(&self, id: i64) -> Result<Option<PullRequest>> {
        Ok(self.db.pull_requests().close(id).await?)
    }

    async fn add_reviewer(&self, pr_id: i64, reviewer_id: i64) -> Result<bool> {
        Ok(self.db.pull_requests().add_reviewer(pr_id, reviewer_id).await?)
    }

    async fn replace_reviewer(
        &self,
        pr_id: i64,
        old_reviewer_id: i64,
        new_reviewer_id: i64,
    ) -> Result<ReplaceOutcome> {
        Ok(self
            .db
            .pull_requests()
            .replace_reviewer(pr_id, old_reviewer_id, new_reviewer_id)
            .await?)
    }

    async fn open_pull_requests_for_reviewer(&self, reviewer_id: i64) -> Result<Vec<PullRequest>> {
        let filter = PullRequestFilter {
            reviewer_id: Some(reviewer_id),
            author_id: None,
            status: Some(PrStatus::Open),
        };
        Ok(self.db.pull_requests().list(filter).await?)
    }

    async fn statistics(&self, top_n: u32) -> Result<Statistics> {
        Ok(self.db.statistics().collect(top_n).await?)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(self.db.pool())
            .await
            .map_err(crate::DbError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reviewer_core::models::{
        BulkDeactivateRequest, CreatePullRequestRequest, CreateTeamRequest, CreateUserRequest, ReassignReviewerRequest,
    };
    use reviewer_core::{ErrorKind, ReviewService, TracingSink};
    use tempfile::TempDir;

    use super::*;

    async fn setup() -> (ReviewService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(temp_dir.path().join("reviews.db")).await.unwrap();
        let store = Arc::new(SqliteStore::new(db));
        (ReviewService::new(store, Arc::new(TracingSink)), temp_dir)
    }

    async fn user(svc: &ReviewService, username: &str, team_id: Option<i64>) -> User {
        svc.create_user(CreateUserRequest {
            username: username.into(),
            name: username.to_uppercase(),
            team_id,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_qa_scenario_on_sqlite() {
        let (svc, _temp) = setup().await;
        let qa = svc.create_team(CreateTeamRequest { name: "QA".into() }).await.unwrap();
        let a = user(&svc, "a", Some(qa.id)).await;
        let b = user(&svc, "b", Some(qa.id)).await;

        let pr = svc
            .create_pull_request(CreatePullRequestRequest {
                title: "Fix bug".into(),
                author_id: a.id,
            })
            .await
            .unwrap();
        assert_eq!(pr.reviewer_ids(), vec![b.id]);
        assert_eq!(pr.status, PrStatus::Open);
        assert_eq!(pr.team.as_ref().map(|t| t.id), Some(qa.id));

        let merged = svc.merge_pull_request(pr.id).await.unwrap();
        assert_eq!(merged.status, PrStatus::Merged);
        let again = svc.merge_pull_request(pr.id).await.unwrap();
        assert_eq!(merged.merged_at, again.merged_at);

        let err = svc.close_pull_request(pr.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_duplicate_constraints_surface_as_domain_errors() {
        let (svc, _temp) = setup().await;
        let store = svc.store().clone();

        store.create_team("QA").await.unwrap();
        let err = store.create_team("QA").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        user(&svc, "alice", None).await;
        let err = svc
            .create_user(CreateUserRequest {
                username: "alice".into(),
                name: "Again".into(),
                team_id: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn test_bulk_deactivate_on_sqlite() {
        let (svc, _temp) = setup().await;
        let qa = svc.create_team(CreateTeamRequest { name: "QA".into() }).await.unwrap();
        let author = user(&svc, "author", Some(qa.id)).await;
        let r1 = user(&svc, "r1", Some(qa.id)).await;
        let r2 = user(&svc, "r2", Some(qa.id)).await;
        let r3 = user(&svc, "r3", Some(qa.id)).await;
        let spare = user(&svc, "spare", Some(qa.id)).await;

        for reviewer in [r1.id, r2.id] {
            svc.store()
                .create_pull_request(NewPullRequest {
                    title: format!("Reviewed by {}", reviewer),
                    author_id: author.id,
                    reviewer_ids: vec![reviewer],
                })
                .await
                .unwrap();
        }

        let resp = svc
            .bulk_deactivate_users(
                qa.id,
                BulkDeactivateRequest {
                    user_ids: vec![r1.id, r2.id, r3.id],
                },
            )
            .await
            .unwrap();
        assert_eq!(resp.deactivated_count, 3);
        assert_eq!(resp.reassigned_pr_count, 2);

        let open = svc
            .list_pull_requests(PullRequestFilter {
                reviewer_id: Some(spare.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(open.len(), 2);
    }

    #[tokio::test]
    async fn test_reassign_on_closed_pr_on_sqlite() {
        let (svc, _temp) = setup().await;
        let qa = svc.create_team(CreateTeamRequest { name: "QA".into() }).await.unwrap();
        let a = user(&svc, "a", Some(qa.id)).await;
        let b = user(&svc, "b", Some(qa.id)).await;
        let pr = svc
            .create_pull_request(CreatePullRequestRequest {
                title: "Closed".into(),
                author_id: a.id,
            })
            .await
            .unwrap();
        let c = user(&svc, "c", Some(qa.id)).await;
        svc.close_pull_request(pr.id).await.unwrap();

        let updated = svc
            .reassign_reviewer(pr.id, ReassignReviewerRequest { old_reviewer_id: b.id })
            .await
            .unwrap();
        assert_eq!(updated.status, PrStatus::Closed);
        assert_eq!(updated.reviewer_ids(), vec![c.id]);

        let merged = svc
            .create_pull_request(CreatePullRequestRequest {
                title: "Merged".into(),
                author_id: a.id,
            })
            .await
            .unwrap();
        svc.merge_pull_request(merged.id).await.unwrap();
        let err = svc
            .reassign_reviewer(
                merged.id,
                ReassignReviewerRequest {
                    old_reviewer_id: merged.reviewer_ids()[0],
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_ping() {
        let (svc, _temp) = setup().await;
        svc.store().ping().await.unwrap();
    }
}

//! Pull request repository
//!
//! Multi-row writes (create with reviewers, reviewer swap) run inside one
//! transaction each. A dropped future rolls the transaction back.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use reviewer_core::models::{PrStatus, PullRequest, User};
use reviewer_core::store::{NewPullRequest, PullRequestFilter, ReplaceOutcome};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::users::UserRow;
use crate::error::{is_foreign_key_violation, is_unique_violation, DbError, Result};

#[derive(Debug, sqlx::FromRow)]
struct PullRequestRow {
    id: i64,
    title: String,
    author_id: i64,
    status: String,
    created_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

fn reviewer_insert_error(err: sqlx::Error, pr_id: i64, reviewer_id: i64) -> DbError {
    if is_unique_violation(&err) {
        DbError::ReviewerAlreadyAssigned { pr_id, reviewer_id }
    } else if is_foreign_key_violation(&err) {
        DbError::UserNotFound(reviewer_id)
    } else {
        err.into()
    }
}

/// Repository for pull requests and their reviewer rows
pub struct PullRequestRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PullRequestRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an OPEN pull request and its reviewers atomically
    pub async fn create(&self, pr: NewPullRequest) -> Result<PullRequest> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO pull_requests (title, author_id, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&pr.title)
        .bind(pr.author_id)
        .bind(PrStatus::Open.as_db_str())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                DbError::UserNotFound(pr.author_id)
            } else {
                e.into()
            }
        })?;
        let pr_id = result.last_insert_rowid();

        for reviewer_id in &pr.reviewer_ids {
            sqlx::query("INSERT INTO pr_reviewers (pr_id, reviewer_id, assigned_at) VALUES (?, ?, ?)")
                .bind(pr_id)
                .bind(*reviewer_id)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(|e| reviewer_insert_error(e, pr_id, *reviewer_id))?;
        }

        tx.commit().await?;
        tracing::debug!(pr_id, reviewers = pr.reviewer_ids.len(), "Pull request inserted");

        self.get_by_id(pr_id)
            .await?
            .ok_or_else(|| DbError::InvalidData(format!("pull request {} missing after insert", pr_id)))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<PullRequest>> {
        let row = sqlx::query_as::<_, PullRequestRow>("SELECT * FROM pull_requests WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// Pull requests matching the filter, newest first
    pub async fn list(&self, filter: PullRequestFilter) -> Result<Vec<PullRequest>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT p.* FROM pull_requests p WHERE 1 = 1");
        if let Some(author_id) = filter.author_id {
            query.push(" AND p.author_id = ").push_bind(author_id);
        }
        if let Some(status) = filter.status {
            query.push(" AND p.status = ").push_bind(status.as_db_str());
        }
        if let Some(reviewer_id) = filter.reviewer_id {
            query
                .push(" AND EXISTS (SELECT 1 FROM pr_reviewers r WHERE r.pr_id = p.id AND r.reviewer_id = ")
                .push_bind(reviewer_id)
                .push(")");
        }
        query.push(" ORDER BY p.id DESC");

        let rows = query.build_query_as::<PullRequestRow>().fetch_all(self.pool).await?;
        let mut prs = Vec::with_capacity(rows.len());
        for row in rows {
            prs.push(self.hydrate(row).await?);
        }
        Ok(prs)
    }

    /// OPEN to MERGED. An already merged PR is returned untouched.
    pub async fn merge(&self, id: i64, merged_at: DateTime<Utc>) -> Result<Option<PullRequest>> {
        let result = sqlx::query(
            r#"
            UPDATE pull_requests SET status = ?, merged_at = ?, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(PrStatus::Merged.as_db_str())
        .bind(merged_at)
        .bind(merged_at)
        .bind(id)
        .bind(PrStatus::Open.as_db_str())
        .execute(self.pool)
        .await?;

        let pr = self.get_by_id(id).await?;
        if result.rows_affected() == 1 {
            return Ok(pr);
        }
        Ok(pr.filter(|p| p.status == PrStatus::Merged))
    }

    /// OPEN to CLOSED; `None` for any other state
    pub async fn close(&self, id: i64) -> Result<Option<PullRequest>> {
        let result = sqlx::query("UPDATE pull_requests SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
            .bind(PrStatus::Closed.as_db_str())
            .bind(Utc::now())
            .bind(id)
            .bind(PrStatus::Open.as_db_str())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Insert a reviewer row if the persisted PR is still OPEN
    pub async fn add_reviewer(&self, pr_id: i64, reviewer_id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO pr_reviewers (pr_id, reviewer_id, assigned_at)
            SELECT ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM pull_requests WHERE id = ? AND status = ?)
            "#,
        )
        .bind(pr_id)
        .bind(reviewer_id)
        .bind(Utc::now())
        .bind(pr_id)
        .bind(PrStatus::Open.as_db_str())
        .execute(self.pool)
        .await
        .map_err(|e| reviewer_insert_error(e, pr_id, reviewer_id))?;

        Ok(result.rows_affected() == 1)
    }

    /// Swap one reviewer for another in a single transaction
    pub async fn replace_reviewer(&self, pr_id: i64, old_reviewer_id: i64, new_reviewer_id: i64) -> Result<ReplaceOutcome> {
        let mut tx = self.pool.begin().await?;

        // Writing first takes the write lock before anything is read
        let removed = sqlx::query(
            r#"
            DELETE FROM pr_reviewers
            WHERE pr_id = ? AND reviewer_id = ?
              AND EXISTS (SELECT 1 FROM pull_requests WHERE id = ? AND status != ?)
            "#,
        )
        .bind(pr_id)
        .bind(old_reviewer_id)
        .bind(pr_id)
        .bind(PrStatus::Merged.as_db_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if removed == 0 {
            let status: Option<String> = sqlx::query_scalar("SELECT status FROM pull_requests WHERE id = ?")
                .bind(pr_id)
                .fetch_optional(&mut *tx)
                .await?;

            return Ok(match status.as_deref() {
                None => ReplaceOutcome::PullRequestMissing,
                Some(s) if s == PrStatus::Merged.as_db_str() => ReplaceOutcome::Merged,
                Some(_) => ReplaceOutcome::ReviewerNotAssigned,
            });
        }

        let inserted = sqlx::query("INSERT INTO pr_reviewers (pr_id, reviewer_id, assigned_at) VALUES (?, ?, ?)")
            .bind(pr_id)
            .bind(new_reviewer_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await;

        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await?;
                return Ok(ReplaceOutcome::ReplacementAssigned);
            }
            Err(e) => return Err(reviewer_insert_error(e, pr_id, new_reviewer_id)),
        }

        tx.commit().await?;
        Ok(ReplaceOutcome::Replaced)
    }

    async fn reviewers(&self, pr_id: i64) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT u.* FROM users u
            JOIN pr_reviewers r ON r.reviewer_id = u.id
            WHERE r.pr_id = ?
            ORDER BY u.id
            "#,
        )
        .bind(pr_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn hydrate(&self, row: PullRequestRow) -> Result<PullRequest> {
        let status = PrStatus::from_str(&row.status)
            .map_err(|_| DbError::InvalidData(format!("unknown pull request status '{}'", row.status)))?;

        Ok(PullRequest {
            id: row.id,
            title: row.title,
            author_id: row.author_id,
            author: None,
            team: None,
            status,
            reviewers: self.reviewers(row.id).await?,
            created_at: row.created_at,
            merged_at: row.merged_at,
            updated_at: row.updated_at,
        })
    }
}

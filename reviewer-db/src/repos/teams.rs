//! Team repository, including membership updates on the users table

use chrono::{DateTime, Utc};
use reviewer_core::models::Team;
use sqlx::SqlitePool;

use crate::error::{is_foreign_key_violation, is_unique_violation, DbError, Result};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TeamRow {
    id: i64,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TeamRow> for Team {
    fn from(row: TeamRow) -> Self {
        Team {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for teams
pub struct TeamRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> TeamRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a team; the unique index on name rejects duplicates
    pub async fn create(&self, name: &str) -> Result<Team> {
        let now = Utc::now();

        let result = sqlx::query("INSERT INTO teams (name, created_at, updated_at) VALUES (?, ?, ?)")
            .bind(name)
            .bind(now)
            .bind(now)
            .execute(self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DbError::TeamNameTaken(name.to_string())
                } else {
                    e.into()
                }
            })?;

        Ok(Team {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Team>> {
        let row = sqlx::query_as::<_, TeamRow>("SELECT * FROM teams WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<Team>> {
        let row = sqlx::query_as::<_, TeamRow>("SELECT * FROM teams WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// All teams, newest first
    pub async fn list(&self) -> Result<Vec<Team>> {
        let rows = sqlx::query_as::<_, TeamRow>("SELECT * FROM teams ORDER BY id DESC")
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Detach members and delete the team in one transaction
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE users SET team_id = NULL, updated_at = ? WHERE team_id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM teams WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    /// Point a user at a team. False if the user is missing or already in it.
    pub async fn add_member(&self, team_id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users SET team_id = ?, updated_at = ?
            WHERE id = ? AND (team_id IS NULL OR team_id != ?)
            "#,
        )
        .bind(team_id)
        .bind(Utc::now())
        .bind(user_id)
        .bind(team_id)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                DbError::TeamNotFound(team_id)
            } else {
                e.into()
            }
        })?;

        Ok(result.rows_affected() == 1)
    }

    /// Clear a user's team. False if the user was not in it.
    pub async fn remove_member(&self, team_id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET team_id = NULL, updated_at = ? WHERE id = ? AND team_id = ?")
            .bind(Utc::now())
            .bind(user_id)
            .bind(team_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use reviewer_core::store::NewUser;

    use super::*;
    use crate::repos::test_support::setup_test_db;

    #[tokio::test]
    async fn test_create_and_get_team() {
        let (db, _temp) = setup_test_db().await;
        let repo = db.teams();

        let team = repo.create("QA").await.unwrap();
        assert_eq!(repo.get_by_id(team.id).await.unwrap(), Some(team.clone()));
        assert_eq!(repo.get_by_name("QA").await.unwrap().map(|t| t.id), Some(team.id));
        assert!(repo.get_by_name("Dev").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unique_name() {
        let (db, _temp) = setup_test_db().await;
        let repo = db.teams();

        repo.create("QA").await.unwrap();
        assert!(matches!(repo.create("QA").await, Err(DbError::TeamNameTaken(_))));
    }

    #[tokio::test]
    async fn test_delete_detaches_members() {
        let (db, _temp) = setup_test_db().await;
        let team = db.teams().create("QA").await.unwrap();
        let user = db
            .users()
            .create(NewUser {
                username: "alice".into(),
                name: "Alice".into(),
                team_id: Some(team.id),
            })
            .await
            .unwrap();

        assert!(db.teams().delete(team.id).await.unwrap());
        assert!(!db.teams().delete(team.id).await.unwrap());

        let user = db.users().get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(user.team_id, None);
    }

    #[tokio::test]
    async fn test_membership_updates() {
        let (db, _temp) = setup_test_db().await;
        let qa = db.teams().create("QA").await.unwrap();
        let user = db
            .users()
            .create(NewUser {
                username: "alice".into(),
                name: "Alice".into(),
                team_id: None,
            })
            .await
            .unwrap();

        let repo = db.teams();
        assert!(repo.add_member(qa.id, user.id).await.unwrap());
        assert!(!repo.add_member(qa.id, user.id).await.unwrap());
        assert!(repo.remove_member(qa.id, user.id).await.unwrap());
        assert!(!repo.remove_member(qa.id, user.id).await.unwrap());
        assert!(matches!(
            repo.add_member(999, user.id).await,
            Err(DbError::TeamNotFound(999))
        ));
    }
}

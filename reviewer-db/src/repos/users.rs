//! User repository

use chrono::{DateTime, Utc};
use reviewer_core::models::{UpdateUserRequest, User};
use reviewer_core::store::{NewUser, UserFilter};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::{is_foreign_key_violation, is_unique_violation, DbError, Result};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    id: i64,
    username: String,
    name: String,
    is_active: bool,
    team_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            name: row.name,
            is_active: row.is_active,
            team_id: row.team_id,
            teams: Vec::new(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for users
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an active user
    pub async fn create(&self, user: NewUser) -> Result<User> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, name, is_active, team_id, created_at, updated_at)
            VALUES (?, ?, 1, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.name)
        .bind(user.team_id)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DbError::UsernameTaken(user.username.clone())
            } else if is_foreign_key_violation(&e) {
                DbError::TeamNotFound(user.team_id.unwrap_or_default())
            } else {
                e.into()
            }
        })?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: user.username,
            name: user.name,
            is_active: true,
            team_id: user.team_id,
            teams: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Users matching the filter, newest first
    pub async fn list(&self, filter: UserFilter) -> Result<Vec<User>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM users WHERE 1 = 1");
        if let Some(team_id) = filter.team_id {
            query.push(" AND team_id = ").push_bind(team_id);
        }
        if let Some(active) = filter.is_active {
            query.push(" AND is_active = ").push_bind(active);
        }
        query.push(" ORDER BY id DESC");

        let rows = query.build_query_as::<UserRow>().fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Apply a partial update. `None` if the user does not exist.
    pub async fn update(&self, id: i64, update: &UpdateUserRequest) -> Result<Option<User>> {
        if update.is_empty() {
            return self.get_by_id(id).await;
        }

        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = COALESCE(?, name),
                is_active = COALESCE(?, is_active),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(update.name.as_deref())
        .bind(update.is_active)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Active members of a team, excluding one user
    pub async fn active_team_members(&self, team_id: i64, exclude_user_id: i64) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users WHERE team_id = ? AND is_active = 1 AND id != ? ORDER BY id",
        )
        .bind(team_id)
        .bind(exclude_user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Deactivate the listed active members of a team; returns rows flipped
    pub async fn deactivate(&self, team_id: i64, user_ids: &[i64]) -> Result<u64> {
        if user_ids.is_empty() {
            return Ok(0);
        }

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE users SET is_active = 0, updated_at = ");
        query.push_bind(Utc::now());
        query.push(" WHERE is_active = 1 AND team_id = ").push_bind(team_id);
        query.push(" AND id IN (");
        let mut ids = query.separated(", ");
        for id in user_ids {
            ids.push_bind(*id);
        }
        ids.push_unseparated(")");

        let result = query.build().execute(self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::test_support::setup_test_db;

    fn new_user(username: &str, team_id: Option<i64>) -> NewUser {
        NewUser {
            username: username.into(),
            name: username.to_uppercase(),
            team_id,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let (db, _temp) = setup_test_db().await;
        let repo = db.users();

        let user = repo.create(new_user("alice", None)).await.unwrap();
        assert!(user.is_active);

        let fetched = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(fetched, user);
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_user_constraints() {
        let (db, _temp) = setup_test_db().await;
        let repo = db.users();

        repo.create(new_user("alice", None)).await.unwrap();
        assert!(matches!(
            repo.create(new_user("alice", None)).await,
            Err(DbError::UsernameTaken(_))
        ));
        assert!(matches!(
            repo.create(new_user("bob", Some(42))).await,
            Err(DbError::TeamNotFound(42))
        ));
    }

    #[tokio::test]
    async fn test_partial_update() {
        let (db, _temp) = setup_test_db().await;
        let repo = db.users();
        let user = repo.create(new_user("alice", None)).await.unwrap();

        let updated = repo
            .update(
                user.id,
                &UpdateUserRequest {
                    name: None,
                    is_active: Some(false),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "ALICE");
        assert!(!updated.is_active);

        let missing = repo
            .update(
                999,
                &UpdateUserRequest {
                    name: Some("Nobody".into()),
                    is_active: None,
                },
            )
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_list_and_candidates() {
        let (db, _temp) = setup_test_db().await;
        let team = db.teams().create("QA").await.unwrap();
        let repo = db.users();
        let a = repo.create(new_user("a", Some(team.id))).await.unwrap();
        let b = repo.create(new_user("b", Some(team.id))).await.unwrap();
        let c = repo.create(new_user("c", Some(team.id))).await.unwrap();
        repo.create(new_user("d", None)).await.unwrap();

        assert_eq!(repo.deactivate(team.id, &[c.id]).await.unwrap(), 1);
        // Already inactive
        assert_eq!(repo.deactivate(team.id, &[c.id]).await.unwrap(), 0);

        let candidates = repo.active_team_members(team.id, a.id).await.unwrap();
        assert_eq!(candidates.iter().map(|u| u.id).collect::<Vec<_>>(), vec![b.id]);

        let in_team = repo
            .list(UserFilter {
                team_id: Some(team.id),
                is_active: None,
            })
            .await
            .unwrap();
        assert_eq!(in_team.len(), 3);

        let inactive = repo
            .list(UserFilter {
                team_id: None,
                is_active: Some(false),
            })
            .await
            .unwrap();
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].id, c.id);
    }

    #[tokio::test]
    async fn test_deactivate_only_touches_team_members() {
        let (db, _temp) = setup_test_db().await;
        let qa = db.teams().create("QA").await.unwrap();
        let dev = db.teams().create("Dev").await.unwrap();
        let repo = db.users();
        let a = repo.create(new_user("a", Some(qa.id))).await.unwrap();
        let b = repo.create(new_user("b", Some(dev.id))).await.unwrap();

        assert_eq!(repo.deactivate(qa.id, &[a.id, b.id, a.id]).await.unwrap(), 1);
        assert!(repo.get_by_id(b.id).await.unwrap().unwrap().is_active);
        assert_eq!(repo.deactivate(qa.id, &[]).await.unwrap(), 0);
    }
}

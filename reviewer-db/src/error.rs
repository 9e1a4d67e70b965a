//! Error types for database operations

use thiserror::Error;

/// Database error types
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx database error
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Unique constraint on teams.name
    #[error("team with name '{0}' already exists")]
    TeamNameTaken(String),

    /// Unique constraint on users.username
    #[error("user with username '{0}' already exists")]
    UsernameTaken(String),

    /// Primary key on pr_reviewers
    #[error("reviewer {reviewer_id} already assigned to pull request {pr_id}")]
    ReviewerAlreadyAssigned { pr_id: i64, reviewer_id: i64 },

    /// Foreign key to teams failed
    #[error("team {0} not found")]
    TeamNotFound(i64),

    /// Foreign key to users failed
    #[error("user {0} not found")]
    UserNotFound(i64),

    /// A stored value could not be decoded
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, DbError>;

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(e) if e.is_unique_violation())
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(e) if e.is_foreign_key_violation())
}

impl From<DbError> for reviewer_core::Error {
    fn from(err: DbError) -> Self {
        use reviewer_core::Error;

        match err {
            DbError::TeamNameTaken(name) => Error::TeamAlreadyExists(name),
            DbError::UsernameTaken(username) => Error::UserAlreadyExists(username),
            DbError::ReviewerAlreadyAssigned { pr_id, reviewer_id } => {
                Error::AlreadyAssigned { pr_id, reviewer_id }
            }
            DbError::TeamNotFound(id) => Error::TeamNotFound(id),
            DbError::UserNotFound(id) => Error::UserNotFound(id),
            other => Error::store(other),
        }
    }
}

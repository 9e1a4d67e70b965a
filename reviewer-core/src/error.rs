//! Error types for reviewer assignment

use thiserror::Error;

/// Result type alias for reviewer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`], stable across variants.
///
/// The HTTP layer maps these onto status codes; callers that only care
/// about the class of failure should match on this rather than on
/// individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidState,
    AlreadyAssigned,
    AuthorCannotReview,
    Inactive,
    NoTeam,
    NoAvailableReviewer,
    AlreadyInTeam,
    NotInTeam,
    Invalid,
    Internal,
}

/// Error type for reviewer operations
#[derive(Error, Debug)]
pub enum Error {
    /// Team not found
    #[error("team {0} not found")]
    TeamNotFound(i64),

    /// User not found
    #[error("user {0} not found")]
    UserNotFound(i64),

    /// Pull request not found
    #[error("pull request {0} not found")]
    PullRequestNotFound(i64),

    /// The conditional status update matched no row
    #[error("pull request {0} not found or already closed/merged")]
    PullRequestFinalized(i64),

    /// Reviewer is not assigned to the pull request
    #[error("reviewer {reviewer_id} not found in pull request {pr_id}")]
    ReviewerNotAssigned { pr_id: i64, reviewer_id: i64 },

    /// Team name already taken
    #[error("team with name '{0}' already exists")]
    TeamAlreadyExists(String),

    /// Username already taken
    #[error("user with username '{0}' already exists")]
    UserAlreadyExists(String),

    /// Pull request lifecycle violation
    #[error("{0}")]
    InvalidState(String),

    /// Reviewer already on the pull request
    #[error("reviewer {reviewer_id} already assigned to pull request {pr_id}")]
    AlreadyAssigned { pr_id: i64, reviewer_id: i64 },

    /// Author was proposed as a reviewer of their own pull request
    #[error("author cannot be a reviewer")]
    AuthorCannotReview,

    /// Reviewer is deactivated
    #[error("reviewer {0} is not active")]
    Inactive(i64),

    /// Reviewer has no team to draw a replacement from
    #[error("reviewer {0} is not in a team")]
    NoTeam(i64),

    /// Candidate pool exhausted
    #[error("no available reviewers in team {0}")]
    NoAvailableReviewer(i64),

    /// User is already a member of the team
    #[error("user {user_id} already in team {team_id}")]
    AlreadyInTeam { team_id: i64, user_id: i64 },

    /// User is not a member of the team
    #[error("user {user_id} not found in team {team_id}")]
    NotInTeam { team_id: i64, user_id: i64 },

    /// Request failed validation
    #[error("invalid request: {0}")]
    Validation(String),

    /// Entity store failure
    #[error("storage error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TeamNotFound(_)
            | Error::UserNotFound(_)
            | Error::PullRequestNotFound(_)
            | Error::PullRequestFinalized(_)
            | Error::ReviewerNotAssigned { .. } => ErrorKind::NotFound,
            Error::TeamAlreadyExists(_) | Error::UserAlreadyExists(_) => ErrorKind::AlreadyExists,
            Error::InvalidState(_) => ErrorKind::InvalidState,
            Error::AlreadyAssigned { .. } => ErrorKind::AlreadyAssigned,
            Error::AuthorCannotReview => ErrorKind::AuthorCannotReview,
            Error::Inactive(_) => ErrorKind::Inactive,
            Error::NoTeam(_) => ErrorKind::NoTeam,
            Error::NoAvailableReviewer(_) => ErrorKind::NoAvailableReviewer,
            Error::AlreadyInTeam { .. } => ErrorKind::AlreadyInTeam,
            Error::NotInTeam { .. } => ErrorKind::NotInTeam,
            Error::Validation(_) => ErrorKind::Invalid,
            Error::Store(_) | Error::Config(_) | Error::Io(_) => ErrorKind::Internal,
        }
    }

    /// Wrap an arbitrary store failure
    pub fn store(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Store(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_family() {
        assert_eq!(Error::TeamNotFound(1).kind(), ErrorKind::NotFound);
        assert_eq!(Error::PullRequestFinalized(3).kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::ReviewerNotAssigned {
                pr_id: 1,
                reviewer_id: 2
            }
            .kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_store_errors_are_internal() {
        let err = Error::store("disk on fire");
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.to_string(), "storage error: disk on fire");
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::TeamAlreadyExists("QA".into()).to_string(),
            "team with name 'QA' already exists"
        );
        assert_eq!(
            Error::PullRequestFinalized(7).to_string(),
            "pull request 7 not found or already closed/merged"
        );
    }
}

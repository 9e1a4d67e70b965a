//! HTTP error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reviewer_core::{Error, ErrorKind};
use serde::Serialize;

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Wrapper making domain errors usable as axum responses
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    /// Status code for an error class
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::NotFound | ErrorKind::NotInTeam => StatusCode::NOT_FOUND,
            ErrorKind::AlreadyExists
            | ErrorKind::AlreadyInTeam
            | ErrorKind::NoTeam
            | ErrorKind::NoAvailableReviewer => StatusCode::CONFLICT,
            ErrorKind::InvalidState
            | ErrorKind::AlreadyAssigned
            | ErrorKind::AuthorCannotReview
            | ErrorKind::Inactive
            | ErrorKind::Invalid => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "Request failed");
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::TeamNotFound(1), StatusCode::NOT_FOUND),
            (Error::PullRequestFinalized(1), StatusCode::NOT_FOUND),
            (
                Error::NotInTeam {
                    team_id: 1,
                    user_id: 2,
                },
                StatusCode::NOT_FOUND,
            ),
            (Error::TeamAlreadyExists("QA".into()), StatusCode::CONFLICT),
            (Error::NoAvailableReviewer(1), StatusCode::CONFLICT),
            (Error::NoTeam(1), StatusCode::CONFLICT),
            (Error::AuthorCannotReview, StatusCode::BAD_REQUEST),
            (Error::Inactive(3), StatusCode::BAD_REQUEST),
            (Error::Validation("title is required".into()), StatusCode::BAD_REQUEST),
            (Error::store("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }

    #[tokio::test]
    async fn test_internal_message_is_hidden() {
        let response = ApiError(Error::store("connection refused")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "internal server error");
    }
}

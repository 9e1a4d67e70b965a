//! Pull request lifecycle endpoints

use axum::extract::State;
use axum::http::StatusCode;
use reviewer_core::models::{CreatePullRequestRequest, PrStatus, PullRequest, ReassignReviewerRequest};
use reviewer_core::store::PullRequestFilter;
use serde::Deserialize;

use crate::extract::{Json, Path, Query};
use crate::{ApiResult, AppState};

/// Filters for `GET /pull-requests`; `userId` selects by reviewer
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestQuery {
    pub user_id: Option<i64>,
    pub author_id: Option<i64>,
    pub status: Option<String>,
}

impl PullRequestQuery {
    fn into_filter(self) -> reviewer_core::Result<PullRequestFilter> {
        let status = self.status.as_deref().map(str::parse::<PrStatus>).transpose()?;
        Ok(PullRequestFilter {
            reviewer_id: self.user_id,
            author_id: self.author_id,
            status,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddReviewerBody {
    pub reviewer_id: i64,
}

pub async fn list_pull_requests(
    State(state): State<AppState>,
    Query(query): Query<PullRequestQuery>,
) -> ApiResult<Json<Vec<PullRequest>>> {
    let filter = query.into_filter()?;
    Ok(Json(state.service.list_pull_requests(filter).await?))
}

pub async fn create_pull_request(
    State(state): State<AppState>,
    Json(req): Json<CreatePullRequestRequest>,
) -> ApiResult<(StatusCode, Json<PullRequest>)> {
    let pr = state.service.create_pull_request(req).await?;
    Ok((StatusCode::CREATED, Json(pr)))
}

pub async fn get_pull_request(
    State(state): State<AppState>,
    Path(pr_id): Path<i64>,
) -> ApiResult<Json<PullRequest>> {
    Ok(Json(state.service.get_pull_request(pr_id).await?))
}

pub async fn add_reviewer(
    State(state): State<AppState>,
    Path(pr_id): Path<i64>,
    Json(body): Json<AddReviewerBody>,
) -> ApiResult<Json<PullRequest>> {
    Ok(Json(state.service.add_reviewer(pr_id, body.reviewer_id).await?))
}

pub async fn reassign_reviewer(
    State(state): State<AppState>,
    Path(pr_id): Path<i64>,
    Json(req): Json<ReassignReviewerRequest>,
) -> ApiResult<Json<PullRequest>> {
    Ok(Json(state.service.reassign_reviewer(pr_id, req).await?))
}

pub async fn merge_pull_request(
    State(state): State<AppState>,
    Path(pr_id): Path<i64>,
) -> ApiResult<Json<PullRequest>> {
    Ok(Json(state.service.merge_pull_request(pr_id).await?))
}

pub async fn close_pull_request(
    State(state): State<AppState>,
    Path(pr_id): Path<i64>,
) -> ApiResult<Json<PullRequest>> {
    Ok(Json(state.service.close_pull_request(pr_id).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::Router;
    use serde_json::{json, Value};

    use crate::test_support::{app, send};

    /// Team "QA" with members a and b, plus "outsider" in no team
    async fn fixture(app: &Router) -> (Value, Value, Value) {
        let (_, qa) = send(app, "POST", "/teams", Some(json!({ "name": "QA" }))).await;
        let mut users = Vec::new();
        for (username, team_id) in [("a", qa["id"].clone()), ("b", qa["id"].clone()), ("outsider", Value::Null)] {
            let (_, user) = send(
                app,
                "POST",
                "/users",
                Some(json!({ "username": username, "name": username, "teamId": team_id })),
            )
            .await;
            users.push(user);
        }
        let outsider = users.pop().unwrap();
        let b = users.pop().unwrap();
        let a = users.pop().unwrap();
        (a, b, outsider)
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let app = app();
        let (a, b, _) = fixture(&app).await;

        let (status, pr) = send(
            &app,
            "POST",
            "/pull-requests",
            Some(json!({ "title": "Fix bug", "authorId": a["id"] })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(pr["status"], "open");
        assert_eq!(pr["author"]["id"], a["id"]);
        assert_eq!(pr["team"]["name"], "QA");
        assert_eq!(pr["reviewers"].as_array().unwrap().len(), 1);
        assert_eq!(pr["reviewers"][0]["id"], b["id"]);
        assert!(pr.get("mergedAt").is_none());

        let merge = format!("/pull-requests/{}/merge", pr["id"]);
        let (status, merged) = send(&app, "POST", &merge, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(merged["status"], "merged");
        let (status, again) = send(&app, "POST", &merge, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(again["mergedAt"], merged["mergedAt"]);

        let (status, body) = send(&app, "POST", &format!("/pull-requests/{}/close", pr["id"]), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("already closed/merged"));
    }

    #[tokio::test]
    async fn test_create_errors() {
        let app = app();
        let (status, _) = send(&app, "POST", "/pull-requests", Some(json!({ "title": "X", "authorId": 999 }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (a, _, _) = fixture(&app).await;
        let (status, _) = send(&app, "POST", "/pull-requests", Some(json!({ "title": "", "authorId": a["id"] }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_add_reviewer() {
        let app = app();
        let (a, b, outsider) = fixture(&app).await;
        let (_, pr) = send(
            &app,
            "POST",
            "/pull-requests",
            Some(json!({ "title": "Fix", "authorId": a["id"] })),
        )
        .await;
        let uri = format!("/pull-requests/{}/reviewers", pr["id"]);

        let (status, body) = send(&app, "POST", &uri, Some(json!({ "reviewerId": a["id"] }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "author cannot be a reviewer");

        let (status, _) = send(&app, "POST", &uri, Some(json!({ "reviewerId": b["id"] }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, updated) = send(&app, "POST", &uri, Some(json!({ "reviewerId": outsider["id"] }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["reviewers"].as_array().unwrap().len(), 2);

        let (status, _) = send(&app, "POST", &uri, Some(json!({ "reviewerId": 999 }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_reassign() {
        let app = app();
        let (a, b, _) = fixture(&app).await;
        let (_, pr) = send(
            &app,
            "POST",
            "/pull-requests",
            Some(json!({ "title": "Fix", "authorId": a["id"] })),
        )
        .await;
        let uri = format!("/pull-requests/{}/reviewers", pr["id"]);

        // b is the only teammate and already reviewing
        let (status, body) = send(&app, "PUT", &uri, Some(json!({ "oldReviewerId": b["id"] }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().starts_with("no available reviewers"));

        let (_, qa) = send(&app, "GET", &format!("/teams/{}", a["teamId"]), None).await;
        let (_, c) = send(
            &app,
            "POST",
            "/users",
            Some(json!({ "username": "c", "name": "c", "teamId": qa["id"] })),
        )
        .await;
        let (status, updated) = send(&app, "PUT", &uri, Some(json!({ "oldReviewerId": b["id"] }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["reviewers"][0]["id"], c["id"]);

        let (status, _) = send(&app, "PUT", &uri, Some(json!({ "oldReviewerId": b["id"] }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        send(&app, "POST", &format!("/pull-requests/{}/merge", pr["id"]), None).await;
        let (status, _) = send(&app, "PUT", &uri, Some(json!({ "oldReviewerId": c["id"] }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let app = app();
        let (a, b, _) = fixture(&app).await;
        let mut created = Vec::new();
        for title in ["One", "Two"] {
            let (_, pr) = send(&app, "POST", "/pull-requests", Some(json!({ "title": title, "authorId": a["id"] }))).await;
            created.push(pr);
        }
        send(&app, "POST", &format!("/pull-requests/{}/close", created[0]["id"]), None).await;

        let (_, mine) = send(&app, "GET", &format!("/pull-requests?userId={}", b["id"]), None).await;
        assert_eq!(mine.as_array().unwrap().len(), 2);

        let (_, open) = send(&app, "GET", "/pull-requests?status=OPEN", None).await;
        assert_eq!(open.as_array().unwrap().len(), 1);
        assert_eq!(open[0]["title"], "Two");

        let (_, closed) = send(
            &app,
            "GET",
            &format!("/pull-requests?authorId={}&status=closed", a["id"]),
            None,
        )
        .await;
        assert_eq!(closed.as_array().unwrap().len(), 1);

        let (status, _) = send(&app, "GET", "/pull-requests?status=draft", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

//! Team endpoints

use axum::extract::State;
use axum::http::StatusCode;
use reviewer_core::models::{CreateTeamRequest, Team};
use serde::Deserialize;

use crate::extract::{Json, Path, Query};
use crate::{ApiResult, AppState};

/// Body of `POST /teams/{id}/users` and query of `DELETE /teams/{id}/users`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRef {
    pub user_id: i64,
}

pub async fn list_teams(State(state): State<AppState>) -> ApiResult<Json<Vec<Team>>> {
    Ok(Json(state.service.list_teams().await?))
}

pub async fn create_team(
    State(state): State<AppState>,
    Json(req): Json<CreateTeamRequest>,
) -> ApiResult<(StatusCode, Json<Team>)> {
    let team = state.service.create_team(req).await?;
    Ok((StatusCode::CREATED, Json(team)))
}

pub async fn get_team(State(state): State<AppState>, Path(team_id): Path<i64>) -> ApiResult<Json<Team>> {
    Ok(Json(state.service.get_team(team_id).await?))
}

pub async fn delete_team(State(state): State<AppState>, Path(team_id): Path<i64>) -> ApiResult<StatusCode> {
    state.service.delete_team(team_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_user(
    State(state): State<AppState>,
    Path(team_id): Path<i64>,
    Json(member): Json<MemberRef>,
) -> ApiResult<StatusCode> {
    state.service.add_user_to_team(team_id, member.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_user(
    State(state): State<AppState>,
    Path(team_id): Path<i64>,
    Query(member): Query<MemberRef>,
) -> ApiResult<StatusCode> {
    state.service.remove_user_from_team(team_id, member.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_support::{app, send};

    #[tokio::test]
    async fn test_team_crud() {
        let app = app();

        let (status, team) = send(&app, "POST", "/teams", Some(json!({ "name": "QA" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(team["name"], "QA");
        let id = team["id"].as_i64().unwrap();

        let (status, fetched) = send(&app, "GET", &format!("/teams/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["id"], id);

        let (status, list) = send(&app, "GET", "/teams", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, body) = send(&app, "POST", "/teams", Some(json!({ "name": "QA" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "team with name 'QA' already exists");

        let (status, _) = send(&app, "DELETE", &format!("/teams/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", &format!("/teams/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, "DELETE", &format!("/teams/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_blank_team_name_is_rejected() {
        let app = app();
        let (status, body) = send(&app, "POST", "/teams", Some(json!({ "name": "   " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("invalid request"));
    }

    #[tokio::test]
    async fn test_membership() {
        let app = app();
        let (_, team) = send(&app, "POST", "/teams", Some(json!({ "name": "QA" }))).await;
        let (_, user) = send(&app, "POST", "/users", Some(json!({ "username": "alice", "name": "Alice" }))).await;
        let members = format!("/teams/{}/users", team["id"]);

        let (status, _) = send(&app, "POST", &members, Some(json!({ "userId": user["id"] }))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "POST", &members, Some(json!({ "userId": user["id"] }))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, fetched) = send(&app, "GET", &format!("/users/{}", user["id"]), None).await;
        assert_eq!(fetched["teamId"], team["id"]);

        let remove = format!("{}?userId={}", members, user["id"]);
        let (status, _) = send(&app, "DELETE", &remove, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "DELETE", &remove, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "POST", &members, Some(json!({ "userId": 999 }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

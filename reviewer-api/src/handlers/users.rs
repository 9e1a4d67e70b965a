//! User endpoints, including bulk deactivation within a team

use axum::extract::State;
use axum::http::StatusCode;
use reviewer_core::models::{
    BulkDeactivateRequest, BulkDeactivateResponse, CreateUserRequest, UpdateUserRequest, User,
};
use reviewer_core::store::UserFilter;
use serde::Deserialize;

use crate::extract::{Json, Path, Query};
use crate::{ApiResult, AppState};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub team_id: Option<i64>,
    pub is_active: Option<bool>,
}

impl From<UserQuery> for UserFilter {
    fn from(q: UserQuery) -> Self {
        UserFilter {
            team_id: q.team_id,
            is_active: q.is_active,
        }
    }
}

pub async fn list_users(State(state): State<AppState>, Query(query): Query<UserQuery>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.service.list_users(query.into()).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.service.create_user(req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(State(state): State<AppState>, Path(user_id): Path<i64>) -> ApiResult<Json<User>> {
    Ok(Json(state.service.get_user(user_id).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.service.update_user(user_id, req).await?))
}

pub async fn bulk_deactivate(
    State(state): State<AppState>,
    Path(team_id): Path<i64>,
    Json(req): Json<BulkDeactivateRequest>,
) -> ApiResult<Json<BulkDeactivateResponse>> {
    Ok(Json(state.service.bulk_deactivate_users(team_id, req).await?))
}

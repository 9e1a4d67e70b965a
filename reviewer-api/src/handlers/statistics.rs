use axum::extract::State;
use axum::Json;
use reviewer_core::models::Statistics;

use crate::{ApiResult, AppState};

pub async fn get_statistics(State(state): State<AppState>) -> ApiResult<Json<Statistics>> {
    Ok(Json(state.service.get_statistics().await?))
}

use axum::{extract::State, Json};
use chrono::Utc;

use crate::error::AppResult;
use crate::models::AppStats;
use crate::services::stats;
use crate::AppState;

pub async fn app_stats(State(state): State<AppState>) -> AppResult<Json<AppStats>> {
    Ok(Json(stats::app_stats(&state, Utc::now()).await?))
}

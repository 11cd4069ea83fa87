use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::auth::Identity;
use crate::models::{
    CreateMatchRequest, MatchPreview, MatchSummary, MatchUpdate, MatchView, UpcomingQuery,
};
use crate::services::{matches, visibility};
use crate::AppState;

pub async fn list_upcoming(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppQuery(query): AppQuery<UpcomingQuery>,
) -> AppResult<Json<Vec<MatchView>>> {
    let list = matches::list_upcoming(&state, &identity, query.limit, Utc::now()).await?;
    Ok(Json(list))
}

pub async fn create_match(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppJson(body): AppJson<CreateMatchRequest>,
) -> AppResult<(StatusCode, Json<MatchView>)> {
    let m = matches::create_match(&state, &identity, body, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(visibility::redact(&m, identity.is_admin))))
}

pub async fn get_match(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<MatchView>> {
    Ok(Json(matches::get_match(&state, &identity, id).await?))
}

pub async fn update_match(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<MatchUpdate>,
) -> AppResult<Json<MatchView>> {
    let m = matches::update_match(&state, &identity, id, body).await?;
    Ok(Json(visibility::redact(&m, identity.is_admin)))
}

pub async fn delete_match(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    matches::delete_match(&state, &identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_summary(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<MatchSummary>> {
    Ok(Json(
        matches::get_summary(&state, &identity, id, Utc::now()).await?,
    ))
}

pub async fn get_preview(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<MatchPreview>> {
    Ok(Json(matches::get_preview(&state, id).await?))
}

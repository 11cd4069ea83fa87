use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::auth::Identity;
use crate::models::{Player, PlayerSearchQuery, PlayerUpdate, RegisterPlayerRequest};
use crate::services::players;
use crate::AppState;

pub async fn list_players(State(state): State<AppState>) -> AppResult<Json<Vec<Player>>> {
    Ok(Json(players::list_players(&state).await?))
}

pub async fn search_players(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PlayerSearchQuery>,
) -> AppResult<Json<Vec<Player>>> {
    let q = query.q.unwrap_or_default();
    let hits = players::search(&state, &q, query.limit).await?;
    Ok(Json(hits))
}

pub async fn register_self(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppJson(body): AppJson<RegisterPlayerRequest>,
) -> AppResult<(StatusCode, Json<Player>)> {
    let player = players::register_self(&state, &identity, body).await?;
    Ok((StatusCode::CREATED, Json(player)))
}

pub async fn get_player(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<Player>> {
    Ok(Json(players::get_player(&state, id).await?))
}

pub async fn update_player(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<PlayerUpdate>,
) -> AppResult<Json<Player>> {
    Ok(Json(players::update(&state, &identity, id, body).await?))
}

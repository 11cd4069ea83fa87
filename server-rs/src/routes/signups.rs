use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::{AppJson, AppPath};
use crate::middleware::auth::Identity;
use crate::models::{
    LineupEntry, LineupGroup, RosterRow, Signup, SignupRequest, SignupUpdate, Team,
    UpsertSignupRequest,
};
use crate::services::roster::{self, TeamLineups};
use crate::AppState;

pub async fn list_signups(
    State(state): State<AppState>,
    AppPath(match_id): AppPath<Uuid>,
) -> AppResult<Json<Vec<RosterRow>>> {
    Ok(Json(roster::list_signups(&state, match_id).await?))
}

pub async fn signup(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppPath(match_id): AppPath<Uuid>,
    AppJson(body): AppJson<SignupRequest>,
) -> AppResult<(StatusCode, Json<Signup>)> {
    let s = roster::signup(&state, &identity, match_id, body, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(s)))
}

pub async fn upsert_signup(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppPath(match_id): AppPath<Uuid>,
    AppJson(body): AppJson<UpsertSignupRequest>,
) -> AppResult<Json<Signup>> {
    let s = roster::upsert_signup(&state, &identity, match_id, body, Utc::now()).await?;
    Ok(Json(s))
}

pub async fn update_signup(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppPath((match_id, player_id)): AppPath<(Uuid, Uuid)>,
    AppJson(body): AppJson<SignupUpdate>,
) -> AppResult<Json<Signup>> {
    let s = roster::update_signup(&state, &identity, match_id, player_id, body).await?;
    Ok(Json(s))
}

pub async fn delete_signup(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppPath((match_id, player_id)): AppPath<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    roster::delete_signup(&state, &identity, match_id, player_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_lineup(
    State(state): State<AppState>,
    AppPath((match_id, team)): AppPath<(Uuid, Team)>,
) -> AppResult<Json<Vec<LineupEntry>>> {
    Ok(Json(roster::get_lineup(&state, match_id, team).await?))
}

pub async fn get_lineups(
    State(state): State<AppState>,
    AppPath(match_id): AppPath<Uuid>,
) -> AppResult<Json<TeamLineups>> {
    Ok(Json(roster::get_lineups(&state, match_id).await?))
}

pub async fn get_lineup_groups(
    State(state): State<AppState>,
    AppPath((match_id, team)): AppPath<(Uuid, Team)>,
) -> AppResult<Json<Vec<LineupGroup>>> {
    let entries = roster::get_lineup(&state, match_id, team).await?;
    Ok(Json(roster::group_lineup(entries)))
}

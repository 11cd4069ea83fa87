use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::Identity;
use crate::models::{
    NewPlayer, Player, PlayerUpdate, RegisterPlayerRequest, DISPLAY_NAME_MAX, DISPLAY_NAME_MIN,
};
use crate::AppState;

/// Queries shorter than this return nothing.
pub const MIN_SEARCH_LEN: usize = 2;
const MAX_SEARCH_LIMIT: i64 = 50;

/// Trims a display name and checks its length.
pub fn normalize_display_name(raw: &str) -> AppResult<String> {
    let name = raw.trim();
    let len = name.chars().count();
    if !(DISPLAY_NAME_MIN..=DISPLAY_NAME_MAX).contains(&len) {
        return Err(AppError::Validation(format!(
            "Display name must be between {DISPLAY_NAME_MIN} and {DISPLAY_NAME_MAX} characters"
        )));
    }
    Ok(name.to_string())
}

/// Exact, case-sensitive lookup by display name; creates the player if absent.
pub async fn find_or_create_by_name(state: &AppState, name: &str) -> AppResult<Player> {
    let name = normalize_display_name(name)?;
    state.store.find_or_create_player(&name).await
}

/// Registers the acting user as a player whose id is the actor id.
pub async fn register_self(
    state: &AppState,
    identity: &Identity,
    req: RegisterPlayerRequest,
) -> AppResult<Player> {
    let actor = identity.require_actor()?;
    let new = NewPlayer {
        id: actor.id,
        display_name: normalize_display_name(&req.display_name)?,
        image_url: req.image_url,
        preferred_position: req.preferred_position,
    };
    let player = state.store.create_player(&new).await?;
    tracing::info!(player_id = %player.id, "player registered");
    Ok(player)
}

pub async fn get_player(state: &AppState, id: Uuid) -> AppResult<Player> {
    state
        .store
        .get_player(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Player not found".into()))
}

pub async fn list_players(state: &AppState) -> AppResult<Vec<Player>> {
    state.store.list_players().await
}

/// Case-insensitive substring search, alphabetical. Inactive below
/// [`MIN_SEARCH_LEN`] characters.
pub async fn search(state: &AppState, query: &str, limit: Option<i64>) -> AppResult<Vec<Player>> {
    let query = query.trim();
    if query.chars().count() < MIN_SEARCH_LEN {
        return Ok(Vec::new());
    }
    let limit = limit
        .unwrap_or(state.config.roster.search_limit)
        .clamp(1, MAX_SEARCH_LIMIT);
    state.store.search_players(query, limit).await
}

/// Changes a player's profile. Only admins or the player themselves.
pub async fn update(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
    mut update: PlayerUpdate,
) -> AppResult<Player> {
    identity.require_admin_or_self(id)?;
    if update.is_empty() {
        return Err(AppError::Validation("Nothing to update".into()));
    }
    if let Some(name) = &update.display_name {
        update.display_name = Some(normalize_display_name(name)?);
    }
    state
        .store
        .update_player(id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound("Player not found".into()))
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::signup::Position;

pub const DISPLAY_NAME_MIN: usize = 2;
pub const DISPLAY_NAME_MAX: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Player {
    pub id: Uuid,
    pub display_name: String,
    pub image_url: Option<String>,
    pub preferred_position: Option<Position>,
    pub created_at: DateTime<Utc>,
}

/// Explicit registration of the acting user as a player.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterPlayerRequest {
    pub display_name: String,
    pub image_url: Option<String>,
    pub preferred_position: Option<Position>,
}

/// Row to insert into `players`. The id is chosen by the caller so that a
/// self-registered player shares the actor's id.
#[derive(Debug, Clone)]
pub struct NewPlayer {
    pub id: Uuid,
    pub display_name: String,
    pub image_url: Option<String>,
    pub preferred_position: Option<Position>,
}

/// Per-field player update. Nullable columns use a double option so that
/// "leave as is" (`None`) and "clear" (`Some(None)`) stay distinct.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerUpdate {
    pub display_name: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub image_url: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub preferred_position: Option<Option<Position>>,
}

impl PlayerUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.image_url.is_none() && self.preferred_position.is_none()
    }

    pub fn apply(&self, player: &mut Player) {
        if let Some(name) = &self.display_name {
            player.display_name = name.clone();
        }
        if let Some(url) = &self.image_url {
            player.image_url = url.clone();
        }
        if let Some(pos) = self.preferred_position {
            player.preferred_position = pos;
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PlayerSearchQuery {
    pub q: Option<String>,
    pub limit: Option<i64>,
}

//! Persistence seam for the four relations: admins, players, matches and
//! signups.
//!
//! Each method is one transaction against the backing store. In particular
//! [`Store::insert_signup`] resolves the player, checks for an existing signup
//! and checks capacity atomically, so a failed signup never leaves a stray
//! player row behind and two concurrent signups for the same pair resolve to
//! exactly one row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    Match, NewPlayer, NewSignup, Player, PlayerUpdate, Position, RosterRow, Signup, SignupUpdate,
    Team,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> bool;

    // --- admins ---

    async fn is_admin(&self, user_id: Uuid) -> AppResult<bool>;

    /// Idempotent; returns `true` when a new admin row was written.
    async fn insert_admin(&self, user_id: Uuid, role: &str) -> AppResult<bool>;

    // --- players ---

    /// Atomic upsert keyed by the exact display name.
    async fn find_or_create_player(&self, display_name: &str) -> AppResult<Player>;

    /// Fails with a validation error when the id or display name is taken.
    async fn create_player(&self, player: &NewPlayer) -> AppResult<Player>;

    async fn get_player(&self, id: Uuid) -> AppResult<Option<Player>>;

    async fn list_players(&self) -> AppResult<Vec<Player>>;

    /// Case-insensitive substring match, alphabetical.
    async fn search_players(&self, query: &str, limit: i64) -> AppResult<Vec<Player>>;

    async fn update_player(&self, id: Uuid, update: &PlayerUpdate) -> AppResult<Option<Player>>;

    // --- matches ---

    async fn insert_match(&self, m: &Match) -> AppResult<()>;

    async fn get_match(&self, id: Uuid) -> AppResult<Option<Match>>;

    /// Matches with `starts_at >= now`, earliest first.
    async fn list_upcoming(&self, now: DateTime<Utc>, limit: i64) -> AppResult<Vec<Match>>;

    async fn count_upcoming(&self, now: DateTime<Utc>) -> AppResult<i64>;

    /// Overwrites every mutable column; returns `false` if the match is gone.
    async fn replace_match(&self, m: &Match) -> AppResult<bool>;

    /// Removes the match and its signups.
    async fn delete_match(&self, id: Uuid) -> AppResult<bool>;

    // --- signups ---

    async fn insert_signup(&self, new: &NewSignup) -> AppResult<Signup>;

    /// Creates the (match, player) row or overwrites its team and position.
    async fn upsert_signup(
        &self,
        match_id: Uuid,
        player_id: Uuid,
        team: Team,
        position: Option<Position>,
        enforce_capacity: bool,
    ) -> AppResult<Signup>;

    async fn update_signup(
        &self,
        match_id: Uuid,
        player_id: Uuid,
        update: &SignupUpdate,
    ) -> AppResult<Option<Signup>>;

    async fn delete_signup(&self, match_id: Uuid, player_id: Uuid) -> AppResult<bool>;

    /// Signups of one match joined with the live player rows, oldest first.
    async fn list_roster(&self, match_id: Uuid) -> AppResult<Vec<RosterRow>>;

    async fn count_signups(&self, match_id: Uuid) -> AppResult<i64>;

    async fn count_signups_since(&self, since: DateTime<Utc>) -> AppResult<i64>;
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Store;
use crate::error::{AppError, AppResult};
use crate::models::{
    Match, NewPlayer, NewSignup, Player, PlayerRef, PlayerUpdate, Position, RosterRow, Signup,
    SignupUpdate, Team,
};

#[derive(Default)]
struct Tables {
    admins: HashMap<Uuid, String>,
    players: HashMap<Uuid, Player>,
    matches: HashMap<Uuid, Match>,
    /// Insertion order doubles as the tie-breaker for equal timestamps.
    signups: Vec<Signup>,
}

impl Tables {
    fn player_by_name(&self, name: &str) -> Option<&Player> {
        self.players.values().find(|p| p.display_name == name)
    }

    fn signup_index(&self, match_id: Uuid, player_id: Uuid) -> Option<usize> {
        self.signups
            .iter()
            .position(|s| s.match_id == match_id && s.player_id == player_id)
    }

    fn signup_count(&self, match_id: Uuid) -> i64 {
        self.signups.iter().filter(|s| s.match_id == match_id).count() as i64
    }

    fn check_capacity(&self, m: &Match, enforce: bool) -> AppResult<()> {
        if enforce && self.signup_count(m.id) >= m.capacity as i64 {
            return Err(AppError::MatchFull);
        }
        Ok(())
    }

    fn require_match(&self, id: Uuid) -> AppResult<&Match> {
        self.matches
            .get(&id)
            .ok_or_else(|| AppError::NotFound("Match not found".into()))
    }
}

/// Store held entirely in process memory. All tables sit behind one lock, so
/// every method is trivially atomic.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_alphabetically(players: &mut [Player]) {
    players.sort_by(|a, b| {
        a.display_name
            .to_lowercase()
            .cmp(&b.display_name.to_lowercase())
            .then_with(|| a.display_name.cmp(&b.display_name))
    });
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> bool {
        true
    }

    async fn is_admin(&self, user_id: Uuid) -> AppResult<bool> {
        Ok(self.tables.read().await.admins.contains_key(&user_id))
    }

    async fn insert_admin(&self, user_id: Uuid, role: &str) -> AppResult<bool> {
        let mut t = self.tables.write().await;
        if t.admins.contains_key(&user_id) {
            return Ok(false);
        }
        t.admins.insert(user_id, role.to_string());
        Ok(true)
    }

    async fn find_or_create_player(&self, display_name: &str) -> AppResult<Player> {
        let mut t = self.tables.write().await;
        if let Some(p) = t.player_by_name(display_name) {
            return Ok(p.clone());
        }
        let player = Player {
            id: Uuid::new_v4(),
            display_name: display_name.to_string(),
            image_url: None,
            preferred_position: None,
            created_at: Utc::now(),
        };
        t.players.insert(player.id, player.clone());
        Ok(player)
    }

    async fn create_player(&self, new: &NewPlayer) -> AppResult<Player> {
        let mut t = self.tables.write().await;
        if t.players.contains_key(&new.id) {
            return Err(AppError::Validation("Player is already registered".into()));
        }
        if t.player_by_name(&new.display_name).is_some() {
            return Err(AppError::Validation("Display name is already taken".into()));
        }
        let player = Player {
            id: new.id,
            display_name: new.display_name.clone(),
            image_url: new.image_url.clone(),
            preferred_position: new.preferred_position,
            created_at: Utc::now(),
        };
        t.players.insert(player.id, player.clone());
        Ok(player)
    }

    async fn get_player(&self, id: Uuid) -> AppResult<Option<Player>> {
        Ok(self.tables.read().await.players.get(&id).cloned())
    }

    async fn list_players(&self) -> AppResult<Vec<Player>> {
        let mut players: Vec<Player> = self.tables.read().await.players.values().cloned().collect();
        sort_alphabetically(&mut players);
        Ok(players)
    }

    async fn search_players(&self, query: &str, limit: i64) -> AppResult<Vec<Player>> {
        let needle = query.to_lowercase();
        let mut players: Vec<Player> = self
            .tables
            .read()
            .await
            .players
            .values()
            .filter(|p| p.display_name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        sort_alphabetically(&mut players);
        players.truncate(limit.max(0) as usize);
        Ok(players)
    }

    async fn update_player(&self, id: Uuid, update: &PlayerUpdate) -> AppResult<Option<Player>> {
        let mut t = self.tables.write().await;
        if let Some(name) = &update.display_name {
            if t.player_by_name(name).is_some_and(|p| p.id != id) {
                return Err(AppError::Validation("Display name is already taken".into()));
            }
        }
        let Some(player) = t.players.get_mut(&id) else {
            return Ok(None);
        };
        update.apply(player);
        Ok(Some(player.clone()))
    }

    async fn insert_match(&self, m: &Match) -> AppResult<()> {
        self.tables.write().await.matches.insert(m.id, m.clone());
        Ok(())
    }

    async fn get_match(&self, id: Uuid) -> AppResult<Option<Match>> {
        Ok(self.tables.read().await.matches.get(&id).cloned())
    }

    async fn list_upcoming(&self, now: DateTime<Utc>, limit: i64) -> AppResult<Vec<Match>> {
        let mut matches: Vec<Match> = self
            .tables
            .read()
            .await
            .matches
            .values()
            .filter(|m| m.starts_at >= now)
            .cloned()
            .collect();
        matches.sort_by_key(|m| m.starts_at);
        matches.truncate(limit.max(0) as usize);
        Ok(matches)
    }

    async fn count_upcoming(&self, now: DateTime<Utc>) -> AppResult<i64> {
        let t = self.tables.read().await;
        Ok(t.matches.values().filter(|m| m.starts_at >= now).count() as i64)
    }

    async fn replace_match(&self, m: &Match) -> AppResult<bool> {
        let mut t = self.tables.write().await;
        match t.matches.get_mut(&m.id) {
            Some(existing) => {
                *existing = m.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_match(&self, id: Uuid) -> AppResult<bool> {
        let mut t = self.tables.write().await;
        if t.matches.remove(&id).is_none() {
            return Ok(false);
        }
        t.signups.retain(|s| s.match_id != id);
        Ok(true)
    }

    async fn insert_signup(&self, new: &NewSignup) -> AppResult<Signup> {
        let mut t = self.tables.write().await;
        let m = t.require_match(new.match_id)?.clone();

        // A name-resolved player is only persisted once every check passed.
        let (player, created) = match &new.player {
            PlayerRef::Existing(id) => {
                let p = t
                    .players
                    .get(id)
                    .cloned()
                    .ok_or_else(|| AppError::NotFound("Player not found".into()))?;
                (p, false)
            }
            PlayerRef::ByName(name) => match t.player_by_name(name) {
                Some(p) => (p.clone(), false),
                None => (
                    Player {
                        id: Uuid::new_v4(),
                        display_name: name.clone(),
                        image_url: None,
                        preferred_position: None,
                        created_at: Utc::now(),
                    },
                    true,
                ),
            },
        };

        if t.signup_index(m.id, player.id).is_some() {
            return Err(AppError::DuplicateSignup);
        }
        t.check_capacity(&m, new.enforce_capacity)?;

        let signup = Signup {
            match_id: m.id,
            player_id: player.id,
            team: new.team,
            position: new.position,
            display_name_snapshot: player.display_name.clone(),
            created_at: Utc::now(),
        };
        if created {
            t.players.insert(player.id, player);
        }
        t.signups.push(signup.clone());
        Ok(signup)
    }

    async fn upsert_signup(
        &self,
        match_id: Uuid,
        player_id: Uuid,
        team: Team,
        position: Option<Position>,
        enforce_capacity: bool,
    ) -> AppResult<Signup> {
        let mut t = self.tables.write().await;
        let m = t.require_match(match_id)?.clone();
        let player = t
            .players
            .get(&player_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Player not found".into()))?;

        if let Some(idx) = t.signup_index(match_id, player_id) {
            let row = &mut t.signups[idx];
            row.team = team;
            row.position = position;
            return Ok(row.clone());
        }

        t.check_capacity(&m, enforce_capacity)?;
        let signup = Signup {
            match_id,
            player_id,
            team,
            position,
            display_name_snapshot: player.display_name,
            created_at: Utc::now(),
        };
        t.signups.push(signup.clone());
        Ok(signup)
    }

    async fn update_signup(
        &self,
        match_id: Uuid,
        player_id: Uuid,
        update: &SignupUpdate,
    ) -> AppResult<Option<Signup>> {
        let mut t = self.tables.write().await;
        let Some(idx) = t.signup_index(match_id, player_id) else {
            return Ok(None);
        };
        let row = &mut t.signups[idx];
        update.apply(row);
        Ok(Some(row.clone()))
    }

    async fn delete_signup(&self, match_id: Uuid, player_id: Uuid) -> AppResult<bool> {
        let mut t = self.tables.write().await;
        match t.signup_index(match_id, player_id) {
            Some(idx) => {
                t.signups.remove(idx);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_roster(&self, match_id: Uuid) -> AppResult<Vec<RosterRow>> {
        let t = self.tables.read().await;
        let mut rows: Vec<RosterRow> = t
            .signups
            .iter()
            .filter(|s| s.match_id == match_id)
            .filter_map(|s| {
                let p = t.players.get(&s.player_id)?;
                Some(RosterRow {
                    match_id: s.match_id,
                    player_id: s.player_id,
                    team: s.team,
                    position: s.position,
                    display_name_snapshot: s.display_name_snapshot.clone(),
                    created_at: s.created_at,
                    display_name: p.display_name.clone(),
                    image_url: p.image_url.clone(),
                    preferred_position: p.preferred_position,
                })
            })
            .collect();
        rows.sort_by_key(|r| r.created_at);
        Ok(rows)
    }

    async fn count_signups(&self, match_id: Uuid) -> AppResult<i64> {
        Ok(self.tables.read().await.signup_count(match_id))
    }

    async fn count_signups_since(&self, since: DateTime<Utc>) -> AppResult<i64> {
        let t = self.tables.read().await;
        Ok(t.signups.iter().filter(|s| s.created_at >= since).count() as i64)
    }
}

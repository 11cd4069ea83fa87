//! Signups, capacity accounting and lineup projection.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::cache::keys;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::Identity;
use crate::models::{
    LineupEntry, LineupGroup, NewSignup, PlayerRef, PositionGroup, RosterRow, Signup,
    SignupRequest, SignupUpdate, Team, UpsertSignupRequest, UNPOSITIONED_ORDER,
};
use crate::services::{matches, players};
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapacityStatus {
    pub white: i64,
    pub black: i64,
    pub total: i64,
    pub capacity: i64,
    /// Floored at zero; a lenient store may hold more signups than capacity.
    pub spots_remaining: i64,
    pub is_full: bool,
}

impl CapacityStatus {
    pub fn count(&self, team: Team) -> i64 {
        match team {
            Team::White => self.white,
            Team::Black => self.black,
        }
    }
}

pub fn capacity_status(capacity: i32, rows: &[RosterRow]) -> CapacityStatus {
    let white = rows.iter().filter(|r| r.team == Team::White).count() as i64;
    let black = rows.iter().filter(|r| r.team == Team::Black).count() as i64;
    let total = white + black;
    let capacity = capacity as i64;
    let spots_remaining = (capacity - total).max(0);
    CapacityStatus {
        white,
        black,
        total,
        capacity,
        spots_remaining,
        is_full: spots_remaining == 0,
    }
}

fn to_entry(row: &RosterRow) -> LineupEntry {
    LineupEntry {
        match_id: row.match_id,
        team: row.team,
        player_id: row.player_id,
        display_name: row.display_name.clone(),
        image_url: row.image_url.clone(),
        position: row.position,
        position_order: row.position.map_or(UNPOSITIONED_ORDER, |p| p.order()),
        position_label: row.position.map(|p| p.label()),
    }
}

/// One team's lineup in canonical position order. Rows arrive oldest first and
/// the sort is stable, so unpositioned entries trail in signup order.
pub fn lineup(rows: &[RosterRow], team: Team) -> Vec<LineupEntry> {
    let mut entries: Vec<LineupEntry> = rows
        .iter()
        .filter(|r| r.team == team)
        .map(to_entry)
        .collect();
    entries.sort_by_key(|e| e.position_order);
    entries
}

/// Lineup bucketed by pitch area. Empty groups are left out.
pub fn group_lineup(entries: Vec<LineupEntry>) -> Vec<LineupGroup> {
    const ORDER: [PositionGroup; 5] = [
        PositionGroup::Goalkeeper,
        PositionGroup::Defense,
        PositionGroup::Midfield,
        PositionGroup::Attack,
        PositionGroup::Unassigned,
    ];
    let group_of = |e: &LineupEntry| e.position.map_or(PositionGroup::Unassigned, |p| p.group());

    ORDER
        .iter()
        .filter_map(|group| {
            let members: Vec<LineupEntry> = entries
                .iter()
                .filter(|e| group_of(e) == *group)
                .cloned()
                .collect();
            (!members.is_empty()).then(|| LineupGroup {
                group: *group,
                entries: members,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamLineups {
    pub white: Vec<LineupEntry>,
    pub black: Vec<LineupEntry>,
    pub capacity: CapacityStatus,
}

/// Roster rows of one match with live player data, through the cache.
pub(crate) async fn load_roster(state: &AppState, match_id: Uuid) -> AppResult<Vec<RosterRow>> {
    let key = keys::roster(match_id);
    if let Some(rows) = state.cache.get_json::<Vec<RosterRow>>(&key).await {
        return Ok(rows);
    }
    let rows = state.store.list_roster(match_id).await?;
    state.cache.set_json(&key, &rows).await;
    Ok(rows)
}

fn resolve_player_ref(req: &SignupRequest) -> AppResult<PlayerRef> {
    match (req.player_id, req.player_name.as_deref()) {
        (Some(id), _) => Ok(PlayerRef::Existing(id)),
        (None, Some(name)) => Ok(PlayerRef::ByName(players::normalize_display_name(name)?)),
        (None, None) => Err(AppError::Validation(
            "Either player_id or player_name is required".into(),
        )),
    }
}

/// Non-admins may not join or move into a match that already kicked off.
fn ensure_open(identity: &Identity, starts_at: DateTime<Utc>, now: DateTime<Utc>) -> AppResult<()> {
    if !identity.is_admin && starts_at < now {
        return Err(AppError::Validation("This match has already started".into()));
    }
    Ok(())
}

/// Joins a player to a team. A repeat signup for the same pair fails with
/// [`AppError::DuplicateSignup`].
pub async fn signup(
    state: &AppState,
    identity: &Identity,
    match_id: Uuid,
    req: SignupRequest,
    now: DateTime<Utc>,
) -> AppResult<Signup> {
    let actor = identity.require_actor()?;
    let player = resolve_player_ref(&req)?;
    let m = matches::load_match(state, match_id).await?;
    ensure_open(identity, m.starts_at, now)?;

    let new = NewSignup {
        match_id,
        player,
        team: req.team,
        position: req.position,
        enforce_capacity: state.config.roster.enforce_capacity,
    };
    let signup = state.store.insert_signup(&new).await?;
    state.cache.invalidate_roster(match_id).await;
    tracing::info!(
        %match_id,
        player_id = %signup.player_id,
        actor_id = %actor.id,
        team = signup.team.as_str(),
        "signup created"
    );
    Ok(signup)
}

/// Creates the signup or overwrites team and position of the existing one.
pub async fn upsert_signup(
    state: &AppState,
    identity: &Identity,
    match_id: Uuid,
    req: UpsertSignupRequest,
    now: DateTime<Utc>,
) -> AppResult<Signup> {
    identity.require_admin_or_self(req.player_id)?;
    let m = matches::load_match(state, match_id).await?;
    ensure_open(identity, m.starts_at, now)?;

    let signup = state
        .store
        .upsert_signup(
            match_id,
            req.player_id,
            req.team,
            req.position,
            state.config.roster.enforce_capacity,
        )
        .await?;
    state.cache.invalidate_roster(match_id).await;
    tracing::info!(%match_id, player_id = %req.player_id, "signup upserted");
    Ok(signup)
}

pub async fn update_signup(
    state: &AppState,
    identity: &Identity,
    match_id: Uuid,
    player_id: Uuid,
    update: SignupUpdate,
) -> AppResult<Signup> {
    identity.require_admin_or_self(player_id)?;
    if update.is_empty() {
        return Err(AppError::Validation("Nothing to update".into()));
    }
    let signup = state
        .store
        .update_signup(match_id, player_id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound("Signup not found".into()))?;
    state.cache.invalidate_roster(match_id).await;
    Ok(signup)
}

pub async fn delete_signup(
    state: &AppState,
    identity: &Identity,
    match_id: Uuid,
    player_id: Uuid,
) -> AppResult<()> {
    let actor = identity.require_admin_or_self(player_id)?;
    if !state.store.delete_signup(match_id, player_id).await? {
        return Err(AppError::NotFound("Signup not found".into()));
    }
    state.cache.invalidate_roster(match_id).await;
    tracing::info!(%match_id, %player_id, actor_id = %actor.id, "signup removed");
    Ok(())
}

/// Raw signup rows of a match, oldest first, snapshot included.
pub async fn list_signups(state: &AppState, match_id: Uuid) -> AppResult<Vec<RosterRow>> {
    matches::load_match(state, match_id).await?;
    load_roster(state, match_id).await
}

pub async fn get_lineup(
    state: &AppState,
    match_id: Uuid,
    team: Team,
) -> AppResult<Vec<LineupEntry>> {
    matches::load_match(state, match_id).await?;
    let rows = load_roster(state, match_id).await?;
    Ok(lineup(&rows, team))
}

/// Both teams plus capacity numbers from a single roster read.
pub async fn get_lineups(state: &AppState, match_id: Uuid) -> AppResult<TeamLineups> {
    let m = matches::load_match(state, match_id).await?;
    let rows = load_roster(state, match_id).await?;
    Ok(TeamLineups {
        white: lineup(&rows, Team::White),
        black: lineup(&rows, Team::Black),
        capacity: capacity_status(m.capacity, &rows),
    })
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum Team {
    White,
    Black,
}

impl Team {
    pub fn as_str(self) -> &'static str {
        match self {
            Team::White => "white",
            Team::Black => "black",
        }
    }
}

/// Pitch positions in canonical lineup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum Position {
    Gk,
    Lb,
    Cb,
    Rb,
    Cm,
    St1,
    St2,
}

/// Sort key for entries without a position; they trail every positioned entry.
pub const UNPOSITIONED_ORDER: i32 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionGroup {
    Goalkeeper,
    Defense,
    Midfield,
    Attack,
    Unassigned,
}

impl Position {
    pub const ALL: [Position; 7] = [
        Position::Gk,
        Position::Lb,
        Position::Cb,
        Position::Rb,
        Position::Cm,
        Position::St1,
        Position::St2,
    ];

    pub fn order(self) -> i32 {
        match self {
            Position::Gk => 1,
            Position::Lb => 2,
            Position::Cb => 3,
            Position::Rb => 4,
            Position::Cm => 5,
            Position::St1 => 6,
            Position::St2 => 7,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Position::Gk => "Goalkeeper",
            Position::Lb => "Left Back",
            Position::Cb => "Center Back",
            Position::Rb => "Right Back",
            Position::Cm => "Midfielder",
            Position::St1 | Position::St2 => "Striker",
        }
    }

    pub fn group(self) -> PositionGroup {
        match self {
            Position::Gk => PositionGroup::Goalkeeper,
            Position::Lb | Position::Cb | Position::Rb => PositionGroup::Defense,
            Position::Cm => PositionGroup::Midfield,
            Position::St1 | Position::St2 => PositionGroup::Attack,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Signup {
    pub match_id: Uuid,
    pub player_id: Uuid,
    pub team: Team,
    pub position: Option<Position>,
    /// Name at signup time. Kept for auditing; lineups show the live name.
    pub display_name_snapshot: String,
    pub created_at: DateTime<Utc>,
}

/// A signup joined with the live player row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RosterRow {
    pub match_id: Uuid,
    pub player_id: Uuid,
    pub team: Team,
    pub position: Option<Position>,
    pub display_name_snapshot: String,
    pub created_at: DateTime<Utc>,
    pub display_name: String,
    pub image_url: Option<String>,
    pub preferred_position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineupEntry {
    pub match_id: Uuid,
    pub team: Team,
    pub player_id: Uuid,
    pub display_name: String,
    pub image_url: Option<String>,
    pub position: Option<Position>,
    pub position_order: i32,
    pub position_label: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineupGroup {
    pub group: PositionGroup,
    pub entries: Vec<LineupEntry>,
}

/// Who is joining: an existing player, or a name to find-or-create.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerRef {
    Existing(Uuid),
    ByName(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub player_id: Option<Uuid>,
    pub player_name: Option<String>,
    pub team: Team,
    pub position: Option<Position>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpsertSignupRequest {
    pub player_id: Uuid,
    pub team: Team,
    pub position: Option<Position>,
}

/// Team/position change for an existing signup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupUpdate {
    pub team: Option<Team>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub position: Option<Option<Position>>,
}

impl SignupUpdate {
    pub fn is_empty(&self) -> bool {
        self.team.is_none() && self.position.is_none()
    }

    pub fn apply(&self, signup: &mut Signup) {
        if let Some(team) = self.team {
            signup.team = team;
        }
        if let Some(pos) = self.position {
            signup.position = pos;
        }
    }
}

/// Insert request handed to the store; every check runs in one transaction.
#[derive(Debug, Clone)]
pub struct NewSignup {
    pub match_id: Uuid,
    pub player: PlayerRef,
    pub team: Team,
    pub position: Option<Position>,
    pub enforce_capacity: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_is_strictly_increasing() {
        let orders: Vec<i32> = Position::ALL.iter().map(|p| p.order()).collect();
        assert!(orders.windows(2).all(|w| w[0] < w[1]));
        assert!(orders.iter().all(|o| *o < UNPOSITIONED_ORDER));
    }

    #[test]
    fn positions_serialize_as_short_codes() {
        assert_eq!(serde_json::to_string(&Position::St1).unwrap(), "\"st1\"");
        assert_eq!(serde_json::to_string(&Team::Black).unwrap(), "\"black\"");
        let p: Position = serde_json::from_str("\"gk\"").unwrap();
        assert_eq!(p, Position::Gk);
    }

    #[test]
    fn signup_update_distinguishes_clear_from_keep() {
        let keep: SignupUpdate = serde_json::from_str(r#"{"team":"black"}"#).unwrap();
        assert_eq!(keep.position, None);
        let clear: SignupUpdate = serde_json::from_str(r#"{"position":null}"#).unwrap();
        assert_eq!(clear.position, Some(None));
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum MatchType {
    #[default]
    Friendly,
    Training,
    Tournament,
}

impl MatchType {
    /// Squad sizes allowed at creation time.
    pub fn capacity_range(self) -> RangeInclusive<i32> {
        match self {
            MatchType::Training => 1..=6,
            MatchType::Friendly | MatchType::Tournament => 14..=18,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MatchType::Friendly => "Friendly",
            MatchType::Training => "Training",
            MatchType::Tournament => "Tournament",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Match {
    pub id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub location: Option<String>,
    pub capacity: i32,
    pub is_private: bool,
    pub match_type: MatchType,
    pub total_cost: Option<f64>,
    pub rented_by_player_id: Option<Uuid>,
    pub rented_by_name: Option<String>,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub created_by_label: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Match {
    pub fn cost_per_player(&self) -> Option<f64> {
        match self.total_cost {
            Some(cost) if self.capacity > 0 => Some(cost / self.capacity as f64),
            _ => None,
        }
    }

    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.starts_at >= now
    }
}

fn default_capacity() -> i32 {
    18
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMatchRequest {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub location: String,
    #[serde(default = "default_capacity")]
    pub capacity: i32,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub match_type: MatchType,
    pub total_cost: Option<f64>,
    pub rented_by_player_id: Option<Uuid>,
    pub rented_by_name: Option<String>,
    pub description: Option<String>,
}

/// Per-field match update; nullable columns take a double option.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchUpdate {
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub location: Option<Option<String>>,
    pub capacity: Option<i32>,
    pub is_private: Option<bool>,
    pub match_type: Option<MatchType>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub total_cost: Option<Option<f64>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub rented_by_player_id: Option<Option<Uuid>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub rented_by_name: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
}

impl MatchUpdate {
    pub fn is_empty(&self) -> bool {
        self.starts_at.is_none()
            && self.ends_at.is_none()
            && self.location.is_none()
            && self.capacity.is_none()
            && self.is_private.is_none()
            && self.match_type.is_none()
            && self.total_cost.is_none()
            && self.rented_by_player_id.is_none()
            && self.rented_by_name.is_none()
            && self.description.is_none()
    }

    /// Returns the record as it would look after the update.
    pub fn merged(&self, current: &Match) -> Match {
        let mut m = current.clone();
        if let Some(v) = self.starts_at {
            m.starts_at = v;
        }
        if let Some(v) = self.ends_at {
            m.ends_at = v;
        }
        if let Some(v) = &self.location {
            m.location = v.clone();
        }
        if let Some(v) = self.capacity {
            m.capacity = v;
        }
        if let Some(v) = self.is_private {
            m.is_private = v;
        }
        if let Some(v) = self.match_type {
            m.match_type = v;
        }
        if let Some(v) = self.total_cost {
            m.total_cost = v;
        }
        if let Some(v) = self.rented_by_player_id {
            m.rented_by_player_id = v;
        }
        if let Some(v) = &self.rented_by_name {
            m.rented_by_name = v.clone();
        }
        if let Some(v) = &self.description {
            m.description = v.clone();
        }
        m
    }
}

/// Match as handed to callers, after the visibility filter ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchView {
    pub id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub location: Option<String>,
    pub location_hidden: bool,
    pub capacity: i32,
    pub is_private: bool,
    pub match_type: MatchType,
    pub total_cost: Option<f64>,
    pub cost_per_player: Option<f64>,
    pub rented_by_player_id: Option<Uuid>,
    pub rented_by_name: Option<String>,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSummary {
    #[serde(rename = "match")]
    pub match_view: MatchView,
    pub white_count: i64,
    pub black_count: i64,
    pub total_signups: i64,
    pub spots_remaining: i64,
    pub is_full: bool,
    pub is_upcoming: bool,
    pub can_signup: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchPreview {
    pub match_id: Uuid,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AppStats {
    pub upcoming_matches: i64,
    pub recent_signups: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    pub limit: Option<i64>,
}

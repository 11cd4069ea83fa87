pub mod admin_registry;
pub mod matches;
pub mod players;
pub mod roster;
pub mod stats;
pub mod visibility;

pub use admin_registry::AdminRegistry;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use crate::config::Config;
    use crate::middleware::auth::{Actor, Identity};
    use crate::models::{CreateMatchRequest, Match, MatchType};
    use crate::AppState;

    pub const ADMIN_EMAIL: &str = "admin@club.test";

    pub fn memory_state() -> AppState {
        AppState::in_memory(Config::in_memory("test-secret", &[ADMIN_EMAIL]))
    }

    pub fn user(email: &str) -> Identity {
        Identity {
            actor: Some(Actor {
                id: Uuid::new_v4(),
                email: Some(email.to_string()),
            }),
            is_admin: false,
        }
    }

    pub fn admin() -> Identity {
        Identity {
            is_admin: true,
            ..user(ADMIN_EMAIL)
        }
    }

    /// Friendly for 18 starting tomorrow, valid as is.
    pub fn friendly_request() -> CreateMatchRequest {
        let starts_at = Utc::now() + Duration::days(1);
        CreateMatchRequest {
            starts_at,
            ends_at: starts_at + Duration::minutes(90),
            location: "Riverside Pitch 3".into(),
            capacity: 18,
            is_private: false,
            match_type: MatchType::Friendly,
            total_cost: Some(90.0),
            rented_by_player_id: None,
            rented_by_name: Some("Marta".into()),
            description: None,
        }
    }

    pub async fn create_tomorrow(state: &AppState) -> Match {
        super::matches::create_match(state, &admin(), friendly_request(), Utc::now())
            .await
            .expect("valid match")
    }
}

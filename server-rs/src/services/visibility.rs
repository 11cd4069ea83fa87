use crate::models::{Match, MatchView};

/// Shown instead of the location of a private match to non-admins.
pub const PRIVATE_LOCATION: &str = "Private location";

/// Projects a match for a caller. Private matches lose their location for
/// anyone who is not an admin.
pub fn redact(m: &Match, is_admin: bool) -> MatchView {
    let hide = m.is_private && !is_admin;
    MatchView {
        id: m.id,
        starts_at: m.starts_at,
        ends_at: m.ends_at,
        location: if hide {
            Some(PRIVATE_LOCATION.to_string())
        } else {
            m.location.clone()
        },
        location_hidden: hide,
        capacity: m.capacity,
        is_private: m.is_private,
        match_type: m.match_type,
        total_cost: m.total_cost,
        cost_per_player: m.cost_per_player(),
        rented_by_player_id: m.rented_by_player_id,
        rented_by_name: m.rented_by_name.clone(),
        description: m.description.clone(),
        created_by: m.created_by,
        created_at: m.created_at,
    }
}

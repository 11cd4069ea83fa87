use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::cache::keys;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::Identity;
use crate::models::{
    CreateMatchRequest, Match, MatchPreview, MatchSummary, MatchUpdate, MatchView, Team,
};
use crate::services::{roster, visibility};
use crate::AppState;

const LOCATION_LEN: (usize, usize) = (3, 100);
const ORGANIZER_NAME_LEN: (usize, usize) = (2, 50);
const DESCRIPTION_MAX: usize = 500;
const MAX_TOTAL_COST: f64 = 500.0;
/// Size of the cached upcoming list; larger requests bypass the cache.
const UPCOMING_CACHE_SIZE: i64 = 100;

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_len(field: &str, value: &str, (min, max): (usize, usize)) -> AppResult<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(AppError::Validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

/// Rules every stored match satisfies, checked on create and on the merged
/// record of an update.
pub fn validate_record(m: &Match) -> AppResult<()> {
    if m.ends_at <= m.starts_at {
        return Err(AppError::Validation("Match must end after it starts".into()));
    }
    let range = m.match_type.capacity_range();
    if !range.contains(&m.capacity) {
        return Err(AppError::Validation(format!(
            "Capacity for a {} match must be between {} and {}",
            m.match_type.label().to_lowercase(),
            range.start(),
            range.end()
        )));
    }
    if let Some(cost) = m.total_cost {
        if !(0.0..=MAX_TOTAL_COST).contains(&cost) {
            return Err(AppError::Validation(format!(
                "Total cost must be between 0 and {MAX_TOTAL_COST}"
            )));
        }
    }
    if m.rented_by_player_id.is_none() && m.rented_by_name.is_none() {
        return Err(AppError::Validation("An organizer is required".into()));
    }
    if let Some(name) = &m.rented_by_name {
        check_len("Organizer name", name, ORGANIZER_NAME_LEN)?;
    }
    match &m.location {
        Some(location) => check_len("Location", location, LOCATION_LEN)?,
        None => return Err(AppError::Validation("Location is required".into())),
    }
    if let Some(description) = &m.description {
        if description.chars().count() > DESCRIPTION_MAX {
            return Err(AppError::Validation(format!(
                "Description cannot exceed {DESCRIPTION_MAX} characters"
            )));
        }
    }
    Ok(())
}

async fn ensure_player_exists(state: &AppState, id: Option<Uuid>) -> AppResult<()> {
    if let Some(id) = id {
        if state.store.get_player(id).await?.is_none() {
            return Err(AppError::Validation("Organizer player does not exist".into()));
        }
    }
    Ok(())
}

pub async fn create_match(
    state: &AppState,
    identity: &Identity,
    req: CreateMatchRequest,
    now: DateTime<Utc>,
) -> AppResult<Match> {
    let actor = identity.require_admin()?;

    let location = trimmed(Some(req.location))
        .ok_or_else(|| AppError::Validation("Location is required".into()))?;
    if req.starts_at <= now {
        return Err(AppError::Validation("Match must start in the future".into()));
    }

    let m = Match {
        id: Uuid::new_v4(),
        starts_at: req.starts_at,
        ends_at: req.ends_at,
        location: Some(location),
        capacity: req.capacity,
        is_private: req.is_private,
        match_type: req.match_type,
        total_cost: req.total_cost,
        rented_by_player_id: req.rented_by_player_id,
        rented_by_name: trimmed(req.rented_by_name),
        description: trimmed(req.description),
        created_by: actor.id,
        created_by_label: actor.email.clone(),
        created_at: now,
    };
    validate_record(&m)?;
    ensure_player_exists(state, m.rented_by_player_id).await?;

    state.store.insert_match(&m).await?;
    state.cache.del(keys::UPCOMING).await;
    tracing::info!(match_id = %m.id, created_by = %actor.id, "match created");
    Ok(m)
}

pub async fn update_match(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
    mut update: MatchUpdate,
) -> AppResult<Match> {
    identity.require_admin()?;
    if update.is_empty() {
        return Err(AppError::Validation("Nothing to update".into()));
    }
    let current = state
        .store
        .get_match(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Match not found".into()))?;

    if let Some(name) = update.rented_by_name.take() {
        update.rented_by_name = Some(trimmed(name));
    }
    if let Some(description) = update.description.take() {
        update.description = Some(trimmed(description));
    }
    if let Some(location) = update.location.take() {
        update.location = Some(trimmed(location));
    }

    let merged = update.merged(&current);
    validate_record(&merged)?;
    if let Some(Some(player_id)) = update.rented_by_player_id {
        ensure_player_exists(state, Some(player_id)).await?;
    }
    if merged.capacity < current.capacity {
        let taken = state.store.count_signups(id).await?;
        if (merged.capacity as i64) < taken {
            return Err(AppError::Validation(format!(
                "Capacity cannot drop below the {taken} players already signed up"
            )));
        }
    }

    if !state.store.replace_match(&merged).await? {
        return Err(AppError::NotFound("Match not found".into()));
    }
    state.cache.invalidate_match(id).await;
    tracing::info!(match_id = %id, "match updated");
    Ok(merged)
}

pub async fn delete_match(state: &AppState, identity: &Identity, id: Uuid) -> AppResult<()> {
    let actor = identity.require_admin()?;
    if !state.store.delete_match(id).await? {
        return Err(AppError::NotFound("Match not found".into()));
    }
    state.cache.invalidate_match(id).await;
    tracing::info!(match_id = %id, deleted_by = %actor.id, "match deleted");
    Ok(())
}

/// Unredacted match, through the cache. Never hand this to a caller directly.
pub(crate) async fn load_match(state: &AppState, id: Uuid) -> AppResult<Match> {
    let key = keys::match_detail(id);
    if let Some(m) = state.cache.get_json::<Match>(&key).await {
        return Ok(m);
    }
    let m = state
        .store
        .get_match(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Match not found".into()))?;
    state.cache.set_json(&key, &m).await;
    Ok(m)
}

pub async fn get_match(state: &AppState, identity: &Identity, id: Uuid) -> AppResult<MatchView> {
    let m = load_match(state, id).await?;
    Ok(visibility::redact(&m, identity.is_admin))
}

/// Upcoming matches (`starts_at >= now`), earliest first.
pub async fn list_upcoming(
    state: &AppState,
    identity: &Identity,
    limit: Option<i64>,
    now: DateTime<Utc>,
) -> AppResult<Vec<MatchView>> {
    let limit = limit.unwrap_or(state.config.roster.upcoming_limit).max(1);

    let matches = if limit <= UPCOMING_CACHE_SIZE {
        let cached = match state.cache.get_json::<Vec<Match>>(keys::UPCOMING).await {
            Some(list) => list,
            None => {
                let list = state.store.list_upcoming(now, UPCOMING_CACHE_SIZE).await?;
                state.cache.set_json(keys::UPCOMING, &list).await;
                list
            }
        };
        // The cached list may hold matches that kicked off since it was built.
        cached
            .into_iter()
            .filter(|m| m.starts_at >= now)
            .take(limit as usize)
            .collect()
    } else {
        state.store.list_upcoming(now, limit).await?
    };

    Ok(matches
        .iter()
        .map(|m| visibility::redact(m, identity.is_admin))
        .collect())
}

/// Match detail plus the capacity badge numbers.
pub async fn get_summary(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<MatchSummary> {
    let m = load_match(state, id).await?;
    let rows = roster::load_roster(state, id).await?;
    let status = roster::capacity_status(m.capacity, &rows);
    let is_upcoming = m.is_upcoming(now);
    Ok(MatchSummary {
        match_view: visibility::redact(&m, identity.is_admin),
        white_count: status.count(Team::White),
        black_count: status.count(Team::Black),
        total_signups: status.total,
        spots_remaining: status.spots_remaining,
        is_full: status.is_full,
        is_upcoming,
        can_signup: is_upcoming && !status.is_full,
    })
}

/// Text for link previews. Built from the non-admin projection whoever asks,
/// since previews are shared and cached outside this service.
pub async fn get_preview(state: &AppState, id: Uuid) -> AppResult<MatchPreview> {
    let m = load_match(state, id).await?;
    Ok(preview_for(&visibility::redact(&m, false)))
}

pub fn preview_for(view: &MatchView) -> MatchPreview {
    let kind = view.match_type.label();
    let date = view.starts_at.format("%A %-d %B").to_string();
    let time = view.starts_at.format("%H:%M").to_string();
    let location = view.location.as_deref().unwrap_or(visibility::PRIVATE_LOCATION);

    let mut description = format!(
        "{kind} football match at {location} on {date} at {time}. Capacity: {} players.",
        view.capacity
    );
    if let Some(cost) = view.total_cost {
        description.push_str(&format!(" Cost: €{cost:.2}"));
    }

    MatchPreview {
        match_id: view.id,
        title: format!("{kind} · {date}"),
        description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Denial;
    use crate::models::MatchType;
    use crate::services::test_support::*;
    use chrono::Duration;

    #[tokio::test]
    async fn admin_creates_and_non_admin_cannot() {
        let state = memory_state();
        let m = create_match(&state, &admin(), friendly_request(), Utc::now())
            .await
            .unwrap();
        assert_eq!(m.capacity, 18);
        assert_eq!(m.created_by_label.as_deref(), Some(ADMIN_EMAIL));

        let err = create_match(&state, &user("p@club.test"), friendly_request(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(Denial::NotPermitted, _)));

        let err = create_match(&state, &Identity::anonymous(), friendly_request(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(Denial::SignedOut, _)));
    }

    #[tokio::test]
    async fn capacity_range_depends_on_match_type() {
        let state = memory_state();

        let mut training = friendly_request();
        training.match_type = MatchType::Training;
        training.capacity = 18;
        let err = create_match(&state, &admin(), training.clone(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        training.capacity = 6;
        assert!(create_match(&state, &admin(), training, Utc::now()).await.is_ok());

        let mut small_friendly = friendly_request();
        small_friendly.capacity = 10;
        assert!(create_match(&state, &admin(), small_friendly, Utc::now())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn rejects_bad_schedule_and_missing_organizer() {
        let state = memory_state();

        let mut backwards = friendly_request();
        backwards.ends_at = backwards.starts_at - Duration::minutes(1);
        assert!(matches!(
            create_match(&state, &admin(), backwards, Utc::now()).await,
            Err(AppError::Validation(_))
        ));

        let mut past = friendly_request();
        past.starts_at = Utc::now() - Duration::hours(2);
        past.ends_at = Utc::now() - Duration::hours(1);
        assert!(create_match(&state, &admin(), past, Utc::now()).await.is_err());

        let mut nobody = friendly_request();
        nobody.rented_by_name = Some("   ".into());
        assert!(matches!(
            create_match(&state, &admin(), nobody, Utc::now()).await,
            Err(AppError::Validation(_))
        ));

        let mut ghost = friendly_request();
        ghost.rented_by_name = None;
        ghost.rented_by_player_id = Some(Uuid::new_v4());
        assert!(create_match(&state, &admin(), ghost, Utc::now()).await.is_err());
    }

    #[tokio::test]
    async fn update_merges_and_revalidates() {
        let state = memory_state();
        let m = create_match(&state, &admin(), friendly_request(), Utc::now())
            .await
            .unwrap();

        let updated = update_match(
            &state,
            &admin(),
            m.id,
            MatchUpdate {
                capacity: Some(14),
                total_cost: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.capacity, 14);
        assert_eq!(updated.total_cost, None);
        assert_eq!(updated.location, m.location);

        // switching to training keeps capacity 14, which training does not allow
        let err = update_match(
            &state,
            &admin(),
            m.id,
            MatchUpdate {
                match_type: Some(MatchType::Training),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = update_match(
            &state,
            &user("p@club.test"),
            m.id,
            MatchUpdate {
                capacity: Some(16),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(Denial::NotPermitted, _)));
    }

    #[tokio::test]
    async fn update_cannot_clear_or_blank_location() {
        let state = memory_state();
        let m = create_match(&state, &admin(), friendly_request(), Utc::now())
            .await
            .unwrap();

        for location in [None, Some("   ".to_string())] {
            let err = update_match(
                &state,
                &admin(),
                m.id,
                MatchUpdate {
                    location: Some(location),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }

        let stored = get_match(&state, &admin(), m.id).await.unwrap();
        assert_eq!(stored.location, m.location);
    }

    #[tokio::test]
    async fn non_admin_delete_leaves_match_in_place() {
        let state = memory_state();
        let m = create_match(&state, &admin(), friendly_request(), Utc::now())
            .await
            .unwrap();

        let err = delete_match(&state, &user("p@club.test"), m.id).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(Denial::NotPermitted, _)));
        assert!(get_match(&state, &Identity::anonymous(), m.id).await.is_ok());

        delete_match(&state, &admin(), m.id).await.unwrap();
        assert!(matches!(
            get_match(&state, &admin(), m.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            delete_match(&state, &admin(), m.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn upcoming_is_ordered_filtered_and_redacted() {
        let state = memory_state();
        let now = Utc::now();

        let mut later = friendly_request();
        later.starts_at = now + Duration::days(3);
        later.ends_at = later.starts_at + Duration::hours(1);
        later.is_private = true;
        let later = create_match(&state, &admin(), later, now).await.unwrap();
        let sooner = create_match(&state, &admin(), friendly_request(), now)
            .await
            .unwrap();

        let list = list_upcoming(&state, &Identity::anonymous(), None, now)
            .await
            .unwrap();
        let ids: Vec<Uuid> = list.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![sooner.id, later.id]);
        assert_eq!(
            list[1].location.as_deref(),
            Some(visibility::PRIVATE_LOCATION)
        );

        let admin_list = list_upcoming(&state, &admin(), Some(1), now).await.unwrap();
        assert_eq!(admin_list.len(), 1);

        // from two days out only the later match is still upcoming
        let list = list_upcoming(&state, &admin(), None, now + Duration::days(2))
            .await
            .unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].location, later.location);
    }

    #[tokio::test]
    async fn preview_never_leaks_private_location() {
        let state = memory_state();
        let mut req = friendly_request();
        req.is_private = true;
        req.location = "Secret Garden Pitch".into();
        let m = create_match(&state, &admin(), req, Utc::now()).await.unwrap();

        let preview = get_preview(&state, m.id).await.unwrap();
        assert!(!preview.description.contains("Secret Garden"));
        assert!(preview.description.contains(visibility::PRIVATE_LOCATION));
        assert!(preview.title.starts_with("Friendly"));
    }
}

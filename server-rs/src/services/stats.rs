use chrono::{DateTime, Duration, Utc};

use crate::error::AppResult;
use crate::models::AppStats;
use crate::AppState;

const RECENT_SIGNUP_WINDOW_DAYS: i64 = 30;

pub async fn app_stats(state: &AppState, now: DateTime<Utc>) -> AppResult<AppStats> {
    let upcoming_matches = state.store.count_upcoming(now).await?;
    let recent_signups = state
        .store
        .count_signups_since(now - Duration::days(RECENT_SIGNUP_WINDOW_DAYS))
        .await?;
    Ok(AppStats {
        upcoming_matches,
        recent_signups,
    })
}

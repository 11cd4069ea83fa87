use axum::{extract::State, Extension, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::auth::Identity;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct IdentityResponse {
    pub actor_id: Option<Uuid>,
    pub email: Option<String>,
    pub is_admin: bool,
}

impl From<&Identity> for IdentityResponse {
    fn from(identity: &Identity) -> Self {
        Self {
            actor_id: identity.actor_id(),
            email: identity.actor.as_ref().and_then(|a| a.email.clone()),
            is_admin: identity.is_admin,
        }
    }
}

/// First-authentication callback: enrolls allow-listed admins, then reports
/// the identity as it stands afterwards.
pub async fn start_session(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<IdentityResponse>> {
    let resolved = state
        .admins
        .start_session(state.store.as_ref(), &identity)
        .await?;
    Ok(Json(IdentityResponse::from(&resolved)))
}

pub async fn me(Extension(identity): Extension<Identity>) -> Json<IdentityResponse> {
    Json(IdentityResponse::from(&identity))
}

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult, Denial};
use crate::store::Store;
use crate::AppState;

/// Claims issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // actor id
    pub email: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Who is calling and whether they are an admin right now. Built fresh for
/// every request; the admin flag always comes from the admins relation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub actor: Option<Actor>,
    pub is_admin: bool,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn actor_id(&self) -> Option<Uuid> {
        self.actor.as_ref().map(|a| a.id)
    }

    pub fn require_actor(&self) -> AppResult<&Actor> {
        self.actor
            .as_ref()
            .ok_or_else(|| AppError::Unauthorized(Denial::SignedOut, "Sign in required".into()))
    }

    pub fn require_admin(&self) -> AppResult<&Actor> {
        let actor = self.require_actor()?;
        if !self.is_admin {
            return Err(AppError::Unauthorized(
                Denial::NotPermitted,
                "Admin rights required".into(),
            ));
        }
        Ok(actor)
    }

    /// Admins may act on anyone; everyone else only on themselves.
    pub fn require_admin_or_self(&self, subject: Uuid) -> AppResult<&Actor> {
        let actor = self.require_actor()?;
        if !self.is_admin && actor.id != subject {
            return Err(AppError::Unauthorized(
                Denial::NotPermitted,
                "Only an admin or the player themselves may do this".into(),
            ));
        }
        Ok(actor)
    }
}

/// Signs a bearer token with the shared secret. In production the identity
/// provider issues tokens; this is the issuer for local development against
/// the in-memory store and for the router tests.
pub fn issue_token(
    actor_id: Uuid,
    email: Option<&str>,
    secret: &str,
    expiry_secs: i64,
) -> AppResult<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: actor_id.to_string(),
        email: email.map(String::from),
        exp: now + expiry_secs,
        iat: now,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

fn extract_bearer(req: &Request) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(String::from)
}

/// Admin lookup that fails closed: a store error means "not an admin".
pub async fn lookup_admin(store: &dyn Store, actor_id: Uuid) -> bool {
    match store.is_admin(actor_id).await {
        Ok(is_admin) => is_admin,
        Err(e) => {
            tracing::warn!(%actor_id, "admin lookup failed, treating as non-admin: {e}");
            false
        }
    }
}

pub fn actor_from_token(token: &str, secret: &str) -> Option<Actor> {
    let claims = verify_token(token, secret).ok()?;
    let id = Uuid::parse_str(&claims.sub).ok()?;
    Some(Actor {
        id,
        email: claims.email,
    })
}

/// Middleware: resolves the caller's [`Identity`] for every request. A missing
/// or invalid token yields an anonymous identity rather than an error; each
/// operation decides what it requires.
pub async fn resolve_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let actor = extract_bearer(&req)
        .and_then(|token| actor_from_token(&token, &state.config.jwt.secret));

    let identity = match actor {
        Some(actor) => {
            let is_admin = lookup_admin(state.store.as_ref(), actor.id).await;
            Identity {
                actor: Some(actor),
                is_admin,
            }
        }
        None => Identity::anonymous(),
    };

    req.extensions_mut().insert(identity);
    next.run(req).await
}

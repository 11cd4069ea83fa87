use std::collections::HashSet;
use std::sync::Arc;

use crate::error::AppResult;
use crate::middleware::auth::{lookup_admin, Actor, Identity};
use crate::store::Store;

pub const ADMIN_ROLE: &str = "admin";

/// Bootstrap of the admins relation from the configured e-mail allow-list.
#[derive(Clone, Debug, Default)]
pub struct AdminRegistry {
    allow_list: Arc<HashSet<String>>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl AdminRegistry {
    pub fn new(emails: &[String]) -> Self {
        let allow_list = emails
            .iter()
            .map(|e| normalize_email(e))
            .filter(|e| !e.is_empty())
            .collect();
        Self {
            allow_list: Arc::new(allow_list),
        }
    }

    pub fn is_allowed(&self, email: &str) -> bool {
        self.allow_list.contains(&normalize_email(email))
    }

    /// Privileged path: writes the admin row without checking the actor's
    /// current rights, since the actor is not an admin yet. Only actors whose
    /// verified e-mail is allow-listed get through. Returns `true` when a new
    /// admin row was written.
    pub async fn enroll(&self, store: &dyn Store, actor: &Actor) -> AppResult<bool> {
        let Some(email) = actor.email.as_deref() else {
            return Ok(false);
        };
        if !self.is_allowed(email) {
            return Ok(false);
        }
        let enrolled = store.insert_admin(actor.id, ADMIN_ROLE).await?;
        if enrolled {
            tracing::info!(actor_id = %actor.id, "auto-enrolled admin");
        }
        Ok(enrolled)
    }

    /// First-authentication hook: enrolls when allowed, then re-reads the
    /// admin flag from the store.
    pub async fn start_session(
        &self,
        store: &dyn Store,
        identity: &Identity,
    ) -> AppResult<Identity> {
        let actor = identity.require_actor()?.clone();
        if let Err(e) = self.enroll(store, &actor).await {
            tracing::warn!(actor_id = %actor.id, "admin enrollment failed: {e}");
        }
        let is_admin = lookup_admin(store, actor.id).await;
        Ok(Identity {
            actor: Some(actor),
            is_admin,
        })
    }
}

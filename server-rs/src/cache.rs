use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use uuid::Uuid;

use crate::config::Config;

/// Redis-backed read cache for match and roster views. When Redis is not
/// configured or not reachable the cache is disabled and every call is a
/// miss or a no-op.
#[derive(Clone)]
pub struct Cache {
    conn: Option<ConnectionManager>,
    prefix: String,
    ttl_secs: u64,
}

pub mod keys {
    use uuid::Uuid;

    pub const UPCOMING: &str = "matches:upcoming";

    pub fn match_detail(id: Uuid) -> String {
        format!("matches:{id}")
    }

    pub fn roster(match_id: Uuid) -> String {
        format!("roster:{match_id}")
    }
}

impl Cache {
    pub async fn new(config: &Config) -> Self {
        if !config.redis.enabled {
            return Self::disabled();
        }
        let conn = match Client::open(config.redis_url()) {
            Ok(client) => ConnectionManager::new(client).await,
            Err(e) => Err(e),
        };
        match conn {
            Ok(conn) => Self {
                conn: Some(conn),
                prefix: config.redis.key_prefix.clone(),
                ttl_secs: config.redis.ttl_secs,
            },
            Err(e) => {
                tracing::warn!("Redis unavailable, running without cache: {e}");
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self {
            conn: None,
            prefix: String::new(),
            ttl_secs: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.conn.is_some()
    }

    fn key(&self, k: &str) -> String {
        format!("{}{}", self.prefix, k)
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.conn.clone()?;
        redis::cmd("GET")
            .arg(self.key(key))
            .query_async::<_, Option<String>>(&mut conn)
            .await
            .ok()
            .flatten()
    }

    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key)
            .await
            .and_then(|s| serde_json::from_str(&s).ok())
    }

    pub async fn set(&self, key: &str, value: &str) {
        let Some(mut conn) = self.conn.clone() else {
            return;
        };
        let k = self.key(key);
        let _: Result<(), _> = if self.ttl_secs > 0 {
            conn.set_ex(&k, value, self.ttl_secs).await
        } else {
            conn.set(&k, value).await
        };
    }

    pub async fn set_json<T: serde::Serialize>(&self, key: &str, value: &T) {
        if let Ok(json) = serde_json::to_string(value) {
            self.set(key, &json).await;
        }
    }

    pub async fn del(&self, key: &str) {
        let Some(mut conn) = self.conn.clone() else {
            return;
        };
        let _: Result<(), _> = conn.del(self.key(key)).await;
    }

    /// Drops every view a match write can affect.
    pub async fn invalidate_match(&self, match_id: Uuid) {
        self.del(keys::UPCOMING).await;
        self.del(&keys::match_detail(match_id)).await;
        self.del(&keys::roster(match_id)).await;
    }

    pub async fn invalidate_roster(&self, match_id: Uuid) {
        self.del(&keys::roster(match_id)).await;
    }

    pub async fn health_check(&self) -> bool {
        let Some(mut conn) = self.conn.clone() else {
            return false;
        };
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_cache_always_misses() {
        let cache = Cache::disabled();
        cache.set("k", "v").await;
        assert_eq!(cache.get("k").await, None);
        assert!(!cache.is_enabled());
        assert!(!cache.health_check().await);
    }

    #[test]
    fn keys_are_scoped_per_match() {
        let id = Uuid::nil();
        assert_eq!(keys::match_detail(id), format!("matches:{id}"));
        assert_ne!(keys::match_detail(id), keys::roster(id));
    }
}

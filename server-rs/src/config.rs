use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub store_backend: StoreBackend,
    pub db: DbConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub admin: AdminConfig,
    pub roster: RosterConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Clone, Debug)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub pool_min: u32,
    pub pool_max: u32,
}

#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: u8,
    pub key_prefix: String,
    pub ttl_secs: u64,
}

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
}

#[derive(Clone, Debug)]
pub struct AdminConfig {
    /// Verified e-mail addresses that get enrolled as admins on first sign-in.
    pub emails: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct RosterConfig {
    pub enforce_capacity: bool,
    pub upcoming_limit: i64,
    pub search_limit: i64,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    pub fn from_env() -> Self {
        let store_backend = match env_or("STORE_BACKEND", "postgres").as_str() {
            "memory" => StoreBackend::Memory,
            _ => StoreBackend::Postgres,
        };

        Self {
            port: env_or_parse("PORT", 3000),
            cors_origins: split_list(&env_or("CORS_ORIGINS", "http://localhost:3000")),
            store_backend,
            db: DbConfig {
                host: env_or("DB_HOST", "localhost"),
                port: env_or_parse("DB_PORT", 5432),
                database: env_or("DB_NAME", "matchday"),
                user: env_or("DB_USER", "matchday"),
                password: env_or("DB_PASSWORD", ""),
                pool_min: env_or_parse("DB_POOL_MIN", 1),
                pool_max: env_or_parse("DB_POOL_MAX", 10),
            },
            redis: RedisConfig {
                enabled: env_or_parse("REDIS_ENABLED", true),
                host: env_or("REDIS_HOST", "localhost"),
                port: env_or_parse("REDIS_PORT", 6379),
                password: env::var("REDIS_PASSWORD").ok().filter(|s| !s.is_empty()),
                db: env_or_parse("REDIS_DB", 0),
                key_prefix: "matchday:".to_string(),
                ttl_secs: env_or_parse("CACHE_TTL_SECS", 120),
            },
            jwt: JwtConfig {
                secret: env_or("JWT_SECRET", "change-me-to-a-secure-random-string"),
            },
            admin: AdminConfig {
                emails: split_list(&env_or("ADMIN_EMAILS", "")),
            },
            roster: RosterConfig {
                enforce_capacity: env_or_parse("ENFORCE_CAPACITY", true),
                upcoming_limit: env_or_parse("UPCOMING_LIMIT", 20),
                search_limit: env_or_parse("PLAYER_SEARCH_LIMIT", 10),
            },
        }
    }

    /// Configuration for tests and the in-memory development mode: no Postgres,
    /// no Redis, fixed secret.
    pub fn in_memory(secret: &str, admin_emails: &[&str]) -> Self {
        let mut config = Self::from_env();
        config.store_backend = StoreBackend::Memory;
        config.redis.enabled = false;
        config.jwt.secret = secret.to_string();
        config.admin.emails = admin_emails.iter().map(|e| e.to_string()).collect();
        config.roster.enforce_capacity = true;
        config
    }

    pub fn database_url(&self) -> String {
        if let Ok(url) = env::var("DATABASE_URL") {
            return url;
        }
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.db.user, self.db.password, self.db.host, self.db.port, self.db.database
        )
    }

    pub fn redis_url(&self) -> String {
        if let Ok(url) = env::var("REDIS_URL") {
            return url;
        }
        match &self.redis.password {
            Some(pw) if !pw.is_empty() => format!(
                "redis://:{}@{}:{}/{}",
                pw, self.redis.host, self.redis.port, self.redis.db
            ),
            _ => format!(
                "redis://{}:{}/{}",
                self.redis.host, self.redis.port, self.redis.db
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_drops_blanks() {
        assert_eq!(
            split_list(" a@x.org, ,b@y.org,"),
            vec!["a@x.org".to_string(), "b@y.org".to_string()]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn in_memory_disables_external_services() {
        let config = Config::in_memory("secret", &["admin@club.test"]);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert!(!config.redis.enabled);
        assert_eq!(config.admin.emails, vec!["admin@club.test".to_string()]);
    }
}

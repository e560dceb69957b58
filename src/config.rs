use std::path::PathBuf;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AvatarConfig {
    pub dir: PathBuf,
    /// Owner of uploaded avatars until requests carry an authenticated user.
    pub placeholder_user_id: i64,
}

/// Where user records live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserStore {
    Postgres { database_url: String },
    /// Process-local; everything is lost on exit.
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store: UserStore,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub avatar: AvatarConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store = match std::env::var("USER_STORE").as_deref() {
            Ok("memory") => UserStore::Memory,
            Ok("postgres") | Err(_) => UserStore::Postgres {
                database_url: std::env::var("DATABASE_URL")
                    .context("DATABASE_URL must be set")?,
            },
            Ok(other) => anyhow::bail!("unknown USER_STORE {:?}", other),
        };
        let avatar = AvatarConfig {
            dir: std::env::var("AVATAR_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("images")),
            placeholder_user_id: env_parse("AVATAR_USER_ID", 1),
        };
        Ok(Self {
            store,
            max_connections: env_parse("DB_MAX_CONNECTIONS", 10),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("APP_PORT", 8080),
            avatar,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_parse_falls_back_on_garbage() {
        std::env::set_var("ACCOUNTD_TEST_PORT", "not-a-number");
        assert_eq!(env_parse::<u16>("ACCOUNTD_TEST_PORT", 8080), 8080);
        std::env::set_var("ACCOUNTD_TEST_PORT", "9000");
        assert_eq!(env_parse::<u16>("ACCOUNTD_TEST_PORT", 8080), 9000);
        std::env::remove_var("ACCOUNTD_TEST_PORT");
        assert_eq!(env_parse::<u16>("ACCOUNTD_TEST_PORT", 8080), 8080);
    }

    #[test]
    fn user_store_is_chosen_from_env() {
        std::env::set_var("USER_STORE", "memory");
        assert_eq!(AppConfig::from_env().unwrap().store, UserStore::Memory);

        std::env::set_var("USER_STORE", "sqlite");
        assert!(AppConfig::from_env().is_err());
        std::env::remove_var("USER_STORE");
    }
}

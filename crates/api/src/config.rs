use std::fmt::Display;
use std::str::FromStr;

use souschef_core::generation::DEFAULT_TRASH_GRACE_DAYS;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// Every field except the JWT secret has a local-development default.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// How long shutdown waits for in-flight generation runs.
    pub shutdown_timeout_secs: u64,
    /// Days a soft-deleted recipe stays restorable before the purge job
    /// removes it.
    pub trash_grace_days: i32,
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `HOST`                    | `0.0.0.0`               |
    /// | `PORT`                    | `3000`                  |
    /// | `CORS_ORIGINS`            | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`   | `30`                    |
    /// | `RECIPE_TRASH_GRACE_DAYS` | `30`                    |
    ///
    /// # Panics
    ///
    /// Panics on a value that does not parse, or a negative grace period.
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        let trash_grace_days = env_or("RECIPE_TRASH_GRACE_DAYS", DEFAULT_TRASH_GRACE_DAYS as i32);
        assert!(trash_grace_days >= 0, "RECIPE_TRASH_GRACE_DAYS must not be negative");

        Self {
            host: env_or("HOST", "0.0.0.0".to_string()),
            port: env_or("PORT", 3000),
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", 30),
            trash_grace_days,
            jwt: JwtConfig::from_env(),
        }
    }
}

/// Parse `name` from the environment, or fall back to `default` when unset.
pub(crate) fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name} has an invalid value '{raw}': {e}")),
        Err(_) => default,
    }
}

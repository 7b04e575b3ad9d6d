//! Server configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_GRID_SIZE: u32 = 50;
/// One second shorter than the client gate so a client that waited out its
/// own countdown is never refused.
pub const DEFAULT_COOLDOWN_SECS: u64 = 9;
pub const DEFAULT_PING_INTERVAL_MS: u64 = 25_000;
pub const DEFAULT_PING_TIMEOUT_MS: u64 = 20_000;
/// Entries kept per cell; `GET /pixel/{x}/{y}/history` returns at most this many.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub grid_width: u32,
    pub grid_height: u32,
    pub cooldown: Duration,
    pub ping_interval: Duration,
    pub ping_timeout: Duration,
    pub history_limit: usize,
    /// Origins allowed to send credentialed requests. Empty means any origin,
    /// without credentials.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            grid_width: DEFAULT_GRID_SIZE,
            grid_height: DEFAULT_GRID_SIZE,
            cooldown: Duration::from_secs(DEFAULT_COOLDOWN_SECS),
            ping_interval: Duration::from_millis(DEFAULT_PING_INTERVAL_MS),
            ping_timeout: Duration::from_millis(DEFAULT_PING_TIMEOUT_MS),
            history_limit: DEFAULT_HISTORY_LIMIT,
            allowed_origins: parse_origins(DEFAULT_ALLOWED_ORIGINS),
        }
    }
}

impl ServerConfig {
    /// Build typed server config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 8000
    /// - `GRID_WIDTH` / `GRID_HEIGHT`: default 50
    /// - `COOLDOWN_SECONDS`: default 9
    /// - `PING_INTERVAL_MS` / `PING_TIMEOUT_MS`: default 25000 / 20000
    /// - `HISTORY_LIMIT`: default 100
    /// - `ALLOWED_ORIGINS`: comma-separated, default `http://localhost:3000`,
    ///   `*` for any origin
    ///
    /// `SESSION_SECRET` is read separately through [`session::SessionKey::from_env`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Zero`] for a zero-sized grid or zero ping interval.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            port: env_parse("PORT", DEFAULT_PORT),
            grid_width: env_parse("GRID_WIDTH", DEFAULT_GRID_SIZE),
            grid_height: env_parse("GRID_HEIGHT", DEFAULT_GRID_SIZE),
            cooldown: Duration::from_secs(env_parse("COOLDOWN_SECONDS", DEFAULT_COOLDOWN_SECS)),
            ping_interval: Duration::from_millis(env_parse("PING_INTERVAL_MS", DEFAULT_PING_INTERVAL_MS)),
            ping_timeout: Duration::from_millis(env_parse("PING_TIMEOUT_MS", DEFAULT_PING_TIMEOUT_MS)),
            history_limit: env_parse("HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT),
            allowed_origins: parse_origins(
                &std::env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.to_owned()),
            ),
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Zero`] naming the first zero setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_width == 0 {
            return Err(ConfigError::Zero { key: "GRID_WIDTH" });
        }
        if self.grid_height == 0 {
            return Err(ConfigError::Zero { key: "GRID_HEIGHT" });
        }
        if self.ping_interval.is_zero() {
            return Err(ConfigError::Zero { key: "PING_INTERVAL_MS" });
        }
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.grid_width && y < self.grid_height
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty() && *origin != "*")
        .map(ToOwned::to_owned)
        .collect()
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

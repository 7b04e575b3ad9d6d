//! Client configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

use crate::error::ClientError;
use crate::net::retry::{Backoff, DEFAULT_SNAPSHOT_ATTEMPTS, DEFAULT_SNAPSHOT_DELAY, RetryPolicy};
use crate::state::canvas::{GridSize, MAX_GRID_DIM};
use crate::state::cooldown::DEFAULT_COOLDOWN_SECS;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// REST base URL, without trailing slash.
    pub api_url: String,
    /// Realtime base URL (`ws://`, `wss://`, `http://` or `https://`).
    pub ws_url: String,
    pub grid: GridSize,
    /// Seconds the cooldown gate resets to after a submission.
    pub cooldown_secs: u32,
    pub snapshot_retry: RetryPolicy,
    pub request_timeout: Duration,
    pub reconnect: Backoff,
}

impl ClientConfig {
    /// Defaults for the given API base URL; the realtime URL is derived from it.
    #[must_use]
    pub fn new(api_url: &str) -> Self {
        let api_url = api_url.trim_end_matches('/').to_owned();
        Self {
            ws_url: api_url.clone(),
            api_url,
            grid: GridSize::default(),
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            snapshot_retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            reconnect: Backoff::default(),
        }
    }

    /// Override the realtime base URL.
    #[must_use]
    pub fn with_ws_url(mut self, ws_url: &str) -> Self {
        self.ws_url = ws_url.trim_end_matches('/').to_owned();
        self
    }

    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `PIXEL_API_URL`: default `http://127.0.0.1:8000`
    /// - `PIXEL_WS_URL`: default derived from `PIXEL_API_URL`
    /// - `PIXEL_GRID_WIDTH` / `PIXEL_GRID_HEIGHT`: default 50
    /// - `PIXEL_COOLDOWN_SECS`: default 10
    /// - `PIXEL_SNAPSHOT_ATTEMPTS`: default 5
    /// - `PIXEL_SNAPSHOT_DELAY_MS`: default 1000
    /// - `PIXEL_REQUEST_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] for unusable URLs or a zero-sized grid.
    pub fn from_env() -> Result<Self, ClientError> {
        let api_url = std::env::var("PIXEL_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_owned());
        let mut config = Self::new(&api_url);
        if let Ok(ws_url) = std::env::var("PIXEL_WS_URL") {
            config = config.with_ws_url(&ws_url);
        }

        config.grid = GridSize::new(
            env_parse("PIXEL_GRID_WIDTH", config.grid.width),
            env_parse("PIXEL_GRID_HEIGHT", config.grid.height),
        );
        config.cooldown_secs = env_parse("PIXEL_COOLDOWN_SECS", DEFAULT_COOLDOWN_SECS);
        config.snapshot_retry = RetryPolicy::new(
            env_parse("PIXEL_SNAPSHOT_ATTEMPTS", DEFAULT_SNAPSHOT_ATTEMPTS),
            Duration::from_millis(env_parse(
                "PIXEL_SNAPSHOT_DELAY_MS",
                u64::try_from(DEFAULT_SNAPSHOT_DELAY.as_millis()).unwrap_or(1000),
            )),
        );
        config.request_timeout =
            Duration::from_secs(env_parse("PIXEL_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS));

        config.validate()?;
        Ok(config)
    }

    /// Check URLs and grid size (non-zero, at most `MAX_GRID_DIM` per edge).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ClientError> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(ClientError::Config(format!("PIXEL_API_URL must be http(s): {}", self.api_url)));
        }
        socket_url(&self.ws_url)?;
        if self.grid.width == 0 || self.grid.height == 0 {
            return Err(ClientError::Config("grid dimensions must be non-zero".to_owned()));
        }
        if self.grid.width > MAX_GRID_DIM || self.grid.height > MAX_GRID_DIM {
            return Err(ClientError::Config(format!(
                "grid {}x{} exceeds the {MAX_GRID_DIM}x{MAX_GRID_DIM} maximum",
                self.grid.width, self.grid.height
            )));
        }
        Ok(())
    }

    /// Full websocket URL of the realtime channel.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when `ws_url` has an unsupported scheme.
    pub fn socket_url(&self) -> Result<String, ClientError> {
        socket_url(&self.ws_url)
    }
}

/// Map a base URL onto the Engine.IO websocket endpoint.
fn socket_url(base: &str) -> Result<String, ClientError> {
    let base = base.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if base.starts_with("ws://") || base.starts_with("wss://") {
        base.to_owned()
    } else {
        return Err(ClientError::Config(format!("unsupported realtime URL: {base}")));
    };
    Ok(format!("{ws_base}{}?EIO=4&transport=websocket", wire::SOCKET_PATH))
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

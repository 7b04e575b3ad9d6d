//! REST calls against the canvas service.
//!
//! `CanvasApi` is the seam the sync loop talks through; `HttpApi` is the
//! `reqwest` implementation. Credentialed calls carry the session token as
//! the `session` cookie so the server can attribute and rate-limit them.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use reqwest::header::{ACCEPT, COOKIE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::state::canvas::Snapshot;

/// One pixel placement as sent to `POST /pixel/`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PixelRequest {
    pub x: u32,
    pub y: u32,
    /// `#RRGGBB`, upper-cased.
    pub color: String,
    pub player: String,
}

impl PixelRequest {
    #[must_use]
    pub fn new(x: u32, y: u32, color: &str, player: &str) -> Self {
        Self { x, y, color: color.trim().to_ascii_uppercase(), player: player.to_owned() }
    }
}

/// Server acknowledgement of an accepted placement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelAck {
    #[serde(default)]
    pub message: String,
    pub x: u32,
    pub y: u32,
    pub color: String,
    pub player: String,
}

#[async_trait::async_trait]
pub trait CanvasApi: Send + Sync {
    /// `GET /canvas`.
    async fn fetch_canvas(&self) -> Result<Snapshot, ClientError>;

    /// `GET /cooldown/{username}`: seconds the server still blocks the player.
    async fn fetch_cooldown(&self, username: &str) -> Result<u32, ClientError>;

    /// `POST /pixel/`. Exactly one attempt.
    async fn submit_pixel(&self, request: &PixelRequest) -> Result<PixelAck, ClientError>;
}

/// Seed value for the cooldown gate. Any failure counts as no cooldown.
pub async fn fetch_remaining_cooldown(api: &dyn CanvasApi, username: &str) -> u32 {
    match api.fetch_cooldown(username).await {
        Ok(remaining) => remaining,
        Err(e) => {
            tracing::warn!(%username, error = %e, "api: cooldown lookup failed; assuming none");
            0
        }
    }
}

// =============================================================================
// HTTP
// =============================================================================

pub struct HttpApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    /// Build a client for `config.api_url`, attaching `session_token` (if any)
    /// to every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the
    /// underlying client cannot be built.
    pub fn new(config: &ClientConfig, session_token: Option<&str>) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = session_token {
            headers.insert(COOKIE, HeaderValue::from_str(&session_cookie(token))?);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, base_url: config.api_url.trim_end_matches('/').to_owned() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait::async_trait]
impl CanvasApi for HttpApi {
    async fn fetch_canvas(&self) -> Result<Snapshot, ClientError> {
        let response = self.http.get(self.url("/canvas")).send().await?;
        let body = read_success(response).await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn fetch_cooldown(&self, username: &str) -> Result<u32, ClientError> {
        let response = self.http.get(self.url(&cooldown_path(username))).send().await?;
        let body = read_success(response).await?;
        Ok(parse_cooldown(&body))
    }

    async fn submit_pixel(&self, request: &PixelRequest) -> Result<PixelAck, ClientError> {
        let response = self
            .http
            .post(self.url("/pixel/"))
            .query(&[
                ("x", request.x.to_string()),
                ("y", request.y.to_string()),
                ("color", request.color.clone()),
                ("player", request.player.clone()),
            ])
            .send()
            .await?;
        let body = read_success(response).await?;
        let ack: PixelAck = serde_json::from_value(body)?;
        tracing::info!(x = ack.x, y = ack.y, color = %ack.color, "api: pixel accepted");
        Ok(ack)
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn session_cookie(token: &str) -> String {
    format!("{}={token}", session::COOKIE_NAME)
}

fn cooldown_path(username: &str) -> String {
    let encoded: String = username
        .bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
                char::from(b).to_string()
            } else {
                format!("%{b:02X}")
            }
        })
        .collect();
    format!("/cooldown/{encoded}")
}

/// First element of the array when it is a non-negative integer, else 0.
fn parse_cooldown(body: &Value) -> u32 {
    body.as_array()
        .and_then(|items| items.first())
        .and_then(Value::as_u64)
        .map_or(0, |secs| u32::try_from(secs).unwrap_or(u32::MAX))
}

/// Map non-2xx responses to [`ClientError::Status`], preferring the server's
/// `detail` text as the message.
async fn read_success(response: reqwest::Response) -> Result<Value, ClientError> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(ClientError::Status { status: status.as_u16(), message: error_message(&text) });
    }
    Ok(serde_json::from_str(&text)?)
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(Value::as_str).map(ToOwned::to_owned))
        .unwrap_or_else(|| body.trim().to_owned())
}

//! Client error type.
//!
//! ERROR HANDLING
//! ==============
//! Nothing in the sync subsystem is fatal. Snapshot failures are absorbed by
//! the retry policy and degrade to an empty canvas, feed failures become
//! connection-status events, and submission failures are returned to the
//! caller and recorded as a dismissible notice.

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("server returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("wire decode failed: {0}")]
    Wire(#[from] wire::WireError),
    #[error("connection refused by server: {0}")]
    Refused(String),
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
    #[error("cooldown active: wait {remaining}s before placing another pixel")]
    CooldownActive { remaining: u32 },
    #[error("cell ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds { x: u32, y: u32, width: u32, height: u32 },
    #[error("no session; log in first")]
    MissingSession,
    #[error("image export failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("live canvas has shut down")]
    Closed,
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WsConnect(Box::new(error))
    }
}

impl ClientError {
    /// Short text for a user-facing banner.
    #[must_use]
    pub fn notice(&self) -> String {
        match self {
            Self::Status { status, message } if message.is_empty() => format!("request failed with HTTP {status}"),
            Self::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

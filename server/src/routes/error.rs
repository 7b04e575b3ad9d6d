//! HTTP error responses.
//!
//! Every failure leaves as `{"detail": "<message>"}` with a matching status,
//! which is the shape clients read their banner text from.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Kein Session-Cookie vorhanden.")]
    MissingSession,
    #[error("Ungültiger oder abgelaufener Token.")]
    InvalidSession,
    #[error("Player-Name stimmt nicht mit dem Session-Username überein.")]
    PlayerMismatch,
    #[error("Ungültige Farbe. Bitte wähle eine erlaubte Farbe.")]
    InvalidColor,
    #[error("Koordinaten außerhalb des Canvas.")]
    OutOfBounds,
    #[error("Bitte warte {remaining} Sekunden.")]
    Cooldown { remaining: u64 },
    #[error("Pixel nicht gefunden")]
    PixelNotFound,
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingSession | Self::InvalidSession | Self::PlayerMismatch => StatusCode::UNAUTHORIZED,
            Self::InvalidColor | Self::OutOfBounds => StatusCode::BAD_REQUEST,
            Self::Cooldown { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::PixelNotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
    }
}

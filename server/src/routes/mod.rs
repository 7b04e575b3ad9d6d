//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! REST endpoints for reading the canvas and placing pixels, plus the
//! realtime channel under `/socket.io/`, all on one Axum router.

pub mod canvas;
pub mod error;
pub mod pixel;
pub mod ws;

use axum::Router;
use axum::http::header::{CONTENT_TYPE, COOKIE};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .route("/canvas", get(canvas::get_canvas))
        .route("/cooldown/{player}", get(canvas::get_cooldown))
        .route("/pixel/", post(pixel::set_pixel))
        .route("/pixel/{x}/{y}", get(canvas::get_pixel))
        .route("/pixel/{x}/{y}/history", get(canvas::get_history))
        .route(wire::SOCKET_PATH, get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Credentialed CORS for the listed origins; any origin without credentials
/// when the list is empty.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(%origin, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if parsed.is_empty() {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, COOKIE])
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

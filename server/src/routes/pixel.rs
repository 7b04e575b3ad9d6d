//! Pixel placement.
//!
//! DESIGN
//! ======
//! `POST /pixel/?x=&y=&color=&player=` with the `session` cookie. Checks run
//! in a fixed order so a refused request never consumes the cooldown:
//!
//! 1. session cookie present and valid,
//! 2. session username equals `player`,
//! 3. color in the palette,
//! 4. coordinates on the grid,
//! 5. player's cooldown has elapsed (starting the next one).
//!
//! The accepted pixel is stored and broadcast before the response is sent.

use axum::Json;
use axum::extract::{Query, State};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use wire::PixelUpdate;

use super::error::ApiError;
use crate::cooldown::CooldownError;
use crate::state::AppState;

const PLACED_MESSAGE: &str = "Pixel gesetzt";

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceParams {
    pub x: i64,
    pub y: i64,
    pub color: String,
    pub player: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceResponse {
    pub message: String,
    pub x: u32,
    pub y: u32,
    pub color: String,
    pub player: String,
}

/// `POST /pixel/`
pub async fn set_pixel(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<PlaceParams>,
) -> Result<Json<PlaceResponse>, ApiError> {
    let token = jar.get(session::COOKIE_NAME).map(Cookie::value).unwrap_or_default();
    if token.is_empty() {
        return Err(ApiError::MissingSession);
    }
    let session = state.sessions.verify(token, session::now_ms()).map_err(|e| {
        warn!(player = %params.player, error = %e, "pixel: rejected session");
        ApiError::InvalidSession
    })?;
    if session.username != params.player {
        return Err(ApiError::PlayerMismatch);
    }

    if !wire::is_palette_color(&params.color) {
        return Err(ApiError::InvalidColor);
    }

    let (x, y) = match (u32::try_from(params.x), u32::try_from(params.y)) {
        (Ok(x), Ok(y)) if state.config.contains(x, y) => (x, y),
        _ => return Err(ApiError::OutOfBounds),
    };

    state.cooldowns.try_start(&params.player).map_err(|CooldownError::Active { remaining }| {
        ApiError::Cooldown { remaining }
    })?;

    let update = PixelUpdate { x, y, color: params.color, player: params.player };
    state.commit(update.clone()).await;
    info!(
        x,
        y,
        color = %update.color,
        player = %update.player,
        waiting_players = state.cooldowns.active(),
        "pixel: placed"
    );

    Ok(Json(PlaceResponse {
        message: PLACED_MESSAGE.to_owned(),
        x,
        y,
        color: update.color,
        player: update.player,
    }))
}

#[cfg(test)]
#[path = "pixel_test.rs"]
mod tests;

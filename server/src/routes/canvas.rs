//! Read-only canvas routes.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use super::error::ApiError;
use crate::state::{AppState, PixelEntry};

pub const DEFAULT_HISTORY_PAGE: usize = 10;

/// `GET /canvas`: every painted cell keyed by `"x:y"`.
pub async fn get_canvas(State(state): State<AppState>) -> Json<BTreeMap<String, PixelEntry>> {
    Json(state.canvas.read().await.snapshot())
}

/// `GET /cooldown/{player}`: `[remaining_seconds]`, `[0]` when free.
pub async fn get_cooldown(State(state): State<AppState>, Path(player): Path<String>) -> Json<[u64; 1]> {
    Json([state.cooldowns.remaining(&player)])
}

/// `GET /pixel/{x}/{y}`
pub async fn get_pixel(
    State(state): State<AppState>,
    Path((x, y)): Path<(u32, u32)>,
) -> Result<Json<PixelEntry>, ApiError> {
    let canvas = state.canvas.read().await;
    canvas.get(x, y).cloned().map(Json).ok_or(ApiError::PixelNotFound)
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

/// `GET /pixel/{x}/{y}/history?limit=`: newest first, 10 by default.
pub async fn get_history(
    State(state): State<AppState>,
    Path((x, y)): Path<(u32, u32)>,
    Query(params): Query<HistoryParams>,
) -> Json<Vec<PixelEntry>> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_PAGE);
    Json(state.canvas.read().await.history(x, y, limit))
}

#[cfg(test)]
#[path = "canvas_test.rs"]
mod tests;

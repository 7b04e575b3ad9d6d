//! Initial canvas load.

#[cfg(test)]
#[path = "snapshot_test.rs"]
mod snapshot_test;

use super::api::CanvasApi;
use super::retry::RetryPolicy;
use crate::state::canvas::{CanvasState, GridSize};

/// Fetch the full canvas with bounded retries.
///
/// Never fails: once the policy is exhausted the result is an empty canvas,
/// so a dead backend shows a blank grid instead of blocking the view. The
/// caller commits the returned state; nothing shared is touched here.
pub async fn fetch_snapshot(api: &dyn CanvasApi, policy: RetryPolicy, grid: GridSize) -> CanvasState {
    match policy.run("canvas snapshot", |_| api.fetch_canvas()).await {
        Ok(snapshot) => {
            let state = CanvasState::from_snapshot(snapshot, grid);
            tracing::info!(cells = state.len(), "snapshot: loaded canvas");
            state
        }
        Err(_) => {
            tracing::warn!(attempts = policy.max_attempts, "snapshot: falling back to empty canvas");
            CanvasState::new()
        }
    }
}

//! Observable view of one live canvas session.

#[cfg(test)]
#[path = "view_test.rs"]
mod view_test;

use wire::PixelUpdate;

use super::canvas::{CanvasState, GridSize};
use super::cooldown::CooldownGate;
use crate::raster::Raster;

/// Realtime connection status, as shown next to the canvas title.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Handshake in progress (initial state and every reconnect attempt).
    #[default]
    Connecting,
    /// Namespace joined; updates are flowing.
    Connected,
    /// An established connection ended.
    Disconnected,
    /// The connection attempt failed.
    Error,
}

impl ConnectionStatus {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        }
    }
}

/// Everything a front end needs to draw one frame.
#[derive(Clone, Debug)]
pub struct CanvasView {
    pub canvas: CanvasState,
    pub raster: Raster,
    pub status: ConnectionStatus,
    pub cooldown: CooldownGate,
    /// Dismissible error banner.
    pub notice: Option<String>,
    /// True once the initial snapshot (or its empty fallback) has landed.
    pub snapshot_loaded: bool,
    /// Most recent merged update.
    pub last_update: Option<PixelUpdate>,
    /// Bumped on every canvas mutation.
    pub revision: u64,
}

impl CanvasView {
    #[must_use]
    pub fn new(grid: GridSize, cooldown_secs: u32) -> Self {
        Self {
            canvas: CanvasState::new(),
            raster: Raster::new(grid),
            status: ConnectionStatus::default(),
            cooldown: CooldownGate::new(cooldown_secs),
            notice: None,
            snapshot_loaded: false,
            last_update: None,
            revision: 0,
        }
    }

    /// Replace the whole canvas and redraw the raster.
    pub fn replace_canvas(&mut self, canvas: CanvasState) {
        self.raster.repaint(&canvas);
        self.canvas = canvas;
        self.snapshot_loaded = true;
        self.revision += 1;
    }

    /// Merge one update and repaint exactly its cell. Returns `false` for
    /// updates outside the grid.
    pub fn merge_update(&mut self, update: PixelUpdate) -> bool {
        if !self.canvas.apply_update(&update, self.raster.grid()) {
            return false;
        }
        self.raster.paint_cell(update.x, update.y, &update.color);
        self.last_update = Some(update);
        self.revision += 1;
        true
    }
}

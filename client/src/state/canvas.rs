//! Local projection of the shared canvas.
//!
//! SYSTEM CONTEXT
//! ==============
//! `CanvasState` is the grid as last observed by this client. It changes in
//! exactly two ways: a full replace from a snapshot, or a last-write-wins
//! merge of one incremental update. Unpainted cells are absent.

#[cfg(test)]
#[path = "canvas_test.rs"]
mod canvas_test;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use wire::PixelUpdate;

/// Color of a cell nobody has painted.
pub const BACKGROUND_COLOR: &str = "#FFFFFF";

/// Largest supported grid edge, in cells. Keeps the raster within
/// `u32` pixel coordinates and a bounded allocation.
pub const MAX_GRID_DIM: u32 = 1000;

/// Snapshot wire shape: `"x:y" -> {color, player}`.
pub type Snapshot = HashMap<String, Cell>;

/// One painted cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub color: String,
    pub player: String,
}

/// Fixed grid dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
}

impl GridSize {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn contains(self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    /// Same grid with each edge limited to [`MAX_GRID_DIM`].
    #[must_use]
    pub fn clamped(self) -> Self {
        Self::new(self.width.min(MAX_GRID_DIM), self.height.min(MAX_GRID_DIM))
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self::new(50, 50)
    }
}

/// Sparse map of painted cells, keyed by `(x, y)`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CanvasState {
    cells: HashMap<(u32, u32), Cell>,
}

impl CanvasState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build state from a snapshot payload. Malformed keys and cells outside
    /// `grid` are dropped.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot, grid: GridSize) -> Self {
        let mut dropped = 0_usize;
        let cells = snapshot
            .into_iter()
            .filter_map(|(key, cell)| match wire::parse_cell_key(&key) {
                Some((x, y)) if grid.contains(x, y) => Some(((x, y), cell)),
                _ => {
                    dropped += 1;
                    None
                }
            })
            .collect::<HashMap<_, _>>();
        if dropped > 0 {
            tracing::debug!(dropped, "canvas: dropped snapshot entries outside grid");
        }
        Self { cells }
    }

    /// Serialize back to the snapshot wire shape, ordered by key.
    #[must_use]
    pub fn to_snapshot(&self) -> BTreeMap<String, Cell> {
        self.cells.iter().map(|(&(x, y), cell)| (wire::cell_key(x, y), cell.clone())).collect()
    }

    /// Merge one update, last-write-wins. Returns `false` (and leaves the state
    /// untouched) when the update lies outside `grid`.
    pub fn apply_update(&mut self, update: &PixelUpdate, grid: GridSize) -> bool {
        if !grid.contains(update.x, update.y) {
            return false;
        }
        self.cells.insert(
            (update.x, update.y),
            Cell { color: update.color.clone(), player: update.player.clone() },
        );
        true
    }

    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<&Cell> {
        self.cells.get(&(x, y))
    }

    /// Last painter of a cell, if any.
    #[must_use]
    pub fn painter_at(&self, x: u32, y: u32) -> Option<&str> {
        self.get(x, y).map(|cell| cell.player.as_str())
    }

    /// Color shown at a cell, background when unpainted.
    #[must_use]
    pub fn color_at(&self, x: u32, y: u32) -> &str {
        self.get(x, y).map_or(BACKGROUND_COLOR, |cell| cell.color.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Painted cells in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = ((u32, u32), &Cell)> {
        self.cells.iter().map(|(&coord, cell)| (coord, cell))
    }
}

//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. The
//! canvas lives in memory behind a `RwLock`: the current cell map plus a
//! bounded newest-first history per cell. Accepted placements are fanned out
//! to every realtime connection through a `broadcast` channel, in the order
//! the write lock serialized them.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use session::SessionKey;
use tokio::sync::{RwLock, broadcast};
use wire::PixelUpdate;

use crate::config::ServerConfig;
use crate::cooldown::CooldownTracker;

const UPDATE_CHANNEL_CAPACITY: usize = 1024;

// =============================================================================
// PIXEL ENTRY
// =============================================================================

/// Stored color and painter of one cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelEntry {
    pub color: String,
    pub player: String,
}

impl From<&PixelUpdate> for PixelEntry {
    fn from(update: &PixelUpdate) -> Self {
        Self { color: update.color.clone(), player: update.player.clone() }
    }
}

// =============================================================================
// CANVAS STORE
// =============================================================================

#[derive(Debug, Default)]
pub struct CanvasStore {
    cells: HashMap<(u32, u32), PixelEntry>,
    history: HashMap<(u32, u32), VecDeque<PixelEntry>>,
}

impl CanvasStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one cell and push it onto that cell's history, keeping at most
    /// `history_limit` entries.
    pub fn place(&mut self, update: &PixelUpdate, history_limit: usize) {
        let key = (update.x, update.y);
        let entry = PixelEntry::from(update);

        let history = self.history.entry(key).or_default();
        history.push_front(entry.clone());
        history.truncate(history_limit.max(1));

        self.cells.insert(key, entry);
    }

    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<&PixelEntry> {
        self.cells.get(&(x, y))
    }

    /// Newest-first changes to `(x, y)`.
    #[must_use]
    pub fn history(&self, x: u32, y: u32, limit: usize) -> Vec<PixelEntry> {
        self.history
            .get(&(x, y))
            .map(|entries| entries.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// Full canvas keyed by `"x:y"`.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, PixelEntry> {
        self.cells
            .iter()
            .map(|(&(x, y), entry)| (wire::cell_key(x, y), entry.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Clone is required by Axum; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub canvas: Arc<RwLock<CanvasStore>>,
    pub cooldowns: CooldownTracker,
    pub updates: broadcast::Sender<PixelUpdate>,
    pub sessions: Arc<SessionKey>,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServerConfig, sessions: SessionKey) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            cooldowns: CooldownTracker::new(config.cooldown),
            config: Arc::new(config),
            canvas: Arc::new(RwLock::new(CanvasStore::new())),
            updates,
            sessions: Arc::new(sessions),
        }
    }

    /// Store `update` and broadcast it to every connected subscriber.
    ///
    /// The broadcast happens under the write lock so subscribers observe
    /// updates in commit order.
    pub async fn commit(&self, update: PixelUpdate) {
        let mut canvas = self.canvas.write().await;
        canvas.place(&update, self.config.history_limit);
        let receivers = self.updates.send(update).unwrap_or(0);
        tracing::debug!(cells = canvas.len(), receivers, "canvas: committed pixel");
    }
}

// =============================================================================
// TESTS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;

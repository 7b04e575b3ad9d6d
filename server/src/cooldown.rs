//! Per-player placement cooldown.
//!
//! DESIGN
//! ======
//! A map from player name to the instant their cooldown ends. A placement is
//! allowed when no entry exists or the entry has passed; allowing it writes a
//! new deadline. Expired entries are pruned on every write so the map only
//! holds players who are currently waiting.
//!
//! Remaining time is reported in whole seconds, rounded up, so a player told
//! "wait 1 second" is never refused again after waiting it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CooldownError {
    #[error("cooldown active for another {remaining}s")]
    Active { remaining: u64 },
}

// =============================================================================
// TRACKER
// =============================================================================

#[derive(Clone)]
pub struct CooldownTracker {
    deadlines: Arc<Mutex<HashMap<String, Instant>>>,
    period: Duration,
}

impl CooldownTracker {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self { deadlines: Arc::new(Mutex::new(HashMap::new())), period }
    }

    /// Seconds until `player` may place again; 0 when free.
    #[must_use]
    pub fn remaining(&self, player: &str) -> u64 {
        self.remaining_at(player, Instant::now())
    }

    fn remaining_at(&self, player: &str, now: Instant) -> u64 {
        let deadlines = self.deadlines.lock().unwrap_or_else(PoisonError::into_inner);
        deadlines.get(player).map_or(0, |deadline| ceil_secs(deadline.saturating_duration_since(now)))
    }

    /// Start a cooldown for `player` unless one is already running.
    ///
    /// # Errors
    ///
    /// Returns [`CooldownError::Active`] with the remaining seconds while the
    /// previous cooldown is still running.
    pub fn try_start(&self, player: &str) -> Result<(), CooldownError> {
        self.try_start_at(player, Instant::now())
    }

    fn try_start_at(&self, player: &str, now: Instant) -> Result<(), CooldownError> {
        let mut deadlines = self.deadlines.lock().unwrap_or_else(PoisonError::into_inner);
        deadlines.retain(|_, deadline| *deadline > now);

        if let Some(deadline) = deadlines.get(player) {
            return Err(CooldownError::Active { remaining: ceil_secs(deadline.saturating_duration_since(now)) });
        }
        if !self.period.is_zero() {
            deadlines.insert(player.to_owned(), now + self.period);
        }
        Ok(())
    }

    /// Players currently waiting.
    #[must_use]
    pub fn active(&self) -> usize {
        let now = Instant::now();
        let deadlines = self.deadlines.lock().unwrap_or_else(PoisonError::into_inner);
        deadlines.values().filter(|deadline| **deadline > now).count()
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn ceil_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "cooldown_test.rs"]
mod tests;

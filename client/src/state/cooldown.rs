//! Client-side pacing between pixel submissions.
//!
//! The gate mirrors the server's per-player rate limit without being
//! authoritative: it only keeps obviously-wasted requests off the wire and
//! drives the countdown shown to the player. It resets the moment a
//! submission is let through, before the server has answered.

#[cfg(test)]
#[path = "cooldown_test.rs"]
mod cooldown_test;

use crate::error::ClientError;

/// One second longer than the server's cooldown so a gate that reaches zero
/// never races a still-active server limit.
pub const DEFAULT_COOLDOWN_SECS: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CooldownGate {
    remaining: u32,
    reset_to: u32,
}

impl CooldownGate {
    /// Open gate that resets to `reset_to` seconds after each submission.
    #[must_use]
    pub const fn new(reset_to: u32) -> Self {
        Self { remaining: 0, reset_to }
    }

    /// Replace the countdown with a server-reported remaining value.
    pub fn seed(&mut self, remaining: u32) {
        self.remaining = remaining;
    }

    /// Advance one second. Returns the new remaining value.
    pub fn tick(&mut self) -> u32 {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining
    }

    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.remaining == 0
    }

    /// Let one submission through, restarting the countdown.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::CooldownActive`] while the countdown is running.
    pub fn try_acquire(&mut self) -> Result<(), ClientError> {
        if !self.is_ready() {
            return Err(ClientError::CooldownActive { remaining: self.remaining });
        }
        self.remaining = self.reset_to;
        Ok(())
    }

    /// Remaining share of the full cooldown in `0.0..=1.0`, for progress bars.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.reset_to == 0 {
            return 0.0;
        }
        (f64::from(self.remaining) / f64::from(self.reset_to)).min(1.0)
    }
}

impl Default for CooldownGate {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN_SECS)
    }
}

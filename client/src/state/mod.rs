//! Client-side state for a live canvas session.
//!
//! SYSTEM CONTEXT
//! ==============
//! `canvas` is the local grid projection, `cooldown` the submission pacing
//! gate, and `view` bundles both with connection status for observers. Only
//! the sync loop mutates these.

pub mod canvas;
pub mod cooldown;
pub mod view;

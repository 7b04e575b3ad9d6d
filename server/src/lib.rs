//! # server
//!
//! In-memory canvas authority for the pixel war.
//!
//! Holds the canvas and per-cell history, authenticates placements with the
//! signed `session` cookie, enforces a per-player cooldown, and broadcasts
//! every accepted pixel over a Socket.IO-compatible websocket channel.

pub mod config;
pub mod cooldown;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use routes::app;
pub use state::AppState;

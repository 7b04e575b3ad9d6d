//! Networking for the live canvas.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` handles REST calls, `snapshot` loads the initial canvas through the
//! `retry` policy, and `subscriber` owns the realtime websocket.

pub mod api;
pub mod retry;
pub mod snapshot;
pub mod subscriber;

//! # client
//!
//! Synchronization client for the shared pixel canvas.
//!
//! A session loads the full canvas once through a bounded retry, follows
//! incremental `pixel_update` events over the realtime channel, and submits
//! pixels through the REST API behind a local cooldown gate. All canvas
//! mutation happens in one writer task; see [`sync::LiveCanvas`].
//!
//! Placed pixels are never painted optimistically. The local grid only ever
//! shows server-accepted history.

pub mod config;
pub mod error;
pub mod net;
pub mod raster;
pub mod state;
pub mod sync;

pub use config::ClientConfig;
pub use error::ClientError;
pub use net::api::{CanvasApi, HttpApi, PixelAck, PixelRequest};
pub use net::subscriber::FeedEvent;
pub use state::canvas::{CanvasState, Cell, GridSize};
pub use state::view::{CanvasView, ConnectionStatus};
pub use sync::LiveCanvas;
pub use wire::PixelUpdate;

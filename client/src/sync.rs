//! Live canvas session: the single writer of canvas state.
//!
//! ARCHITECTURE
//! ============
//! `LiveCanvas::start` spawns four cooperating pieces:
//!
//! - a bootstrap task that loads the snapshot and the server-side cooldown,
//! - the realtime subscriber,
//! - the writer loop, which owns the [`CanvasView`] and is the only code that
//!   mutates it,
//! - one short-lived task per pixel submission.
//!
//! Everything except the writer talks to it over an `mpsc` channel. Readers
//! observe the view through a `watch` channel, so a front end can redraw on
//! `changed()` without taking locks. The view only holds the latest state;
//! consumers that need every merged update read the `broadcast` stream from
//! [`LiveCanvas::updates`].
//!
//! Submissions never paint locally. A placed pixel appears only when the
//! server's broadcast comes back through the subscriber.

#[cfg(test)]
#[path = "sync_test.rs"]
mod sync_test;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use wire::PixelUpdate;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::net::api::{CanvasApi, PixelAck, PixelRequest, fetch_remaining_cooldown};
use crate::net::retry::RetryPolicy;
use crate::net::snapshot::fetch_snapshot;
use crate::net::subscriber::{FeedEvent, SubscriberHandle, spawn_subscriber};
use crate::state::canvas::{CanvasState, GridSize};
use crate::state::view::{CanvasView, ConnectionStatus};

const FEED_CAPACITY: usize = 256;
const INPUT_CAPACITY: usize = 64;
const UPDATE_CAPACITY: usize = 1024;
const TICK: Duration = Duration::from_secs(1);

/// Messages handled by the writer loop.
#[derive(Debug)]
enum SyncInput {
    Snapshot(CanvasState),
    CooldownSeed(u32),
    Place { x: u32, y: u32, color: String, reply: oneshot::Sender<Result<PixelAck, ClientError>> },
    SubmitFailed(String),
    DismissNotice,
}

/// Handle to a running live canvas session.
///
/// Dropping the handle stops every task it spawned and closes the realtime
/// connection.
pub struct LiveCanvas {
    inputs: mpsc::Sender<SyncInput>,
    view: watch::Receiver<CanvasView>,
    updates: broadcast::Sender<PixelUpdate>,
    tasks: Vec<JoinHandle<()>>,
    subscriber: Option<SubscriberHandle>,
}

impl LiveCanvas {
    /// Start a session for `player` against the configured server.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when the realtime URL is unusable.
    pub fn start(config: &ClientConfig, api: Arc<dyn CanvasApi>, player: &str) -> Result<Self, ClientError> {
        let (feed_tx, feed_rx) = mpsc::channel(FEED_CAPACITY);
        let subscriber = spawn_subscriber(config, feed_tx)?;
        let mut live = Self::with_feed(config, api, player, feed_rx);
        live.subscriber = Some(subscriber);
        Ok(live)
    }

    /// Start a session that takes realtime events from `feed` instead of a
    /// websocket.
    #[must_use]
    pub fn with_feed(
        config: &ClientConfig,
        api: Arc<dyn CanvasApi>,
        player: &str,
        feed: mpsc::Receiver<FeedEvent>,
    ) -> Self {
        let (inputs_tx, inputs_rx) = mpsc::channel(INPUT_CAPACITY);
        let (view_tx, view_rx) = watch::channel(CanvasView::new(config.grid, config.cooldown_secs));
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);

        let bootstrap = tokio::spawn(bootstrap(
            Arc::clone(&api),
            config.snapshot_retry,
            config.grid,
            player.to_owned(),
            inputs_tx.clone(),
        ));

        let writer = Writer {
            view: view_tx,
            updates: updates.clone(),
            api,
            player: player.to_owned(),
            inputs: inputs_tx.downgrade(),
        };
        let writer = tokio::spawn(writer.run(inputs_rx, feed));

        Self { inputs: inputs_tx, view: view_rx, updates, tasks: vec![bootstrap, writer], subscriber: None }
    }

    /// Submit one pixel as this session's player.
    ///
    /// The cooldown gate is checked and reset before the request leaves. The
    /// local canvas is not touched; the cell changes when the server's
    /// broadcast arrives.
    ///
    /// # Errors
    ///
    /// - [`ClientError::OutOfBounds`] for cells outside the grid.
    /// - [`ClientError::CooldownActive`] while the gate is closed.
    /// - Any transport or HTTP error from the single submission attempt. The
    ///   same error is also shown as the view's notice.
    pub async fn place(&self, x: u32, y: u32, color: &str) -> Result<PixelAck, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.send(SyncInput::Place { x, y, color: color.to_owned(), reply }).await?;
        rx.await.map_err(|_| ClientError::Closed)?
    }

    /// Clear the current notice, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Closed`] after the session has stopped.
    pub async fn dismiss_notice(&self) -> Result<(), ClientError> {
        self.send(SyncInput::DismissNotice).await
    }

    /// Copy of the current view.
    #[must_use]
    pub fn view(&self) -> CanvasView {
        self.view.borrow().clone()
    }

    /// A receiver for the view, for callers that want their own change
    /// tracking.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CanvasView> {
        self.view.clone()
    }

    /// Every update merged into the canvas from now on, in merge order.
    /// Out-of-bounds updates are never published. A receiver that falls more
    /// than 1024 updates behind gets `RecvError::Lagged`.
    #[must_use]
    pub fn updates(&self) -> broadcast::Receiver<PixelUpdate> {
        self.updates.subscribe()
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.view.borrow().status
    }

    /// Player who last painted `(x, y)`, as currently known.
    #[must_use]
    pub fn painter_at(&self, x: u32, y: u32) -> Option<String> {
        self.view.borrow().canvas.painter_at(x, y).map(ToOwned::to_owned)
    }

    /// Wait until the view changes.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Closed`] once the writer has stopped.
    pub async fn changed(&mut self) -> Result<(), ClientError> {
        self.view.changed().await.map_err(|_| ClientError::Closed)
    }

    /// Stop all tasks and close the realtime connection.
    pub fn shutdown(self) {
        drop(self);
    }

    async fn send(&self, input: SyncInput) -> Result<(), ClientError> {
        self.inputs.send(input).await.map_err(|_| ClientError::Closed)
    }
}

impl Drop for LiveCanvas {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        if let Some(subscriber) = self.subscriber.take() {
            subscriber.shutdown();
        }
    }
}

/// Load the snapshot and the remaining cooldown, then hand both to the writer.
async fn bootstrap(
    api: Arc<dyn CanvasApi>,
    retry: RetryPolicy,
    grid: GridSize,
    player: String,
    inputs: mpsc::Sender<SyncInput>,
) {
    let (canvas, remaining) =
        tokio::join!(fetch_snapshot(api.as_ref(), retry, grid), fetch_remaining_cooldown(api.as_ref(), &player));

    if inputs.send(SyncInput::Snapshot(canvas)).await.is_err() {
        return;
    }
    let _ = inputs.send(SyncInput::CooldownSeed(remaining)).await;
}

// =============================================================================
// WRITER
// =============================================================================

struct Writer {
    view: watch::Sender<CanvasView>,
    updates: broadcast::Sender<PixelUpdate>,
    api: Arc<dyn CanvasApi>,
    player: String,
    /// Weak so the loop ends once every `LiveCanvas` sender is gone.
    inputs: mpsc::WeakSender<SyncInput>,
}

impl Writer {
    async fn run(self, mut inputs: mpsc::Receiver<SyncInput>, mut feed: mpsc::Receiver<FeedEvent>) {
        let mut ticker = tokio::time::interval_at(Instant::now() + TICK, TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut feed_open = true;

        loop {
            tokio::select! {
                input = inputs.recv() => {
                    let Some(input) = input else { break };
                    self.handle_input(input);
                }
                event = feed.recv(), if feed_open => {
                    match event {
                        Some(event) => self.handle_feed(event),
                        None => {
                            tracing::debug!("sync: realtime feed closed");
                            feed_open = false;
                        }
                    }
                }
                _ = ticker.tick() => {
                    self.view.send_if_modified(|view| {
                        let before = view.cooldown.remaining();
                        view.cooldown.tick() != before
                    });
                }
            }
        }
        tracing::debug!("sync: writer stopped");
    }

    fn handle_input(&self, input: SyncInput) {
        match input {
            SyncInput::Snapshot(canvas) => {
                tracing::debug!(cells = canvas.len(), "sync: replacing canvas with snapshot");
                self.view.send_modify(|view| view.replace_canvas(canvas));
            }
            SyncInput::CooldownSeed(remaining) => {
                // A submission made while the seed was in flight already reset the gate.
                self.view.send_if_modified(|view| {
                    if remaining > view.cooldown.remaining() {
                        view.cooldown.seed(remaining);
                        return true;
                    }
                    false
                });
            }
            SyncInput::Place { x, y, color, reply } => self.place(x, y, &color, reply),
            SyncInput::SubmitFailed(message) => {
                self.view.send_modify(|view| view.notice = Some(message));
            }
            SyncInput::DismissNotice => {
                self.view.send_if_modified(|view| view.notice.take().is_some());
            }
        }
    }

    fn handle_feed(&self, event: FeedEvent) {
        let status = match event {
            FeedEvent::Connecting => ConnectionStatus::Connecting,
            FeedEvent::Connected => ConnectionStatus::Connected,
            FeedEvent::Disconnected => ConnectionStatus::Disconnected,
            FeedEvent::Error(reason) => {
                tracing::debug!(%reason, "sync: realtime connection error");
                ConnectionStatus::Error
            }
            FeedEvent::Update(update) => {
                let published = update.clone();
                if self.view.send_if_modified(|view| view.merge_update(update)) {
                    let _ = self.updates.send(published);
                }
                return;
            }
        };
        self.view.send_if_modified(|view| {
            if view.status == status {
                return false;
            }
            view.status = status;
            true
        });
    }

    /// Gate, then submit on a separate task so the loop keeps merging.
    fn place(&self, x: u32, y: u32, color: &str, reply: oneshot::Sender<Result<PixelAck, ClientError>>) {
        let grid = self.view.borrow().raster.grid();
        if !grid.contains(x, y) {
            let _ = reply.send(Err(ClientError::OutOfBounds { x, y, width: grid.width, height: grid.height }));
            return;
        }

        let mut gate = Ok(());
        self.view.send_if_modified(|view| {
            gate = view.cooldown.try_acquire();
            gate.is_ok()
        });
        if let Err(e) = gate {
            let _ = reply.send(Err(e));
            return;
        }

        let request = PixelRequest::new(x, y, color, &self.player);
        let api = Arc::clone(&self.api);
        let inputs = self.inputs.clone();
        tokio::spawn(async move {
            let result = api.submit_pixel(&request).await;
            if let Err(e) = &result {
                tracing::warn!(x = request.x, y = request.y, error = %e, "sync: pixel submission failed");
                if let Some(inputs) = inputs.upgrade() {
                    let _ = inputs.send(SyncInput::SubmitFailed(e.notice())).await;
                }
            }
            let _ = reply.send(result);
        });
    }
}

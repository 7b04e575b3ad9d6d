//! Realtime update subscriber.
//!
//! DESIGN
//! ======
//! One task owns the websocket for the lifetime of a `SubscriberHandle`. It
//! performs the Engine.IO open handshake, joins the default Socket.IO
//! namespace, answers heartbeats, and turns every `pixel_update` event into a
//! typed [`FeedEvent`] on an mpsc channel. Lifecycle transitions are sent on
//! the same channel so the consumer sees them in order with the updates.
//!
//! The subscriber never touches canvas state. Updates that fail to parse or
//! fall outside the grid are dropped here.
//!
//! LIFECYCLE
//! =========
//! `Connecting` → `Connected` → `Disconnected`, or `Connecting` → `Error`
//! when the attempt fails before the namespace is joined. Either way the
//! task sleeps with exponential backoff and reconnects until the handle is
//! dropped or the consumer goes away. `Connecting` is announced on the first
//! attempt and after a `Disconnected`; retries during an outage stay in
//! `Error`, emitting one `Error` per failed attempt.

#[cfg(test)]
#[path = "subscriber_test.rs"]
mod subscriber_test;

use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use wire::{EnginePacket, PIXEL_UPDATE_EVENT, PixelUpdate, SocketPacket};

use super::retry::Backoff;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::state::canvas::GridSize;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Event emitted by the subscriber.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedEvent {
    Connecting,
    Connected,
    Disconnected,
    /// Connection attempt failed; carries the reason.
    Error(String),
    Update(PixelUpdate),
}

/// Owner of the subscriber task. Dropping it tears the connection down.
#[derive(Debug)]
pub struct SubscriberHandle {
    task: JoinHandle<()>,
}

impl SubscriberHandle {
    /// Close the connection and stop reconnecting.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for SubscriberHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn the subscriber for `config`, emitting events on `events`.
///
/// # Errors
///
/// Returns [`ClientError::Config`] when the realtime URL is unusable.
pub fn spawn_subscriber(config: &ClientConfig, events: mpsc::Sender<FeedEvent>) -> Result<SubscriberHandle, ClientError> {
    let url = config.socket_url()?;
    let task = tokio::spawn(subscriber_loop(url, config.grid, config.reconnect, events));
    Ok(SubscriberHandle { task })
}

/// Connect, run, and reconnect until the consumer drops its receiver.
async fn subscriber_loop(url: String, grid: GridSize, mut backoff: Backoff, events: mpsc::Sender<FeedEvent>) {
    let mut announce = true;
    loop {
        if announce && events.send(FeedEvent::Connecting).await.is_err() {
            return;
        }

        let mut connected = false;
        let outcome = connect_and_run(&url, grid, &events, &mut connected).await;

        let event = if connected {
            backoff.reset();
            match &outcome {
                Ok(()) => tracing::info!("subscriber: disconnected"),
                Err(e) => tracing::warn!(error = %e, "subscriber: connection lost"),
            }
            FeedEvent::Disconnected
        } else {
            let reason = match outcome {
                Ok(()) => ClientError::WsClosed.to_string(),
                Err(e) => e.to_string(),
            };
            tracing::warn!(error = %reason, "subscriber: connect failed");
            FeedEvent::Error(reason)
        };
        if events.send(event).await.is_err() {
            return;
        }
        announce = connected;

        let delay = backoff.next_delay();
        tracing::debug!(?delay, "subscriber: reconnecting after backoff");
        tokio::time::sleep(delay).await;
    }
}

/// One connection: handshake, namespace join, then pump packets until the
/// socket closes. `connected` flips once the namespace join is acknowledged.
async fn connect_and_run(
    url: &str,
    grid: GridSize,
    events: &mpsc::Sender<FeedEvent>,
    connected: &mut bool,
) -> Result<(), ClientError> {
    let (stream, _) = connect_async(url).await?;
    let (mut write, mut read) = stream.split();

    let handshake = loop {
        match recv_packet(&mut read, HANDSHAKE_TIMEOUT, "open handshake").await? {
            Some(EnginePacket::Open(handshake)) => break handshake,
            Some(other) => tracing::debug!(packet = ?other, "subscriber: ignoring packet before open"),
            None => return Err(ClientError::WsClosed),
        }
    };
    tracing::debug!(sid = %handshake.sid, ping_interval = handshake.ping_interval, "subscriber: engine open");

    send_packet(&mut write, &EnginePacket::Message(SocketPacket::Connect(None))).await?;

    loop {
        match recv_packet(&mut read, HANDSHAKE_TIMEOUT, "namespace connect").await? {
            Some(EnginePacket::Message(SocketPacket::Connect(_))) => break,
            Some(EnginePacket::Message(SocketPacket::ConnectError(data))) => {
                return Err(ClientError::Refused(refusal_message(&data)));
            }
            Some(EnginePacket::Ping(probe)) => send_packet(&mut write, &EnginePacket::Pong(probe)).await?,
            Some(EnginePacket::Close) | None => return Err(ClientError::WsClosed),
            Some(other) => tracing::debug!(packet = ?other, "subscriber: ignoring packet before connect"),
        }
    }

    *connected = true;
    tracing::info!(%url, "subscriber: connected");
    if events.send(FeedEvent::Connected).await.is_err() {
        return Ok(());
    }

    // Server pings every `ping_interval`; silence beyond interval + timeout is a dead link.
    let heartbeat = Duration::from_millis(handshake.ping_interval.saturating_add(handshake.ping_timeout));
    loop {
        let packet = match recv_text(&mut read, heartbeat, "heartbeat").await? {
            Some(text) => match wire::decode_packet(&text) {
                Ok(packet) => packet,
                Err(e) => {
                    tracing::debug!(error = %e, "subscriber: dropping undecodable packet");
                    continue;
                }
            },
            None => return Ok(()),
        };

        match packet {
            EnginePacket::Ping(probe) => send_packet(&mut write, &EnginePacket::Pong(probe)).await?,
            EnginePacket::Close | EnginePacket::Message(SocketPacket::Disconnect) => return Ok(()),
            other => match other.as_event() {
                Some((PIXEL_UPDATE_EVENT, args)) => {
                    for update in parse_updates(args, grid) {
                        if events.send(FeedEvent::Update(update)).await.is_err() {
                            return Ok(());
                        }
                    }
                }
                _ => tracing::debug!(packet = ?other, "subscriber: ignoring packet"),
            },
        }
    }
}

/// Valid in-bounds records from a `pixel_update` event's arguments.
fn parse_updates(args: &[Value], grid: GridSize) -> Vec<PixelUpdate> {
    args.iter()
        .filter_map(|arg| {
            let Some(record) = arg.as_str() else {
                tracing::debug!(?arg, "subscriber: non-string pixel_update payload");
                return None;
            };
            match PixelUpdate::parse(record) {
                Ok(update) if grid.contains(update.x, update.y) => Some(update),
                Ok(update) => {
                    tracing::debug!(x = update.x, y = update.y, "subscriber: dropping out-of-bounds update");
                    None
                }
                Err(e) => {
                    tracing::debug!(error = %e, "subscriber: dropping malformed update");
                    None
                }
            }
        })
        .collect()
}

fn refusal_message(data: &Value) -> String {
    data.get("message")
        .and_then(Value::as_str)
        .map_or_else(|| data.to_string(), ToOwned::to_owned)
}

async fn send_packet<S>(write: &mut S, packet: &EnginePacket) -> Result<(), ClientError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    write.send(Message::Text(wire::encode_packet(packet).into())).await?;
    Ok(())
}

/// Next decoded packet, `None` once the socket closes.
async fn recv_packet<S>(read: &mut S, deadline: Duration, what: &'static str) -> Result<Option<EnginePacket>, ClientError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    match recv_text(read, deadline, what).await? {
        Some(text) => Ok(Some(wire::decode_packet(&text)?)),
        None => Ok(None),
    }
}

/// Next text frame, skipping binary and control frames. `None` once the
/// socket closes.
async fn recv_text<S>(read: &mut S, deadline: Duration, what: &'static str) -> Result<Option<String>, ClientError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    let fut = async {
        loop {
            let Some(message) = read.next().await else {
                return Ok::<_, ClientError>(None);
            };
            match message? {
                Message::Text(text) => return Ok(Some(text.as_str().to_owned())),
                Message::Close(_) => return Ok(None),
                _ => {}
            }
        }
    };

    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| ClientError::Timeout(what))?
}

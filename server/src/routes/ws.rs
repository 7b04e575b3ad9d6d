//! Realtime channel: Engine.IO v4 / Socket.IO v5 over websocket.
//!
//! DESIGN
//! ======
//! Only the websocket transport and the default namespace are served. On
//! upgrade the server sends the Engine.IO `open` packet, waits for the
//! client's namespace connect (`40`), acknowledges it, and from then on
//! forwards every committed pixel as `42["pixel_update","x:y:color:player"]`.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `0{sid,pingInterval,pingTimeout,..}`
//! 2. Client `40` → reply `40{"sid"}`, subscribe to canvas updates
//! 3. `select!` loop: inbound packets, broadcast updates, ping timer
//! 4. Client `41`/`1`/close, or no pong within interval + timeout → drop

use std::collections::HashMap;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;
use wire::{EnginePacket, OpenHandshake, PixelUpdate, SocketPacket};

use crate::state::AppState;

const MAX_PAYLOAD: u64 = 1_000_000;

// =============================================================================
// UPGRADE
// =============================================================================

/// `GET /socket.io/?EIO=4&transport=websocket`
pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    if params.get("EIO").map(String::as_str) != Some("4") {
        return (StatusCode::BAD_REQUEST, "unsupported protocol version").into_response();
    }
    if params.get("transport").map(String::as_str) != Some("websocket") {
        return (StatusCode::BAD_REQUEST, "only the websocket transport is supported").into_response();
    }

    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let sid = Uuid::new_v4().simple().to_string();
    let ping_interval = state.config.ping_interval;
    let ping_timeout = state.config.ping_timeout;

    let open = EnginePacket::Open(OpenHandshake {
        sid: sid.clone(),
        upgrades: Vec::new(),
        ping_interval: millis(ping_interval),
        ping_timeout: millis(ping_timeout),
        max_payload: MAX_PAYLOAD,
    });
    if send_packet(&mut socket, &open).await.is_err() {
        return;
    }
    info!(%sid, "ws: client connected");

    // Subscribed once the namespace is joined.
    let mut updates: Option<broadcast::Receiver<PixelUpdate>> = None;
    let mut ping = tokio::time::interval_at(Instant::now() + ping_interval, ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_pong = Instant::now();

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                let text = match msg {
                    Message::Text(text) => text,
                    Message::Close(_) => break,
                    _ => continue,
                };
                let packet = match wire::decode_packet(text.as_str()) {
                    Ok(packet) => packet,
                    Err(e) => {
                        debug!(%sid, error = %e, "ws: undecodable packet");
                        continue;
                    }
                };
                match packet {
                    EnginePacket::Pong(_) => last_pong = Instant::now(),
                    EnginePacket::Ping(probe) => {
                        if send_packet(&mut socket, &EnginePacket::Pong(probe)).await.is_err() {
                            break;
                        }
                    }
                    EnginePacket::Message(SocketPacket::Connect(_)) => {
                        let ack = EnginePacket::Message(SocketPacket::Connect(Some(json!({ "sid": sid }))));
                        if send_packet(&mut socket, &ack).await.is_err() {
                            break;
                        }
                        if updates.is_none() {
                            updates = Some(state.updates.subscribe());
                            debug!(%sid, "ws: namespace joined");
                        }
                    }
                    EnginePacket::Message(SocketPacket::Disconnect) | EnginePacket::Close => break,
                    EnginePacket::Message(SocketPacket::Event { name, .. }) => {
                        debug!(%sid, %name, "ws: ignoring client event");
                    }
                    other => debug!(%sid, packet = ?other, "ws: ignoring packet"),
                }
            }
            update = next_update(&mut updates) => {
                match update {
                    Ok(update) => {
                        if send_packet(&mut socket, &EnginePacket::pixel_update(&update)).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%sid, skipped, "ws: subscriber lagged; updates dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            _ = ping.tick() => {
                if last_pong.elapsed() > ping_interval + ping_timeout {
                    info!(%sid, "ws: heartbeat timed out");
                    break;
                }
                if send_packet(&mut socket, &EnginePacket::Ping(String::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    info!(%sid, "ws: client disconnected");
}

/// Next broadcast update, or never when the namespace is not joined yet.
async fn next_update(updates: &mut Option<broadcast::Receiver<PixelUpdate>>) -> Result<PixelUpdate, RecvError> {
    match updates {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn send_packet(socket: &mut WebSocket, packet: &EnginePacket) -> Result<(), axum::Error> {
    socket.send(Message::Text(wire::encode_packet(packet).into())).await
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;

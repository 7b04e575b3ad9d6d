//! Shared wire model for the realtime pixel channel.
//!
//! This crate owns the text representation used by both `server` and
//! `client`. The channel speaks Engine.IO v4 packets over a websocket, with
//! Socket.IO v5 packets nested inside Engine.IO `message` packets:
//!
//! ```text
//! 0{"sid":"..","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}
//! 40                                   namespace connect
//! 42["pixel_update","3:4:#FF0000:Alice"]
//! 2 / 3                                ping / pong
//! ```
//!
//! Only the default namespace and non-binary packets are supported.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event name carrying a `"x:y:color:player"` record.
pub const PIXEL_UPDATE_EVENT: &str = "pixel_update";

/// Path the channel is mounted under.
pub const SOCKET_PATH: &str = "/socket.io/";

/// Colors a placement may use, upper-case `#RRGGBB`.
pub const PALETTE: [&str; 18] = [
    "#6D001A", "#BE0039", "#FF4500", "#FFA800", "#FFD635", "#FFF8B8", "#00A368", "#00CC78", "#7EED56",
    "#00756F", "#009EAA", "#2450A4", "#3690EA", "#51E9F4", "#493AC1", "#6A5CFF", "#FFFFFF", "#000000",
];

/// Whether `color` is one of the [`PALETTE`] entries. Case-sensitive.
#[must_use]
pub fn is_palette_color(color: &str) -> bool {
    PALETTE.contains(&color)
}

/// Error returned by [`decode_packet`] and [`PixelUpdate::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// The text frame was empty.
    #[error("empty packet")]
    Empty,
    /// The leading Engine.IO type digit is not a known packet type.
    #[error("unknown engine packet type `{0}`")]
    UnknownEngineType(char),
    /// The Socket.IO type digit is not a known packet type.
    #[error("unknown socket packet type `{0}`")]
    UnknownSocketType(char),
    /// Binary and ack packets are not used on this channel.
    #[error("unsupported socket packet type `{0}`")]
    UnsupportedSocketType(char),
    /// The JSON payload did not have the expected shape.
    #[error("invalid packet payload: {0}")]
    Payload(String),
    /// A pixel record did not have four `:`-separated fields.
    #[error("malformed pixel record `{0}`")]
    MalformedRecord(String),
}

// =============================================================================
// ENGINE.IO
// =============================================================================

/// Payload of the Engine.IO `open` packet sent by the server on connect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: u64,
}

/// One Engine.IO packet.
#[derive(Clone, Debug, PartialEq)]
pub enum EnginePacket {
    Open(OpenHandshake),
    Close,
    /// Heartbeat probe. Carries an optional probe string (usually empty).
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

impl EnginePacket {
    /// Build the Socket.IO `pixel_update` event for a record.
    #[must_use]
    pub fn pixel_update(update: &PixelUpdate) -> Self {
        Self::Message(SocketPacket::Event {
            name: PIXEL_UPDATE_EVENT.to_owned(),
            args: vec![Value::String(update.to_string())],
        })
    }

    /// Name and arguments when this is a Socket.IO event.
    #[must_use]
    pub fn as_event(&self) -> Option<(&str, &[Value])> {
        match self {
            Self::Message(SocketPacket::Event { name, args }) => Some((name.as_str(), args.as_slice())),
            _ => None,
        }
    }
}

// =============================================================================
// SOCKET.IO
// =============================================================================

/// One Socket.IO packet, always on the default namespace.
#[derive(Clone, Debug, PartialEq)]
pub enum SocketPacket {
    /// Namespace connect. The server's reply carries `{"sid": ..}`.
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, args: Vec<Value> },
    /// Namespace connect refused, usually `{"message": ..}`.
    ConnectError(Value),
}

// =============================================================================
// CODEC
// =============================================================================

/// Encode a packet into its text frame.
#[must_use]
pub fn encode_packet(packet: &EnginePacket) -> String {
    match packet {
        EnginePacket::Open(handshake) => {
            let body = serde_json::to_string(handshake).unwrap_or_else(|_| "{}".to_owned());
            format!("0{body}")
        }
        EnginePacket::Close => "1".to_owned(),
        EnginePacket::Ping(probe) => format!("2{probe}"),
        EnginePacket::Pong(probe) => format!("3{probe}"),
        EnginePacket::Message(socket) => format!("4{}", encode_socket(socket)),
        EnginePacket::Upgrade => "5".to_owned(),
        EnginePacket::Noop => "6".to_owned(),
    }
}

fn encode_socket(packet: &SocketPacket) -> String {
    match packet {
        SocketPacket::Connect(None) => "0".to_owned(),
        SocketPacket::Connect(Some(data)) => format!("0{data}"),
        SocketPacket::Disconnect => "1".to_owned(),
        SocketPacket::Event { name, args } => {
            let mut items = Vec::with_capacity(args.len() + 1);
            items.push(Value::String(name.clone()));
            items.extend(args.iter().cloned());
            format!("2{}", Value::Array(items))
        }
        SocketPacket::ConnectError(data) => format!("4{data}"),
    }
}

/// Decode one text frame.
///
/// # Errors
///
/// Returns [`WireError`] when the type digits are unknown or the JSON payload
/// does not match the packet type.
pub fn decode_packet(text: &str) -> Result<EnginePacket, WireError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(WireError::Empty)?;
    let rest = chars.as_str();

    match kind {
        '0' => serde_json::from_str::<OpenHandshake>(rest)
            .map(EnginePacket::Open)
            .map_err(|e| WireError::Payload(e.to_string())),
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping(rest.to_owned())),
        '3' => Ok(EnginePacket::Pong(rest.to_owned())),
        '4' => decode_socket(rest).map(EnginePacket::Message),
        '5' => Ok(EnginePacket::Upgrade),
        '6' => Ok(EnginePacket::Noop),
        other => Err(WireError::UnknownEngineType(other)),
    }
}

fn decode_socket(text: &str) -> Result<SocketPacket, WireError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(WireError::Empty)?;
    let body = strip_ack_id(strip_namespace(chars.as_str()));

    match kind {
        '0' => {
            if body.is_empty() {
                return Ok(SocketPacket::Connect(None));
            }
            parse_json(body).map(|v| SocketPacket::Connect(Some(v)))
        }
        '1' => Ok(SocketPacket::Disconnect),
        '2' => {
            let Value::Array(mut items) = parse_json(body)? else {
                return Err(WireError::Payload("event payload must be an array".to_owned()));
            };
            if items.is_empty() {
                return Err(WireError::Payload("event payload is empty".to_owned()));
            }
            let Value::String(name) = items.remove(0) else {
                return Err(WireError::Payload("event name must be a string".to_owned()));
            };
            Ok(SocketPacket::Event { name, args: items })
        }
        '4' => parse_json(body).map(SocketPacket::ConnectError),
        '3' | '5' | '6' => Err(WireError::UnsupportedSocketType(kind)),
        other => Err(WireError::UnknownSocketType(other)),
    }
}

/// Drop a `/nsp,` prefix. Namespaces other than `/` are not routed separately.
fn strip_namespace(text: &str) -> &str {
    if !text.starts_with('/') {
        return text;
    }
    match text.find(',') {
        Some(idx) => &text[idx + 1..],
        None => "",
    }
}

fn strip_ack_id(text: &str) -> &str {
    text.trim_start_matches(|c: char| c.is_ascii_digit())
}

fn parse_json(text: &str) -> Result<Value, WireError> {
    serde_json::from_str(text).map_err(|e| WireError::Payload(e.to_string()))
}

// =============================================================================
// PIXEL RECORD
// =============================================================================

/// A single-cell change as broadcast on the channel: `"x:y:color:player"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelUpdate {
    pub x: u32,
    pub y: u32,
    pub color: String,
    pub player: String,
}

impl PixelUpdate {
    /// Parse a colon-delimited record. The player field keeps any further
    /// colons verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::MalformedRecord`] when a field is missing, a
    /// coordinate is not a non-negative integer, or the color is empty.
    pub fn parse(record: &str) -> Result<Self, WireError> {
        let malformed = || WireError::MalformedRecord(record.to_owned());
        let mut fields = record.splitn(4, ':');

        let x = fields.next().and_then(|s| s.trim().parse::<u32>().ok()).ok_or_else(malformed)?;
        let y = fields.next().and_then(|s| s.trim().parse::<u32>().ok()).ok_or_else(malformed)?;
        let color = fields.next().filter(|s| !s.is_empty()).ok_or_else(malformed)?;
        let player = fields.next().ok_or_else(malformed)?;

        Ok(Self { x, y, color: color.to_owned(), player: player.to_owned() })
    }

    /// The `"x:y"` key this update lands on.
    #[must_use]
    pub fn key(&self) -> String {
        cell_key(self.x, self.y)
    }
}

impl fmt::Display for PixelUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.x, self.y, self.color, self.player)
    }
}

impl FromStr for PixelUpdate {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Format the `"x:y"` snapshot key for a cell.
#[must_use]
pub fn cell_key(x: u32, y: u32) -> String {
    format!("{x}:{y}")
}

/// Parse a `"x:y"` snapshot key.
#[must_use]
pub fn parse_cell_key(key: &str) -> Option<(u32, u32)> {
    let (x, y) = key.split_once(':')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;

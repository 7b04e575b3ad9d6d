use super::*;

fn handshake() -> OpenHandshake {
    OpenHandshake {
        sid: "abc".to_owned(),
        upgrades: Vec::new(),
        ping_interval: 25_000,
        ping_timeout: 20_000,
        max_payload: 1_000_000,
    }
}

// =============================================================
// Engine packets
// =============================================================

#[test]
fn decode_open_reads_camel_case_handshake() {
    let text = r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
    let packet = decode_packet(text).expect("open should decode");
    assert_eq!(packet, EnginePacket::Open(handshake()));
}

#[test]
fn encode_open_uses_camel_case_keys() {
    let text = encode_packet(&EnginePacket::Open(handshake()));
    assert!(text.starts_with('0'));
    assert!(text.contains("\"pingInterval\":25000"));
    assert!(text.contains("\"maxPayload\":1000000"));
}

#[test]
fn ping_and_pong_keep_probe() {
    assert_eq!(decode_packet("2").expect("ping"), EnginePacket::Ping(String::new()));
    assert_eq!(decode_packet("3probe").expect("pong"), EnginePacket::Pong("probe".to_owned()));
    assert_eq!(encode_packet(&EnginePacket::Pong(String::new())), "3");
}

#[test]
fn decode_rejects_empty_and_unknown_types() {
    assert_eq!(decode_packet(""), Err(WireError::Empty));
    assert_eq!(decode_packet("9"), Err(WireError::UnknownEngineType('9')));
    assert_eq!(decode_packet("49"), Err(WireError::UnknownSocketType('9')));
}

#[test]
fn decode_open_with_bad_json_is_payload_error() {
    assert!(matches!(decode_packet("0{not json"), Err(WireError::Payload(_))));
}

// =============================================================
// Socket packets
// =============================================================

#[test]
fn namespace_connect_without_payload() {
    assert_eq!(encode_packet(&EnginePacket::Message(SocketPacket::Connect(None))), "40");
    assert_eq!(decode_packet("40").expect("connect"), EnginePacket::Message(SocketPacket::Connect(None)));
}

#[test]
fn namespace_connect_reply_carries_sid() {
    let packet = decode_packet(r#"40{"sid":"xyz"}"#).expect("connect reply");
    let EnginePacket::Message(SocketPacket::Connect(Some(data))) = packet else {
        panic!("expected connect with data");
    };
    assert_eq!(data["sid"], "xyz");
}

#[test]
fn decode_pixel_update_event() {
    let packet = decode_packet(r#"42["pixel_update","3:4:#FF0000:Alice"]"#).expect("event");
    let (name, args) = packet.as_event().expect("should be an event");
    assert_eq!(name, PIXEL_UPDATE_EVENT);
    assert_eq!(args, [Value::String("3:4:#FF0000:Alice".to_owned())]);
}

#[test]
fn decode_event_ignores_namespace_and_ack_id() {
    let packet = decode_packet(r#"42/,12["pixel_update","1:1:#000000:Bob"]"#).expect("event");
    assert_eq!(packet.as_event().map(|(name, _)| name), Some(PIXEL_UPDATE_EVENT));
}

#[test]
fn pixel_update_packet_encodes_record_as_single_argument() {
    let update = PixelUpdate { x: 3, y: 4, color: "#FF0000".to_owned(), player: "Alice".to_owned() };
    let text = encode_packet(&EnginePacket::pixel_update(&update));
    assert_eq!(text, r#"42["pixel_update","3:4:#FF0000:Alice"]"#);
}

#[test]
fn event_with_non_array_payload_is_rejected() {
    assert!(matches!(decode_packet(r#"42{"a":1}"#), Err(WireError::Payload(_))));
    assert!(matches!(decode_packet("42[]"), Err(WireError::Payload(_))));
    assert!(matches!(decode_packet("42[1,2]"), Err(WireError::Payload(_))));
}

#[test]
fn connect_error_keeps_message() {
    let packet = decode_packet(r#"44{"message":"Bad request"}"#).expect("connect error");
    let EnginePacket::Message(SocketPacket::ConnectError(data)) = packet else {
        panic!("expected connect error");
    };
    assert_eq!(data["message"], "Bad request");
}

#[test]
fn binary_and_ack_packets_are_unsupported() {
    assert_eq!(decode_packet("43[]"), Err(WireError::UnsupportedSocketType('3')));
    assert_eq!(decode_packet("45[]"), Err(WireError::UnsupportedSocketType('5')));
}

#[test]
fn non_event_packets_have_no_event_view() {
    assert!(EnginePacket::Ping(String::new()).as_event().is_none());
    assert!(EnginePacket::Message(SocketPacket::Disconnect).as_event().is_none());
}

// =============================================================
// Pixel records
// =============================================================

#[test]
fn parse_record_reads_all_fields() {
    let update = PixelUpdate::parse("3:4:#FF0000:Alice").expect("valid record");
    assert_eq!(update.x, 3);
    assert_eq!(update.y, 4);
    assert_eq!(update.color, "#FF0000");
    assert_eq!(update.player, "Alice");
    assert_eq!(update.key(), "3:4");
    assert_eq!(update.to_string(), "3:4:#FF0000:Alice");
}

#[test]
fn parse_record_keeps_colons_in_player() {
    let update: PixelUpdate = "0:0:#000000:a:b".parse().expect("valid record");
    assert_eq!(update.player, "a:b");
}

#[test]
fn parse_record_rejects_malformed_input() {
    for bad in ["", "3", "3:4", "3:4:#FF0000", "x:4:#FF0000:A", "-1:4:#FF0000:A", "3:4::A"] {
        assert!(
            matches!(PixelUpdate::parse(bad), Err(WireError::MalformedRecord(_))),
            "`{bad}` should be rejected"
        );
    }
}

#[test]
fn cell_keys_round_trip() {
    assert_eq!(cell_key(12, 7), "12:7");
    assert_eq!(parse_cell_key("12:7"), Some((12, 7)));
    assert_eq!(parse_cell_key("12"), None);
    assert_eq!(parse_cell_key("a:7"), None);
    assert_eq!(parse_cell_key("-1:7"), None);
}

#[test]
fn palette_membership_is_exact() {
    assert_eq!(PALETTE.len(), 18);
    assert!(is_palette_color("#FF4500"));
    assert!(!is_palette_color("#ff4500"));
    assert!(!is_palette_color("#123456"));
}

use crate::transport::frame::{InboundFrame, OutboundFrame};

use serde_json::{Value, json};

fn encoded(frame: &OutboundFrame) -> Value {
    serde_json::from_str(&frame.encode().expect("encode")).expect("valid json")
}

/// **VALUE**: Verifies an event frame decodes with its sequence number and opaque payload.
///
/// **WHY THIS MATTERS**: Events are flattened next to the `type` tag on the wire. If the
/// nesting were wrong every live event would be skipped as undecodable.
#[test]
fn given_event_json_when_decoding_then_event_frame() {
    // GIVEN
    let raw = json!({
        "type": "event",
        "seq": 42,
        "event": "device_joined",
        "payload": { "id": "d-1" },
        "timestamp": "2026-01-01T00:00:00Z"
    });

    // WHEN
    let frame = InboundFrame::decode(raw.to_string().as_bytes()).expect("decode");

    // THEN
    match frame {
        InboundFrame::Event(event) => {
            assert_eq!(event.seq, 42);
            assert_eq!(event.kind, "device_joined");
            assert_eq!(event.payload["id"], "d-1");
        }
        other => panic!("expected event, got {other:?}"),
    }
}

#[test]
fn given_control_frames_when_decoding_then_variants_match() {
    let decode = |raw: Value| InboundFrame::decode(raw.to_string().as_bytes()).expect("decode");

    assert_eq!(decode(json!({"type": "auth_ok"})), InboundFrame::AuthOk);
    assert_eq!(decode(json!({"type": "ping"})), InboundFrame::Ping);
    assert_eq!(
        decode(json!({"type": "replay_complete", "last_seq": 7})),
        InboundFrame::ReplayComplete { last_seq: 7 }
    );
    assert_eq!(
        decode(json!({"type": "auth_error"})),
        InboundFrame::AuthError {
            reason: String::new()
        }
    );
    assert_eq!(decode(json!({"type": "ping"})).kind(), "ping");
}

/// **VALUE**: Verifies unknown frame types are a decode error rather than a panic.
///
/// **BUG THIS CATCHES**: Would catch a newer sensor firmware frame crashing the reader.
#[test]
fn given_unknown_type_when_decoding_then_error() {
    assert!(InboundFrame::decode(br#"{"type":"telemetry"}"#).is_err());
    assert!(InboundFrame::decode(b"not json").is_err());
}

/// **VALUE**: Verifies the outbound frames have exactly the shape the sensor expects.
#[test]
fn given_outbound_frames_when_encoding_then_wire_shape() {
    assert_eq!(
        encoded(&OutboundFrame::Auth {
            fingerprint: Some(String::from("sha256:ab")),
            token: None,
        }),
        json!({"type": "auth", "fingerprint": "sha256:ab"})
    );
    assert_eq!(
        encoded(&OutboundFrame::Replay { since_seq: 0 }),
        json!({"type": "replay", "since_seq": 0})
    );
    assert_eq!(encoded(&OutboundFrame::Pong), json!({"type": "pong"}));
}

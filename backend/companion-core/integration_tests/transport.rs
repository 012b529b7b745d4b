use crate::helpers::{AfterScript, EventServer, event_frame, wait_until};

use companion_core::crypto::tls::TlsSettings;
use companion_core::error::transport::TransportError;
use companion_core::transport::cursor::SequenceCursor;
use companion_core::transport::frame::InboundFrame;
use companion_core::transport::{EventTransport, events_url};

use std::time::Duration;

use futures_util::StreamExt;
use serde_json::json;
use url::Url;

const WAIT: Duration = Duration::from_secs(5);

async fn connected_transport(events: &EventServer, cursor: SequenceCursor) -> EventTransport {
    let mut transport = EventTransport::new(events.url.clone(), TlsSettings::unpinned(), cursor);
    transport.connect().await.expect("connect");
    transport
        .send_auth(Some("sha256:00"), None)
        .expect("send auth");
    transport.request_replay(0).expect("send replay");
    transport
}

/// **VALUE**: Verifies every `ping` is answered with exactly one `pong`.
///
/// **WHY THIS MATTERS**: The sensor drops clients that stop answering pings. Answering twice
/// is harmless to the sensor but means frames are being processed twice.
#[tokio::test]
async fn given_ping_frame_when_receiving_then_single_pong_sent() {
    // GIVEN: A server that pings once
    let events = EventServer::start(vec![json!({"type": "ping"})], AfterScript::Hold).await;
    let mut transport = connected_transport(&events, SequenceCursor::new()).await;
    let mut frames = Box::pin(transport.receive_events().expect("stream"));

    // WHEN: The ping is read
    let frame = tokio::time::timeout(WAIT, frames.next())
        .await
        .expect("frame in time");

    // THEN: The consumer still sees the ping, and one pong went back
    assert_eq!(frame, Some(InboundFrame::Ping));
    assert!(wait_until(WAIT, || events.received_of_type("pong").len() == 1).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(events.received_of_type("pong").len(), 1);
}

/// **VALUE**: Verifies event frames advance the shared cursor, and never backwards.
///
/// **BUG THIS CATCHES**: Would catch an out-of-order replayed event rewinding `last_seq`,
/// which would make the next reconnect replay events twice.
#[tokio::test]
async fn given_event_frames_when_receiving_then_cursor_tracks_highest_seq() {
    // GIVEN
    let events = EventServer::start(
        vec![event_frame(7, "device_joined"), event_frame(4, "device_left")],
        AfterScript::Hold,
    )
    .await;
    let cursor = SequenceCursor::new();
    let mut transport = connected_transport(&events, cursor.clone()).await;
    let mut frames = Box::pin(transport.receive_events().expect("stream"));

    // WHEN
    for _ in 0..2 {
        tokio::time::timeout(WAIT, frames.next())
            .await
            .expect("frame in time")
            .expect("frame present");
    }

    // THEN
    assert_eq!(cursor.get(), 7);
    assert_eq!(transport.last_seq(), 7);
}

/// **VALUE**: Verifies a server close ends the stream and clears the connected flag.
#[tokio::test]
async fn given_server_close_when_receiving_then_stream_ends_and_disconnected() {
    // GIVEN
    let events = EventServer::start(vec![json!({"type": "auth_ok"})], AfterScript::Close).await;
    let mut transport = connected_transport(&events, SequenceCursor::new()).await;
    assert!(transport.is_connected());
    let mut frames = Box::pin(transport.receive_events().expect("stream"));

    // WHEN: Draining until the stream ends
    let mut seen = Vec::new();
    while let Some(frame) = tokio::time::timeout(WAIT, frames.next())
        .await
        .expect("stream progresses")
    {
        seen.push(frame);
    }

    // THEN
    assert_eq!(seen, vec![InboundFrame::AuthOk]);
    assert!(!transport.is_connected());
    assert!(matches!(
        transport.request_replay(1),
        Err(TransportError::NotConnected { .. })
    ));
}

/// **VALUE**: Verifies sending before `connect()` is refused instead of silently dropped.
#[tokio::test]
async fn given_unconnected_transport_when_sending_then_not_connected() {
    let url = Url::parse("ws://127.0.0.1:9/ws/events").expect("url");
    let mut transport = EventTransport::new(url, TlsSettings::unpinned(), SequenceCursor::new());

    assert!(matches!(
        transport.send_auth(Some("sha256:00"), None),
        Err(TransportError::NotConnected { .. })
    ));
    assert!(transport.receive_events().is_err());
    transport.disconnect().await;
    assert!(!transport.is_connected());
}

#[tokio::test]
async fn given_connected_transport_when_disconnecting_twice_then_idempotent() {
    let events = EventServer::start(Vec::new(), AfterScript::Hold).await;
    let mut transport = connected_transport(&events, SequenceCursor::new()).await;

    transport.disconnect().await;
    transport.disconnect().await;

    assert!(!transport.is_connected());
}

#[test]
fn given_http_addresses_when_deriving_events_url_then_ws_schemes() {
    let plain = events_url(&Url::parse("http://10.0.0.2:8080/").expect("url")).expect("derive");
    let secure =
        events_url(&Url::parse("https://sensor.local:8443/").expect("url")).expect("derive");

    assert_eq!(plain.as_str(), "ws://10.0.0.2:8080/ws/events");
    assert_eq!(secure.as_str(), "wss://sensor.local:8443/ws/events");
    assert!(events_url(&Url::parse("ftp://sensor.local/").expect("url")).is_err());
}

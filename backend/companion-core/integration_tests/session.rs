use crate::helpers::{
    AfterScript, EventServer, Record, RecordingConsumer, TEST_FINGERPRINT, TEST_SENSOR_NAME,
    event_frame, mount_hydration, received_paths, wait_for_requests, wait_until,
};

use companion_core::crypto::tls::TlsSettings;
use companion_core::error::session::SessionError;
use companion_core::session::{
    ActionDisposition, ReplayPolicy, SessionManager, SessionSettings, SessionState, StateConsumer,
};
use companion_core::transport::cursor::SequenceCursor;

use models::{HydrationSnapshot, SensorAction, SensorEvent};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WAIT: Duration = Duration::from_secs(5);

fn settings(events: &EventServer) -> SessionSettings {
    SessionSettings::new(TlsSettings::unpinned())
        .with_events_url(events.url.clone())
        .with_request_timeout(Duration::from_secs(5))
}

fn session_with(
    consumer: &Arc<RecordingConsumer>,
    settings: SessionSettings,
) -> SessionManager<Arc<RecordingConsumer>> {
    SessionManager::new(consumer.clone(), settings)
}

async fn mount_ok(server: &MockServer, method_name: &str, route: &str) {
    Mock::given(method(method_name))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// **VALUE**: Verifies a rejected bearer during hydration ends in `auth_failed` without ever
/// opening the event stream.
///
/// **WHY THIS MATTERS**: A revoked companion must stop and ask the user to re-pair. Opening
/// the stream or retrying would hammer the sensor with credentials it already refused.
///
/// **BUG THIS CATCHES**: Would catch:
/// - 403 being classified as a transient error (state `disconnected`, retried forever)
/// - The stream being opened before hydration succeeds
#[tokio::test]
async fn given_forbidden_hydration_when_connecting_then_auth_failed_and_no_stream() {
    // GIVEN: A sensor that refuses the bearer
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    let events = EventServer::start(Vec::new(), AfterScript::Hold).await;
    let consumer = RecordingConsumer::new();
    let session = session_with(&consumer, settings(&events));

    // WHEN
    let result = session.connect(&server.uri(), TEST_FINGERPRINT).await;

    // THEN
    let err = result.expect_err("auth rejected");
    assert!(matches!(err, SessionError::AuthRejected { .. }));
    assert!(!err.is_retryable());
    assert_eq!(session.state(), SessionState::AuthFailed);
    assert_eq!(consumer.snapshot_count(), 0);
    assert_eq!(events.connection_count(), 0);
}

/// **VALUE**: Verifies a failing hydration call leaves the session disconnected and retryable.
#[tokio::test]
async fn given_server_error_during_hydration_when_connecting_then_disconnected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let events = EventServer::start(Vec::new(), AfterScript::Hold).await;
    let consumer = RecordingConsumer::new();
    let session = session_with(&consumer, settings(&events));

    let err = session
        .connect(&server.uri(), TEST_FINGERPRINT)
        .await
        .expect_err("hydration fails");

    assert!(matches!(err, SessionError::Hydration { .. }));
    assert!(err.is_retryable());
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(events.connection_count(), 0);
}

/// **VALUE**: Verifies the happy path: one snapshot, authenticated stream, replay from the
/// cursor, events in order, and `live` only after replay completes.
///
/// **WHY THIS MATTERS**: The consumer's view of the sensor is the snapshot plus every event
/// after it. Events applied before the snapshot, or a session claiming `live` while still
/// replaying, would show the user a state the sensor never had.
///
/// **BUG THIS CATCHES**: Would catch:
/// - The bearer token missing from hydration calls
/// - `auth` not being the first frame, or `replay` sent without `since_seq`
/// - `live` being entered on `auth_ok` instead of `replay_complete`
/// - The cursor not following the highest applied sequence
#[tokio::test]
async fn given_healthy_sensor_when_connecting_then_snapshot_events_and_live() {
    // GIVEN: Hydration succeeds only with the right bearer
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .and(header(
            "authorization",
            format!("Bearer {TEST_FINGERPRINT}").as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(401))
        .with_priority(5)
        .mount(&server)
        .await;
    mount_hydration(&server).await;

    // GIVEN: A stream that replays two events then completes
    let events = EventServer::start(
        vec![
            json!({"type": "auth_ok"}),
            event_frame(11, "device_joined"),
            event_frame(12, "alert_raised"),
            json!({"type": "replay_complete", "last_seq": 12}),
        ],
        AfterScript::Hold,
    )
    .await;
    let consumer = RecordingConsumer::new();
    let session = SessionManager::with_cursor(
        consumer.clone(),
        settings(&events),
        SequenceCursor::starting_at(10),
    );

    // WHEN
    session
        .connect(&server.uri(), TEST_FINGERPRINT)
        .await
        .expect("connect");
    let live = wait_until(WAIT, || session.state() == SessionState::Live).await;

    // THEN: Live, cursor advanced, snapshot applied once before the events
    assert!(live, "session should go live");
    assert_eq!(session.last_seq(), 12);
    assert_eq!(consumer.snapshot_count(), 1);
    assert_eq!(consumer.event_seqs(), vec![11, 12]);

    let records = consumer.records();
    let snapshot_at = records
        .iter()
        .position(|record| matches!(record, Record::Snapshot(_)))
        .expect("snapshot recorded");
    let first_event_at = records
        .iter()
        .position(|record| matches!(record, Record::Event(_)))
        .expect("event recorded");
    assert!(snapshot_at < first_event_at);
    assert!(records.contains(&Record::State(SessionState::Connecting)));

    // THEN: The sensor saw auth first, then a replay from the starting cursor
    let received = events.received.lock().expect("received").clone();
    assert_eq!(received[0]["type"], "auth");
    assert_eq!(received[0]["fingerprint"], TEST_FINGERPRINT);
    assert_eq!(received[1], json!({"type": "replay", "since_seq": 10}));
}

/// **VALUE**: Verifies actions queued while offline are replayed in order once live.
///
/// **WHY THIS MATTERS**: Users act on alerts while the sensor is unreachable. Those actions
/// must reach the sensor exactly in the order they were taken.
#[tokio::test]
async fn given_queued_actions_when_session_goes_live_then_replayed_in_order() {
    // GIVEN: Hydration, action routes, and a stream that completes replay immediately
    let server = MockServer::start().await;
    mount_hydration(&server).await;
    mount_ok(&server, "POST", "/api/alerts/1/acknowledge").await;
    mount_ok(&server, "POST", "/api/devices/d-1/trust").await;
    mount_ok(&server, "POST", "/api/learning/start").await;
    let events = EventServer::start(
        vec![json!({"type": "replay_complete", "last_seq": 0})],
        AfterScript::Hold,
    )
    .await;
    let consumer = RecordingConsumer::new();
    let session = session_with(&consumer, settings(&events));

    // GIVEN: Three actions submitted while disconnected
    for action in [
        SensorAction::AcknowledgeAlert { alert_id: 1 },
        SensorAction::TrustDevice {
            device_id: String::from("d-1"),
        },
        SensorAction::SetLearning { enabled: true },
    ] {
        let disposition = session.submit_action(action).await.expect("queue");
        assert_eq!(disposition, ActionDisposition::Queued);
    }
    assert_eq!(session.queued_action_count(), 3);

    // WHEN
    session
        .connect(&server.uri(), TEST_FINGERPRINT)
        .await
        .expect("connect");

    // THEN: All three were sent, in submission order, and the queue is empty
    assert!(wait_for_requests(&server, "POST", 3).await);
    let posts: Vec<String> = received_paths(&server)
        .await
        .into_iter()
        .filter(|line| line.starts_with("POST"))
        .collect();
    assert_eq!(
        posts,
        vec![
            "POST /api/alerts/1/acknowledge",
            "POST /api/devices/d-1/trust",
            "POST /api/learning/start",
        ]
    );
    assert!(wait_until(WAIT, || session.queued_action_count() == 0).await);
}

/// **VALUE**: Verifies the stop-on-failure policy keeps the failed action and everything after it.
///
/// **BUG THIS CATCHES**: Would catch:
/// - Actions after the failure being sent anyway
/// - The failed action being dropped instead of requeued
/// - Requeued actions losing their order
#[tokio::test]
async fn given_stop_on_failure_when_replay_hits_error_then_rest_requeued() {
    // GIVEN: The second action's route fails; the stream never completes replay
    let server = MockServer::start().await;
    mount_hydration(&server).await;
    mount_ok(&server, "POST", "/api/alerts/1/acknowledge").await;
    Mock::given(method("POST"))
        .and(path("/api/alerts/2/acknowledge"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_ok(&server, "POST", "/api/alerts/3/acknowledge").await;
    let events = EventServer::start(vec![json!({"type": "auth_ok"})], AfterScript::Hold).await;
    let consumer = RecordingConsumer::new();
    let session = session_with(
        &consumer,
        settings(&events).with_replay_policy(ReplayPolicy::StopOnFailure),
    );
    session
        .connect(&server.uri(), TEST_FINGERPRINT)
        .await
        .expect("connect");
    for alert_id in 1..=3 {
        session.enqueue_action(SensorAction::AcknowledgeAlert { alert_id });
    }

    // WHEN
    let report = session.replay_queued_actions().await;

    // THEN
    assert_eq!(report.attempted, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.requeued, 2);
    assert_eq!(session.queued_action_count(), 2);
    assert!(
        !received_paths(&server)
            .await
            .iter()
            .any(|line| line.ends_with("/api/alerts/3/acknowledge"))
    );
}

/// **VALUE**: Verifies best effort drains the queue even when an action fails.
#[tokio::test]
async fn given_best_effort_when_replay_hits_error_then_queue_drained() {
    let server = MockServer::start().await;
    mount_hydration(&server).await;
    Mock::given(method("DELETE"))
        .and(path("/api/decoys/dc-1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_ok(&server, "POST", "/api/decoys").await;
    let events = EventServer::start(vec![json!({"type": "auth_ok"})], AfterScript::Hold).await;
    let consumer = RecordingConsumer::new();
    let session = session_with(&consumer, settings(&events));
    session
        .connect(&server.uri(), TEST_FINGERPRINT)
        .await
        .expect("connect");
    session.enqueue_action(SensorAction::RemoveDecoy {
        decoy_id: String::from("dc-1"),
    });
    session.enqueue_action(SensorAction::DeployDecoy {
        template: String::from("ssh"),
        port: Some(2222),
    });

    let report = session.replay_queued_actions().await;

    assert_eq!(report.attempted, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.requeued, 0);
    assert_eq!(session.queued_action_count(), 0);
}

/// **VALUE**: Verifies replay without a connection leaves the queue alone.
#[tokio::test]
async fn given_no_connection_when_replaying_then_queue_untouched() {
    let events = EventServer::start(Vec::new(), AfterScript::Hold).await;
    let consumer = RecordingConsumer::new();
    let session = session_with(&consumer, settings(&events));
    session.enqueue_action(SensorAction::SetLearning { enabled: false });

    let report = session.replay_queued_actions().await;

    assert_eq!(report.attempted, 0);
    assert_eq!(session.queued_action_count(), 1);
}

/// **VALUE**: Verifies actions go straight to the sensor while live.
#[tokio::test]
async fn given_live_session_when_submitting_action_then_sent_immediately() {
    let server = MockServer::start().await;
    mount_hydration(&server).await;
    mount_ok(&server, "POST", "/api/devices/d-9/block").await;
    let events = EventServer::start(
        vec![json!({"type": "replay_complete", "last_seq": 0})],
        AfterScript::Hold,
    )
    .await;
    let consumer = RecordingConsumer::new();
    let session = session_with(&consumer, settings(&events));
    session
        .connect(&server.uri(), TEST_FINGERPRINT)
        .await
        .expect("connect");
    assert!(wait_until(WAIT, || session.state() == SessionState::Live).await);

    let disposition = session
        .submit_action(SensorAction::BlockDevice {
            device_id: String::from("d-9"),
        })
        .await
        .expect("submit");

    assert_eq!(disposition, ActionDisposition::Sent);
    assert_eq!(session.queued_action_count(), 0);
    assert!(wait_for_requests(&server, "/api/devices/d-9/block", 1).await);
}

/// **VALUE**: Verifies losing a live stream raises exactly one local offline alert.
///
/// **WHY THIS MATTERS**: The sensor cannot report its own disappearance. The companion is
/// the only one able to tell the user that monitoring stopped.
///
/// **BUG THIS CATCHES**: Would catch:
/// - The session staying `live` after the socket closed
/// - No alert, or a duplicate alert, on disconnect
#[tokio::test]
async fn given_live_session_when_stream_closes_then_disconnected_with_offline_alert() {
    // GIVEN: A stream that goes live and then closes
    let server = MockServer::start().await;
    mount_hydration(&server).await;
    let events = EventServer::start(
        vec![json!({"type": "replay_complete", "last_seq": 3})],
        AfterScript::Close,
    )
    .await;
    let consumer = RecordingConsumer::new();
    let session = session_with(&consumer, settings(&events));

    // WHEN
    session
        .connect(&server.uri(), TEST_FINGERPRINT)
        .await
        .expect("connect");
    let dropped = wait_until(WAIT, || !consumer.local_alerts().is_empty()).await;

    // THEN
    assert!(dropped, "offline alert should be raised");
    assert_eq!(session.state(), SessionState::Disconnected);
    let alerts = consumer.local_alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains(TEST_SENSOR_NAME));

    let records = consumer.records();
    let live_at = records
        .iter()
        .position(|record| *record == Record::State(SessionState::Live))
        .expect("went live");
    let offline_at = records
        .iter()
        .rposition(|record| *record == Record::State(SessionState::Disconnected))
        .expect("went offline");
    assert!(live_at < offline_at);
}

/// **VALUE**: Verifies an `auth_error` frame ends the session in `auth_failed`.
#[tokio::test]
async fn given_auth_error_frame_when_connected_then_auth_failed() {
    let server = MockServer::start().await;
    mount_hydration(&server).await;
    let events = EventServer::start(
        vec![json!({"type": "auth_error", "reason": "certificate revoked"})],
        AfterScript::Hold,
    )
    .await;
    let consumer = RecordingConsumer::new();
    let session = session_with(&consumer, settings(&events));

    session
        .connect(&server.uri(), TEST_FINGERPRINT)
        .await
        .expect("connect");

    assert!(wait_until(WAIT, || session.state() == SessionState::AuthFailed).await);
    assert!(consumer.local_alerts().is_empty());
}

/// **VALUE**: Verifies disconnect is idempotent and silences the old connection.
///
/// **WHY THIS MATTERS**: UI code calls disconnect on every teardown path. A second call
/// must be harmless, and nothing from the old stream may reach the consumer afterwards.
#[tokio::test]
async fn given_live_session_when_disconnecting_twice_then_disconnected_without_alert() {
    // GIVEN
    let server = MockServer::start().await;
    mount_hydration(&server).await;
    let events = EventServer::start(
        vec![json!({"type": "replay_complete", "last_seq": 0})],
        AfterScript::Hold,
    )
    .await;
    let consumer = RecordingConsumer::new();
    let session = session_with(&consumer, settings(&events));
    session
        .connect(&server.uri(), TEST_FINGERPRINT)
        .await
        .expect("connect");
    assert!(wait_until(WAIT, || session.state() == SessionState::Live).await);

    // WHEN
    session.disconnect().await;
    session.disconnect().await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // THEN: A user-initiated disconnect is not an outage
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(consumer.local_alerts().is_empty());
}

/// **VALUE**: Verifies reconnecting hydrates again and resumes replay from the cursor.
#[tokio::test]
async fn given_previous_session_when_reconnecting_then_new_snapshot_and_resume_from_cursor() {
    // GIVEN: A first connection that saw events up to seq 5
    let server = MockServer::start().await;
    mount_hydration(&server).await;
    let events = EventServer::start(
        vec![
            event_frame(5, "device_left"),
            json!({"type": "replay_complete", "last_seq": 5}),
        ],
        AfterScript::Hold,
    )
    .await;
    let consumer = RecordingConsumer::new();
    let session = session_with(&consumer, settings(&events));
    session
        .connect(&server.uri(), TEST_FINGERPRINT)
        .await
        .expect("first connect");
    assert!(wait_until(WAIT, || session.state() == SessionState::Live).await);

    // WHEN: Connecting again
    session
        .connect(&server.uri(), TEST_FINGERPRINT)
        .await
        .expect("second connect");
    assert!(wait_until(WAIT, || events.received_of_type("replay").len() == 2).await);

    // THEN: Two snapshots, and the second replay starts where the first left off
    assert_eq!(consumer.snapshot_count(), 2);
    let replays = events.received_of_type("replay");
    assert_eq!(replays[0]["since_seq"], 0);
    assert_eq!(replays[1]["since_seq"], 5);
    assert_eq!(events.connection_count(), 2);
}

/// **VALUE**: Verifies retrying never repeats a credential rejection.
///
/// **BUG THIS CATCHES**: Would catch `connect_with_retry` treating 401/403 as transient
/// and re-presenting a revoked certificate until the backoff cap runs out.
#[tokio::test]
async fn given_rejected_credentials_when_connecting_with_retry_then_single_attempt() {
    // GIVEN
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let events = EventServer::start(Vec::new(), AfterScript::Hold).await;
    let consumer = RecordingConsumer::new();
    let session = session_with(
        &consumer,
        settings(&events).with_reconnect_max_elapsed(Duration::from_secs(3)),
    );

    // WHEN
    let err = session
        .connect_with_retry(&server.uri(), TEST_FINGERPRINT)
        .await
        .expect_err("auth rejected");

    // THEN: One hydration round only, then auth_failed
    assert!(matches!(err, SessionError::AuthRejected { .. }));
    assert_eq!(session.state(), SessionState::AuthFailed);
    let health_calls = received_paths(&server)
        .await
        .iter()
        .filter(|line| line.ends_with("/api/health"))
        .count();
    assert_eq!(health_calls, 1);
}

/// **VALUE**: Verifies transient failures are retried and the retry loop is bounded.
#[tokio::test]
async fn given_failing_sensor_when_connecting_with_retry_then_retries_until_cap() {
    // GIVEN: A sensor that keeps failing with 500
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let events = EventServer::start(Vec::new(), AfterScript::Hold).await;
    let consumer = RecordingConsumer::new();
    let session = session_with(
        &consumer,
        settings(&events).with_reconnect_max_elapsed(Duration::from_secs(2)),
    );

    // WHEN
    let result = tokio::time::timeout(
        Duration::from_secs(10),
        session.connect_with_retry(&server.uri(), TEST_FINGERPRINT),
    )
    .await
    .expect("retry loop gives up on its own");

    // THEN: More than one attempt, still disconnected, stream never opened
    let err = result.expect_err("sensor never recovers");
    assert!(matches!(err, SessionError::Hydration { .. }));
    let health_calls = received_paths(&server)
        .await
        .iter()
        .filter(|line| line.ends_with("/api/health"))
        .count();
    assert!(health_calls >= 2, "expected a retry, saw {health_calls} attempts");
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(events.connection_count(), 0);
}

/// **VALUE**: Verifies the stream keeps answering pings while queued actions drain.
///
/// **WHY THIS MATTERS**: A slow action endpoint must not starve the event loop. A sensor
/// that sees no pong drops the companion, so a long queue would cause reconnect churn.
///
/// **BUG THIS CATCHES**: Would catch the queue being drained inline on the frame loop,
/// holding every later frame until the last queued HTTP call returns.
#[tokio::test]
async fn given_slow_queued_action_when_replay_completes_then_pings_still_answered() {
    // GIVEN: An acknowledge endpoint that takes three seconds
    let server = MockServer::start().await;
    mount_hydration(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/alerts/1/acknowledge"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;
    let events = EventServer::start(
        vec![
            json!({"type": "replay_complete", "last_seq": 0}),
            json!({"type": "ping"}),
        ],
        AfterScript::Hold,
    )
    .await;
    let consumer = RecordingConsumer::new();
    let session = session_with(&consumer, settings(&events));
    session.enqueue_action(SensorAction::AcknowledgeAlert { alert_id: 1 });

    // WHEN
    session
        .connect(&server.uri(), TEST_FINGERPRINT)
        .await
        .expect("connect");

    // THEN: The pong goes out well before the acknowledge call finishes
    assert!(
        wait_until(Duration::from_millis(1500), || !events
            .received_of_type("pong")
            .is_empty())
        .await
    );
    assert_eq!(session.state(), SessionState::Live);
    assert!(wait_for_requests(&server, "POST /api/alerts/1/acknowledge", 1).await);
    assert!(wait_until(WAIT, || session.queued_action_count() == 0).await);
}

/// Records where the session cursor stood when each event was applied.
struct CursorWatchingConsumer {
    cursor: SequenceCursor,
    seen: Mutex<Vec<(u64, u64)>>,
}

impl CursorWatchingConsumer {
    fn seen(&self) -> Vec<(u64, u64)> {
        self.seen.lock().expect("seen lock").clone()
    }
}

impl StateConsumer for CursorWatchingConsumer {
    fn apply_snapshot(&self, _snapshot: HydrationSnapshot) {}

    fn apply_event(&self, event: &SensorEvent) {
        self.seen
            .lock()
            .expect("seen lock")
            .push((event.seq, self.cursor.get()));
    }
}

/// **VALUE**: Verifies the resume cursor only moves past an event once it was applied.
///
/// **WHY THIS MATTERS**: The cursor is what the next connection asks the sensor to replay
/// from. If it runs ahead of the consumer, a drop between receipt and apply loses that
/// event for good.
///
/// **BUG THIS CATCHES**: Would catch the transport bumping the shared cursor on receipt,
/// before the consumer has seen the event.
#[tokio::test]
async fn given_streamed_events_when_applied_then_cursor_trails_until_each_applies() {
    // GIVEN: A consumer that shares the session cursor
    let server = MockServer::start().await;
    mount_hydration(&server).await;
    let events = EventServer::start(
        vec![
            event_frame(1, "device_joined"),
            event_frame(2, "device_joined"),
            event_frame(3, "alert_raised"),
            json!({"type": "replay_complete", "last_seq": 3}),
        ],
        AfterScript::Hold,
    )
    .await;
    let cursor = SequenceCursor::new();
    let consumer = Arc::new(CursorWatchingConsumer {
        cursor: cursor.clone(),
        seen: Mutex::new(Vec::new()),
    });
    let session = SessionManager::with_cursor(consumer.clone(), settings(&events), cursor);

    // WHEN
    session
        .connect(&server.uri(), TEST_FINGERPRINT)
        .await
        .expect("connect");
    assert!(wait_until(WAIT, || session.state() == SessionState::Live).await);

    // THEN: Each event saw the cursor still on the previous one
    assert_eq!(consumer.seen(), vec![(1, 0), (2, 1), (3, 2)]);
    assert_eq!(session.last_seq(), 3);
}

//! Session lifecycle for a paired sensor.
//!
//! # Lifecycle
//!
//! `connect()` moves `disconnected → connecting`, runs the six hydration
//! calls, hands the snapshot to the [`StateConsumer`], then opens the event
//! stream and sends `auth` followed by `replay(last_seq)`. A background task
//! consumes frames from there on; the session turns `live` only when the
//! sensor reports `replay_complete`, at which point queued actions are
//! replayed.
//!
//! # Serialization
//!
//! Consumer calls and state transitions all happen under one async lock and
//! are tagged with a connection generation. `disconnect()` bumps the
//! generation first, so a task that is still unwinding cannot touch state
//! that belongs to a newer connection.

pub mod consumer;
pub mod state;

pub use consumer::StateConsumer;
pub use state::{ActionDisposition, ReplayPolicy, ReplayReport, SessionState};

use crate::action_queue::ActionQueue;
use crate::config::AppConfig;
use crate::crypto::tls::TlsSettings;
use crate::error::session::SessionError;
use crate::error::transport::TransportError;
use crate::sensor_client::SensorClient;
use crate::transport::cursor::SequenceCursor;
use crate::transport::frame::InboundFrame;
use crate::transport::{EventTransport, events_url};

use models::{
    HydrationSnapshot, PendingAction, SensorAction, SyntheticAlert, SyntheticAlertId, TrustBundle,
};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use backoff::{ExponentialBackoff, backoff::Backoff};
use futures_util::{Stream, StreamExt};
use log::{debug, error, info, trace, warn};
use tokio::sync::{Mutex, MutexGuard, RwLock, watch};
use tokio::task::JoinHandle;
use url::Url;

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub tls: TlsSettings,
    pub request_timeout: Duration,
    pub replay_policy: ReplayPolicy,
    /// Replaces the `ws(s)://<address>/ws/events` URL derived from the address.
    pub events_url: Option<Url>,
    pub reconnect_max_elapsed: Duration,
}

impl SessionSettings {
    pub fn new(tls: TlsSettings) -> Self {
        let defaults = AppConfig::default();
        Self {
            tls,
            request_timeout: defaults.session.request_timeout(),
            replay_policy: defaults.session.replay_policy,
            events_url: None,
            reconnect_max_elapsed: defaults.session.reconnect_max_elapsed(),
        }
    }

    /// Settings for a paired sensor: pinned to its CA, presenting its client certificate.
    pub fn for_bundle(bundle: &TrustBundle, config: &AppConfig) -> Result<Self, SessionError> {
        let tls =
            TlsSettings::from_bundle(bundle).map_err(|e| SessionError::setup(e.to_string()))?;

        let events_url = match &config.session.events_url {
            Some(raw) => Some(Url::parse(raw).map_err(|e| {
                SessionError::setup(format!("Invalid events URL '{raw}': {e}"))
            })?),
            None => None,
        };

        Ok(Self {
            tls,
            request_timeout: config.session.request_timeout(),
            replay_policy: config.session.replay_policy,
            events_url,
            reconnect_max_elapsed: config.session.reconnect_max_elapsed(),
        })
    }

    pub fn with_replay_policy(mut self, policy: ReplayPolicy) -> Self {
        self.replay_policy = policy;
        self
    }

    pub fn with_events_url(mut self, url: Url) -> Self {
        self.events_url = Some(url);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_reconnect_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.reconnect_max_elapsed = max_elapsed;
        self
    }
}

struct SessionShared<C> {
    consumer: C,
    settings: SessionSettings,
    state: watch::Sender<SessionState>,
    cursor: SequenceCursor,
    queue: ActionQueue,
    client: RwLock<Option<SensorClient>>,
    apply_lock: Mutex<()>,
    drain_lock: Mutex<()>,
    generation: AtomicU64,
    next_local_alert: AtomicU64,
}

impl<C: StateConsumer> SessionShared<C> {
    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    /// Take the apply lock, but only on behalf of the current connection.
    async fn lock_current(&self, generation: u64) -> Option<MutexGuard<'_, ()>> {
        let guard = self.apply_lock.lock().await;
        if !self.is_current(generation) {
            trace!("Dropping update from stale session generation {generation}");
            return None;
        }
        Some(guard)
    }

    /// Caller must hold the apply lock.
    fn set_state_locked(&self, _guard: &MutexGuard<'_, ()>, next: SessionState) {
        let changed = self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            *state = next;
            true
        });

        if changed {
            info!("Session state -> {next}");
            self.consumer.session_state_changed(next);
        }
    }

    async fn set_state(&self, generation: u64, next: SessionState) -> bool {
        match self.lock_current(generation).await {
            Some(guard) => {
                self.set_state_locked(&guard, next);
                true
            }
            None => false,
        }
    }

    fn next_local_alert_id(&self) -> SyntheticAlertId {
        SyntheticAlertId(self.next_local_alert.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// One drain at a time, so two `replay_complete` frames cannot interleave actions.
    async fn replay_queued_actions(&self) -> ReplayReport {
        let _drain = self.drain_lock.lock().await;
        let client = self.client.read().await.clone();
        let Some(client) = client else {
            debug!("No sensor client, leaving {} queued action(s)", self.queue.count());
            return ReplayReport::default();
        };

        let mut report = ReplayReport::default();
        let mut pending = self.queue.dequeue_all().into_iter();
        if pending.len() > 0 {
            info!("Replaying {} queued action(s)", pending.len());
        }

        while let Some(action) = pending.next() {
            report.attempted += 1;
            match client.perform(&action.action).await {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!("Queued '{}' failed: {e}", action.action.operation());

                    if self.settings.replay_policy == ReplayPolicy::StopOnFailure {
                        let mut requeue: Vec<PendingAction> = vec![action];
                        requeue.extend(pending.by_ref());
                        report.requeued = requeue.len();
                        self.queue.requeue_front(requeue);
                        break;
                    }
                }
            }
        }

        if report.attempted > 0 {
            info!(
                "Replay finished: {} ok, {} failed, {} requeued",
                report.succeeded, report.failed, report.requeued
            );
        }
        report
    }

    async fn consume_frames(
        self: Arc<Self>,
        generation: u64,
        frames: impl Stream<Item = InboundFrame> + Send + 'static,
        sensor_name: String,
    ) {
        let mut frames = Box::pin(frames);

        while let Some(frame) = frames.next().await {
            match frame {
                InboundFrame::Event(event) => {
                    let Some(_guard) = self.lock_current(generation).await else {
                        return;
                    };
                    trace!("Applying event seq {} ({})", event.seq, event.kind);
                    self.consumer.apply_event(&event);
                    self.cursor.advance(event.seq);
                }
                InboundFrame::ReplayComplete { last_seq } => {
                    {
                        let Some(guard) = self.lock_current(generation).await else {
                            return;
                        };
                        self.cursor.advance(last_seq);
                        debug!("Replay complete at seq {}", self.cursor.get());
                        self.set_state_locked(&guard, SessionState::Live);
                    }
                    // Frames keep flowing (pongs, events) while the queue drains.
                    let shared = self.clone();
                    tokio::spawn(async move {
                        shared.replay_queued_actions().await;
                    });
                }
                InboundFrame::AuthError { reason } => {
                    error!("Sensor rejected event stream credentials: {reason}");
                    self.set_state(generation, SessionState::AuthFailed).await;
                    return;
                }
                InboundFrame::AuthOk => debug!("Event stream authenticated"),
                InboundFrame::Ping => trace!("Answered ping"),
            }
        }

        let Some(guard) = self.lock_current(generation).await else {
            return;
        };
        let previous = *self.state.borrow();
        match previous {
            SessionState::Live | SessionState::Connecting => {
                warn!("Event stream for '{sensor_name}' ended while {previous}");
                self.set_state_locked(&guard, SessionState::Disconnected);
                if previous == SessionState::Live {
                    let alert = SyntheticAlert::sensor_offline(self.next_local_alert_id(), &sensor_name);
                    self.consumer.apply_local_alert(alert);
                }
            }
            SessionState::Disconnected | SessionState::AuthFailed => {}
        }
    }
}

#[derive(Default)]
struct SessionRuntime {
    consumer_task: Option<JoinHandle<()>>,
    transport: Option<EventTransport>,
}

/// Owns the connection to one paired sensor.
pub struct SessionManager<C: StateConsumer> {
    shared: Arc<SessionShared<C>>,
    runtime: Mutex<SessionRuntime>,
}

impl<C: StateConsumer> SessionManager<C> {
    pub fn new(consumer: C, settings: SessionSettings) -> Self {
        Self::with_cursor(consumer, settings, SequenceCursor::new())
    }

    /// Resume from a known `last_seq`, e.g. one saved by a previous process.
    pub fn with_cursor(consumer: C, settings: SessionSettings, cursor: SequenceCursor) -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);
        Self {
            shared: Arc::new(SessionShared {
                consumer,
                settings,
                state,
                cursor,
                queue: ActionQueue::new(),
                client: RwLock::new(None),
                apply_lock: Mutex::new(()),
                drain_lock: Mutex::new(()),
                generation: AtomicU64::new(0),
                next_local_alert: AtomicU64::new(0),
            }),
            runtime: Mutex::new(SessionRuntime::default()),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.shared.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    pub fn last_seq(&self) -> u64 {
        self.shared.cursor.get()
    }

    pub fn cursor(&self) -> SequenceCursor {
        self.shared.cursor.clone()
    }

    pub fn queued_action_count(&self) -> usize {
        self.shared.queue.count()
    }

    pub fn consumer(&self) -> &C {
        &self.shared.consumer
    }

    // ============================================
    // CONNECT / DISCONNECT
    // ============================================

    /// Hydrate, then open and authenticate the event stream.
    ///
    /// Returns once the stream is being consumed. `live` follows
    /// asynchronously when the sensor reports replay completion.
    ///
    /// # Errors
    ///
    /// - [`SessionError::AuthRejected`]: state is `auth_failed`, re-pair required
    /// - [`SessionError::Hydration`] / [`SessionError::Transport`]: state is `disconnected`
    /// - [`SessionError::Cancelled`]: a `disconnect()` or newer `connect()` won the race
    pub async fn connect(&self, address: &str, fingerprint: &str) -> Result<(), SessionError> {
        let generation = {
            let mut runtime = self.runtime.lock().await;
            self.shutdown(&mut runtime).await;
            self.shared.generation()
        };

        self.shared.set_state(generation, SessionState::Connecting).await;
        info!("Connecting to sensor at {address}");

        match self.establish(generation, address, fingerprint).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let next = if e.is_auth_rejection() {
                    SessionState::AuthFailed
                } else {
                    SessionState::Disconnected
                };
                if self.shared.set_state(generation, next).await {
                    *self.shared.client.write().await = None;
                }
                warn!("Connect to {address} failed: {e}");
                Err(e)
            }
        }
    }

    async fn establish(
        &self,
        generation: u64,
        address: &str,
        fingerprint: &str,
    ) -> Result<(), SessionError> {
        let settings = &self.shared.settings;
        let client = SensorClient::new(address, &settings.tls, settings.request_timeout)
            .map_err(|e| SessionError::setup(e.to_string()))?
            .with_bearer(fingerprint);

        let snapshot = client.hydrate().await.map_err(SessionError::hydration)?;
        let sensor_name = sensor_display_name(&snapshot);

        {
            let Some(_guard) = self.shared.lock_current(generation).await else {
                return Err(SessionError::cancelled());
            };
            *self.shared.client.write().await = Some(client.clone());
            self.shared.consumer.apply_snapshot(snapshot);
        }

        let url = match &settings.events_url {
            Some(url) => url.clone(),
            None => events_url(client.base_url()).map_err(SessionError::transport)?,
        };

        // The transport counts what it received; the session cursor only
        // moves once an event has been applied.
        let since_seq = self.shared.cursor.get();
        let mut transport = EventTransport::new(
            url,
            settings.tls.clone(),
            SequenceCursor::starting_at(since_seq),
        );
        transport.connect().await.map_err(SessionError::transport)?;

        let opened = open_stream(&mut transport, fingerprint, since_seq);
        let frames = match opened {
            Ok(frames) => frames,
            Err(e) => {
                transport.disconnect().await;
                return Err(SessionError::transport(e));
            }
        };

        let mut runtime = self.runtime.lock().await;
        if !self.shared.is_current(generation) {
            transport.disconnect().await;
            return Err(SessionError::cancelled());
        }

        let shared = self.shared.clone();
        runtime.consumer_task = Some(tokio::spawn(shared.consume_frames(
            generation,
            frames,
            sensor_name,
        )));
        runtime.transport = Some(transport);

        debug!("Event stream consumer started (generation {generation})");
        Ok(())
    }

    /// Stop the event task, close the transport, and go `disconnected`. Idempotent.
    pub async fn disconnect(&self) {
        let mut runtime = self.runtime.lock().await;
        self.shutdown(&mut runtime).await;
    }

    async fn shutdown(&self, runtime: &mut SessionRuntime) {
        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;

        if let Some(task) = runtime.consumer_task.take() {
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("Event consumer task failed: {e}");
                }
            }
        }

        if let Some(mut transport) = runtime.transport.take() {
            transport.disconnect().await;
        }

        *self.shared.client.write().await = None;
        self.shared
            .set_state(generation, SessionState::Disconnected)
            .await;
    }

    /// Retry `connect()` with exponential backoff until it succeeds, fails
    /// with something retrying cannot fix, or the elapsed-time cap is hit.
    pub async fn connect_with_retry(
        &self,
        address: &str,
        fingerprint: &str,
    ) -> Result<(), SessionError> {
        let mut backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.shared.settings.reconnect_max_elapsed),
            ..Default::default()
        };

        loop {
            let error = match self.connect(address, fingerprint).await {
                Ok(()) => return Ok(()),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            match backoff.next_backoff() {
                Some(duration) => {
                    warn!("Connect failed, retrying after {duration:?}: {error}");
                    tokio::time::sleep(duration).await;
                }
                None => {
                    error!("Giving up on {address} after max backoff time");
                    return Err(error);
                }
            }
        }
    }

    // ============================================
    // ACTIONS
    // ============================================

    pub fn enqueue_action(&self, action: SensorAction) {
        self.shared.queue.enqueue(action);
    }

    /// Perform `action` now if the session is live, otherwise queue it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Action`] if a live call fails. Failed live
    /// calls are not queued.
    pub async fn submit_action(
        &self,
        action: SensorAction,
    ) -> Result<ActionDisposition, SessionError> {
        if self.state() == SessionState::Live {
            let client = self.shared.client.read().await.clone();
            if let Some(client) = client {
                client
                    .perform(&action)
                    .await
                    .map_err(|e| SessionError::action(action.operation(), e))?;
                return Ok(ActionDisposition::Sent);
            }
        }

        self.shared.queue.enqueue(action);
        Ok(ActionDisposition::Queued)
    }

    /// Drain the queue against the sensor according to the replay policy.
    pub async fn replay_queued_actions(&self) -> ReplayReport {
        self.shared.replay_queued_actions().await
    }
}

/// Authenticate, ask for everything after `since_seq`, and take the frame stream.
fn open_stream(
    transport: &mut EventTransport,
    fingerprint: &str,
    since_seq: u64,
) -> Result<impl Stream<Item = InboundFrame> + Send + 'static, TransportError> {
    transport.send_auth(Some(fingerprint), None)?;
    transport.request_replay(since_seq)?;
    transport.receive_events()
}

fn sensor_display_name(snapshot: &HydrationSnapshot) -> String {
    snapshot
        .status
        .sensor_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| snapshot.status.sensor_id.clone())
}

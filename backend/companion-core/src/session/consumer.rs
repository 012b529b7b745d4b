use crate::session::state::SessionState;

use models::{HydrationSnapshot, SensorEvent, SyntheticAlert};

use std::sync::Arc;

/// Sink for everything the session learns about the sensor.
///
/// Calls are serialized: a snapshot always lands before any event of the same
/// connection, and events arrive in stream order. Implementations should not
/// block for long; the event loop waits on each call.
pub trait StateConsumer: Send + Sync + 'static {
    /// Replace all state with a freshly hydrated baseline.
    fn apply_snapshot(&self, snapshot: HydrationSnapshot);

    fn apply_event(&self, event: &SensorEvent);

    /// An alert raised by the companion itself, never by the sensor.
    fn apply_local_alert(&self, _alert: SyntheticAlert) {}

    fn session_state_changed(&self, _state: SessionState) {}
}

impl<T: StateConsumer + ?Sized> StateConsumer for Arc<T> {
    fn apply_snapshot(&self, snapshot: HydrationSnapshot) {
        (**self).apply_snapshot(snapshot)
    }

    fn apply_event(&self, event: &SensorEvent) {
        (**self).apply_event(event)
    }

    fn apply_local_alert(&self, alert: SyntheticAlert) {
        (**self).apply_local_alert(alert)
    }

    fn session_state_changed(&self, state: SessionState) {
        (**self).session_state_changed(state)
    }
}

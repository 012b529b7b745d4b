use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Live,
    /// The sensor rejected our credentials. Never retried automatically.
    AuthFailed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Live => "live",
            SessionState::AuthFailed => "auth_failed",
        };
        f.write_str(name)
    }
}

/// What happens to the rest of the queue when a replayed action fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayPolicy {
    /// Log the failure and keep going. The queue ends up empty either way.
    #[default]
    BestEffort,
    /// Stop at the first failure and put it, plus everything after it, back
    /// at the front of the queue.
    StopOnFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplayReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub requeued: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionDisposition {
    /// Performed immediately against a live session.
    Sent,
    /// Held in the action queue until the session is live again.
    Queued,
}

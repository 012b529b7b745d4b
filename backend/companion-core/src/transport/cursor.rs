use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Highest event sequence number seen so far.
///
/// Clones share the same counter. The value only ever moves forward.
#[derive(Debug, Clone, Default)]
pub struct SequenceCursor {
    last_seq: Arc<AtomicU64>,
}

impl SequenceCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(seq: u64) -> Self {
        Self {
            last_seq: Arc::new(AtomicU64::new(seq)),
        }
    }

    pub fn get(&self) -> u64 {
        self.last_seq.load(Ordering::Acquire)
    }

    /// Move the cursor to `seq` if that is ahead of it. Returns whether it moved.
    pub fn advance(&self, seq: u64) -> bool {
        self.last_seq.fetch_max(seq, Ordering::AcqRel) < seq
    }
}

//! Process-wide sequence key issuer
//!
//! The only global mutable counter in the engine. Every successful post
//! consumes exactly one key; keys are strictly increasing across all callers.

use crate::domain::SequenceKey;
use crate::error::{FeedError, FeedResult};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::error;

#[derive(Debug, Default)]
pub struct Sequencer {
    /// Last issued key, 0 before the first post
    last: AtomicU64,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume issuing after `last`; the next key returned is `last + 1`.
    pub fn starting_at(last: u64) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }

    /// Issue the next key.
    ///
    /// Refuses to wrap at `u64::MAX`: once exhausted every call fails with
    /// [`FeedError::SequenceExhausted`].
    pub fn next_sequence(&self) -> FeedResult<SequenceKey> {
        match self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                last.checked_add(1)
            }) {
            Ok(previous) => Ok(SequenceKey::new(previous + 1)),
            Err(_) => {
                error!("Sequence counter exhausted, rejecting write");
                Err(FeedError::SequenceExhausted)
            }
        }
    }

    /// Last issued key.
    pub fn current(&self) -> SequenceKey {
        SequenceKey::new(self.last.load(Ordering::Acquire))
    }
}

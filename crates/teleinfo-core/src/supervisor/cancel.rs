//! Cooperative cancellation for the read loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Granularity of cancellation checks while pausing.
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Shared flag observed by the supervisor before every read.
///
/// Clones share the same flag; cancelling any clone stops the link at its
/// next check.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Sleep for `duration`, waking early on cancellation.
    ///
    /// Returns `false` if the token was cancelled before the full duration
    /// elapsed.
    pub fn sleep(&self, duration: Duration) -> bool {
        let mut remaining = duration;
        while !remaining.is_zero() {
            if self.is_cancelled() {
                return false;
            }
            let step = remaining.min(CANCEL_POLL_INTERVAL);
            thread::sleep(step);
            remaining -= step;
        }
        !self.is_cancelled()
    }
}

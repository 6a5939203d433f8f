//! Rate limiting for repetitive log lines.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Lets one log line through per interval and counts the ones held back.
///
/// Each owner keeps its own throttle, so two clients never share a window.
#[derive(Debug)]
pub struct LogThrottle {
    interval: Duration,
    // When the last line went out, and how many were held back since.
    last: Mutex<Option<(Instant, u64)>>,
}

impl LogThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// `Some(held_back)` if the caller should log now, `None` if it should stay quiet.
    pub fn admit(&self) -> Option<u64> {
        self.admit_at(Instant::now())
    }

    fn admit_at(&self, now: Instant) -> Option<u64> {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((emitted_at, held_back)) = last.as_mut() {
            if now.saturating_duration_since(*emitted_at) < self.interval {
                *held_back += 1;
                return None;
            }
        }
        let held_back = last.as_ref().map_or(0, |(_, n)| *n);
        *last = Some((now, 0));
        Some(held_back)
    }
}

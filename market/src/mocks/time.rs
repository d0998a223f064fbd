//! Mock time provider for testing.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::traits::TimeProvider;

/// Mock time provider with a controllable clock. Clones share the same
/// underlying instant.
#[derive(Debug, Clone)]
pub struct MockTime {
    current_unix: Arc<AtomicI64>,
}

impl MockTime {
    /// Create a mock clock starting at the specified instant.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current_unix: Arc::new(AtomicI64::new(start.timestamp())),
        }
    }

    /// Create a mock clock starting at a Unix timestamp in seconds.
    pub fn at_unix(secs: i64) -> Self {
        Self {
            current_unix: Arc::new(AtomicI64::new(secs)),
        }
    }

    /// Create a mock clock starting at a reasonable default (2024-01-01).
    pub fn default_time() -> Self {
        Self::at_unix(1_704_067_200)
    }

    /// Set the clock to a specific instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        self.current_unix
            .store(instant.timestamp(), Ordering::SeqCst);
    }

    /// Advance the clock by the specified number of seconds.
    pub fn advance_secs(&self, seconds: i64) {
        self.current_unix.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Default for MockTime {
    fn default() -> Self {
        Self::default_time()
    }
}

impl TimeProvider for MockTime {
    fn now(&self) -> DateTime<Utc> {
        let secs = self.current_unix.load(Ordering::SeqCst);
        DateTime::from_timestamp(secs, 0).expect("mock timestamp out of range")
    }
}

//! Active connection accounting for graceful drain.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Counts live connections and lets the server wait for them to finish.
#[derive(Debug, Clone, Default)]
pub(crate) struct ConnectionTracker {
    inner: Arc<TrackerState>,
}

#[derive(Debug, Default)]
struct TrackerState {
    active: Mutex<usize>,
    idle: Condvar,
}

/// Decrements the active count when dropped.
#[derive(Debug)]
pub(crate) struct ConnectionGuard {
    inner: Arc<TrackerState>,
}

impl ConnectionTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a new live connection.
    pub(crate) fn track(&self) -> ConnectionGuard {
        let mut active = self
            .inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *active = active.saturating_add(1);
        ConnectionGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    pub(crate) fn active(&self) -> usize {
        *self
            .inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until no connection is live or `timeout` elapses.
    ///
    /// Returns `true` when the tracker became idle in time.
    pub(crate) fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut active = self
            .inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while *active > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let (guard, _) = self
                .inner
                .idle
                .wait_timeout(active, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            active = guard;
        }
        true
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let mut active = self
            .inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *active = active.saturating_sub(1);
        if *active == 0 {
            self.inner.idle.notify_all();
        }
    }
}

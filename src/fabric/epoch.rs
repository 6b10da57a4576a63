//! Engine epoch: invalidates work started before a shutdown.
//!
//! Anything that races [`Engine::close_agent`](crate::Engine::close_agent)
//! (actor initialization, task settlement) captures the epoch when it starts
//! and compares it again before publishing results. A mismatch means the
//! engine was closed in between and the result must not be published.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonically increasing counter.
#[derive(Debug, Default)]
pub struct Epoch(AtomicU64);

impl Epoch {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Current value.
    #[inline]
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Advances the epoch and returns the new value.
    #[inline]
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// True if `started_at` is no longer the current epoch.
    #[inline]
    pub fn is_stale(&self, started_at: u64) -> bool {
        self.current() != started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_invalidates_earlier_snapshots() {
        let epoch = Epoch::new();
        let before = epoch.current();
        assert!(!epoch.is_stale(before));
        assert_eq!(epoch.advance(), before + 1);
        assert!(epoch.is_stale(before));
    }
}

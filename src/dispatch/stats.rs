//! Dispatch statistics
//!
//! Thread-safe counters for frames written to the bridge.
//! Uses lock-free atomics for all operations.

use std::sync::atomic::{AtomicU64, Ordering};

/// Send counters (fully lock-free)
#[derive(Debug, Default)]
pub struct Stats {
    /// Frames written successfully
    frames_sent: AtomicU64,
    /// Bytes written successfully (frame markers included)
    bytes_sent: AtomicU64,
    /// Sends that hit an open or write error
    failures: AtomicU64,
    /// Sends dropped because no port was ready
    skipped: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub frames_sent: u64,
    pub bytes_sent: u64,
    pub failures: u64,
    pub skipped: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add_sent(&self, bytes: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = Stats::new();
        stats.add_sent(62);
        stats.add_sent(62);
        stats.add_failure();
        stats.add_skipped();

        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                frames_sent: 2,
                bytes_sent: 124,
                failures: 1,
                skipped: 1,
            }
        );
    }
}

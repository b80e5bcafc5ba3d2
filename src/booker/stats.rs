//! Run statistics shared by all workers

use std::sync::atomic::{AtomicU64, Ordering};

/// Booker statistics (thread-safe)
#[derive(Debug, Default)]
pub struct BookerStats {
    /// Poll cycles started
    pub polls: AtomicU64,

    /// Cycles abandoned because settings could not be resolved
    pub settings_failures: AtomicU64,

    /// Cycles that found no first-dose slot
    pub unavailable: AtomicU64,

    /// Entries into the booking critical section
    pub lock_entries: AtomicU64,

    /// First-dose appointments created
    pub first_created: AtomicU64,

    /// Created appointments left unconfirmed
    pub abandoned: AtomicU64,

    /// Confirmation requests issued successfully
    pub confirmed: AtomicU64,
}

impl BookerStats {
    pub fn record_poll(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_settings_failure(&self) {
        self.settings_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unavailable(&self) {
        self.unavailable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lock_entry(&self) {
        self.lock_entries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_first_created(&self) {
        self.first_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_abandoned(&self) {
        self.abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_confirmed(&self) {
        self.confirmed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of current stats
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            polls: self.polls.load(Ordering::Relaxed),
            settings_failures: self.settings_failures.load(Ordering::Relaxed),
            unavailable: self.unavailable.load(Ordering::Relaxed),
            lock_entries: self.lock_entries.load(Ordering::Relaxed),
            first_created: self.first_created.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            confirmed: self.confirmed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of booker statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub polls: u64,
    pub settings_failures: u64,
    pub unavailable: u64,
    pub lock_entries: u64,
    pub first_created: u64,
    pub abandoned: u64,
    pub confirmed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let stats = BookerStats::default();
        stats.record_poll();
        stats.record_poll();
        stats.record_unavailable();
        stats.record_lock_entry();
        stats.record_first_created();
        stats.record_abandoned();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.polls, 2);
        assert_eq!(snapshot.unavailable, 1);
        assert_eq!(snapshot.lock_entries, 1);
        assert_eq!(snapshot.first_created, 1);
        assert_eq!(snapshot.abandoned, 1);
        assert_eq!(snapshot.confirmed, 0);
    }
}

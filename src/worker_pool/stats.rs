use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Lock-free pool counters
#[derive(Debug, Default)]
pub struct PoolStats {
    submitted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    cancelled: AtomicU64,
    running: AtomicUsize,
    peak_running: AtomicUsize,
}

impl PoolStats {
    pub(super) fn record_submitted(&self) -> u64 {
        self.submitted.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(super) fn record_started(&self) {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_running.fetch_max(now, Ordering::SeqCst);
    }

    pub(super) fn record_stopped(&self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
    }

    pub(super) fn record_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::SeqCst);
    }

    pub(super) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub(super) fn record_timed_out(&self) {
        self.timed_out.fetch_add(1, Ordering::SeqCst);
    }

    pub(super) fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
    }

    pub(super) fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn snapshot(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            submitted: self.submitted.load(Ordering::SeqCst),
            succeeded: self.succeeded.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            timed_out: self.timed_out.load(Ordering::SeqCst),
            cancelled: self.cancelled.load(Ordering::SeqCst),
            running: self.running.load(Ordering::SeqCst),
            peak_running: self.peak_running.load(Ordering::SeqCst),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PoolStatsSnapshot {
    pub submitted: u64,
    pub succeeded: u64,
    /// Includes timed out tasks
    pub failed: u64,
    pub timed_out: u64,
    pub cancelled: u64,
    pub running: usize,
    pub peak_running: usize,
}

impl PoolStatsSnapshot {
    /// Submitted tasks that have not reached a final state
    #[must_use]
    pub fn pending(&self) -> u64 {
        self.submitted
            .saturating_sub(self.succeeded + self.failed + self.cancelled)
    }
}

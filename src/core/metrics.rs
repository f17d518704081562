//! Event counters shared by a logger and its clones

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counts of what happened to every event a logger was asked to emit
///
/// Each event lands in exactly one bucket: written by the sink, filtered
/// by the threshold, or dropped because the sink failed.
///
/// # Example
///
/// ```
/// use rust_worker_logger::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
/// metrics.record_logged();
/// metrics.record_dropped();
///
/// let snapshot = metrics.snapshot();
/// assert_eq!((snapshot.logged, snapshot.dropped), (1, 1));
/// ```
#[derive(Debug, Default)]
pub struct LoggerMetrics {
    logged: AtomicU64,
    filtered: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of [`LoggerMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub logged: u64,
    pub filtered: u64,
    pub dropped: u64,
}

impl MetricsSnapshot {
    /// Share of sink-bound events that were lost, in percent
    pub fn drop_rate(&self) -> f64 {
        let attempted = self.logged + self.dropped;
        if attempted == 0 {
            return 0.0;
        }
        self.dropped as f64 * 100.0 / attempted as f64
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} logged, {} filtered, {} dropped",
            self.logged, self.filtered, self.dropped
        )
    }
}

impl LoggerMetrics {
    pub const fn new() -> Self {
        Self {
            logged: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn total_logged(&self) -> u64 {
        self.logged.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn filtered_count(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Count one written event; returns the count before this one
    #[inline]
    pub fn record_logged(&self) -> u64 {
        self.logged.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_filtered(&self) -> u64 {
        self.filtered.fetch_add(1, Ordering::Relaxed)
    }

    /// Count one lost event; returns the count before this one
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }

    pub fn drop_rate(&self) -> f64 {
        self.snapshot().drop_rate()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            logged: self.total_logged(),
            filtered: self.filtered_count(),
            dropped: self.dropped_count(),
        }
    }

    pub fn reset(&self) {
        for counter in [&self.logged, &self.filtered, &self.dropped] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

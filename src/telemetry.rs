//! Ambient, coarse latency instrumentation — a single process-wide HDR
//! histogram recording every completed request's latency across all tests.
//!
//! This is deliberately separate from `metrics::compute_metrics`: the
//! aggregator needs bit-exact percentiles per test, which an approximating
//! histogram cannot give. This tracker exists only for operators watching
//! the process as a whole; it never feeds a test's reported metrics.
//!
//! Grounded on the teacher's `PercentileTracker` (`Histogram<u64>` behind a
//! `Mutex`, microsecond precision, `record_ms`/`stats`), trimmed from
//! `MultiLabelPercentileTracker`'s per-label LRU layer since this domain has
//! one latency dimension, not per-scenario/per-endpoint labels.

use std::sync::Mutex;

use hdrhistogram::Histogram;
use tracing::warn;

/// Snapshot of the global tracker's current percentile view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySnapshot {
    pub count: u64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

/// Thread-safe latency tracker backed by an HDR histogram covering 1µs to
/// 60s with 3 significant digits, matching the requester's timeout range.
pub struct PercentileTracker {
    histogram: Mutex<Histogram<u64>>,
}

impl PercentileTracker {
    pub fn new() -> Self {
        let histogram =
            Histogram::new_with_bounds(1, 60_000_000, 3).expect("valid histogram bounds");
        PercentileTracker {
            histogram: Mutex::new(histogram),
        }
    }

    /// Records one request's latency, in milliseconds.
    pub fn record_ms(&self, latency_ms: f64) {
        let latency_us = (latency_ms * 1000.0).round().clamp(1.0, 60_000_000.0) as u64;
        let mut hist = self.histogram.lock().unwrap();
        if let Err(e) = hist.record(latency_us) {
            warn!(latency_us, error = %e, "failed to record latency sample");
        }
    }

    pub fn snapshot(&self) -> Option<TelemetrySnapshot> {
        let hist = self.histogram.lock().unwrap();
        if hist.is_empty() {
            return None;
        }
        Some(TelemetrySnapshot {
            count: hist.len(),
            p50_ms: hist.value_at_quantile(0.50) as f64 / 1000.0,
            p90_ms: hist.value_at_quantile(0.90) as f64 / 1000.0,
            p99_ms: hist.value_at_quantile(0.99) as f64 / 1000.0,
            max_ms: hist.max() as f64 / 1000.0,
        })
    }

    pub fn reset(&self) {
        self.histogram.lock().unwrap().clear();
    }
}

impl Default for PercentileTracker {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static::lazy_static! {
    /// Global tracker recording every completed request across all tests.
    pub static ref GLOBAL_LATENCY_TRACKER: PercentileTracker = PercentileTracker::new();
}

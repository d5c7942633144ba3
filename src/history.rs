//! Bounded most-recent-first list of completed tests.
//!
//! Grounded on the teacher's `MultiLabelPercentileTracker`'s bounded
//! collection behind a mutex, swapping its `lru::LruCache` (recency-order
//! eviction) for a plain `VecDeque` since history needs ordered
//! prepend/truncate, not LRU touch-on-read semantics.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::config::TestConfig;
use crate::metrics::{AggregatedMetrics, TimeSeriesPoint};
use crate::safety::SafetyScore;
use crate::state::{LegacyVerdict, TestState};
use crate::threshold::ThresholdVerdict;

const MAX_HISTORY: usize = 100;

/// Snapshot of a completed test, independent of the live `TestState` it was
/// built from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryRecord {
    pub id: String,
    pub config: TestConfig,
    pub metrics: AggregatedMetrics,
    pub safety_score: Option<SafetyScore>,
    pub legacy_verdict: LegacyVerdict,
    pub threshold_verdict: ThresholdVerdict,
    pub verdict_reasons: Vec<String>,
    pub first_violation_at: Option<i64>,
    pub started_at: i64,
    pub completed_at: Option<i64>,
    pub time_series: Vec<TimeSeriesPoint>,
}

impl From<&TestState> for HistoryRecord {
    fn from(state: &TestState) -> Self {
        HistoryRecord {
            id: state.id.clone(),
            config: state.config.clone(),
            metrics: state.metrics,
            safety_score: state.safety_score.clone(),
            legacy_verdict: state.legacy_verdict,
            threshold_verdict: state.threshold_verdict,
            verdict_reasons: state.verdict_reasons.clone(),
            first_violation_at: state.first_violation_at,
            started_at: state.started_at,
            completed_at: state.completed_at,
            time_series: state.time_series.clone(),
        }
    }
}

/// Most-recent-first ring of up to `MAX_HISTORY` completed-test snapshots.
#[derive(Default)]
pub struct HistoryRing {
    records: Mutex<VecDeque<HistoryRecord>>,
}

impl HistoryRing {
    pub fn new() -> Self {
        HistoryRing {
            records: Mutex::new(VecDeque::new()),
        }
    }

    /// Prepends `record`; drops the oldest entry if this pushes the ring
    /// past `MAX_HISTORY`.
    pub fn insert(&self, record: HistoryRecord) {
        let mut records = self.records.lock().unwrap();
        records.push_front(record);
        if records.len() > MAX_HISTORY {
            records.pop_back();
        }
    }

    /// Independent copy of the full ring, newest first.
    pub fn all(&self) -> Vec<HistoryRecord> {
        self.records.lock().unwrap().iter().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<HistoryRecord> {
        self.records.lock().unwrap().iter().find(|r| r.id == id).cloned()
    }

    /// Records matching `ids`, in history order (not input order).
    pub fn get_many(&self, ids: &[String]) -> Vec<HistoryRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Method;
    use crate::pattern::Pattern;

    fn record(id: &str) -> HistoryRecord {
        HistoryRecord {
            id: id.to_string(),
            config: TestConfig {
                target_url: "http://example.com".to_string(),
                method: Method::Get,
                base_concurrency: 1,
                duration_seconds: 1,
                request_timeout_ms: 1000,
                thresholds: None,
                pattern: Pattern::FixedConcurrency,
            },
            metrics: AggregatedMetrics::default(),
            safety_score: None,
            legacy_verdict: LegacyVerdict::Ok,
            threshold_verdict: ThresholdVerdict::Pass,
            verdict_reasons: Vec::new(),
            first_violation_at: None,
            started_at: 0,
            completed_at: Some(1),
            time_series: Vec::new(),
        }
    }

    #[test]
    fn insert_prepends_newest_first() {
        let ring = HistoryRing::new();
        ring.insert(record("a"));
        ring.insert(record("b"));
        let all = ring.all();
        assert_eq!(all[0].id, "b");
        assert_eq!(all[1].id, "a");
    }

    #[test]
    fn bound_is_enforced_by_dropping_the_oldest() {
        let ring = HistoryRing::new();
        for i in 0..105 {
            ring.insert(record(&format!("t{i}")));
        }
        assert_eq!(ring.len(), MAX_HISTORY);
        let all = ring.all();
        assert_eq!(all[0].id, "t104");
        assert_eq!(all.last().unwrap().id, "t5");
    }

    #[test]
    fn get_by_id_and_by_ids_list() {
        let ring = HistoryRing::new();
        ring.insert(record("x"));
        ring.insert(record("y"));
        ring.insert(record("z"));

        assert_eq!(ring.get("y").unwrap().id, "y");
        assert!(ring.get("missing").is_none());

        let ids = vec!["z".to_string(), "x".to_string()];
        let many = ring.get_many(&ids);
        // history order (newest first), not input order
        assert_eq!(many.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["z", "x"]);
    }

    #[test]
    fn reads_return_independent_copies() {
        let ring = HistoryRing::new();
        ring.insert(record("a"));
        let mut copy = ring.all();
        copy[0].id = "mutated".to_string();
        assert_eq!(ring.get("a").unwrap().id, "a");
    }
}

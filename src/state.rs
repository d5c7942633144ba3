//! The in-flight test registry: one `TestState` per running or recently
//! completed test, each mutated through its own lock so concurrent tests
//! never contend with each other (spec.md §5).
//!
//! Grounded on the teacher's `ThroughputTracker` (`Arc<Mutex<HashMap<..>>>`
//! keyed collection), extended with a second per-entry lock layer — the
//! teacher locks the whole map's values directly, but here each test's
//! append-and-recompute section needs to be held without blocking reads of
//! unrelated tests.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::TestConfig;
use crate::metrics::{AggregatedMetrics, TimeSeriesPoint};
use crate::safety::SafetyScore;
use crate::threshold::ThresholdVerdict;

/// Outcome of a single HTTP request, appended to a test's result list.
/// `error` carries `"timeout"` or the raw transport error message, per
/// spec.md §4.2.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestResult {
    pub response_time_ms: f64,
    pub success: bool,
    pub status: Option<u16>,
    pub error: Option<String>,
    pub timestamp: i64,
}

/// Lifecycle status of a test.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Running,
    Completed,
    Failed,
}

/// Error-rate-band verdict retained for callers that predate threshold
/// verdicts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LegacyVerdict {
    Ok,
    Unstable,
    Critical,
}

impl LegacyVerdict {
    /// errorRate >60 → CRITICAL; >30 → UNSTABLE; else OK (spec.md §4.7 step 6).
    pub fn from_error_rate(error_rate_percentage: f64) -> Self {
        if error_rate_percentage > 60.0 {
            LegacyVerdict::Critical
        } else if error_rate_percentage > 30.0 {
            LegacyVerdict::Unstable
        } else {
            LegacyVerdict::Ok
        }
    }
}

/// Full record for one test, covering both the in-flight shape and the
/// completed/history shape (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestState {
    pub id: String,
    pub config: TestConfig,
    pub status: TestStatus,
    pub started_at: i64,
    pub completed_at: Option<i64>,
    pub request_results: Vec<RequestResult>,
    pub metrics: AggregatedMetrics,
    pub time_series: Vec<TimeSeriesPoint>,
    pub legacy_verdict: LegacyVerdict,
    pub threshold_verdict: ThresholdVerdict,
    pub verdict_reasons: Vec<String>,
    pub first_violation_at: Option<i64>,
    pub safety_score: Option<SafetyScore>,
}

impl TestState {
    pub fn new(id: String, config: TestConfig, started_at: i64) -> Self {
        TestState {
            id,
            config,
            status: TestStatus::Running,
            started_at,
            completed_at: None,
            request_results: Vec::new(),
            metrics: AggregatedMetrics::default(),
            time_series: Vec::new(),
            legacy_verdict: LegacyVerdict::Ok,
            threshold_verdict: ThresholdVerdict::Pass,
            verdict_reasons: Vec::new(),
            first_violation_at: None,
            safety_score: None,
        }
    }
}

/// Keyed registry of test states, one lock per id so unrelated tests never
/// contend (spec.md §4.8, §5).
///
/// Grounded on the teacher's `ThroughputTracker`'s
/// `Arc<Mutex<HashMap<String, ..>>>` shape for the outer map; the inner
/// `Arc<Mutex<TestState>>` per entry is this crate's addition, since the
/// teacher's map held plain counters that never needed their own lock.
#[derive(Clone, Default)]
pub struct TestStateStore {
    inner: Arc<std::sync::Mutex<HashMap<String, Arc<Mutex<TestState>>>>>,
}

impl TestStateStore {
    pub fn new() -> Self {
        TestStateStore {
            inner: Arc::new(std::sync::Mutex::new(HashMap::new())),
        }
    }

    /// Registers a freshly created test state and returns a handle to its
    /// per-test lock for the engine to mutate going forward.
    pub fn set(&self, state: TestState) -> Arc<Mutex<TestState>> {
        let handle = Arc::new(Mutex::new(state));
        let id = {
            let guard = handle.try_lock().expect("freshly created handle is uncontended");
            guard.id.clone()
        };
        self.inner.lock().unwrap().insert(id, handle.clone());
        handle
    }

    /// Returns the per-test lock handle for mutation (engine use).
    pub fn handle(&self, id: &str) -> Option<Arc<Mutex<TestState>>> {
        self.inner.lock().unwrap().get(id).cloned()
    }

    /// Snapshot read: an independent copy of the current state.
    pub async fn get(&self, id: &str) -> Option<TestState> {
        let handle = self.inner.lock().unwrap().get(id).cloned()?;
        let guard = handle.lock().await;
        Some(guard.clone())
    }

    /// Runs `mutator` under the per-test lock and returns its result.
    pub async fn update<F, R>(&self, id: &str, mutator: F) -> Option<R>
    where
        F: FnOnce(&mut TestState) -> R,
    {
        let handle = self.inner.lock().unwrap().get(id).cloned()?;
        let mut guard = handle.lock().await;
        Some(mutator(&mut guard))
    }

    pub fn delete(&self, id: &str) {
        debug!(test_id = id, "removing test state");
        self.inner.lock().unwrap().remove(id);
    }
}

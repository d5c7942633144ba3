//! The scheduler: spawns a base requester pool (plus an optional spike
//! cohort), drives each one through the pattern/rate-limiter/requester
//! pipeline, aggregates under a per-test lock after every result, and
//! finalizes the test once the end time arrives or auto-stop fires.
//!
//! Grounded on the teacher's `worker.rs::run_worker` for the overall
//! "sleep, check duration, fire one request" task shape, restructured
//! around spec.md's masked-concurrency model (a worker below its pattern's
//! effective concurrency is masked off and re-checks every 100ms) instead
//! of the teacher's RPS-cycle `sleep_until` gating, and `memory_guard.rs`'s
//! use of a plain `AtomicBool` for a cooperative flag, repurposed here as
//! the per-test stop flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::TestConfig;
use crate::errors::EngineError;
use crate::history::{HistoryRecord, HistoryRing};
use crate::metrics::{build_time_series, compute_metrics};
use crate::pattern::{concurrency_at, delay_ms};
use crate::rate_limiter::GLOBAL_RATE_LIMITER;
use crate::requester::issue_request;
use crate::state::{LegacyVerdict, TestState, TestStateStore, TestStatus};
use crate::telemetry::GLOBAL_LATENCY_TRACKER;
use crate::threshold::{evaluate_thresholds, should_auto_stop};

const PATTERN_MASK_SLEEP_MS: u64 = 100;
const BASE36_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const TEST_ID_SUFFIX_LEN: usize = 7;

fn generate_test_id(now_ms: i64) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..TEST_ID_SUFFIX_LEN)
        .map(|_| BASE36_ALPHABET[rng.gen_range(0..BASE36_ALPHABET.len())] as char)
        .collect();
    format!("test_{now_ms}_{suffix}")
}

/// The load-test engine: owns the test registry, history, and HTTP client
/// shared by every run it starts.
#[derive(Clone)]
pub struct LoadTestEngine {
    store: TestStateStore,
    history: Arc<HistoryRing>,
    client: reqwest::Client,
}

impl LoadTestEngine {
    pub fn new() -> Self {
        LoadTestEngine {
            store: TestStateStore::new(),
            history: Arc::new(HistoryRing::new()),
            client: reqwest::Client::new(),
        }
    }

    /// Validates and registers `config`, then starts the run in the
    /// background. Returns immediately with the new test's id (spec.md §6).
    pub fn start_load_test(&self, mut config: TestConfig) -> Result<String, EngineError> {
        config.clamp();
        config.validate()?;

        let started_at = SystemClock.now_ms();
        let id = generate_test_id(started_at);

        let state = TestState::new(id.clone(), config.clone(), started_at);
        let handle = self.store.set(state);

        let engine = self.clone();
        let id_for_task = id.clone();
        tokio::spawn(async move {
            engine.run(id_for_task, config, handle).await;
        });

        Ok(id)
    }

    pub async fn get_test(&self, id: &str) -> Option<TestState> {
        self.store.get(id).await
    }

    pub fn get_history(&self) -> Vec<HistoryRecord> {
        self.history.all()
    }

    pub fn get_history_record(&self, id: &str) -> Option<HistoryRecord> {
        self.history.get(id)
    }

    pub fn get_history_records(&self, ids: &[String]) -> Vec<HistoryRecord> {
        self.history.get_many(ids)
    }

    async fn run(&self, id: String, config: TestConfig, handle: Arc<Mutex<TestState>>) {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let start_instant = Instant::now();
        let base_n = config.base_concurrency;

        let mut tasks = Vec::new();
        for index in 0..base_n {
            tasks.push(self.spawn_worker(index, start_instant, config.clone(), handle.clone(), stop_flag.clone()));
        }

        if let crate::pattern::Pattern::Spike {
            spike_concurrency,
            spike_duration_seconds,
        } = &config.pattern
        {
            if *spike_concurrency > base_n {
                let delay_s = (config.duration_seconds as i64 - *spike_duration_seconds as i64).max(0);
                let engine = self.clone();
                let config2 = config.clone();
                let handle2 = handle.clone();
                let stop_flag2 = stop_flag.clone();
                let spike_lo = base_n;
                let spike_hi = *spike_concurrency;
                tasks.push(tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(delay_s as u64)).await;
                    let mut cohort = Vec::new();
                    for index in spike_lo..spike_hi {
                        cohort.push(engine.spawn_worker(
                            index,
                            start_instant,
                            config2.clone(),
                            handle2.clone(),
                            stop_flag2.clone(),
                        ));
                    }
                    for t in cohort {
                        let _ = t.await;
                    }
                }));
            }
        }

        for t in tasks {
            let _ = t.await;
        }

        self.finalize(id, handle).await;
    }

    fn spawn_worker(
        &self,
        index: usize,
        start_instant: Instant,
        config: TestConfig,
        handle: Arc<Mutex<TestState>>,
        stop_flag: Arc<AtomicBool>,
    ) -> tokio::task::JoinHandle<()> {
        let client = self.client.clone();
        let duration_ms = config.duration_seconds as i64 * 1000;

        tokio::spawn(async move {
            loop {
                if stop_flag.load(Ordering::Acquire) {
                    break;
                }

                let elapsed_ms = start_instant.elapsed().as_millis() as i64;
                if elapsed_ms >= duration_ms {
                    break;
                }

                let effective_concurrency =
                    concurrency_at(&config.pattern, elapsed_ms, config.duration_seconds, config.base_concurrency);
                if index >= effective_concurrency {
                    tokio::time::sleep(Duration::from_millis(PATTERN_MASK_SLEEP_MS)).await;
                    continue;
                }

                let delay = delay_ms(&config.pattern, config.base_concurrency);
                if delay > 0 {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }

                GLOBAL_RATE_LIMITER.acquire().await;

                let result = issue_request(&client, &config.target_url, config.method, config.request_timeout_ms).await;
                GLOBAL_LATENCY_TRACKER.record_ms(result.response_time_ms);

                let elapsed_seconds = start_instant.elapsed().as_secs_f64();
                let mut guard = handle.lock().await;
                guard.request_results.push(result);
                guard.metrics = compute_metrics(&guard.request_results, elapsed_seconds);
                guard.time_series = build_time_series(&guard.request_results, guard.started_at);
                guard.legacy_verdict = LegacyVerdict::from_error_rate(guard.metrics.error_rate_percentage);

                let evaluation = evaluate_thresholds(&guard.metrics, guard.config.thresholds.as_ref());
                guard.threshold_verdict = evaluation.verdict;
                guard.verdict_reasons = evaluation.reasons.clone();
                if evaluation.violated && guard.first_violation_at.is_none() {
                    guard.first_violation_at = Some(SystemClock.now_ms());
                }
                drop(guard);

                if should_auto_stop(&evaluation) {
                    stop_flag.store(true, Ordering::Release);
                }
            }
        })
    }

    async fn finalize(&self, id: String, handle: Arc<Mutex<TestState>>) {
        let mut guard = handle.lock().await;
        if guard.status != TestStatus::Running {
            return;
        }

        let completed_at = SystemClock.now_ms();
        let elapsed_seconds = (completed_at - guard.started_at) as f64 / 1000.0;

        guard.status = TestStatus::Completed;
        guard.completed_at = Some(completed_at);
        guard.metrics = compute_metrics(&guard.request_results, elapsed_seconds.max(0.001));
        guard.time_series = build_time_series(&guard.request_results, guard.started_at);
        guard.legacy_verdict = LegacyVerdict::from_error_rate(guard.metrics.error_rate_percentage);

        let evaluation = evaluate_thresholds(&guard.metrics, guard.config.thresholds.as_ref());
        guard.threshold_verdict = evaluation.verdict;
        guard.verdict_reasons = evaluation.reasons;
        if !guard.verdict_reasons.is_empty() && guard.first_violation_at.is_none() {
            guard.first_violation_at = Some(completed_at);
        }

        guard.safety_score = Some(crate::safety::compute_safety_score(&guard.metrics));

        info!(
            test_id = %id,
            total = guard.metrics.total,
            error_rate = guard.metrics.error_rate_percentage,
            "test finalized"
        );

        self.history.insert(HistoryRecord::from(&*guard));
    }
}

impl Default for LoadTestEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Reports an engine fault: transitions a test straight to `Failed` without
/// a history append (spec.md §7). Not currently reachable from normal
/// operation — the worker loop has no panicking paths — but kept as the
/// documented escape hatch for unexpected internal errors.
pub async fn mark_failed(store: &TestStateStore, id: &str) {
    let marked = store
        .update(id, |state| {
            state.status = TestStatus::Failed;
            state.completed_at = Some(SystemClock.now_ms());
        })
        .await;
    if marked.is_none() {
        warn!(test_id = id, "mark_failed called for unknown test id");
    }
}

//! A controlled HTTP load generator: shapes concurrency over time, drives
//! requests under a global rate cap, aggregates live metrics, evaluates
//! thresholds with auto-stop, and scores the run's safety once it
//! completes.
//!
//! This crate is the execution engine and metrics pipeline only. The HTTP
//! presentation surface, persistence beyond a bounded in-memory history,
//! and URL safety filtering are external collaborators' concerns.

pub mod clock;
pub mod config;
pub mod engine;
pub mod errors;
pub mod history;
pub mod metrics;
pub mod pattern;
pub mod rate_limiter;
pub mod requester;
pub mod safety;
pub mod state;
pub mod telemetry;
pub mod threshold;

pub use config::{Method, TestConfig, Thresholds};
pub use engine::LoadTestEngine;
pub use errors::EngineError;
pub use history::{HistoryRecord, HistoryRing};
pub use metrics::{build_time_series, compute_metrics, AggregatedMetrics, TimeSeriesPoint};
pub use pattern::{concurrency_at, delay_ms, pattern_preview, Pattern, PatternPreviewPoint};
pub use safety::{compute_safety_score, SafetyLabel, SafetyScore};
pub use state::{LegacyVerdict, RequestResult, TestState, TestStateStore, TestStatus};
pub use threshold::{evaluate_thresholds, should_auto_stop, Evaluation, ThresholdVerdict};

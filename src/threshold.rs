//! Maps current metrics and optional thresholds to a verdict, reasons, and
//! an auto-stop decision. Pure: no clock, no I/O, no mutation.
//!
//! Grounded on the teacher's `config.rs` validation style — a sequence of
//! independent `if let Some(limit) = ...` checks, each contributing a named
//! reason string, rather than a single combined predicate.

use serde::{Deserialize, Serialize};

use crate::config::Thresholds;
use crate::metrics::AggregatedMetrics;

/// PASS / DEGRADED / FAIL, compared against a test's thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ThresholdVerdict {
    Pass,
    Degraded,
    Fail,
}

/// The reason strings the evaluator can produce (spec.md §4.5); named so
/// `should_auto_stop` can match on them without string comparison.
pub const REASON_MAX_ERROR_RATE: &str = "maxErrorRatePercent";
pub const REASON_MIN_SUCCESS_RATE: &str = "minSuccessRatePercent";
pub const REASON_MAX_P95_LATENCY: &str = "maxP95LatencyMs";

/// Result of one evaluation pass: verdict, ordered reasons, and whether this
/// pass found any violation at all (the engine decides whether to record it
/// as the test's `first_violation_at` — see spec.md §9).
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub verdict: ThresholdVerdict,
    pub reasons: Vec<String>,
    pub violated: bool,
}

/// Compares `metrics` against `thresholds` per spec.md §4.5. Absent
/// thresholds always yield `{Pass, [], false}`.
pub fn evaluate_thresholds(metrics: &AggregatedMetrics, thresholds: Option<&Thresholds>) -> Evaluation {
    let Some(thresholds) = thresholds else {
        return Evaluation {
            verdict: ThresholdVerdict::Pass,
            reasons: Vec::new(),
            violated: false,
        };
    };

    let mut verdict = ThresholdVerdict::Pass;
    let mut reasons = Vec::new();

    if let Some(limit) = thresholds.max_error_rate_percent {
        if metrics.error_rate_percentage > limit {
            reasons.push(REASON_MAX_ERROR_RATE.to_string());
            verdict = ThresholdVerdict::Fail;
        }
    }

    if let Some(limit) = thresholds.min_success_rate_percent {
        let success_rate = if metrics.total == 0 {
            100.0
        } else {
            100.0 * metrics.successful as f64 / metrics.total as f64
        };
        if success_rate < limit {
            reasons.push(REASON_MIN_SUCCESS_RATE.to_string());
            verdict = ThresholdVerdict::Fail;
        }
    }

    if let Some(limit) = thresholds.max_p95_latency_ms {
        if metrics.p95_response_time > limit {
            reasons.push(REASON_MAX_P95_LATENCY.to_string());
            if verdict == ThresholdVerdict::Pass {
                verdict = ThresholdVerdict::Degraded;
            }
        }
    }

    let violated = !reasons.is_empty();
    Evaluation {
        verdict,
        reasons,
        violated,
    }
}

/// Stop a run early only when the FAIL was caused by an error-rate or
/// success-rate violation. A FAIL driven purely by latency (p95 can only
/// ever push the verdict to DEGRADED, never FAIL on its own) never
/// auto-stops.
pub fn should_auto_stop(evaluation: &Evaluation) -> bool {
    evaluation.verdict == ThresholdVerdict::Fail
        && evaluation
            .reasons
            .iter()
            .any(|r| r == REASON_MAX_ERROR_RATE || r == REASON_MIN_SUCCESS_RATE)
}

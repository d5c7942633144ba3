//! Post-run safety scorer: a 0-100 health score derived from final metrics,
//! with weighted penalties and a human-readable explanation.
//!
//! Grounded on the teacher's `ThroughputStats::format` — concatenating
//! plain strings describing each contributing factor — adapted here to
//! penalty explanations instead of throughput summaries.

use serde::{Deserialize, Serialize};

use crate::metrics::AggregatedMetrics;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SafetyLabel {
    Safe,
    Warning,
    Dangerous,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SafetyScore {
    pub score: u8,
    pub label: SafetyLabel,
    pub explanation: String,
}

/// Computes the post-run safety score per spec.md §4.6. Penalties are
/// additive and independently capped; the running total is clamped to
/// [0, 100] and rounded to the nearest integer only at the end.
pub fn compute_safety_score(metrics: &AggregatedMetrics) -> SafetyScore {
    let mut score = 100.0;
    let mut notes = Vec::new();

    if metrics.total > 0 {
        let http_error_count = metrics.failed.saturating_sub(metrics.timeout_count);
        let http_error_rate = 100.0 * http_error_count as f64 / metrics.total as f64;
        if http_error_rate > 0.0 {
            let penalty = (http_error_rate * 0.6).min(40.0);
            score -= penalty;
            notes.push(format!(
                "HTTP error rate {:.2}% (-{:.1})",
                http_error_rate, penalty
            ));
        }

        if metrics.timeout_rate_percentage > 0.0 {
            let penalty = (metrics.timeout_rate_percentage * 1.2).min(30.0);
            score -= penalty;
            notes.push(format!(
                "timeout rate {:.2}% (-{:.1})",
                metrics.timeout_rate_percentage, penalty
            ));
        }
    }

    if metrics.p95_response_time > 500.0 {
        let penalty = ((metrics.p95_response_time - 500.0) / 100.0 * 3.0).min(25.0);
        score -= penalty;
        notes.push(format!(
            "p95 latency {:.1}ms exceeds 500ms (-{:.1})",
            metrics.p95_response_time, penalty
        ));
    }

    if metrics.avg_response_time > 300.0 {
        let penalty = ((metrics.avg_response_time - 300.0) / 100.0).min(10.0);
        score -= penalty;
        notes.push(format!(
            "avg latency {:.1}ms exceeds 300ms (-{:.1})",
            metrics.avg_response_time, penalty
        ));
    }

    if metrics.requests_per_second > 0.0 && metrics.requests_per_second < 1.0 {
        score -= 5.0;
        notes.push(format!(
            "throughput {:.2} rps is below 1 rps (-5.0)",
            metrics.requests_per_second
        ));
    }

    let clamped = score.clamp(0.0, 100.0).round() as u8;
    let label = if clamped >= 80 {
        SafetyLabel::Safe
    } else if clamped >= 50 {
        SafetyLabel::Warning
    } else {
        SafetyLabel::Dangerous
    };

    let explanation = if notes.is_empty() {
        "no penalties applied".to_string()
    } else {
        notes.join("; ")
    };

    SafetyScore {
        score: clamped,
        label,
        explanation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> AggregatedMetrics {
        AggregatedMetrics::default()
    }

    #[test]
    fn perfect_run_scores_100_and_is_safe() {
        let m = AggregatedMetrics {
            total: 100,
            successful: 100,
            failed: 0,
            requests_per_second: 10.0,
            avg_response_time: 50.0,
            p95_response_time: 100.0,
            ..metrics()
        };
        let s = compute_safety_score(&m);
        assert_eq!(s.score, 100);
        assert_eq!(s.label, SafetyLabel::Safe);
        assert_eq!(s.explanation, "no penalties applied");
    }

    #[test]
    fn s1_scenario_from_spec_is_safe() {
        // S1: fixed_concurrency smoke, all successes at 100ms, errorRate 0.
        let m = AggregatedMetrics {
            total: 6,
            successful: 6,
            failed: 0,
            error_rate_percentage: 0.0,
            requests_per_second: 2.0,
            avg_response_time: 100.0,
            min_response_time: 100.0,
            max_response_time: 100.0,
            p95_response_time: 100.0,
            p99_response_time: 100.0,
            timeout_count: 0,
            timeout_rate_percentage: 0.0,
        };
        let s = compute_safety_score(&m);
        assert_eq!(s.label, SafetyLabel::Safe);
    }

    #[test]
    fn total_failure_scores_dangerously_low() {
        let m = AggregatedMetrics {
            total: 100,
            successful: 0,
            failed: 100,
            error_rate_percentage: 100.0,
            ..metrics()
        };
        let s = compute_safety_score(&m);
        assert_eq!(s.label, SafetyLabel::Dangerous);
        assert!(s.score < 50);
    }

    #[test]
    fn timeout_heavy_run_is_penalized_separately_from_http_errors() {
        let m = AggregatedMetrics {
            total: 100,
            successful: 50,
            failed: 50,
            timeout_count: 50,
            timeout_rate_percentage: 50.0,
            ..metrics()
        };
        let s = compute_safety_score(&m);
        // http_error_count = failed - timeout_count = 0, so only the
        // timeout penalty (capped at 30) applies.
        assert_eq!(s.score, 70);
    }

    #[test]
    fn p95_excess_penalty_is_capped_at_25() {
        let m = AggregatedMetrics {
            total: 10,
            successful: 10,
            p95_response_time: 10_000.0,
            ..metrics()
        };
        let s = compute_safety_score(&m);
        assert_eq!(s.score, 75);
    }

    #[test]
    fn low_throughput_applies_flat_five_point_penalty() {
        let m = AggregatedMetrics {
            total: 1,
            successful: 1,
            requests_per_second: 0.5,
            ..metrics()
        };
        let s = compute_safety_score(&m);
        assert_eq!(s.score, 95);
    }

    #[test]
    fn zero_throughput_is_not_penalized_as_low() {
        let m = AggregatedMetrics {
            total: 0,
            requests_per_second: 0.0,
            ..metrics()
        };
        let s = compute_safety_score(&m);
        assert_eq!(s.score, 100);
    }

    #[test]
    fn score_never_drops_below_zero() {
        let m = AggregatedMetrics {
            total: 100,
            successful: 0,
            failed: 100,
            error_rate_percentage: 100.0,
            timeout_count: 50,
            timeout_rate_percentage: 50.0,
            avg_response_time: 10_000.0,
            p95_response_time: 50_000.0,
            requests_per_second: 0.1,
            ..metrics()
        };
        let s = compute_safety_score(&m);
        assert_eq!(s.score, 0);
    }
}

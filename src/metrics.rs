//! The live aggregator: pure, total, idempotent functions that turn a list
//! of request results into summary statistics and per-second buckets.
//!
//! Percentiles are computed by sorting the successes and interpolating
//! linearly at a fractional rank — not via an approximating histogram —
//! because callers depend on bit-exact values (see spec.md §8, S6).

use serde::{Deserialize, Serialize};

use crate::state::RequestResult;

/// Rounds to two decimal places the way every percentage/latency value in
/// this crate is reported.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Running summary statistics over a list of request results.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct AggregatedMetrics {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub error_rate_percentage: f64,
    pub requests_per_second: f64,
    pub avg_response_time: f64,
    pub min_response_time: f64,
    pub max_response_time: f64,
    pub p95_response_time: f64,
    pub p99_response_time: f64,
    pub timeout_count: u64,
    pub timeout_rate_percentage: f64,
}

/// Value at a fractional rank via linear interpolation between the two
/// bracketing order statistics, per spec.md §4.4.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let len = sorted.len();
    if len == 0 {
        return 0.0;
    }
    if len == 1 {
        return sorted[0];
    }

    let rank = (len - 1) as f64 * p;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;

    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Computes `AggregatedMetrics` over the full result list so far, against
/// `duration_seconds` of elapsed wall-clock time (live: elapsed since
/// start; final: total elapsed at completion — see spec.md §9).
pub fn compute_metrics(results: &[RequestResult], duration_seconds: f64) -> AggregatedMetrics {
    let total = results.len() as u64;
    let successful = results.iter().filter(|r| r.success).count() as u64;
    let failed = total - successful;
    let timeout_count = results
        .iter()
        .filter(|r| r.error.as_deref() == Some("timeout"))
        .count() as u64;

    let error_rate_percentage = if total == 0 {
        0.0
    } else {
        round2(100.0 * failed as f64 / total as f64)
    };
    let timeout_rate_percentage = if total == 0 {
        0.0
    } else {
        round2(100.0 * timeout_count as f64 / total as f64)
    };
    let requests_per_second = if duration_seconds > 0.0 {
        round2(total as f64 / duration_seconds)
    } else {
        0.0
    };

    let mut successes: Vec<f64> = results
        .iter()
        .filter(|r| r.success)
        .map(|r| r.response_time_ms)
        .collect();
    successes.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let (min, max, avg, p95, p99) = if successes.is_empty() {
        (0.0, 0.0, 0.0, 0.0, 0.0)
    } else {
        let sum: f64 = successes.iter().sum();
        (
            successes[0],
            *successes.last().unwrap(),
            round2(sum / successes.len() as f64),
            round2(percentile(&successes, 0.95)),
            round2(percentile(&successes, 0.99)),
        )
    };

    AggregatedMetrics {
        total,
        successful,
        failed,
        error_rate_percentage,
        requests_per_second,
        avg_response_time: avg,
        min_response_time: round2(min),
        max_response_time: round2(max),
        p95_response_time: p95,
        p99_response_time: p99,
        timeout_count,
        timeout_rate_percentage,
    }
}

/// A 1-second-wide window of per-request outcomes, for charting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TimeSeriesPoint {
    pub time: i64,
    pub response_time: f64,
    pub error_rate: f64,
    pub success_count: u64,
    pub fail_count: u64,
}

/// Partitions results into 1-second buckets keyed off `started_at`, in
/// ascending order, omitting empty buckets.
pub fn build_time_series(results: &[RequestResult], started_at: i64) -> Vec<TimeSeriesPoint> {
    use std::collections::BTreeMap;

    let mut buckets: BTreeMap<i64, (f64, u64, u64)> = BTreeMap::new();

    for r in results {
        let bucket = (r.timestamp - started_at).div_euclid(1000);
        let entry = buckets.entry(bucket).or_insert((0.0, 0, 0));
        entry.0 += r.response_time_ms;
        if r.success {
            entry.1 += 1;
        } else {
            entry.2 += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(bucket, (sum, success_count, fail_count))| {
            let count = success_count + fail_count;
            let mean = if count > 0 { sum / count as f64 } else { 0.0 };
            let error_rate = if count > 0 {
                100.0 * fail_count as f64 / count as f64
            } else {
                0.0
            };
            TimeSeriesPoint {
                time: started_at + bucket * 1000,
                response_time: round2(mean),
                error_rate: round2(error_rate),
                success_count,
                fail_count,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(success: bool, ms: f64, error: Option<&str>, timestamp: i64) -> RequestResult {
        RequestResult {
            response_time_ms: ms,
            success,
            status: None,
            error: error.map(|s| s.to_string()),
            timestamp,
        }
    }

    #[test]
    fn empty_results_are_all_zero() {
        let m = compute_metrics(&[], 10.0);
        assert_eq!(m, AggregatedMetrics::default());
        assert!(build_time_series(&[], 0).is_empty());
    }

    #[test]
    fn invariant_successful_plus_failed_equals_total() {
        let results = vec![
            result(true, 10.0, None, 0),
            result(false, 20.0, Some("timeout"), 0),
            result(false, 30.0, Some("oops"), 0),
        ];
        let m = compute_metrics(&results, 1.0);
        assert_eq!(m.successful + m.failed, m.total);
        assert!(m.timeout_count <= m.failed);
        assert_eq!(m.timeout_count, 1);
    }

    #[test]
    fn requests_per_second_matches_count_over_duration() {
        let results: Vec<_> = (0..7).map(|_| result(true, 5.0, None, 0)).collect();
        let m = compute_metrics(&results, 10.0);
        assert_eq!(m.requests_per_second, (7.0_f64 / 10.0 * 100.0).round() / 100.0);
    }

    #[test]
    fn percentile_monotonicity_holds() {
        let results: Vec<_> = vec![5.0, 1.0, 9.0, 3.0, 7.0]
            .into_iter()
            .map(|ms| result(true, ms, None, 0))
            .collect();
        let m = compute_metrics(&results, 1.0);
        assert!(m.min_response_time <= m.avg_response_time);
        assert!(m.avg_response_time <= m.p95_response_time);
        assert!(m.p95_response_time <= m.p99_response_time);
        assert!(m.p99_response_time <= m.max_response_time);
    }

    #[test]
    fn idempotent_across_repeated_calls() {
        let results = vec![result(true, 12.0, None, 0), result(false, 0.0, Some("timeout"), 1000)];
        let a = compute_metrics(&results, 2.0);
        let b = compute_metrics(&results, 2.0);
        assert_eq!(a, b);

        let ts_a = build_time_series(&results, 0);
        let ts_b = build_time_series(&results, 0);
        assert_eq!(ts_a, ts_b);
    }

    #[test]
    fn single_success_at_t0_has_one_bucket_with_all_percentiles_equal() {
        let results = vec![result(true, 42.0, None, 0)];
        let m = compute_metrics(&results, 1.0);
        assert_eq!(m.min_response_time, 42.0);
        assert_eq!(m.max_response_time, 42.0);
        assert_eq!(m.avg_response_time, 42.0);
        assert_eq!(m.p95_response_time, 42.0);
        assert_eq!(m.p99_response_time, 42.0);

        let ts = build_time_series(&results, 0);
        assert_eq!(ts.len(), 1);
        assert_eq!(ts[0].time, 0);
        assert_eq!(ts[0].success_count, 1);
        assert_eq!(ts[0].fail_count, 0);
    }

    #[test]
    fn single_failure_has_zero_percentiles() {
        let results = vec![result(false, 999.0, Some("timeout"), 0)];
        let m = compute_metrics(&results, 1.0);
        assert_eq!(m.min_response_time, 0.0);
        assert_eq!(m.max_response_time, 0.0);
        assert_eq!(m.p95_response_time, 0.0);
        assert_eq!(m.p99_response_time, 0.0);
    }

    #[test]
    fn exactly_on_threshold_does_not_round_up_error_rate() {
        // 1 failure out of 10 = exactly 10.00%
        let mut results: Vec<_> = (0..9).map(|_| result(true, 1.0, None, 0)).collect();
        results.push(result(false, 1.0, Some("boom"), 0));
        let m = compute_metrics(&results, 1.0);
        assert_eq!(m.error_rate_percentage, 10.0);
    }

    #[test]
    fn s6_percentile_scenario_from_spec() {
        // computeMetrics on successes 10..=100 step 10, d=10
        // expects p95 = 95.5, p99 = 99.1, avg = 55.0
        let results: Vec<_> = (1..=10)
            .map(|i| result(true, (i * 10) as f64, None, 0))
            .collect();
        let m = compute_metrics(&results, 10.0);
        assert_eq!(m.avg_response_time, 55.0);
        assert_eq!(m.p95_response_time, 95.5);
        assert_eq!(m.p99_response_time, 99.1);
    }

    #[test]
    fn time_series_orders_buckets_ascending_and_omits_empty() {
        let results = vec![
            result(true, 10.0, None, 2500),
            result(true, 20.0, None, 2600),
            result(true, 5.0, None, 0),
        ];
        let ts = build_time_series(&results, 0);
        let times: Vec<i64> = ts.iter().map(|p| p.time).collect();
        assert_eq!(times, vec![0, 2000]);
    }
}

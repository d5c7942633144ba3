//! Pure functions mapping a load pattern and elapsed time to effective
//! concurrency and inter-request delay. No state, no I/O — callers
//! (the engine's worker loop) are fully responsible for sleeping and
//! gating on the results.

use serde::{Deserialize, Serialize};

/// Shape of load over the life of a test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Pattern {
    FixedConcurrency,
    FixedRps { target_rps: f64 },
    RampUp { ramp_up_seconds: u64 },
    Spike { spike_concurrency: usize, spike_duration_seconds: u64 },
}

/// Effective concurrency c(t): the number of requesters permitted to be
/// actively issuing requests at `elapsed_ms` into a test of `duration_s`
/// seconds with base concurrency `base_n`.
///
/// Always in `[1, max(base_n, spike_concurrency)]` per spec.md §8 property 7.
pub fn concurrency_at(pattern: &Pattern, elapsed_ms: i64, duration_s: u64, base_n: usize) -> usize {
    let elapsed_s = elapsed_ms as f64 / 1000.0;

    match pattern {
        Pattern::FixedConcurrency | Pattern::FixedRps { .. } => base_n.max(1),

        Pattern::RampUp { ramp_up_seconds } => {
            let r = *ramp_up_seconds as f64;
            if r <= 0.0 || elapsed_s >= r {
                base_n.max(1)
            } else {
                let c = (base_n as f64 * elapsed_s / r).floor() as usize;
                c.max(1)
            }
        }

        Pattern::Spike {
            spike_concurrency,
            spike_duration_seconds,
        } => {
            let delta = *spike_duration_seconds as f64;
            let start = (duration_s as f64 - delta).max(0.0);
            if elapsed_s >= start && elapsed_s < start + delta {
                (*spike_concurrency).max(1)
            } else {
                base_n.max(1)
            }
        }
    }
}

/// Inter-request delay (ms) a single worker should wait between its own
/// requests. Only `fixed_rps` imposes one; every other pattern relies
/// purely on concurrency gating.
pub fn delay_ms(pattern: &Pattern, base_n: usize) -> u64 {
    match pattern {
        Pattern::FixedRps { target_rps } if *target_rps > 0.0 => {
            ((1000.0 / target_rps) * base_n as f64).round() as u64
        }
        _ => 0,
    }
}

/// One sample of `(time_sec, concurrency)` for previewing a pattern's shape.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PatternPreviewPoint {
    pub time_sec: u64,
    pub concurrency: usize,
}

/// Samples `concurrency_at` at `step = max(1, floor(D/50))` second
/// intervals from t=0 to t=D inclusive, always including a final point
/// at t=D even if the step grid didn't land on it exactly.
pub fn pattern_preview(pattern: &Pattern, duration_s: u64, base_n: usize) -> Vec<PatternPreviewPoint> {
    let step = (duration_s / 50).max(1);
    let mut points = Vec::new();

    let mut t = 0u64;
    while t <= duration_s {
        points.push(PatternPreviewPoint {
            time_sec: t,
            concurrency: concurrency_at(pattern, (t * 1000) as i64, duration_s, base_n),
        });
        t += step;
    }

    if points.last().map(|p| p.time_sec) != Some(duration_s) {
        points.push(PatternPreviewPoint {
            time_sec: duration_s,
            concurrency: concurrency_at(pattern, (duration_s * 1000) as i64, duration_s, base_n),
        });
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_patterns_always_return_base_n() {
        assert_eq!(concurrency_at(&Pattern::FixedConcurrency, 0, 10, 7), 7);
        assert_eq!(
            concurrency_at(&Pattern::FixedRps { target_rps: 50.0 }, 5_000, 10, 7),
            7
        );
    }

    #[test]
    fn ramp_up_reaches_base_n_exactly_at_end() {
        let pattern = Pattern::RampUp { ramp_up_seconds: 10 };
        assert_eq!(concurrency_at(&pattern, 0, 10, 10), 1);
        assert_eq!(concurrency_at(&pattern, 5_000, 10, 10), 5);
        assert_eq!(concurrency_at(&pattern, 10_000, 10, 10), 10);
        assert_eq!(concurrency_at(&pattern, 15_000, 10, 10), 10);
    }

    #[test]
    fn ramp_up_seconds_equal_to_duration_reaches_n_at_d() {
        let pattern = Pattern::RampUp { ramp_up_seconds: 10 };
        assert_eq!(concurrency_at(&pattern, 10_000, 10, 42), 42);
    }

    #[test]
    fn spike_window_matches_s5_scenario() {
        let pattern = Pattern::Spike {
            spike_concurrency: 12,
            spike_duration_seconds: 2,
        };
        // N=3, D=10s: spike window is [8s, 10s)
        assert_eq!(concurrency_at(&pattern, 0, 10, 3), 3);
        assert_eq!(concurrency_at(&pattern, 7_999, 10, 3), 3);
        assert_eq!(concurrency_at(&pattern, 8_000, 10, 3), 12);
        assert_eq!(concurrency_at(&pattern, 9_999, 10, 3), 12);
        assert_eq!(concurrency_at(&pattern, 10_000, 10, 3), 3);
    }

    #[test]
    fn spike_duration_equal_to_total_runs_whole_test() {
        let pattern = Pattern::Spike {
            spike_concurrency: 20,
            spike_duration_seconds: 10,
        };
        assert_eq!(concurrency_at(&pattern, 0, 10, 5), 20);
        assert_eq!(concurrency_at(&pattern, 9_999, 10, 5), 20);
    }

    #[test]
    fn fixed_rps_delay_spreads_across_workers() {
        // 10 rps target, 5 workers -> each worker waits 500ms between requests.
        let pattern = Pattern::FixedRps { target_rps: 10.0 };
        assert_eq!(delay_ms(&pattern, 5), 500);
    }

    #[test]
    fn non_rps_patterns_have_no_delay() {
        assert_eq!(delay_ms(&Pattern::FixedConcurrency, 5), 0);
        assert_eq!(
            delay_ms(&Pattern::RampUp { ramp_up_seconds: 5 }, 5),
            0
        );
    }

    #[test]
    fn preview_always_includes_final_point_at_d() {
        let pattern = Pattern::FixedConcurrency;
        let points = pattern_preview(&pattern, 37, 4);
        assert_eq!(points.last().unwrap().time_sec, 37);
    }

    #[test]
    fn concurrency_bounds_hold_across_patterns() {
        let patterns = vec![
            Pattern::FixedConcurrency,
            Pattern::FixedRps { target_rps: 5.0 },
            Pattern::RampUp { ramp_up_seconds: 5 },
            Pattern::Spike {
                spike_concurrency: 20,
                spike_duration_seconds: 3,
            },
        ];
        let base_n = 8;
        for pattern in &patterns {
            let cap = match pattern {
                Pattern::Spike { spike_concurrency, .. } => base_n.max(*spike_concurrency),
                _ => base_n,
            };
            for ms in (0..=10_000).step_by(137) {
                let c = concurrency_at(pattern, ms, 10, base_n);
                assert!(c >= 1 && c <= cap, "c={c} out of [1,{cap}] at ms={ms}");
            }
        }
    }
}

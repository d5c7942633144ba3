//! Test configuration: immutable once a run starts. Numeric fields are
//! re-clamped defensively per spec.md §6 even though collaborators are
//! expected to clamp before calling `start_load_test`.

use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::pattern::Pattern;

const MIN_CONCURRENCY: usize = 1;
const MAX_CONCURRENCY: usize = 100;
const MIN_DURATION_S: u64 = 1;
const MAX_DURATION_S: u64 = 300;
const MIN_TIMEOUT_MS: u64 = 1000;
const MAX_TIMEOUT_MS: u64 = 60000;

/// HTTP method the requester issues. POST sends an empty JSON body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

/// Optional pass/fail limits the threshold evaluator checks after every
/// request result.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Thresholds {
    pub max_error_rate_percent: Option<f64>,
    pub max_p95_latency_ms: Option<f64>,
    pub min_success_rate_percent: Option<f64>,
}

/// Immutable per-test configuration. The upstream URL safety guard
/// (localhost/private-IP blocking) is assumed to have already run; this
/// crate does not re-implement it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestConfig {
    pub target_url: String,
    pub method: Method,
    pub base_concurrency: usize,
    pub duration_seconds: u64,
    pub request_timeout_ms: u64,
    pub thresholds: Option<Thresholds>,
    pub pattern: Pattern,
}

impl TestConfig {
    /// Re-clamps every numeric field to its valid range in place. Collaborators
    /// are expected to have already clamped (spec.md §6); this is a defensive
    /// second pass inside the engine, not a rejection path.
    pub fn clamp(&mut self) {
        self.base_concurrency = self.base_concurrency.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY);
        self.duration_seconds = self.duration_seconds.clamp(MIN_DURATION_S, MAX_DURATION_S);
        self.request_timeout_ms = self.request_timeout_ms.clamp(MIN_TIMEOUT_MS, MAX_TIMEOUT_MS);
    }

    /// Rejects configs with a malformed target url or an unusable pattern.
    /// Numeric out-of-range fields are clamped rather than rejected, per
    /// spec.md §7 (config errors reaching the engine are coerced, not
    /// bounced back to the caller).
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.target_url.starts_with("http://") || self.target_url.starts_with("https://")) {
            return Err(EngineError::InvalidUrl(self.target_url.clone()));
        }

        match &self.pattern {
            Pattern::FixedRps { target_rps } if *target_rps < 1.0 => {
                return Err(EngineError::InvalidPattern(
                    "fixed_rps.target_rps must be >= 1".to_string(),
                ));
            }
            Pattern::RampUp { ramp_up_seconds } if *ramp_up_seconds < 1 => {
                return Err(EngineError::InvalidPattern(
                    "ramp_up.ramp_up_seconds must be >= 1".to_string(),
                ));
            }
            Pattern::Spike {
                spike_concurrency,
                spike_duration_seconds,
            } => {
                if *spike_concurrency < self.base_concurrency {
                    return Err(EngineError::InvalidPattern(
                        "spike.spike_concurrency must be >= base_concurrency".to_string(),
                    ));
                }
                if *spike_duration_seconds < 1 {
                    return Err(EngineError::InvalidPattern(
                        "spike.spike_duration_seconds must be >= 1".to_string(),
                    ));
                }
            }
            _ => {}
        }

        Ok(())
    }
}

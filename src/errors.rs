//! Error taxonomy: configuration errors (rejected/re-clamped before a run
//! starts) versus engine faults (unexpected, terminate a run as `Failed`).
//!
//! Per-request outcomes — timeouts, 4xx/5xx responses, transport failures —
//! are *not* part of this taxonomy. They are captured as a `RequestResult`
//! and folded into metrics; they never surface as an `EngineError`.

use thiserror::Error;

/// Errors that can occur while validating a test configuration or running
/// the engine itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid target url: {0}")]
    InvalidUrl(String),

    #[error("base concurrency {0} out of range [1, 100]")]
    ConcurrencyOutOfRange(usize),

    #[error("duration {0}s out of range [1, 300]")]
    DurationOutOfRange(u64),

    #[error("request timeout {0}ms out of range [1000, 60000]")]
    TimeoutOutOfRange(u64),

    #[error("pattern parameter invalid: {0}")]
    InvalidPattern(String),

    #[error("unknown test id: {0}")]
    UnknownTest(String),
}

/// Classifies a `reqwest::Error` into the two shapes the requester cares
/// about: did the transport signal a timeout, or something else.
///
/// Grounded on the teacher's richer `ErrorCategory::from_reqwest_error`
/// six-way classification, trimmed to the two-way distinction spec.md's
/// requester actually records (`"timeout"` tag vs. the raw message).
pub fn classify_transport_error(error: &reqwest::Error) -> &'static str {
    if error.is_timeout() {
        "timeout"
    } else {
        "transport"
    }
}

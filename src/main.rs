use std::env;
use std::time::Duration;

use loadgen_core::config::{Method, Thresholds};
use loadgen_core::{LoadTestEngine, Pattern, TestConfig, TestStatus, ThresholdVerdict};
use mimalloc::MiMalloc;
use tracing::info;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn env_var(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_pattern() -> Pattern {
    match env_var("LOAD_PATTERN", "fixed_concurrency").as_str() {
        "fixed_rps" => Pattern::FixedRps {
            target_rps: env_var("TARGET_RPS", "10").parse().expect("TARGET_RPS must be a number"),
        },
        "ramp_up" => Pattern::RampUp {
            ramp_up_seconds: env_var("RAMP_UP_SECONDS", "10").parse().expect("RAMP_UP_SECONDS must be a number"),
        },
        "spike" => Pattern::Spike {
            spike_concurrency: env_var("SPIKE_CONCURRENCY", "20").parse().expect("SPIKE_CONCURRENCY must be a number"),
            spike_duration_seconds: env_var("SPIKE_DURATION_SECONDS", "5")
                .parse()
                .expect("SPIKE_DURATION_SECONDS must be a number"),
        },
        _ => Pattern::FixedConcurrency,
    }
}

fn parse_thresholds() -> Option<Thresholds> {
    let max_error_rate_percent = env::var("MAX_ERROR_RATE_PERCENT").ok().and_then(|v| v.parse().ok());
    let max_p95_latency_ms = env::var("MAX_P95_LATENCY_MS").ok().and_then(|v| v.parse().ok());
    let min_success_rate_percent = env::var("MIN_SUCCESS_RATE_PERCENT").ok().and_then(|v| v.parse().ok());

    if max_error_rate_percent.is_none() && max_p95_latency_ms.is_none() && min_success_rate_percent.is_none() {
        return None;
    }

    Some(Thresholds {
        max_error_rate_percent,
        max_p95_latency_ms,
        min_success_rate_percent,
    })
}

/// Thin CLI demo driver: starts one load test, polls it to completion, and
/// prints a summary. This is not the HTTP presentation surface — there is
/// no server, no REST API, no CSV export. Collaborators that need those
/// build them on top of `loadgen_core`.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let target_url = env::var("TARGET_URL").expect("TARGET_URL environment variable must be set");
    let method = match env_var("METHOD", "GET").to_uppercase().as_str() {
        "POST" => Method::Post,
        _ => Method::Get,
    };
    let base_concurrency: usize = env_var("CONCURRENCY", "10").parse().expect("CONCURRENCY must be a number");
    let duration_seconds: u64 = env_var("DURATION_SECONDS", "10").parse().expect("DURATION_SECONDS must be a number");
    let request_timeout_ms: u64 = env_var("REQUEST_TIMEOUT_MS", "5000")
        .parse()
        .expect("REQUEST_TIMEOUT_MS must be a number");

    let config = TestConfig {
        target_url,
        method,
        base_concurrency,
        duration_seconds,
        request_timeout_ms,
        thresholds: parse_thresholds(),
        pattern: parse_pattern(),
    };

    let engine = LoadTestEngine::new();
    let id = engine.start_load_test(config)?;
    info!(test_id = %id, "load test started");

    loop {
        tokio::time::sleep(Duration::from_millis(250)).await;
        let state = engine.get_test(&id).await.expect("test id was just registered");
        if state.status != TestStatus::Running {
            println!(
                "test {id} finished: status={:?} total={} error_rate={:.2}% p95={:.2}ms verdict={:?} reasons={:?}",
                state.status,
                state.metrics.total,
                state.metrics.error_rate_percentage,
                state.metrics.p95_response_time,
                state.threshold_verdict,
                state.verdict_reasons
            );
            if let Some(score) = &state.safety_score {
                println!("safety: {}/100 ({:?}) — {}", score.score, score.label, score.explanation);
            }

            let exit_code = match state.threshold_verdict {
                ThresholdVerdict::Pass => 0,
                ThresholdVerdict::Degraded => 1,
                ThresholdVerdict::Fail => 2,
            };
            std::process::exit(exit_code);
        }
    }
}

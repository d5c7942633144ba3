//! Issues a single HTTP request with an armed timeout and classifies the
//! outcome into a `RequestResult`. Connection reuse is left to `reqwest`;
//! response bodies are drained in small chunks rather than buffered whole,
//! which matters once many tests are issuing requests concurrently.

use tokio::time::Instant;

use crate::clock::{Clock, SystemClock};
use crate::config::Method;
use crate::errors::classify_transport_error;
use crate::state::RequestResult;

/// Builds the request for the configured method, attaching an empty JSON
/// body with a JSON content-type for POST as spec.md §3 requires.
fn build_request(client: &reqwest::Client, url: &str, method: Method) -> reqwest::RequestBuilder {
    match method {
        Method::Get => client.get(url),
        Method::Post => client
            .post(url)
            .header("Content-Type", "application/json")
            .body("{}"),
    }
}

/// Issues one request and classifies the outcome per spec.md §4.2:
/// - status < 400 → success
/// - status >= 400 → failure, no error tag
/// - timeout fired → failure, error = "timeout"
/// - other transport error → failure, error = message
pub async fn issue_request(
    client: &reqwest::Client,
    url: &str,
    method: Method,
    timeout_ms: u64,
) -> RequestResult {
    let start = Instant::now();
    let timestamp = SystemClock.now_ms();

    let req = build_request(client, url, method);
    let outcome = tokio::time::timeout(
        std::time::Duration::from_millis(timeout_ms),
        req.send(),
    )
    .await;

    let response_time_ms = start.elapsed().as_millis() as f64;

    let (success, status, error) = match outcome {
        Err(_elapsed) => (false, None, Some("timeout".to_string())),
        Ok(Err(e)) => {
            if e.is_timeout() {
                (false, None, Some("timeout".to_string()))
            } else {
                (false, None, Some(classify_error_message(&e)))
            }
        }
        Ok(Ok(mut response)) => {
            let status_code = response.status().as_u16();
            // Drain the body without buffering it whole.
            while let Ok(Some(_chunk)) = response.chunk().await {}
            if status_code < 400 {
                (true, Some(status_code), None)
            } else {
                (false, Some(status_code), None)
            }
        }
    };

    RequestResult {
        response_time_ms,
        success,
        status,
        error,
        timestamp,
    }
}

fn classify_error_message(error: &reqwest::Error) -> String {
    if classify_transport_error(error) == "timeout" {
        "timeout".to_string()
    } else {
        error.to_string()
    }
}

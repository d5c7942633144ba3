//! Process-wide sliding-window cap on outgoing request starts.
//!
//! This protects downstream targets from the generator process as a whole,
//! independent of how many tests are running concurrently — every worker
//! across every test admits through the same limiter.

use std::collections::VecDeque;

use tokio::sync::Mutex;
use tokio::time::{self, Duration, Instant};

const WINDOW: Duration = Duration::from_millis(1000);
const MAX_ADMITTED: usize = 500;
const BACKOFF: Duration = Duration::from_millis(20);

/// Sliding-window limiter over the last 1000ms of accepted request starts.
pub struct RateLimiter {
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            timestamps: Mutex::new(VecDeque::with_capacity(MAX_ADMITTED)),
        }
    }

    /// Blocks until a request start is admitted, then records it.
    pub async fn acquire(&self) {
        loop {
            {
                let mut ts = self.timestamps.lock().await;
                let cutoff = Instant::now() - WINDOW;
                while ts.front().is_some_and(|&t| t < cutoff) {
                    ts.pop_front();
                }

                if ts.len() < MAX_ADMITTED {
                    ts.push_back(Instant::now());
                    return;
                }
            }

            time::sleep(BACKOFF).await;
        }
    }

    /// Number of starts currently counted within the rolling window.
    pub async fn current_load(&self) -> usize {
        let mut ts = self.timestamps.lock().await;
        let cutoff = Instant::now() - WINDOW;
        while ts.front().is_some_and(|&t| t < cutoff) {
            ts.pop_front();
        }
        ts.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static::lazy_static! {
    /// Single limiter shared by every worker across every test.
    pub static ref GLOBAL_RATE_LIMITER: RateLimiter = RateLimiter::new();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admits_up_to_cap_without_blocking() {
        let limiter = RateLimiter::new();
        let start = Instant::now();
        for _ in 0..MAX_ADMITTED {
            limiter.acquire().await;
        }
        // All MAX_ADMITTED admissions should have gone through near-instantly.
        assert!(start.elapsed() < Duration::from_millis(200));
        assert_eq!(limiter.current_load().await, MAX_ADMITTED);
    }

    #[tokio::test]
    async fn evicts_expired_timestamps() {
        let limiter = RateLimiter::new();
        limiter.acquire().await;
        assert_eq!(limiter.current_load().await, 1);

        time::sleep(WINDOW + Duration::from_millis(100)).await;

        assert_eq!(limiter.current_load().await, 0);
    }

    #[tokio::test]
    async fn blocks_once_window_is_full() {
        let limiter = RateLimiter::new();
        for _ in 0..MAX_ADMITTED {
            limiter.acquire().await;
        }

        // The (MAX_ADMITTED + 1)th acquire must not resolve within one backoff tick.
        let blocked = tokio::select! {
            _ = limiter.acquire() => false,
            _ = time::sleep(BACKOFF / 2) => true,
        };
        assert!(blocked, "acquire should have blocked while the window is full");
    }
}

//! Pure exponential-backoff retry policy, grounded on
//! `original_source/src/retry.py::retry_with_backoff` (doubling delay plus a
//! `uniform(0, 1)` jitter term, terminates by re-raising the final exception
//! rather than a sentinel), with the delay formula cross-checked against a
//! rate-limit-aware `delay_for_attempt` shape (multiplier plus a capped max
//! delay).

use std::time::Duration;

use rand::Rng;

use super::limiter::{Sleeper, SystemSleeper};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first. `retries = 1` means
    /// no retrying at all.
    pub max_retries: u32,
    /// Base delay in milliseconds; doubles with each attempt.
    pub base_delay_ms: u64,
    /// Cap on the computed delay, regardless of attempt count.
    pub max_delay_ms: u64,
    /// Multiplier applied to the delay when the failure was a rate-limit
    /// response (HTTP 429), mirroring an explicit "back off harder" signal.
    pub rate_limit_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 1000,
            max_delay_ms: 32_000,
            rate_limit_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// `base_delay_ms * 2^attempt`, capped at `max_delay_ms`, scaled by
    /// `rate_limit_multiplier` when rate-limited, plus a `uniform(0, 1)`
    /// second jitter term so concurrent retriers don't all wake at once.
    pub fn delay_for_attempt(&self, attempt: u32, is_rate_limited: bool) -> Duration {
        let base_delay = self.base_delay_ms.saturating_mul(1u64 << attempt.min(32));
        let delay_ms = base_delay.min(self.max_delay_ms);
        let delay = if is_rate_limited {
            Duration::from_millis((delay_ms as f64 * self.rate_limit_multiplier) as u64)
        } else {
            Duration::from_millis(delay_ms)
        };
        delay + Duration::from_secs_f64(rand::thread_rng().gen_range(0.0..1.0))
    }
}

/// True for HTTP statuses worth retrying (timeouts, rate limits, 5xx).
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// True for the specific status that should trigger the rate-limit
/// multiplier rather than the plain backoff curve.
pub fn is_rate_limited_status(status: u16) -> bool {
    status == 429
}

/// Run `op` up to `config.max_retries` times, sleeping with exponential
/// backoff between attempts. `op` receives the zero-based attempt number and
/// returns `Err((error, is_rate_limited))` on failure. The final attempt's
/// error is returned verbatim on exhaustion -- there is no synthetic
/// "retries exhausted" error, matching the original's re-raise of the last
/// caught exception.
pub fn retry_with_backoff<T, E>(
    config: &RetryConfig,
    sleeper: &dyn Sleeper,
    mut op: impl FnMut(u32) -> Result<T, (E, bool)>,
) -> Result<T, E> {
    let mut attempt = 0;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err((err, is_rate_limited)) => {
                attempt += 1;
                if attempt >= config.max_retries {
                    return Err(err);
                }
                let delay = config.delay_for_attempt(attempt - 1, is_rate_limited);
                sleeper.sleep(delay.as_secs_f64());
            }
        }
    }
}

/// Convenience wrapper using the real system sleeper.
pub fn retry_with_default_sleeper<T, E>(
    config: &RetryConfig,
    op: impl FnMut(u32) -> Result<T, (E, bool)>,
) -> Result<T, E> {
    retry_with_backoff(config, &SystemSleeper, op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct RecordingSleeper {
        calls: std::sync::Mutex<Vec<f64>>,
    }
    impl Sleeper for RecordingSleeper {
        fn sleep(&self, secs: f64) {
            self.calls.lock().unwrap().push(secs);
        }
    }

    /// Asserts `delay` falls in `[floor_ms, floor_ms + 1000)`, the window
    /// left by the `uniform(0, 1)` second jitter term.
    fn assert_in_jitter_window(delay: Duration, floor_ms: u64) {
        assert!(delay >= Duration::from_millis(floor_ms));
        assert!(delay < Duration::from_millis(floor_ms + 1000));
    }

    #[test]
    fn delay_doubles_then_caps() {
        let config = RetryConfig {
            max_retries: 10,
            base_delay_ms: 1000,
            max_delay_ms: 5000,
            rate_limit_multiplier: 2.0,
        };
        assert_in_jitter_window(config.delay_for_attempt(0, false), 1000);
        assert_in_jitter_window(config.delay_for_attempt(1, false), 2000);
        assert_in_jitter_window(config.delay_for_attempt(2, false), 4000);
        assert_in_jitter_window(config.delay_for_attempt(3, false), 5000);
        assert_in_jitter_window(config.delay_for_attempt(10, false), 5000);
    }

    #[test]
    fn rate_limited_attempt_applies_multiplier() {
        let config = RetryConfig {
            max_retries: 10,
            base_delay_ms: 1000,
            max_delay_ms: 100_000,
            rate_limit_multiplier: 2.0,
        };
        assert_in_jitter_window(config.delay_for_attempt(0, true), 2000);
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let attempts = Cell::new(0);
        let sleeper = RecordingSleeper {
            calls: std::sync::Mutex::new(Vec::new()),
        };
        let config = RetryConfig::default();
        let result: Result<&str, &str> = retry_with_backoff(&config, &sleeper, |_attempt| {
            let count = attempts.get() + 1;
            attempts.set(count);
            if count < 3 {
                Err(("transient", false))
            } else {
                Ok("done")
            }
        });
        assert_eq!(result, Ok("done"));
        assert_eq!(sleeper.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn exhausting_retries_returns_final_error_not_a_sentinel() {
        let sleeper = RecordingSleeper {
            calls: std::sync::Mutex::new(Vec::new()),
        };
        let config = RetryConfig {
            max_retries: 3,
            base_delay_ms: 1,
            max_delay_ms: 10,
            rate_limit_multiplier: 1.0,
        };
        let result: Result<(), &str> =
            retry_with_backoff(&config, &sleeper, |attempt| Err((
                if attempt == 2 { "final failure" } else { "earlier failure" },
                false,
            )));
        assert_eq!(result, Err("final failure"));
    }
}

//! Component H — Rate Limiter & Retry Core.
//!
//! Two independent, reusable primitives: a token-bucket rate limiter
//! (`limiter`) and a pure exponential-backoff retry policy (`retry`),
//! grounded on `original_source/src/rate_limiter.py` and
//! `original_source/src/retry.py` respectively, with the retry delay
//! formula cross-checked against a rate-limit-aware `RetryConfig` shape.

pub mod limiter;
pub mod retry;

pub use limiter::RateLimiter;
pub use retry::{retry_with_backoff, RetryConfig};

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limit exceeded: {0}")]
    Exceeded(String),
}

//! Token-bucket rate limiter over a sliding window. Clock and sleeper are
//! injectable so the invariant ("at most `max_calls` within any window of
//! length `period`") can be tested deterministically, exactly as
//! `original_source/src/rate_limiter.py::RateLimiter` does with its
//! `clock`/`sleeper` constructor parameters.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Injectable monotonic clock, in seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Injectable sleep function.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, secs: f64);
}

#[derive(Default)]
pub struct SystemClock {
    epoch: std::time::Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: std::time::Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

pub struct SystemSleeper;

impl Sleeper for SystemSleeper {
    fn sleep(&self, secs: f64) {
        if secs > 0.0 {
            std::thread::sleep(Duration::from_secs_f64(secs));
        }
    }
}

/// Configuration for a rate limiter.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    pub max_calls: usize,
    pub period: f64,
    pub burst_size: usize,
}

/// Token-bucket limiter: `acquire()` blocks until a new call fits within the
/// configured window; `penalize()` blocks unconditionally (used after an
/// explicit 429/rate-limit signal).
pub struct RateLimiter {
    max_calls: usize,
    period: f64,
    timestamps: Mutex<VecDeque<f64>>,
    clock: Box<dyn Clock>,
    sleeper: Box<dyn Sleeper>,
}

impl RateLimiter {
    pub fn new(max_calls: usize, period: f64, burst_size: Option<usize>) -> Self {
        Self::with_clock_and_sleeper(
            max_calls,
            period,
            burst_size,
            Box::new(SystemClock::new()),
            Box::new(SystemSleeper),
        )
    }

    pub fn with_clock_and_sleeper(
        max_calls: usize,
        period: f64,
        burst_size: Option<usize>,
        clock: Box<dyn Clock>,
        sleeper: Box<dyn Sleeper>,
    ) -> Self {
        assert!(max_calls > 0, "max_calls must be > 0");
        let _burst = burst_size.unwrap_or(max_calls).max(1);
        Self {
            max_calls,
            period: period.max(0.001),
            timestamps: Mutex::new(VecDeque::new()),
            clock,
            sleeper,
        }
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    /// Block until a new call fits within the window, then record it.
    pub fn acquire(&self) {
        let mut now = self.clock.now();
        {
            let mut timestamps = self.timestamps.lock().expect("rate limiter mutex poisoned");
            prune(&mut timestamps, now, self.period);
            if timestamps.len() >= self.max_calls {
                let sleep_time = self.period - (now - timestamps[0]);
                if sleep_time > 0.0 {
                    drop(timestamps);
                    self.sleeper.sleep(sleep_time);
                    now = self.clock.now();
                    let mut timestamps = self.timestamps.lock().expect("rate limiter mutex poisoned");
                    prune(&mut timestamps, now, self.period);
                    timestamps.push_back(now);
                    return;
                }
            }
            timestamps.push_back(now);
        }
    }

    /// Unconditionally block for `delay` (defaults to one period).
    pub fn penalize(&self, delay: Option<f64>) {
        let delay = delay.unwrap_or(self.period);
        if delay > 0.0 {
            self.sleeper.sleep(delay);
        }
    }
}

fn prune(timestamps: &mut VecDeque<f64>, now: f64, period: f64) {
    let boundary = now - period;
    while timestamps.front().is_some_and(|&t| t <= boundary) {
        timestamps.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;

    /// A clock and sleeper sharing one mutable instant, so sleeping
    /// deterministically advances what `now()` reports next.
    struct SharedClock(Arc<StdMutex<f64>>);
    impl Clock for SharedClock {
        fn now(&self) -> f64 {
            *self.0.lock().unwrap()
        }
    }

    struct AdvancingSleeper(Arc<StdMutex<f64>>);
    impl Sleeper for AdvancingSleeper {
        fn sleep(&self, secs: f64) {
            *self.0.lock().unwrap() += secs;
        }
    }

    fn fake_limiter(max_calls: usize, period: f64) -> (RateLimiter, Arc<StdMutex<f64>>) {
        let now = Arc::new(StdMutex::new(0.0));
        let limiter = RateLimiter::with_clock_and_sleeper(
            max_calls,
            period,
            None,
            Box::new(SharedClock(now.clone())),
            Box::new(AdvancingSleeper(now.clone())),
        );
        (limiter, now)
    }

    #[test]
    fn never_exceeds_max_calls_per_window() {
        let (limiter, _now) = fake_limiter(2, 1.0);
        for _ in 0..6 {
            limiter.acquire();
        }
        let timestamps = limiter.timestamps.lock().unwrap();
        assert!(timestamps.len() <= 2);
    }

    #[test]
    fn penalize_sleeps_full_period_by_default() {
        let (limiter, now) = fake_limiter(5, 2.5);
        limiter.penalize(None);
        assert_eq!(*now.lock().unwrap(), 2.5);
    }
}

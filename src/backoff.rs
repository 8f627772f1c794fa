//! Delay strategies applied between retry attempts.

use std::fmt;
use std::time::Duration;

use rand::Rng;

/// Computes the delay to wait before the next retry.
pub trait Backoff: fmt::Debug + Send + Sync {
    /// Returns the delay given the number of retries already attempted.
    fn next(&self, retries: u32) -> Duration;
}

/// Configuration-time error for [`Exponential`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum BackoffError {
    #[error("initial delay {initial:?} must be greater than zero and less than max {max:?}")]
    InitialOutOfRange { initial: Duration, max: Duration },
    #[error("growth rate {0} must be within (0.0, 1.0]")]
    GrowthRateOutOfRange(f64),
}

/// Waits the same amount of time between every attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Constant {
    delay: Duration,
}

impl Constant {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// No delay between attempts.
    pub fn zero() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl Backoff for Constant {
    fn next(&self, _retries: u32) -> Duration {
        self.delay
    }
}

/// Exponentially growing delay with jitter, capped at a maximum.
///
/// The unjittered delay for retry `x` is `f(x) = a(1 + r)^x`, where `a` is
/// the initial delay and `r` the growth rate. Retry `0` returns `a` as is;
/// later retries subtract up to 25% of `f(x)` at random and clamp the
/// result to `max`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Exponential {
    initial: Duration,
    max: Duration,
    growth_rate: f64,
}

impl Exponential {
    /// 50% growth per retry.
    pub const DEFAULT_GROWTH_RATE: f64 = 0.5;

    pub fn new(initial: Duration, max: Duration) -> Result<Self, BackoffError> {
        Self::with_growth_rate(initial, max, Self::DEFAULT_GROWTH_RATE)
    }

    pub fn with_growth_rate(
        initial: Duration,
        max: Duration,
        growth_rate: f64,
    ) -> Result<Self, BackoffError> {
        // a zero initial delay would keep every computed delay at zero.
        if initial.is_zero() || initial >= max {
            return Err(BackoffError::InitialOutOfRange { initial, max });
        }
        if !(growth_rate > 0.0 && growth_rate <= 1.0) {
            return Err(BackoffError::GrowthRateOutOfRange(growth_rate));
        }

        Ok(Self {
            initial,
            max,
            growth_rate,
        })
    }

    pub fn initial(&self) -> Duration {
        self.initial
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn growth_rate(&self) -> f64 {
        self.growth_rate
    }

    /// Delay for `retries` before jitter and clamping.
    fn unjittered(&self, retries: u32) -> Option<Duration> {
        let exponent = i32::try_from(retries).unwrap_or(i32::MAX);
        let secs = self.initial.as_secs_f64() * (1.0 + self.growth_rate).powi(exponent);
        Duration::try_from_secs_f64(secs).ok()
    }
}

impl Backoff for Exponential {
    fn next(&self, retries: u32) -> Duration {
        if retries == 0 {
            return self.initial;
        }

        let Some(delay) = self.unjittered(retries) else {
            return self.max;
        };

        let jitter = rand::thread_rng().gen_range(0.0..0.25);
        delay.mul_f64(1.0 - jitter).min(self.max)
    }
}

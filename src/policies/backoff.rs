//! # Backoff between resubscribe attempts.
//!
//! [`BackoffPolicy`] grows the wait before a region reopens its upstream
//! subscription: the `n`-th consecutive retry waits `first × factor^(n-1)`,
//! capped at `max`, then jittered. The base is recomputed from `n` every time,
//! so jitter never compounds across retries.
//!
//! ```rust
//! use std::time::Duration;
//! use geoingest::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_secs(1),
//!     max: Duration::from_secs(60),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//! assert_eq!(backoff.delay(1), Duration::from_secs(1));
//! assert_eq!(backoff.delay(3), Duration::from_secs(4));
//! assert_eq!(backoff.delay(20), Duration::from_secs(60));
//! ```

use std::time::Duration;

use super::jitter::JitterPolicy;

/// Exponential backoff with a cap and optional jitter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Upper bound for any delay (before jitter).
    pub max: Duration,
    /// Growth factor per consecutive retry (`1.0` = constant).
    pub factor: f64,
    /// Randomization applied to the capped delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// `1s × 2.0` per retry, capped at 5 minutes, equal jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(1),
            max: Duration::from_secs(300),
            factor: 2.0,
            jitter: JitterPolicy::Equal,
        }
    }
}

impl BackoffPolicy {
    /// Constant delay, no jitter.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Delay before the `retry`-th consecutive retry (1-based; `0` is treated as `1`).
    pub fn delay(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if secs.is_finite() && secs >= 0.0 && secs < self.max.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            self.max
        };
        self.jitter.apply(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exp(first_ms: u64, max_ms: u64) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(first_ms),
            max: Duration::from_millis(max_ms),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }

    #[test]
    fn doubles_per_retry() {
        let p = exp(500, 60_000);
        let got: Vec<u128> = (1..=5).map(|n| p.delay(n).as_millis()).collect();
        assert_eq!(got, [500, 1000, 2000, 4000, 8000]);
    }

    #[test]
    fn zero_retry_uses_first() {
        assert_eq!(exp(500, 60_000).delay(0), Duration::from_millis(500));
    }

    #[test]
    fn caps_at_max_including_overflow() {
        let p = exp(500, 3_000);
        assert_eq!(p.delay(4), Duration::from_millis(3_000));
        assert_eq!(p.delay(u32::MAX), Duration::from_millis(3_000));
    }

    #[test]
    fn first_above_max_is_capped() {
        assert_eq!(exp(10_000, 2_000).delay(1), Duration::from_millis(2_000));
    }

    #[test]
    fn fixed_is_constant() {
        let p = BackoffPolicy::fixed(Duration::from_secs(30));
        assert!((1..10).all(|n| p.delay(n) == Duration::from_secs(30)));
    }

    #[test]
    fn default_jitter_stays_within_half_and_base() {
        let p = BackoffPolicy::default();
        for _ in 0..100 {
            let d = p.delay(3);
            assert!(d >= Duration::from_secs(2) && d <= Duration::from_secs(4), "{d:?}");
        }
    }
}

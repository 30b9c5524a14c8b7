//! # Runtime configuration.
//!
//! [`Config`] gathers every knob of the ingestion runtime. It is built by the
//! binary from [`Args`](super::Args), or directly in code and tests.
//!
//! ## Sentinel values
//! - `launch_interval = 0s` → workers launched back to back
//! - `grace = 0s` → do not wait for workers after cancelling them
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

use crate::{
    core::ActorParams,
    error::ConfigError,
    policies::{BackoffPolicy, PublishFailurePolicy, RestartPolicy, StallPolicy},
    publish::Outbound,
};

/// Settings of the ingestion runtime.
///
/// ## Field semantics
/// - `launch_interval`: pause between two consecutive worker launches
/// - `supervise_interval`: period of the liveness check (must be > 0)
/// - `grace`: maximum wait for workers after shutdown was requested
/// - `bus_capacity`: event bus ring buffer size
/// - `restart`, `backoff`: worker resubscribe policies
/// - `stall`: reaction to a region that produced nothing for an interval
/// - `publish_failure`: reaction to a failed publish
/// - `outbound`: topic, partition key and payload format
/// - `flush_timeout`: bound on the final publisher flush
#[derive(Clone, Debug)]
pub struct Config {
    /// Pause between consecutive worker launches.
    pub launch_interval: Duration,

    /// Period of the liveness check.
    ///
    /// A region whose counter reads zero for a whole period is flagged Stalled.
    pub supervise_interval: Duration,

    /// Maximum time to wait for workers once shutdown was requested.
    ///
    /// Exceeding it makes the runtime return `RuntimeError::GraceExceeded`.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel.
    ///
    /// A listener that lags behind by more than `bus_capacity` events skips
    /// the oldest ones.
    pub bus_capacity: usize,

    /// When a failed worker reopens its subscription.
    pub restart: RestartPolicy,

    /// How long a worker waits before reopening.
    pub backoff: BackoffPolicy,

    /// What a stalled region leads to.
    pub stall: StallPolicy,

    /// How a worker reacts to a failed publish.
    pub publish_failure: PublishFailurePolicy,

    /// Destination topic, partition key and payload encoding.
    pub outbound: Outbound,

    /// Bound on the publisher flush performed after shutdown.
    pub flush_timeout: Duration,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Policies handed to every worker actor.
    #[inline]
    pub fn actor_params(&self) -> ActorParams {
        ActorParams {
            restart: self.restart,
            backoff: self.backoff,
        }
    }

    /// Rejects settings the runtime cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.supervise_interval.is_zero() {
            return Err(ConfigError::InvalidSetting {
                name: "supervise-interval",
                reason: "must be greater than zero".into(),
            });
        }
        if self.outbound.topic.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "topic",
                reason: "must not be empty".into(),
            });
        }
        if !(self.backoff.factor.is_finite() && self.backoff.factor >= 1.0) {
            return Err(ConfigError::InvalidSetting {
                name: "backoff-factor",
                reason: format!("must be a finite number >= 1, got {}", self.backoff.factor),
            });
        }
        if self.backoff.first > self.backoff.max {
            return Err(ConfigError::InvalidSetting {
                name: "backoff-first",
                reason: format!(
                    "first delay {:?} exceeds the cap {:?}",
                    self.backoff.first, self.backoff.max
                ),
            });
        }
        Ok(())
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `launch_interval = 30s`, `supervise_interval = 30s`
    /// - `grace = 30s`
    /// - `bus_capacity = 1024`
    /// - `restart = OnFailure` (unbounded), `backoff` 1s ×2 up to 5min with equal jitter
    /// - `stall = Restart { after: 2 }`
    /// - `publish_failure = Retry { attempts: 3 }`
    /// - `outbound`: topic `raw-tweets`, key per region, envelope payload
    /// - `flush_timeout = 5s`
    fn default() -> Self {
        Self {
            launch_interval: Duration::from_secs(30),
            supervise_interval: Duration::from_secs(30),
            grace: Duration::from_secs(30),
            bus_capacity: 1024,
            restart: RestartPolicy::default(),
            backoff: BackoffPolicy::default(),
            stall: StallPolicy::default(),
            publish_failure: PublishFailurePolicy::default(),
            outbound: Outbound::default(),
            flush_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.launch_interval, Duration::from_secs(30));
        assert_eq!(cfg.supervise_interval, Duration::from_secs(30));
        assert_eq!(cfg.stall, StallPolicy::Restart { after: 2 });
        assert_eq!(&*cfg.outbound.topic, "raw-tweets");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_bus_capacity_is_clamped() {
        let cfg = Config {
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn zero_supervise_interval_is_rejected() {
        let cfg = Config {
            supervise_interval: Duration::ZERO,
            ..Config::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("supervise-interval"));
    }

    #[test]
    fn blank_topic_is_rejected() {
        let mut cfg = Config::default();
        cfg.outbound.topic = Arc::from("  ");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn inverted_backoff_bounds_are_rejected() {
        let mut cfg = Config::default();
        cfg.backoff.first = Duration::from_secs(600);
        assert_eq!(cfg.validate().unwrap_err().as_label(), "config_invalid_setting");
    }
}

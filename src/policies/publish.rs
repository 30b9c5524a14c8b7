//! # Publish failure policy.
//!
//! A [`PublishError`](crate::PublishError) always reaches the worker that
//! issued the publish. [`PublishFailurePolicy`] is the worker's decision:
//!
//! - `Drop`: count the record as dropped, report it, keep streaming;
//! - `Retry`: retry with backoff up to `attempts` extra times, then drop-and-count;
//! - `Escalate`: fail the worker attempt so the restart policy takes over.

use std::time::Duration;

use super::backoff::BackoffPolicy;
use super::jitter::JitterPolicy;

/// Worker-level reaction to a failed publish.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PublishFailurePolicy {
    /// Drop the record and count it.
    Drop,
    /// Retry, then drop and count.
    Retry {
        /// Extra attempts after the first failure.
        attempts: u32,
        /// Delay between attempts.
        backoff: BackoffPolicy,
    },
    /// Fail the worker attempt.
    Escalate,
}

impl Default for PublishFailurePolicy {
    /// Three retries, 200ms doubling up to 2s, then drop-and-count.
    fn default() -> Self {
        PublishFailurePolicy::Retry {
            attempts: 3,
            backoff: BackoffPolicy {
                first: Duration::from_millis(200),
                max: Duration::from_secs(2),
                factor: 2.0,
                jitter: JitterPolicy::None,
            },
        }
    }
}

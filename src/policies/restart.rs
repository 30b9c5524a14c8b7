//! # Restart policy for region workers.
//!
//! A region worker is long-running: it only returns when its subscription
//! fails, drops, or is cancelled. [`RestartPolicy`] decides what happens after
//! a failed attempt.
//!
//! ```text
//! RestartPolicy::Never                         → first failure terminates the region
//! RestartPolicy::OnFailure { max_retries: None }    → reopen forever, with backoff (default)
//! RestartPolicy::OnFailure { max_retries: Some(n) } → terminate after n consecutive failures
//! ```
//!
//! Consecutive failures reset once an attempt delivers at least one item.

/// Policy controlling whether a failed worker reopens its subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Never restart: the region is Terminated on its first failure.
    Never,
    /// Restart after failures, optionally bounded by consecutive failures.
    OnFailure {
        /// Maximum consecutive failed attempts before giving up (`None` = unbounded).
        max_retries: Option<u32>,
    },
}

impl Default for RestartPolicy {
    /// Returns `OnFailure { max_retries: None }`.
    fn default() -> Self {
        RestartPolicy::OnFailure { max_retries: None }
    }
}

impl RestartPolicy {
    /// Whether another attempt is allowed after `consecutive_failures` failures in a row.
    pub fn allows_retry(&self, consecutive_failures: u32) -> bool {
        match self {
            RestartPolicy::Never => false,
            RestartPolicy::OnFailure { max_retries: None } => true,
            RestartPolicy::OnFailure {
                max_retries: Some(max),
            } => consecutive_failures <= *max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_does_not_retry() {
        assert!(!RestartPolicy::Never.allows_retry(1));
    }

    #[test]
    fn bounded_retries_stop_after_limit() {
        let p = RestartPolicy::OnFailure {
            max_retries: Some(2),
        };
        assert!(p.allows_retry(1));
        assert!(p.allows_retry(2));
        assert!(!p.allows_retry(3));
    }

    #[test]
    fn default_retries_forever() {
        assert!(RestartPolicy::default().allows_retry(u32::MAX));
    }
}

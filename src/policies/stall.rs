//! # Stall policy.
//!
//! The liveness loop flags a region Stalled when its counter read zero for a
//! whole interval. [`StallPolicy`] decides whether that signal is only
//! reported or also turned into a restart request for the region's worker.
//!
//! A restarted worker reopens its subscription after its backoff delay, so a
//! region that keeps stalling backs off instead of hammering the upstream.

use std::str::FromStr;

/// What to do about a stalled region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StallPolicy {
    /// Report the stall, take no action.
    AlertOnly,
    /// Request a restart once the region has been stalled for `after`
    /// consecutive intervals (`after >= 1`).
    Restart {
        /// Consecutive stalled intervals before restarting.
        after: u32,
    },
}

impl Default for StallPolicy {
    /// Restart after two consecutive stalled intervals.
    fn default() -> Self {
        StallPolicy::Restart { after: 2 }
    }
}

impl StallPolicy {
    /// Whether a region stalled for `consecutive` intervals should be restarted now.
    ///
    /// Fires once per streak: exactly when the streak reaches a multiple of `after`.
    pub fn should_restart(&self, consecutive: u32) -> bool {
        match self {
            StallPolicy::AlertOnly => false,
            StallPolicy::Restart { after } => {
                let after = (*after).max(1);
                consecutive > 0 && consecutive % after == 0
            }
        }
    }
}

impl FromStr for StallPolicy {
    type Err = String;

    /// Parses `alert` or `restart` / `restart:<n>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "alert" | "alert-only" => Ok(StallPolicy::AlertOnly),
            "restart" => Ok(StallPolicy::default()),
            other => {
                let n = other
                    .strip_prefix("restart:")
                    .ok_or_else(|| format!("unknown stall policy `{other}`"))?;
                let after: u32 = n
                    .parse()
                    .map_err(|_| format!("invalid restart threshold `{n}`"))?;
                if after == 0 {
                    return Err("restart threshold must be at least 1".into());
                }
                Ok(StallPolicy::Restart { after })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_only_never_restarts() {
        assert!((0..10).all(|n| !StallPolicy::AlertOnly.should_restart(n)));
    }

    #[test]
    fn restart_fires_on_every_nth_stalled_tick() {
        let p = StallPolicy::Restart { after: 2 };
        let fired: Vec<u32> = (1..=6).filter(|n| p.should_restart(*n)).collect();
        assert_eq!(fired, [2, 4, 6]);
    }

    #[test]
    fn parses_cli_forms() {
        assert_eq!("alert".parse::<StallPolicy>(), Ok(StallPolicy::AlertOnly));
        assert_eq!("restart".parse::<StallPolicy>(), Ok(StallPolicy::Restart { after: 2 }));
        assert_eq!("restart:3".parse::<StallPolicy>(), Ok(StallPolicy::Restart { after: 3 }));
        assert!("restart:0".parse::<StallPolicy>().is_err());
        assert!("reboot".parse::<StallPolicy>().is_err());
    }
}

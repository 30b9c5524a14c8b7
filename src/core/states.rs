//! # Per-region worker state.
//!
//! [`RegionStates`] is the authoritative table of [`WorkerState`] per region.
//! Actors write `Starting` / `Errored` / `Terminated`, workers write `Running`
//! once their subscription opens, and the liveness loop moves regions between
//! `Running` and `Stalled`.
//!
//! ```text
//!            open ok               zero activity
//! Starting ──────────► Running ─────────────────► Stalled
//!  ▲   │                 ▲ ◄──────────────────────── │
//!  │   │ open failed     │     nonzero activity      │
//!  │   ▼                 │                           │
//!  │ Errored ◄── failure ┴───────────────────────────┤
//!  │   │                                             │
//!  └───┴── backoff elapsed ◄──── restart request ────┘
//!
//! any ──► Terminated   (restart policy exhausted, fatal error, shutdown)
//! ```
//!
//! During shutdown the orchestrator uses [`RegionStates::alive`] to name the
//! regions whose workers did not stop within the grace period.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Lifecycle state of one region's worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkerState {
    /// Attempt started, subscription not open yet.
    Starting,
    /// Subscription open; activity seen in the last interval (or not checked yet).
    Running,
    /// No activity during the last full supervision interval.
    Stalled,
    /// Last attempt failed; backing off before the next one.
    Errored,
    /// Worker exited for good.
    Terminated,
}

impl WorkerState {
    /// Returns a short stable label (lowercase) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerState::Starting => "starting",
            WorkerState::Running => "running",
            WorkerState::Stalled => "stalled",
            WorkerState::Errored => "errored",
            WorkerState::Terminated => "terminated",
        }
    }

    /// True when the liveness loop should read the region's counter.
    #[inline]
    pub fn is_supervised(&self) -> bool {
        matches!(self, WorkerState::Running | WorkerState::Stalled)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Shared state table keyed by region id.
#[derive(Debug, Default)]
pub struct RegionStates {
    inner: RwLock<HashMap<Arc<str>, WorkerState>>,
}

impl RegionStates {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `state` for `region`; returns the previous state.
    pub fn set(&self, region: &Arc<str>, state: WorkerState) -> Option<WorkerState> {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(Arc::clone(region), state)
    }

    /// Moves `region` from `from` to `to`; no-op (returns false) when it is in another state.
    pub fn transition(&self, region: &str, from: WorkerState, to: WorkerState) -> bool {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        match map.get_mut(region) {
            Some(state) if *state == from => {
                *state = to;
                true
            }
            _ => false,
        }
    }

    /// Current state of `region`.
    pub fn get(&self, region: &str) -> Option<WorkerState> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(region)
            .copied()
    }

    /// All known regions with their state, sorted by id.
    pub fn snapshot(&self) -> Vec<(Arc<str>, WorkerState)> {
        let mut all: Vec<_> = self
            .inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(k, v)| (Arc::clone(k), *v))
            .collect();
        all.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Regions not yet `Terminated`, sorted.
    pub fn alive(&self) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .filter(|(_, s)| *s != WorkerState::Terminated)
            .map(|(id, _)| id.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_only_from_expected_state() {
        let states = RegionStates::new();
        let nyc: Arc<str> = Arc::from("nyc");
        states.set(&nyc, WorkerState::Starting);

        assert!(!states.transition("nyc", WorkerState::Running, WorkerState::Stalled));
        assert_eq!(states.get("nyc"), Some(WorkerState::Starting));

        states.set(&nyc, WorkerState::Running);
        assert!(states.transition("nyc", WorkerState::Running, WorkerState::Stalled));
        assert_eq!(states.get("nyc"), Some(WorkerState::Stalled));
        assert!(!states.transition("sf", WorkerState::Running, WorkerState::Stalled));
    }

    #[test]
    fn alive_excludes_terminated() {
        let states = RegionStates::new();
        states.set(&Arc::from("b"), WorkerState::Running);
        states.set(&Arc::from("a"), WorkerState::Stalled);
        states.set(&Arc::from("c"), WorkerState::Terminated);

        assert_eq!(states.alive(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn only_running_and_stalled_are_supervised() {
        assert!(WorkerState::Running.is_supervised());
        assert!(WorkerState::Stalled.is_supervised());
        assert!(!WorkerState::Starting.is_supervised());
        assert!(!WorkerState::Errored.is_supervised());
        assert!(!WorkerState::Terminated.is_supervised());
    }
}

//! # LivenessLoop: periodic per-region activity check.
//!
//! Every `interval` the loop drains the [`ActivityLedger`] and classifies each
//! region whose subscription is open:
//!
//! ```text
//! count = ledger.get_and_reset(region)
//!   count > 0 → state Running, RegionRunning { count }
//!   count = 0 → state Stalled, RegionStalled { streak }
//!                 └─► StallPolicy::should_restart(streak) → RestartRequested
//! ```
//!
//! Regions whose last attempt failed are `Errored` while they back off; each
//! tick reports them with `RegionErrored { streak }` but never asks for a
//! restart, since the actor is already retrying. Regions `Starting` (opening,
//! or backing off after a restart request) or `Terminated` are listed in the
//! tick report with their state, but their counters are not read and they are
//! never flagged.
//!
//! Health events go through the [`Bus`] and never block the loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    core::{ActivityLedger, RegionStates, Registry, WorkerState},
    events::{Bus, Event, EventKind},
    policies::StallPolicy,
};

/// One region's line in a tick report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HealthReport {
    /// Region id.
    pub region: Arc<str>,
    /// State after this tick.
    pub state: WorkerState,
    /// Items accepted since the previous tick (0 when not read).
    pub count: u64,
}

/// Periodic supervision of region activity.
pub struct LivenessLoop {
    interval: Duration,
    stall: StallPolicy,
    ledger: Arc<ActivityLedger>,
    states: Arc<RegionStates>,
    registry: Arc<Registry>,
    bus: Bus,
    streaks: HashMap<Arc<str>, u32>,
    errored: HashMap<Arc<str>, u32>,
}

impl LivenessLoop {
    /// Creates the loop; call [`run`](Self::run) to start ticking.
    pub fn new(
        interval: Duration,
        stall: StallPolicy,
        ledger: Arc<ActivityLedger>,
        states: Arc<RegionStates>,
        registry: Arc<Registry>,
        bus: Bus,
    ) -> Self {
        Self {
            interval,
            stall,
            ledger,
            states,
            registry,
            bus,
            streaks: HashMap::new(),
            errored: HashMap::new(),
        }
    }

    /// Ticks every `interval` until `token` is cancelled.
    ///
    /// The first check happens one full interval after start.
    pub async fn run(mut self, token: CancellationToken) {
        let start = time::Instant::now() + self.interval;
        let mut ticker = time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
        debug!("liveness loop stopped");
    }

    /// Runs one check over every known region.
    pub async fn tick(&mut self) -> Vec<HealthReport> {
        let mut reports = Vec::new();

        for (region, state) in self.states.snapshot() {
            if state == WorkerState::Errored {
                self.streaks.remove(&region);
                let streak = self.errored.entry(Arc::clone(&region)).or_insert(0);
                *streak += 1;
                self.bus.publish(
                    Event::new(EventKind::RegionErrored)
                        .with_region(Arc::clone(&region))
                        .with_state(WorkerState::Errored)
                        .with_count(0)
                        .with_attempt(*streak),
                );
                reports.push(HealthReport {
                    region,
                    state,
                    count: 0,
                });
                continue;
            }
            if state != WorkerState::Starting {
                self.errored.remove(&region);
            }
            if !state.is_supervised() {
                self.streaks.remove(&region);
                reports.push(HealthReport {
                    region,
                    state,
                    count: 0,
                });
                continue;
            }

            let count = self.ledger.get_and_reset(&region);
            let report = if count > 0 {
                self.streaks.remove(&region);
                self.states.transition(&region, WorkerState::Stalled, WorkerState::Running);
                self.bus.publish(
                    Event::new(EventKind::RegionRunning)
                        .with_region(Arc::clone(&region))
                        .with_state(WorkerState::Running)
                        .with_count(count),
                );
                HealthReport {
                    region,
                    state: WorkerState::Running,
                    count,
                }
            } else {
                self.states.transition(&region, WorkerState::Running, WorkerState::Stalled);
                let streak = self.streaks.entry(Arc::clone(&region)).or_insert(0);
                *streak += 1;
                let streak = *streak;
                self.bus.publish(
                    Event::new(EventKind::RegionStalled)
                        .with_region(Arc::clone(&region))
                        .with_state(WorkerState::Stalled)
                        .with_count(0)
                        .with_attempt(streak),
                );
                if self.stall.should_restart(streak) {
                    self.request_restart(&region, streak).await;
                }
                HealthReport {
                    region,
                    state: WorkerState::Stalled,
                    count: 0,
                }
            };
            reports.push(report);
        }
        reports
    }

    async fn request_restart(&self, region: &Arc<str>, streak: u32) {
        if self.registry.request_restart(region).await {
            self.bus.publish(
                Event::new(EventKind::RestartRequested)
                    .with_region(Arc::clone(region))
                    .with_attempt(streak),
            );
        } else {
            warn!(%region, "stalled region has no running worker to restart");
        }
    }
}

//! # StartupThrottle: staggered worker launches.
//!
//! Opening many subscriptions at once trips upstream rate limits, so workers
//! are launched one at a time with a fixed pause between consecutive launches:
//!
//! ```text
//! t0        start(R1)
//! t0 + T    start(R2)
//! t0 + 2T   start(R3)
//! ```
//!
//! A failed launch is reported (`LaunchFailed`) and never retried; the
//! throttle moves on to the next region. Cancelling the token stops further
//! launches, including during a pause.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::events::{Bus, Event, EventKind};
use crate::regions::Region;

/// Launch sequencer.
#[derive(Clone, Debug)]
pub struct StartupThrottle {
    interval: Duration,
    bus: Bus,
}

impl StartupThrottle {
    /// Creates a throttle pausing `interval` between launches.
    pub fn new(interval: Duration, bus: Bus) -> Self {
        Self { interval, bus }
    }

    /// Calls `start` once per region, in order, pausing between calls.
    ///
    /// Returns the number of successful launches.
    pub async fn launch_all<F, Fut>(
        &self,
        regions: &[Arc<Region>],
        token: &CancellationToken,
        mut start: F,
    ) -> usize
    where
        F: FnMut(Arc<Region>) -> Fut,
        Fut: Future<Output = Result<(), String>>,
    {
        let mut launched = 0;

        for (i, region) in regions.iter().enumerate() {
            if i > 0 {
                let pause = time::sleep(self.interval);
                select! {
                    _ = pause => {}
                    _ = token.cancelled() => break,
                }
            }
            if token.is_cancelled() {
                break;
            }

            match start(Arc::clone(region)).await {
                Ok(()) => {
                    launched += 1;
                    self.bus
                        .publish(Event::new(EventKind::RegionLaunched).with_region(Arc::clone(&region.id)));
                }
                Err(reason) => {
                    self.bus.publish(
                        Event::new(EventKind::LaunchFailed)
                            .with_region(Arc::clone(&region.id))
                            .with_reason(reason),
                    );
                }
            }
        }
        launched
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::time::Instant;

    use super::*;
    use crate::testing;

    fn regions(ids: &[&str]) -> Vec<Arc<Region>> {
        ids.iter().map(|id| Arc::new(testing::region(id))).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn launches_are_spaced_by_the_interval() {
        let throttle = StartupThrottle::new(Duration::from_secs(30), Bus::new(16));
        let calls: Arc<Mutex<Vec<(String, Instant)>>> = Arc::default();
        let t0 = Instant::now();

        let n = throttle
            .launch_all(&regions(&["R1", "R2", "R3"]), &CancellationToken::new(), |r| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.lock().unwrap().push((r.id.to_string(), Instant::now()));
                    Ok(())
                }
            })
            .await;

        assert_eq!(n, 3);
        let calls = calls.lock().unwrap();
        let offsets: Vec<(&str, u64)> = calls
            .iter()
            .map(|(id, at)| (id.as_str(), (*at - t0).as_secs()))
            .collect();
        assert_eq!(offsets, [("R1", 0), ("R2", 30), ("R3", 60)]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_launch_is_reported_and_skipped() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let throttle = StartupThrottle::new(Duration::from_secs(1), bus);

        let n = throttle
            .launch_all(&regions(&["a", "b", "c"]), &CancellationToken::new(), |r| async move {
                if &*r.id == "b" {
                    Err("duplicate region".to_string())
                } else {
                    Ok(())
                }
            })
            .await;
        assert_eq!(n, 2);

        let events: Vec<(EventKind, String)> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| (e.kind, e.region.as_deref().unwrap_or_default().to_string()))
            .collect();
        assert_eq!(
            events,
            [
                (EventKind::RegionLaunched, "a".to_string()),
                (EventKind::LaunchFailed, "b".to_string()),
                (EventKind::RegionLaunched, "c".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_pending_launches() {
        let throttle = StartupThrottle::new(Duration::from_secs(30), Bus::new(16));
        let token = CancellationToken::new();
        let stopper = {
            let token = token.clone();
            tokio::spawn(async move {
                time::sleep(Duration::from_secs(45)).await;
                token.cancel();
            })
        };

        let n = throttle
            .launch_all(&regions(&["a", "b", "c", "d"]), &token, |_| async { Ok(()) })
            .await;
        stopper.await.unwrap();
        assert_eq!(n, 2);
    }
}

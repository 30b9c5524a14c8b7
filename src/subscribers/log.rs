//! # LogWriter: structured event logging.
//!
//! Turns every [`Event`] into one `tracing` record with structured fields.
//! Health reports carry `region`, `status` and `count`, which is the
//! per-interval throughput line operators watch:
//!
//! ```text
//! INFO region=nyc status=running count=412 region throughput
//! WARN region=sf status=stalled count=0 stalled_for=2 region stalled
//! WARN region=sf attempt=3 delay_ms=4000 reason="stream closed by upstream" resubscribe scheduled
//! ```
//!
//! Levels: health and lifecycle at `info`/`debug`, stalls and failures at
//! `warn`, subscriber faults and grace overruns at `error`.

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Logs events through `tracing`.
#[derive(Debug, Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let region = e.region.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        let status = e.state.map(|s| s.as_label()).unwrap_or("-");

        match e.kind {
            EventKind::RegionRunning => {
                info!(region, status, count = e.count.unwrap_or(0), "region throughput");
            }
            EventKind::RegionStalled => {
                warn!(
                    region,
                    status,
                    count = 0u64,
                    stalled_for = e.attempt.unwrap_or(1),
                    "region stalled"
                );
            }
            EventKind::RegionErrored => {
                warn!(
                    region,
                    status,
                    count = 0u64,
                    stalled_for = e.attempt.unwrap_or(1),
                    "region failing"
                );
            }
            EventKind::RestartRequested => {
                warn!(region, stalled_for = e.attempt.unwrap_or(1), "restart requested");
            }
            EventKind::RegionLaunched => {
                info!(region, "worker launched");
            }
            EventKind::LaunchFailed => {
                error!(region, reason, "worker launch failed");
            }
            EventKind::WorkerStarting => {
                debug!(region, attempt = e.attempt.unwrap_or(0), "subscribing");
            }
            EventKind::SubscriptionOpened => {
                info!(region, attempt = e.attempt.unwrap_or(0), "subscription open");
            }
            EventKind::WorkerFailed => {
                warn!(region, attempt = e.attempt.unwrap_or(0), reason, "subscription failed");
            }
            EventKind::WorkerStopped => {
                debug!(region, attempt = e.attempt.unwrap_or(0), reason, "subscription closed");
            }
            EventKind::BackoffScheduled => {
                warn!(
                    region,
                    attempt = e.attempt.unwrap_or(0),
                    delay_ms = e.delay_ms.unwrap_or(0),
                    reason,
                    "resubscribe scheduled"
                );
            }
            EventKind::WorkerTerminated => {
                warn!(region, attempt = e.attempt.unwrap_or(0), reason, "worker terminated");
            }
            EventKind::ControlMessage => {
                info!(region, notice = reason, "upstream notice");
            }
            EventKind::PublishFailed => {
                warn!(region, dropped = e.count.unwrap_or(0), reason, "record dropped");
            }
            EventKind::ShutdownRequested => {
                info!("shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                info!("all workers stopped within grace");
            }
            EventKind::GraceExceeded => {
                error!(stuck = reason, "grace period exceeded");
            }
            EventKind::SubscriberPanicked => {
                error!(subscriber = region, info = reason, "subscriber panicked");
            }
            EventKind::SubscriberOverflow => {
                warn!(subscriber = region, reason, "subscriber dropped event");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }

    fn queue_capacity(&self) -> usize {
        4096
    }
}

//! # Runtime events emitted by the orchestrator, workers and liveness loop.
//!
//! [`EventKind`] classifies events in five groups:
//! - **Startup**: staggered worker launches
//! - **Worker lifecycle**: attempts, subscription state, backoff, terminal exit
//! - **Stream**: control messages and publish failures seen by a worker
//! - **Health**: per-region liveness reports from the supervision loop
//! - **Runtime**: shutdown and subscriber delivery problems
//!
//! [`Event`] carries optional metadata (region, attempt, count, delay, reason,
//! state) depending on the kind.
//!
//! ## Ordering guarantees
//! Each event has a globally unique, monotonically increasing `seq`. Use it to
//! restore the exact order when events reach subscribers through separate queues.
//!
//! ## Example
//! ```rust
//! use geoingest::{Event, EventKind, WorkerState};
//!
//! let ev = Event::new(EventKind::RegionRunning)
//!     .with_region("nyc")
//!     .with_state(WorkerState::Running)
//!     .with_count(5);
//!
//! assert_eq!(ev.region.as_deref(), Some("nyc"));
//! assert_eq!(ev.count, Some(5));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::core::WorkerState;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Startup ===
    /// The throttle launched a region's worker.
    ///
    /// Sets: `region`
    RegionLaunched,

    /// The throttle could not launch a region's worker; it moves on.
    ///
    /// Sets: `region`, `reason`
    LaunchFailed,

    // === Worker lifecycle ===
    /// A worker attempt is starting (subscription about to open).
    ///
    /// Sets: `region`, `attempt` (1-based)
    WorkerStarting,

    /// The upstream subscription opened; the region is Running.
    ///
    /// Sets: `region`, `attempt`
    SubscriptionOpened,

    /// A worker attempt failed (open failure, dropped stream, escalated publish error).
    ///
    /// Sets: `region`, `attempt`, `reason`
    WorkerFailed,

    /// A worker attempt ended cleanly (cancellation or restart request).
    ///
    /// Sets: `region`, `attempt`
    WorkerStopped,

    /// Next attempt scheduled after a failure or a restart request.
    ///
    /// Sets: `region`, `attempt` (previous), `delay_ms`, `reason`
    BackoffScheduled,

    /// The worker will not run again (restart policy exhausted, fatal error or shutdown).
    ///
    /// Sets: `region`, `attempt`, `reason`
    WorkerTerminated,

    // === Stream ===
    /// Out-of-band control message from the upstream (stall warning, limit notice, ...).
    ///
    /// Sets: `region`, `reason` (rendered message)
    ControlMessage,

    /// A record could not be published and was dropped (after retries, if any).
    ///
    /// Sets: `region`, `reason`, `count` (records dropped by this worker so far)
    PublishFailed,

    // === Health ===
    /// Region produced items during the last supervision interval.
    ///
    /// Sets: `region`, `state`, `count`
    RegionRunning,

    /// Region produced nothing during the last supervision interval.
    ///
    /// Sets: `region`, `state`, `count` (= 0), `attempt` (consecutive stalled ticks)
    RegionStalled,

    /// Region's last attempt failed and it is waiting to reopen.
    ///
    /// Sets: `region`, `state`, `count` (= 0), `attempt` (consecutive errored ticks)
    RegionErrored,

    /// The stall policy asked the region's worker to reopen its subscription.
    ///
    /// Sets: `region`, `attempt` (consecutive stalled ticks)
    RestartRequested,

    // === Runtime ===
    /// Shutdown requested (OS signal or caller).
    ShutdownRequested,

    /// All workers and the supervision loop stopped within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some workers did not stop in time.
    ///
    /// Sets: `reason` (stuck regions)
    GraceExceeded,

    /// Subscriber panicked while handling an event.
    ///
    /// Sets: `region` (subscriber name), `reason` (panic message)
    SubscriberPanicked,

    /// Subscriber queue dropped an event.
    ///
    /// Sets: `region` (subscriber name), `reason` ("full" / "closed")
    SubscriberOverflow,
}

impl EventKind {
    /// Returns a short stable label (kebab-case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::RegionLaunched => "region-launched",
            EventKind::LaunchFailed => "launch-failed",
            EventKind::WorkerStarting => "worker-starting",
            EventKind::SubscriptionOpened => "subscription-opened",
            EventKind::WorkerFailed => "worker-failed",
            EventKind::WorkerStopped => "worker-stopped",
            EventKind::BackoffScheduled => "backoff-scheduled",
            EventKind::WorkerTerminated => "worker-terminated",
            EventKind::ControlMessage => "control-message",
            EventKind::PublishFailed => "publish-failed",
            EventKind::RegionRunning => "region-running",
            EventKind::RegionStalled => "region-stalled",
            EventKind::RegionErrored => "region-errored",
            EventKind::RestartRequested => "restart-requested",
            EventKind::ShutdownRequested => "shutdown-requested",
            EventKind::AllStoppedWithin => "all-stopped-within-grace",
            EventKind::GraceExceeded => "grace-exceeded",
            EventKind::SubscriberPanicked => "subscriber-panicked",
            EventKind::SubscriberOverflow => "subscriber-overflow",
        }
    }
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Region id (or subscriber name for subscriber events).
    pub region: Option<Arc<str>>,
    /// Attempt number or consecutive-stall count.
    pub attempt: Option<u32>,
    /// Item count (health reports, dropped records).
    pub count: Option<u64>,
    /// Backoff delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
    /// Region state after this event.
    pub state: Option<WorkerState>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            region: None,
            attempt: None,
            count: None,
            delay_ms: None,
            reason: None,
            state: None,
        }
    }

    /// Attaches a region id.
    #[inline]
    pub fn with_region(mut self, region: impl Into<Arc<str>>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Attaches an attempt number.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches an item count.
    #[inline]
    pub fn with_count(mut self, n: u64) -> Self {
        self.count = Some(n);
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the region state.
    #[inline]
    pub fn with_state(mut self, state: WorkerState) -> Self {
        self.state = Some(state);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_region(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_region(subscriber)
            .with_reason(info)
    }

    /// True for the per-interval liveness reports.
    #[inline]
    pub fn is_health(&self) -> bool {
        matches!(
            self.kind,
            EventKind::RegionRunning | EventKind::RegionStalled | EventKind::RegionErrored
        )
    }
}

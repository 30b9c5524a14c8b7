//! # WorkerActor: supervised wrapper around one [`StreamWorker`].
//!
//! Runs attempts of one region's worker with policies:
//! - restarts per [`RestartPolicy`],
//! - delays per [`BackoffPolicy`],
//! - out-of-band restart requests from the liveness loop,
//! - cooperative cancellation via [`CancellationToken`].
//!
//! ## Event flow
//! ```text
//! WorkerStarting → [attempt] → SubscriptionOpened → ... → WorkerFailed    (error)
//!                                                       → WorkerStopped   (shutdown / restart request)
//!
//! If another attempt is scheduled:
//!   → BackoffScheduled → [sleep] → WorkerStarting (attempt + 1)
//!
//! Otherwise:
//!   → WorkerTerminated
//! ```
//!
//! ## Architecture
//! ```text
//! loop {
//!   ├─► states[region] = Starting, publish WorkerStarting
//!   ├─► select! {
//!   │     worker.run(attempt, child_token)  → Err(Canceled) | Err(Fail) | Err(Fatal)
//!   │     restart_rx.recv()                 → drop attempt (closes subscription)
//!   │   }
//!   ├─► delivered anything? → failures = 0, backoff_step = 0
//!   ├─► Canceled            → WorkerStopped, exit (shutdown)
//!   ├─► Fatal               → WorkerFailed, exit
//!   ├─► Fail                → WorkerFailed, failures += 1, RestartPolicy decides,
//!   │                         states[region] = Errored
//!   ├─► restart request     → WorkerStopped, states[region] = Starting
//!   ├─► backoff_step += 1
//!   └─► BackoffScheduled, sleep(backoff.delay(backoff_step))  (cancellable)
//! }
//! states[region] = Terminated, publish WorkerTerminated
//! ```
//!
//! ## Rules
//! - Attempts run **sequentially** within one actor.
//! - The attempt counter is monotonic over the actor's lifetime.
//! - Consecutive failures reset once an attempt delivers at least one item,
//!   so a region that keeps stalling or failing backs off further each time.
//! - Only failed attempts count toward `max_retries`; restart requests only
//!   lengthen the backoff.
//! - Restart requests are refused while no attempt is running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::{select, sync::mpsc, time};
use tokio_util::sync::CancellationToken;

use crate::{
    core::{worker::StreamWorker, WorkerState},
    error::WorkerError,
    events::{Event, EventKind},
    policies::{BackoffPolicy, RestartPolicy},
};

/// Policies applied by a [`WorkerActor`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ActorParams {
    /// When to reopen after a failed attempt.
    pub restart: RestartPolicy,
    /// How long to wait before reopening.
    pub backoff: BackoffPolicy,
}

/// Why an actor stopped for good.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActorExit {
    /// Runtime token cancelled.
    Shutdown,
    /// Restart policy forbade another attempt.
    Exhausted,
    /// The worker reported a non-recoverable error.
    Fatal(String),
}

impl ActorExit {
    fn reason(&self) -> String {
        match self {
            ActorExit::Shutdown => "shutdown".into(),
            ActorExit::Exhausted => "restart policy exhausted".into(),
            ActorExit::Fatal(e) => e.clone(),
        }
    }
}

enum Outcome {
    Finished(Result<(), WorkerError>),
    RestartRequested,
}

/// Sending side of an actor's restart channel.
#[derive(Clone, Debug)]
pub struct RestartHandle {
    tx: mpsc::Sender<()>,
    attempting: Arc<AtomicBool>,
}

impl RestartHandle {
    /// Asks the actor to drop its current attempt and reopen.
    ///
    /// Returns false when no attempt is running (backing off or exited).
    /// A request already pending counts as delivered.
    pub fn request(&self) -> bool {
        if !self.attempting.load(Ordering::Acquire) {
            return false;
        }
        match self.tx.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => true,
            Err(mpsc::error::TrySendError::Closed(())) => false,
        }
    }
}

/// Supervises one region's [`StreamWorker`].
pub struct WorkerActor {
    worker: StreamWorker,
    params: ActorParams,
    restart_rx: mpsc::Receiver<()>,
    attempting: Arc<AtomicBool>,
}

impl WorkerActor {
    /// Creates an actor and the handle used to request restarts.
    pub fn new(worker: StreamWorker, params: ActorParams) -> (Self, RestartHandle) {
        let (tx, rx) = mpsc::channel(1);
        let attempting = Arc::new(AtomicBool::new(false));
        (
            Self {
                worker,
                params,
                restart_rx: rx,
                attempting: Arc::clone(&attempting),
            },
            RestartHandle { tx, attempting },
        )
    }

    /// Runs attempts until shutdown, restart exhaustion or a fatal error.
    pub async fn run(mut self, runtime_token: CancellationToken) -> ActorExit {
        let region = Arc::clone(&self.worker.region().id);
        let ctx = self.worker.context().clone();
        let mut attempt: u32 = 0;
        let mut failures: u32 = 0;
        let mut backoff_step: u32 = 0;

        let exit = loop {
            if runtime_token.is_cancelled() {
                break ActorExit::Shutdown;
            }
            while self.restart_rx.try_recv().is_ok() {}

            attempt += 1;
            ctx.states.set(&region, WorkerState::Starting);
            ctx.bus.publish(
                Event::new(EventKind::WorkerStarting)
                    .with_region(Arc::clone(&region))
                    .with_attempt(attempt)
                    .with_state(WorkerState::Starting),
            );

            let before = self.worker.accepted();
            let attempt_token = runtime_token.child_token();
            self.attempting.store(true, Ordering::Release);
            let outcome = select! {
                res = self.worker.run(attempt, &attempt_token) => Outcome::Finished(res),
                Some(()) = self.restart_rx.recv() => Outcome::RestartRequested,
            };
            self.attempting.store(false, Ordering::Release);
            attempt_token.cancel();
            if self.worker.accepted() > before {
                failures = 0;
                backoff_step = 0;
            }

            let reason = match outcome {
                Outcome::Finished(Ok(())) | Outcome::Finished(Err(WorkerError::Canceled)) => {
                    self.publish_stopped(&region, attempt, "shutdown");
                    break ActorExit::Shutdown;
                }
                Outcome::Finished(Err(WorkerError::Fatal(e))) => {
                    self.publish_failed(&region, attempt, &e);
                    break ActorExit::Fatal(e);
                }
                Outcome::Finished(Err(e)) => {
                    let e = e.to_string();
                    self.publish_failed(&region, attempt, &e);
                    failures = failures.saturating_add(1);
                    if !self.params.restart.allows_retry(failures) {
                        break ActorExit::Exhausted;
                    }
                    ctx.states.set(&region, WorkerState::Errored);
                    e
                }
                Outcome::RestartRequested => {
                    self.publish_stopped(&region, attempt, "restart requested");
                    ctx.states.set(&region, WorkerState::Starting);
                    "restart requested".to_string()
                }
            };

            backoff_step = backoff_step.saturating_add(1);
            let delay = self.params.backoff.delay(backoff_step);
            ctx.bus.publish(
                Event::new(EventKind::BackoffScheduled)
                    .with_region(Arc::clone(&region))
                    .with_attempt(attempt)
                    .with_delay(delay)
                    .with_reason(reason),
            );
            if !sleep_or_cancel(delay, &runtime_token).await {
                break ActorExit::Shutdown;
            }
        };

        ctx.ledger.remove(&region);
        ctx.states.set(&region, WorkerState::Terminated);
        ctx.bus.publish(
            Event::new(EventKind::WorkerTerminated)
                .with_region(region)
                .with_attempt(attempt)
                .with_state(WorkerState::Terminated)
                .with_reason(exit.reason()),
        );
        exit
    }

    fn publish_stopped(&self, region: &Arc<str>, attempt: u32, reason: &str) {
        self.worker.context().bus.publish(
            Event::new(EventKind::WorkerStopped)
                .with_region(Arc::clone(region))
                .with_attempt(attempt)
                .with_reason(reason),
        );
    }

    fn publish_failed(&self, region: &Arc<str>, attempt: u32, err: &str) {
        self.worker.context().bus.publish(
            Event::new(EventKind::WorkerFailed)
                .with_region(Arc::clone(region))
                .with_attempt(attempt)
                .with_reason(err),
        );
    }
}

/// Sleeps for `delay`; returns false if `token` was cancelled first.
async fn sleep_or_cancel(delay: Duration, token: &CancellationToken) -> bool {
    let sleep = time::sleep(delay);
    tokio::pin!(sleep);
    select! {
        _ = &mut sleep => true,
        _ = token.cancelled() => false,
    }
}

//! # Orchestrator: composition root of the ingestion runtime.
//!
//! The [`Orchestrator`] owns the event bus, the subscriber listener, the
//! activity ledger, the region state table and the actor registry. It starts
//! one worker actor per region through the [`StartupThrottle`], runs the
//! [`LivenessLoop`], and performs a bounded-wait shutdown.
//!
//! ## High-level architecture
//! ```text
//! Inputs to run():
//!   Vec<Region> ──► Orchestrator::run(regions)
//!
//! Tasks:
//!   listener   : Bus.subscribe() ─► SubscriberSet::emit(&Event)     (built with the orchestrator)
//!   liveness   : LivenessLoop::run(runtime_token.child_token())
//!   launcher   : StartupThrottle::launch_all(regions) ─► Registry::spawn(worker)
//!                                                           └──► WorkerActor::run(child token)
//!
//! Shutdown path:
//!   ShutdownSignal::recv() | caller future
//!             └─► Bus.publish(ShutdownRequested)
//!             └─► runtime_token.cancel()   → launcher, liveness and every actor
//!             └─► wait_all_with_grace(cfg.grace):
//!                    ├─ all joined        → Bus.publish(AllStoppedWithin)
//!                    └─ timeout exceeded  → Bus.publish(GraceExceeded)
//!                                           RegionStates::alive() for stuck regions
//!             └─► Publisher::flush(cfg.flush_timeout)
//!             └─► listener drains the bus and shuts the subscriber set down
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use geoingest::{
//!     Config, HttpUpstream, LogWriter, OrchestratorBuilder, Subscribe,
//!     publish::{self, Backend},
//!     regions::load_regions,
//! };
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let cfg = Config::default();
//! let regions = load_regions("regions.json".as_ref())?;
//! let publisher = publish::connect(&Backend::Stdout).await?;
//! let upstream = HttpUpstream::new(
//!     "https://stream.example.com/1.1/statuses/filter.json",
//!     "bearer-token",
//!     std::time::Duration::from_secs(10),
//! )?;
//!
//! let orch = OrchestratorBuilder::new(cfg, Arc::new(upstream), publisher)
//!     .with_subscribers(vec![Arc::new(LogWriter::new()) as Arc<dyn Subscribe>])
//!     .build();
//! orch.run(regions).await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    config::Config,
    core::{
        shutdown::ShutdownSignal, ActivityLedger, LivenessLoop, RegionStates, Registry,
        StartupThrottle, StreamWorker, WorkerContext,
    },
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    publish::Publisher,
    regions::Region,
    subscribers::SubscriberSet,
    upstream::Upstream,
};

/// Runs region workers, the liveness loop and graceful shutdown.
///
/// One-shot: [`run`](Self::run) consumes the orchestrator.
pub struct Orchestrator {
    cfg: Config,
    bus: Bus,
    ledger: Arc<ActivityLedger>,
    states: Arc<RegionStates>,
    registry: Arc<Registry>,
    runtime_token: CancellationToken,
    upstream: Arc<dyn Upstream>,
    publisher: Arc<dyn Publisher>,
    listener: JoinHandle<()>,
    listener_stop: CancellationToken,
}

impl Orchestrator {
    pub(super) fn new_internal(
        cfg: Config,
        bus: Bus,
        subs: SubscriberSet,
        upstream: Arc<dyn Upstream>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        let runtime_token = CancellationToken::new();
        let listener_stop = CancellationToken::new();
        let listener = spawn_listener(&bus, subs, listener_stop.clone());

        Self {
            cfg,
            bus,
            ledger: Arc::new(ActivityLedger::new()),
            states: Arc::new(RegionStates::new()),
            registry: Registry::new(runtime_token.clone()),
            runtime_token,
            upstream,
            publisher,
            listener,
            listener_stop,
        }
    }

    /// Event bus shared with every component.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Per-region state table.
    pub fn states(&self) -> Arc<RegionStates> {
        Arc::clone(&self.states)
    }

    /// Per-region activity counters.
    pub fn ledger(&self) -> Arc<ActivityLedger> {
        Arc::clone(&self.ledger)
    }

    /// Runs `regions` until a termination signal arrives.
    pub async fn run(self, regions: Vec<Region>) -> Result<(), RuntimeError> {
        let signal = ShutdownSignal::install()?;
        self.run_until(regions, async move {
            let name = signal.recv().await;
            info!(signal = name, "termination signal received");
        })
        .await
    }

    /// Runs `regions` until `shutdown` completes, then stops everything
    /// within the grace period.
    pub async fn run_until<F>(self, regions: Vec<Region>, shutdown: F) -> Result<(), RuntimeError>
    where
        F: Future<Output = ()> + Send,
    {
        let regions: Vec<Arc<Region>> = regions.into_iter().map(Arc::new).collect();
        info!(
            regions = regions.len(),
            topic = %self.cfg.outbound.topic,
            publisher = self.publisher.name(),
            "starting ingestion"
        );

        let liveness = self.spawn_liveness();
        let launcher = self.spawn_launcher(regions);

        shutdown.await;
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.runtime_token.cancel();

        let res = self.wait_all_with_grace(launcher, liveness).await;

        if let Err(e) = self.publisher.flush(self.cfg.flush_timeout).await {
            warn!(error = %e, label = e.as_label(), "publisher flush failed");
        }

        self.listener_stop.cancel();
        if self.listener.await.is_err() {
            warn!("event listener panicked");
        }
        res
    }

    fn context(&self) -> WorkerContext {
        WorkerContext {
            bus: self.bus.clone(),
            ledger: Arc::clone(&self.ledger),
            states: Arc::clone(&self.states),
            upstream: Arc::clone(&self.upstream),
            publisher: Arc::clone(&self.publisher),
            outbound: Arc::new(self.cfg.outbound.clone()),
            publish_failure: self.cfg.publish_failure,
        }
    }

    fn spawn_liveness(&self) -> JoinHandle<()> {
        let lp = LivenessLoop::new(
            self.cfg.supervise_interval,
            self.cfg.stall,
            Arc::clone(&self.ledger),
            Arc::clone(&self.states),
            Arc::clone(&self.registry),
            self.bus.clone(),
        );
        tokio::spawn(lp.run(self.runtime_token.child_token()))
    }

    /// Drives the throttle in its own task so shutdown never waits for
    /// pending launches.
    fn spawn_launcher(&self, regions: Vec<Arc<Region>>) -> JoinHandle<usize> {
        let throttle = StartupThrottle::new(self.cfg.launch_interval, self.bus.clone());
        let registry = Arc::clone(&self.registry);
        let ctx = self.context();
        let params = self.cfg.actor_params();
        let token = self.runtime_token.child_token();

        tokio::spawn(async move {
            throttle
                .launch_all(&regions, &token, |region| {
                    let worker = StreamWorker::new(region, ctx.clone());
                    let registry = Arc::clone(&registry);
                    async move { registry.spawn(worker, params).await }
                })
                .await
        })
    }

    /// Waits for the launcher, the liveness loop and every actor to finish
    /// within the configured grace period.
    async fn wait_all_with_grace(
        &self,
        launcher: JoinHandle<usize>,
        liveness: JoinHandle<()>,
    ) -> Result<(), RuntimeError> {
        let grace = self.cfg.grace;
        let done = async {
            if let Ok(n) = launcher.await {
                info!(launched = n, "launcher stopped");
            }
            if liveness.await.is_err() {
                warn!("liveness loop panicked");
            }
            self.registry.join_all().await
        };

        match time::timeout(grace, done).await {
            Ok(exits) => {
                for (region, exit) in exits {
                    if exit.is_none() {
                        warn!(%region, "worker task panicked");
                    }
                }
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                let stuck = self.states.alive();
                self.bus
                    .publish(Event::new(EventKind::GraceExceeded).with_reason(stuck.join(",")));
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }
}

/// Forwards bus events to the subscriber set until `stop`, then drains what
/// is left and waits for every subscriber to finish.
fn spawn_listener(bus: &Bus, subs: SubscriberSet, stop: CancellationToken) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            select! {
                biased;
                ev = rx.recv() => match ev {
                    Ok(ev) => subs.emit(&ev),
                    Err(RecvError::Lagged(n)) => warn!(skipped = n, "event listener lagged"),
                    Err(RecvError::Closed) => break,
                },
                _ = stop.cancelled() => break,
            }
        }
        while let Ok(ev) = rx.try_recv() {
            subs.emit(&ev);
        }
        subs.shutdown().await;
    })
}

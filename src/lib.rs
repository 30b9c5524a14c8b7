//! # geoingest
//!
//! **geoingest** ingests a continuous feed of geotagged posts by opening one
//! filtered subscription per geographic region and republishing every
//! accepted post onto a message bus topic, while checking that each region's
//! subscription keeps producing data.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   regions.json ──► load_regions() ──► Vec<Region>
//!                                           │
//!                                           ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Orchestrator (composition root)                                  │
//! │  - Bus (broadcast events)                                         │
//! │  - ActivityLedger (per-region atomic counters)                    │
//! │  - RegionStates (per-region WorkerState)                          │
//! │  - Registry (actor handles by region id)                          │
//! │  - SubscriberSet (fans out to subscribers)                        │
//! └──────┬───────────────────────────┬───────────────────────┬────────┘
//!        │ StartupThrottle           │ LivenessLoop          │ listener
//!        │ (one launch per interval) │ (every interval)      │
//!        ▼                           ▼                       ▼
//!   ┌──────────────┐  ┌──────────────┐   get_and_reset()   SubscriberSet
//!   │ WorkerActor  │  │ WorkerActor  │   Running/Stalled    ├─► LogWriter
//!   │ StreamWorker │  │ StreamWorker │   StallPolicy        └─► custom
//!   └──────┬───────┘  └──────┬───────┘
//!          │ Upstream::open(region) → Subscription
//!          │ per post: ledger.increment() → Publisher::publish(topic, key, payload)
//!          ▼
//!   Kafka / Redis stream / stdout / memory
//! ```
//!
//! ### Lifecycle of a region
//! ```text
//! Starting ──open ok──► Running ──idle interval──► Stalled ──activity──► Running
//!    ▲                     │                          │
//!    └──backoff◄──failure──┘◄──────restart request────┘
//! any ──shutdown / restart policy exhausted / fatal──► Terminated
//! ```
//!
//! ## Features
//! | Area              | Description                                            | Key types / traits                          |
//! |-------------------|--------------------------------------------------------|---------------------------------------------|
//! | **Supervision**   | Per-region actors, staggered launch, stall detection.  | [`Orchestrator`], [`LivenessLoop`]          |
//! | **Policies**      | Restart, backoff, stall and publish failure handling.  | [`RestartPolicy`], [`StallPolicy`]          |
//! | **Publishing**    | Interchangeable bus backends.                          | [`Publisher`], [`publish::Backend`]         |
//! | **Upstream**      | Filter-stream subscriptions per bounding box.          | [`Upstream`], [`HttpUpstream`]              |
//! | **Events**        | Lifecycle and health events for logging or alerting.   | [`Event`], [`Subscribe`], [`LogWriter`]     |
//! | **Errors**        | Typed errors with stable labels.                       | [`ConfigError`], [`RuntimeError`]           |
//!
//! ## Optional features
//! - `redis` (default): Redis stream publisher.
//! - `kafka`: Kafka publisher (builds librdkafka).
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use geoingest::{
//!     publish::MemoryPublisher, regions::parse_regions, Config, LogWriter,
//!     OrchestratorBuilder, Subscribe, Upstream, Region, Subscription, SubscriptionError,
//! };
//!
//! struct Offline;
//!
//! #[async_trait::async_trait]
//! impl Upstream for Offline {
//!     async fn open(&self, _region: &Region) -> Result<Subscription, SubscriptionError> {
//!         Err(SubscriptionError::Connect("offline".into()))
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let regions = parse_regions(
//!         br#"[{"id":"nyc","west":-74.26,"south":40.49,"east":-73.7,"north":40.92}]"#,
//!         std::path::Path::new("inline"),
//!     )?;
//!     let cfg = Config { grace: Duration::from_secs(1), ..Config::default() };
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!
//!     let orch = OrchestratorBuilder::new(cfg, Arc::new(Offline), Arc::new(MemoryPublisher::new()))
//!         .with_subscribers(subs)
//!         .build();
//!     orch.run_until(regions, tokio::time::sleep(Duration::from_millis(50))).await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod policies;

pub mod config;
pub mod publish;
pub mod regions;
pub mod subscribers;
pub mod telemetry;
pub mod upstream;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use config::{Args, Config};
pub use core::{
    ActivityCounter, ActivityLedger, ActorExit, ActorParams, HealthReport, LivenessLoop,
    Orchestrator, OrchestratorBuilder, RegionStates, Registry, RestartHandle, ShutdownSignal,
    StartupThrottle, StreamWorker, WorkerActor, WorkerContext, WorkerState,
};
pub use error::{ConfigError, PublishError, RuntimeError, SubscriptionError, WorkerError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy, PublishFailurePolicy, RestartPolicy, StallPolicy};
pub use publish::{Outbound, PartitionKey, PayloadFormat, PublishRecord, Publisher};
pub use regions::{BoundingBox, Region};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use upstream::{ControlMessage, HttpUpstream, Post, StreamMessage, Subscription, Upstream};

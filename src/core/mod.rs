//! Runtime core: region workers, supervision and lifecycle.
//!
//! Internal modules:
//! - [`ledger`]: per-region activity counters;
//! - [`states`]: per-region [`WorkerState`] table;
//! - [`worker`]: one subscription attempt for one region;
//! - [`actor`]: restart/backoff loop around a worker;
//! - [`registry`]: actor handles by region id;
//! - [`throttle`]: staggered worker launches;
//! - [`liveness`]: periodic stall detection;
//! - [`orchestrator`]: composition root and graceful shutdown;
//! - [`shutdown`]: termination signal handling.

mod actor;
mod builder;
mod ledger;
mod liveness;
mod orchestrator;
mod registry;
mod shutdown;
mod states;
mod throttle;
mod worker;

pub use actor::{ActorExit, ActorParams, RestartHandle, WorkerActor};
pub use builder::OrchestratorBuilder;
pub use ledger::{ActivityCounter, ActivityLedger};
pub use liveness::{HealthReport, LivenessLoop};
pub use orchestrator::Orchestrator;
pub use registry::Registry;
pub use shutdown::ShutdownSignal;
pub use states::{RegionStates, WorkerState};
pub use throttle::StartupThrottle;
pub use worker::{StreamWorker, WorkerContext};

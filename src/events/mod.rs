//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Orchestrator`, `StartupThrottle`, `WorkerActor`, `StreamWorker`,
//!   `LivenessLoop`, `SubscriberSet` workers (overflow/panic).
//! - **Consumer**: the orchestrator's listener, which fans out to `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};

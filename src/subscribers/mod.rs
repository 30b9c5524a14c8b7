//! # Event subscribers.
//!
//! Runtime events reach subscribers through the orchestrator's listener:
//!
//! ```text
//! Worker / Liveness / Throttle ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                                      ┌──────┴──────┐
//!                                                                      ▼             ▼
//!                                                                  LogWriter      custom
//! ```
//!
//! - [`Subscribe`]: the extension trait;
//! - [`SubscriberSet`]: per-subscriber bounded queues with panic isolation;
//! - [`LogWriter`]: structured `tracing` output for every event.

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;

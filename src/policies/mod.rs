//! Supervision policies.
//!
//! This module groups the knobs that control **if/when** a region worker is
//! restarted, **how long** it waits between attempts, what a **stall** leads
//! to, and how a **failed publish** is handled.
//!
//! ## Contents
//! - [`RestartPolicy`] reopen after failure (never / on-failure with optional cap)
//! - [`BackoffPolicy`] how resubscribe delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`] randomization to avoid synchronized reconnects
//! - [`StallPolicy`] alert-only vs restart after N stalled intervals
//! - [`PublishFailurePolicy`] drop / retry-then-drop / escalate
//!
//! ## Quick wiring
//! ```text
//! Config { restart, backoff, stall, publish_failure, .. }
//!      ├─► WorkerActor: restart.allows_retry(n), backoff.delay(n)
//!      ├─► LivenessLoop: stall.should_restart(streak) → restart request
//!      └─► StreamWorker: publish_failure on each PublishError
//! ```

mod backoff;
mod jitter;
mod publish;
mod restart;
mod stall;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use publish::PublishFailurePolicy;
pub use restart::RestartPolicy;
pub use stall::StallPolicy;

//! # Subscriber trait.
//!
//! `Subscribe` is the extension point for consumers of runtime events: health
//! reports, worker lifecycle, publish failures. Each subscriber is driven by a
//! dedicated worker loop fed by a bounded queue owned by the
//! [`SubscriberSet`](crate::subscribers::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching): they never block the
//!   workers, the liveness loop or other subscribers.
//! - Each subscriber declares its queue capacity via
//!   [`Subscribe::queue_capacity`]. On overflow the event is dropped for that
//!   subscriber and a `SubscriberOverflow` event is published.
//!
//! ## Example
//! ```rust
//! use geoingest::{Event, EventKind, Subscribe};
//!
//! struct StallAlerts;
//!
//! #[async_trait::async_trait]
//! impl Subscribe for StallAlerts {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::RegionStalled {
//!             // page someone
//!         }
//!     }
//!     fn name(&self) -> &'static str { "stall-alerts" }
//!     fn queue_capacity(&self) -> usize { 64 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles a single event.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow and panic reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}

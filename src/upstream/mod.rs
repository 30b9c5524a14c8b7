//! # Upstream subscriptions.
//!
//! [`Upstream`] is the seam between a region worker and the data source:
//! given a region it opens **one** long-lived subscription scoped to the
//! region's bounding box and yields [`StreamMessage`]s until it fails or is
//! dropped.
//!
//! ```text
//! StreamWorker ── open(&region) ──► Upstream ──► Subscription (Stream)
//!                                                   ├─► Ok(Post)        → count + publish
//!                                                   ├─► Ok(Control(..)) → ControlMessage event
//!                                                   └─► Err(..) / end   → attempt fails
//! ```
//!
//! Dropping a [`Subscription`] closes the underlying connection.

mod http;
mod message;

pub use http::{frame_lines, HttpUpstream};
pub use message::{ControlMessage, Post, StreamMessage};

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::SubscriptionError;
use crate::regions::Region;

/// Open subscription: messages until error or end of stream.
pub type Subscription = BoxStream<'static, Result<StreamMessage, SubscriptionError>>;

/// Source of per-region subscriptions.
#[async_trait]
pub trait Upstream: Send + Sync + 'static {
    /// Opens one subscription filtered to `region.bbox`.
    async fn open(&self, region: &Region) -> Result<Subscription, SubscriptionError>;
}

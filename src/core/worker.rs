//! # StreamWorker: one region's subscription.
//!
//! Runs **one attempt**: opens the region's subscription and forwards every
//! accepted item until the subscription fails, ends, or the attempt is cancelled.
//!
//! ## Per-item flow
//! ```text
//! Subscription ──► Post ──► counter.increment()          (happens-before publish)
//!                       └─► Outbound::record() ──► Publisher::publish()
//!                                                    └─► Err → PublishFailurePolicy
//!              ──► Control ──► ControlMessage event  (never counted)
//! ```
//!
//! ## Rules
//! - A fresh ledger counter is registered at the start of each attempt.
//! - The region moves to `Running` only after the subscription opened.
//! - Publish calls are issued one at a time in acceptance order.
//! - Cancellation drops the subscription and returns [`WorkerError::Canceled`].
//! - Every other exit is an error; the stream is never expected to end.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::{
    core::{ActivityLedger, RegionStates, WorkerState},
    error::{PublishError, SubscriptionError, WorkerError},
    events::{Bus, Event, EventKind},
    policies::PublishFailurePolicy,
    publish::{Outbound, PublishRecord, Publisher},
    regions::Region,
    upstream::{ControlMessage, Post, StreamMessage, Upstream},
};

/// Collaborators shared by every worker of a runtime.
#[derive(Clone)]
pub struct WorkerContext {
    /// Lifecycle and stream events.
    pub bus: Bus,
    /// Per-region activity counters.
    pub ledger: Arc<ActivityLedger>,
    /// Per-region state table.
    pub states: Arc<RegionStates>,
    /// Subscription source.
    pub upstream: Arc<dyn Upstream>,
    /// Message bus producer.
    pub publisher: Arc<dyn Publisher>,
    /// Topic, key and payload settings.
    pub outbound: Arc<Outbound>,
    /// Reaction to publish errors.
    pub publish_failure: PublishFailurePolicy,
}

/// Forwards one region's items to the publisher.
pub struct StreamWorker {
    region: Arc<Region>,
    ctx: WorkerContext,
    accepted: AtomicU64,
    dropped: AtomicU64,
}

impl StreamWorker {
    /// Creates a worker for `region`.
    pub fn new(region: Arc<Region>, ctx: WorkerContext) -> Self {
        Self {
            region,
            ctx,
            accepted: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Region served by this worker.
    pub fn region(&self) -> &Arc<Region> {
        &self.region
    }

    /// Shared collaborators.
    pub fn context(&self) -> &WorkerContext {
        &self.ctx
    }

    /// Items accepted over the worker's lifetime (all attempts).
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Acquire)
    }

    /// Records dropped after publish failures over the worker's lifetime.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Acquire)
    }

    /// Runs one attempt until failure or cancellation of `token`.
    pub async fn run(&self, attempt: u32, token: &CancellationToken) -> Result<(), WorkerError> {
        let id = &self.region.id;
        let counter = self.ctx.ledger.register(id);

        let mut sub = select! {
            biased;
            _ = token.cancelled() => return Err(WorkerError::Canceled),
            res = self.ctx.upstream.open(&self.region) => res?,
        };

        self.ctx.states.set(id, WorkerState::Running);
        self.ctx.bus.publish(
            Event::new(EventKind::SubscriptionOpened)
                .with_region(Arc::clone(id))
                .with_attempt(attempt)
                .with_state(WorkerState::Running),
        );

        loop {
            let msg = select! {
                biased;
                _ = token.cancelled() => return Err(WorkerError::Canceled),
                msg = sub.next() => msg,
            };

            match msg {
                Some(Ok(StreamMessage::Post(post))) => {
                    counter.increment();
                    self.accepted.fetch_add(1, Ordering::AcqRel);
                    self.forward(&post, token).await?;
                }
                Some(Ok(StreamMessage::Control(ControlMessage::KeepAlive))) => {}
                Some(Ok(StreamMessage::Control(ctl))) => {
                    self.ctx.bus.publish(
                        Event::new(EventKind::ControlMessage)
                            .with_region(Arc::clone(id))
                            .with_reason(ctl.to_string()),
                    );
                    if let ControlMessage::Disconnect { code, reason } = ctl {
                        return Err(SubscriptionError::Disconnected { code, reason }.into());
                    }
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Err(SubscriptionError::Closed.into()),
            }
        }
    }

    /// Builds and publishes one record under the publish failure policy.
    async fn forward(&self, post: &Post, token: &CancellationToken) -> Result<(), WorkerError> {
        let record = match self.ctx.outbound.record(&self.region, post) {
            Ok(r) => r,
            Err(e) => {
                self.drop_record(&e);
                return Ok(());
            }
        };

        let err = match self.publish(&record).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        match self.ctx.publish_failure {
            PublishFailurePolicy::Drop => {
                self.drop_record(&err);
                Ok(())
            }
            PublishFailurePolicy::Escalate => Err(WorkerError::Fail(err.to_string())),
            PublishFailurePolicy::Retry { attempts, backoff } => {
                let mut last = err;
                for retry in 1..=attempts {
                    let sleep = time::sleep(backoff.delay(retry));
                    select! {
                        _ = sleep => {}
                        _ = token.cancelled() => return Err(WorkerError::Canceled),
                    }
                    match self.publish(&record).await {
                        Ok(()) => return Ok(()),
                        Err(e) => last = e,
                    }
                }
                self.drop_record(&last);
                Ok(())
            }
        }
    }

    async fn publish(&self, record: &PublishRecord) -> Result<(), PublishError> {
        self.ctx
            .publisher
            .publish(&record.topic, &record.key, &record.payload)
            .await
    }

    fn drop_record(&self, err: &PublishError) {
        let dropped = self.dropped.fetch_add(1, Ordering::AcqRel) + 1;
        self.ctx.bus.publish(
            Event::new(EventKind::PublishFailed)
                .with_region(Arc::clone(&self.region.id))
                .with_reason(err.to_string())
                .with_count(dropped),
        );
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::Value;

    use super::*;
    use crate::testing::{self, ScriptedUpstream};
    use crate::publish::MemoryPublisher;

    const NYC_ITEMS: [&str; 2] = [
        r#"{"id":1,"id_str":"1","text":"first","coordinates":{"type":"Point","coordinates":[-73.98,40.75]}}"#,
        r#"{"id":2,"id_str":"2","text":"second"}"#,
    ];

    #[tokio::test]
    async fn nyc_items_are_counted_and_published_verbatim() {
        let upstream = ScriptedUpstream::new();
        let publisher = Arc::new(MemoryPublisher::new());
        let mut ctx = testing::context(upstream.clone(), publisher.clone());
        ctx.outbound = Arc::new(Outbound {
            format: crate::publish::PayloadFormat::Raw,
            ..Outbound::default()
        });
        let ledger = Arc::clone(&ctx.ledger);
        let worker = StreamWorker::new(Arc::new(testing::region("NYC")), ctx);

        let feed = upstream.script("NYC");
        for item in NYC_ITEMS {
            feed.post(item);
        }
        feed.close();

        let token = CancellationToken::new();
        let err = worker.run(1, &token).await.unwrap_err();
        assert_eq!(err.as_label(), "worker_failed");

        let recs = publisher.records();
        assert_eq!(recs.len(), 2);
        for (rec, item) in recs.iter().zip(NYC_ITEMS) {
            assert_eq!(&*rec.topic, "raw-tweets");
            let got: Value = serde_json::from_slice(&rec.payload).unwrap();
            let want: Value = serde_json::from_str(item).unwrap();
            assert_eq!(got, want);
        }
        assert_eq!(ledger.get_and_reset("NYC"), 2);
        assert_eq!(worker.accepted(), 2);
    }

    #[tokio::test]
    async fn control_messages_are_reported_not_counted() {
        let upstream = ScriptedUpstream::new();
        let publisher = Arc::new(MemoryPublisher::new());
        let ctx = testing::context(upstream.clone(), publisher.clone());
        let bus = ctx.bus.clone();
        let mut rx = bus.subscribe();
        let ledger = Arc::clone(&ctx.ledger);
        let worker = StreamWorker::new(Arc::new(testing::region("sf")), ctx);

        let feed = upstream.script("sf");
        feed.control(ControlMessage::KeepAlive);
        feed.control(ControlMessage::Limit { undelivered: 3 });
        feed.control(ControlMessage::Disconnect {
            code: 7,
            reason: "admin logout".into(),
        });

        let err = worker.run(1, &CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("admin logout"));
        assert_eq!(ledger.get_and_reset("sf"), 0);
        assert!(publisher.is_empty());

        let kinds: Vec<EventKind> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            [
                EventKind::SubscriptionOpened,
                EventKind::ControlMessage,
                EventKind::ControlMessage
            ]
        );
    }

    #[tokio::test]
    async fn open_failure_is_a_retryable_worker_error() {
        let upstream = ScriptedUpstream::new();
        let ctx = testing::context(upstream.clone(), Arc::new(MemoryPublisher::new()));
        let states = Arc::clone(&ctx.states);
        let worker = StreamWorker::new(Arc::new(testing::region("la")), ctx);

        upstream.fail_open("la", SubscriptionError::Rejected {
            status: 420,
            body: "enhance your calm".into(),
        });

        let err = worker.run(1, &CancellationToken::new()).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(states.get("la"), None);
    }

    #[tokio::test]
    async fn cancellation_closes_the_subscription() {
        let upstream = ScriptedUpstream::new();
        let ctx = testing::context(upstream.clone(), Arc::new(MemoryPublisher::new()));
        let worker = StreamWorker::new(Arc::new(testing::region("chi")), ctx);
        let feed = upstream.script("chi");

        let token = CancellationToken::new();
        let cancel = token.clone();
        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        });

        let err = worker.run(1, &token).await.unwrap_err();
        stopper.await.unwrap();
        assert!(matches!(err, WorkerError::Canceled));
        assert!(feed.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn retry_policy_recovers_from_transient_publish_errors() {
        let upstream = ScriptedUpstream::new();
        let publisher = Arc::new(MemoryPublisher::new());
        let ctx = testing::context(upstream.clone(), publisher.clone());
        let worker = StreamWorker::new(Arc::new(testing::region("nyc")), ctx);

        publisher.fail_next(2);
        let feed = upstream.script("nyc");
        feed.post(NYC_ITEMS[0]);
        feed.close();

        let _ = worker.run(1, &CancellationToken::new()).await;
        assert_eq!(publisher.len(), 1);
        assert_eq!(worker.dropped(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_policy_drops_and_counts_after_exhaustion() {
        let upstream = ScriptedUpstream::new();
        let publisher = Arc::new(MemoryPublisher::new());
        let ctx = testing::context(upstream.clone(), publisher.clone());
        let mut rx = ctx.bus.subscribe();
        let worker = StreamWorker::new(Arc::new(testing::region("nyc")), ctx);

        publisher.fail_next(4);
        let feed = upstream.script("nyc");
        feed.post(NYC_ITEMS[0]);
        feed.post(NYC_ITEMS[1]);
        feed.close();

        let _ = worker.run(1, &CancellationToken::new()).await;
        assert_eq!(worker.dropped(), 1);
        assert_eq!(publisher.len(), 1);

        let failed = std::iter::from_fn(|| rx.try_recv().ok())
            .find(|e| e.kind == EventKind::PublishFailed)
            .unwrap();
        assert_eq!(failed.count, Some(1));
    }

    #[tokio::test]
    async fn escalate_policy_fails_the_attempt() {
        let upstream = ScriptedUpstream::new();
        let publisher = Arc::new(MemoryPublisher::new());
        let mut ctx = testing::context(upstream.clone(), publisher.clone());
        ctx.publish_failure = PublishFailurePolicy::Escalate;
        let worker = StreamWorker::new(Arc::new(testing::region("nyc")), ctx);

        publisher.fail_next(1);
        let feed = upstream.script("nyc");
        feed.post(NYC_ITEMS[0]);
        feed.post(NYC_ITEMS[1]);

        let err = worker.run(1, &CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("injected failure"));
        assert!(publisher.is_empty());
    }
}

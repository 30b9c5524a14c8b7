//! Test doubles shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::StreamExt;

use crate::core::{ActivityLedger, RegionStates, WorkerContext};
use crate::error::SubscriptionError;
use crate::events::Bus;
use crate::policies::PublishFailurePolicy;
use crate::publish::{Outbound, Publisher};
use crate::regions::{BoundingBox, Region};
use crate::upstream::{ControlMessage, Post, StreamMessage, Subscription, Upstream};

type Item = Result<StreamMessage, SubscriptionError>;

enum Script {
    Feed(mpsc::UnboundedReceiver<Item>),
    Fail(SubscriptionError),
}

/// Upstream whose subscriptions are scripted per region, one script per `open`.
///
/// An `open` with no script left fails with `Connect("no script")`.
#[derive(Clone, Default)]
pub(crate) struct ScriptedUpstream {
    scripts: Arc<Mutex<HashMap<String, VecDeque<Script>>>>,
    opens: Arc<Mutex<HashMap<String, usize>>>,
}

/// Sending half of a scripted subscription.
pub(crate) struct Feed {
    tx: mpsc::UnboundedSender<Item>,
}

impl Feed {
    pub(crate) fn post(&self, json: &str) {
        let post = Post::from_json(json).expect("test post must be a JSON object");
        let _ = self.tx.unbounded_send(Ok(StreamMessage::Post(post)));
    }

    pub(crate) fn control(&self, msg: ControlMessage) {
        let _ = self.tx.unbounded_send(Ok(StreamMessage::Control(msg)));
    }

    pub(crate) fn fail(&self, err: SubscriptionError) {
        let _ = self.tx.unbounded_send(Err(err));
    }

    /// Ends the subscription (stream returns `None`).
    pub(crate) fn close(self) {}

    /// True once the worker dropped its subscription.
    pub(crate) fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl ScriptedUpstream {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queues a subscription for the next `open` of `region`.
    pub(crate) fn script(&self, region: &str) -> Feed {
        let (tx, rx) = mpsc::unbounded();
        self.push(region, Script::Feed(rx));
        Feed { tx }
    }

    /// Queues an open failure for the next `open` of `region`.
    pub(crate) fn fail_open(&self, region: &str, err: SubscriptionError) {
        self.push(region, Script::Fail(err));
    }

    /// Number of `open` calls seen for `region`.
    pub(crate) fn opens(&self, region: &str) -> usize {
        self.opens
            .lock()
            .unwrap()
            .get(region)
            .copied()
            .unwrap_or(0)
    }

    fn push(&self, region: &str, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .entry(region.to_string())
            .or_default()
            .push_back(script);
    }
}

#[async_trait]
impl Upstream for ScriptedUpstream {
    async fn open(&self, region: &Region) -> Result<Subscription, SubscriptionError> {
        *self
            .opens
            .lock()
            .unwrap()
            .entry(region.id.to_string())
            .or_default() += 1;

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&*region.id)
            .and_then(VecDeque::pop_front);
        match next {
            Some(Script::Feed(rx)) => Ok(rx.boxed()),
            Some(Script::Fail(e)) => Err(e),
            None => Err(SubscriptionError::Connect("no script".into())),
        }
    }
}

/// Region with a small valid box.
pub(crate) fn region(id: &str) -> Region {
    Region::new(id, BoundingBox::new(-74.0, 40.0, -73.0, 41.0).unwrap())
}

/// Worker context around `upstream` and `publisher` with default settings.
pub(crate) fn context(upstream: impl Upstream, publisher: Arc<dyn Publisher>) -> WorkerContext {
    WorkerContext {
        bus: Bus::new(256),
        ledger: Arc::new(ActivityLedger::new()),
        states: Arc::new(RegionStates::new()),
        upstream: Arc::new(upstream),
        publisher,
        outbound: Arc::new(Outbound::default()),
        publish_failure: PublishFailurePolicy::default(),
    }
}

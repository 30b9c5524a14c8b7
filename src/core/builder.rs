use std::sync::Arc;

use super::orchestrator::Orchestrator;
use crate::{
    config::Config,
    events::Bus,
    publish::Publisher,
    subscribers::{Subscribe, SubscriberSet},
    upstream::Upstream,
};

/// Builder for an [`Orchestrator`].
pub struct OrchestratorBuilder {
    cfg: Config,
    upstream: Arc<dyn Upstream>,
    publisher: Arc<dyn Publisher>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl OrchestratorBuilder {
    /// Creates a builder around the subscription source and the bus producer.
    pub fn new(cfg: Config, upstream: Arc<dyn Upstream>, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            cfg,
            upstream,
            publisher,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive runtime events (health reports, worker lifecycle,
    /// publish failures) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the orchestrator.
    ///
    /// Spawns the subscriber workers and the event listener, so it must be
    /// called inside a tokio runtime.
    pub fn build(self) -> Orchestrator {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        Orchestrator::new_internal(self.cfg, bus, subs, self.upstream, self.publisher)
    }
}

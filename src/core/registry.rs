//! # Registry of running region actors.
//!
//! The registry owns one handle per region:
//!
//! ```text
//! Handle {
//!   join:    JoinHandle<ActorExit>   (awaited at shutdown)
//!   cancel:  CancellationToken       (child of the runtime token)
//!   restart: RestartHandle           (liveness loop → actor)
//! }
//! ```
//!
//! ## Rules
//! - One actor per region id; a second spawn for the same id is refused.
//! - Every actor token is a child of the runtime token, so cancelling the
//!   runtime reaches every worker.
//! - Restart requests never block: a request already pending is enough, and a
//!   request for an actor that is backing off is refused.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::actor::{ActorExit, ActorParams, RestartHandle, WorkerActor};
use crate::core::worker::StreamWorker;

/// Handle to a running actor.
struct Handle {
    join: JoinHandle<ActorExit>,
    restart: RestartHandle,
}

/// Actor handles keyed by region id.
pub struct Registry {
    actors: RwLock<HashMap<Arc<str>, Handle>>,
    runtime_token: CancellationToken,
}

impl Registry {
    /// Creates an empty registry under `runtime_token`.
    pub fn new(runtime_token: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            actors: RwLock::new(HashMap::new()),
            runtime_token,
        })
    }

    /// Spawns an actor for `worker`'s region.
    ///
    /// Fails when the region already has an actor or the runtime is shutting down.
    pub async fn spawn(&self, worker: StreamWorker, params: ActorParams) -> Result<(), String> {
        let id = Arc::clone(&worker.region().id);
        let mut actors = self.actors.write().await;
        if self.runtime_token.is_cancelled() {
            return Err("runtime is shutting down".into());
        }
        if actors.contains_key(&id) {
            return Err(format!("region `{id}` already has a worker"));
        }

        let cancel = self.runtime_token.child_token();
        let (actor, restart) = WorkerActor::new(worker, params);
        let join = tokio::spawn(actor.run(cancel));

        actors.insert(id, Handle { join, restart });
        Ok(())
    }

    /// Asks `region`'s actor to reopen its subscription.
    ///
    /// Returns false when the region has no live actor or its actor has no
    /// attempt running.
    pub async fn request_restart(&self, region: &str) -> bool {
        let actors = self.actors.read().await;
        match actors.get(region) {
            Some(h) if !h.join.is_finished() => h.restart.request(),
            _ => false,
        }
    }

    /// Waits for every registered actor to exit; returns their exits by region.
    ///
    /// Does not cancel anything: cancel the runtime token first.
    pub async fn join_all(&self) -> Vec<(Arc<str>, Option<ActorExit>)> {
        let handles: Vec<(Arc<str>, Handle)> = self.actors.write().await.drain().collect();
        let mut exits = Vec::with_capacity(handles.len());
        for (id, h) in handles {
            exits.push((id, h.join.await.ok()));
        }
        exits.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        exits
    }
}

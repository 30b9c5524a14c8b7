//! In-process publisher: records every call. Used for dry runs and tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{PublishRecord, Publisher};
use crate::error::PublishError;

/// Keeps every published record in memory.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    records: Mutex<Vec<PublishRecord>>,
    failures: AtomicU32,
}

impl MemoryPublisher {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` publish calls fail with a transport error.
    pub fn fail_next(&self, n: u32) {
        self.failures.store(n, Ordering::Release);
    }

    /// Records published so far, in call order.
    pub fn records(&self) -> Vec<PublishRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of records published so far.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// True when nothing was published.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Publisher for MemoryPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), PublishError> {
        let injected = self
            .failures
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(PublishError::Transport("injected failure".into()));
        }

        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(PublishRecord {
                topic: Arc::from(topic),
                key: key.to_string(),
                payload: payload.to_vec(),
            });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

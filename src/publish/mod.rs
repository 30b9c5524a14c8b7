//! # Message bus publishing.
//!
//! Every worker hands its records to one shared [`Publisher`]. Backends are
//! interchangeable and chosen by configuration ([`Backend`]):
//!
//! | backend  | transport                                  | feature |
//! |----------|--------------------------------------------|---------|
//! | `kafka`  | `rdkafka::FutureProducer`, key = partition | `kafka` |
//! | `redis`  | `XADD <topic> * key <key> payload <bytes>` | `redis` |
//! | `stdout` | one payload per line                       | always  |
//! | `memory` | in-process recorder                        | always  |
//!
//! ## Contract
//! - At-least-once on the best effort of the bus; duplicates are acceptable.
//! - Errors are returned to the caller, which applies its
//!   [`PublishFailurePolicy`](crate::PublishFailurePolicy).
//! - Within one worker calls are issued in acceptance order.

#[cfg(feature = "kafka")]
mod kafka;
mod memory;
mod record;
#[cfg(feature = "redis")]
mod redis_streams;
mod stdout;

#[cfg(feature = "kafka")]
pub use kafka::KafkaPublisher;
pub use memory::MemoryPublisher;
pub use record::{Outbound, PartitionKey, PayloadFormat, PublishRecord};
#[cfg(feature = "redis")]
pub use redis_streams::RedisPublisher;
pub use stdout::{LinePublisher, StdoutPublisher};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ConfigError, PublishError};

/// Uniform publish contract over the message bus producer.
#[async_trait]
pub trait Publisher: Send + Sync + 'static {
    /// Attempts delivery of one record.
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), PublishError>;

    /// Waits up to `timeout` for buffered records to be delivered.
    async fn flush(&self, _timeout: Duration) -> Result<(), PublishError> {
        Ok(())
    }

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}

/// Kafka connection settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KafkaSettings {
    /// `bootstrap.servers`.
    pub brokers: String,
    /// Optional SASL/PLAIN username and password.
    pub sasl: Option<(String, String)>,
    /// Use TLS.
    pub tls: bool,
}

/// Selected publisher backend.
#[derive(Clone, PartialEq, Eq)]
pub enum Backend {
    /// Kafka topic.
    Kafka(KafkaSettings),
    /// Redis stream.
    Redis {
        /// Connection URL.
        url: String,
        /// Approximate stream length cap.
        max_len: Option<usize>,
    },
    /// Process stdout.
    Stdout,
    /// In-process recorder.
    Memory,
}

impl Backend {
    /// Short backend name.
    pub fn as_label(&self) -> &'static str {
        match self {
            Backend::Kafka(_) => "kafka",
            Backend::Redis { .. } => "redis",
            Backend::Stdout => "stdout",
            Backend::Memory => "memory",
        }
    }
}

impl fmt::Debug for Backend {
    /// Credentials are never printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Kafka(k) => f
                .debug_struct("Kafka")
                .field("brokers", &k.brokers)
                .field("sasl", &k.sasl.as_ref().map(|(user, _)| user))
                .field("tls", &k.tls)
                .finish(),
            Backend::Redis { url, max_len } => f
                .debug_struct("Redis")
                .field("url", url)
                .field("max_len", max_len)
                .finish(),
            Backend::Stdout => f.write_str("Stdout"),
            Backend::Memory => f.write_str("Memory"),
        }
    }
}

/// Builds the publisher for `backend`.
///
/// Fails with [`ConfigError::Backend`] when the backend cannot be reached or
/// was not compiled in.
pub async fn connect(backend: &Backend) -> Result<Arc<dyn Publisher>, ConfigError> {
    match backend {
        #[cfg(feature = "kafka")]
        Backend::Kafka(settings) => Ok(Arc::new(KafkaPublisher::new(settings)?)),
        #[cfg(not(feature = "kafka"))]
        Backend::Kafka(_) => Err(ConfigError::Backend {
            backend: "kafka",
            reason: "built without the `kafka` feature".into(),
        }),
        #[cfg(feature = "redis")]
        Backend::Redis { url, max_len } => {
            Ok(Arc::new(RedisPublisher::connect(url, *max_len).await?))
        }
        #[cfg(not(feature = "redis"))]
        Backend::Redis { .. } => Err(ConfigError::Backend {
            backend: "redis",
            reason: "built without the `redis` feature".into(),
        }),
        Backend::Stdout => Ok(Arc::new(StdoutPublisher::stdout())),
        Backend::Memory => Ok(Arc::new(MemoryPublisher::new())),
    }
}

//! Kafka publisher backed by `rdkafka::FutureProducer`.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use tracing::debug;

use super::{KafkaSettings, Publisher};
use crate::error::{ConfigError, PublishError};

/// How long a record may wait in the local producer queue.
const QUEUE_TIMEOUT: Duration = Duration::from_secs(5);

/// Publishes records with librdkafka.
#[derive(Clone)]
pub struct KafkaPublisher {
    producer: FutureProducer,
}

impl KafkaPublisher {
    /// Creates the producer. Broker connections are made lazily by librdkafka.
    pub fn new(settings: &KafkaSettings) -> Result<Self, ConfigError> {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", settings.brokers.as_str())
            .set("message.timeout.ms", "5000")
            .set("acks", "all");

        if let Some((user, pass)) = &settings.sasl {
            config
                .set(
                    "security.protocol",
                    if settings.tls { "SASL_SSL" } else { "SASL_PLAINTEXT" },
                )
                .set("sasl.mechanism", "PLAIN")
                .set("sasl.username", user)
                .set("sasl.password", pass);
        } else if settings.tls {
            config.set("security.protocol", "SSL");
        }

        let producer: FutureProducer = config.create().map_err(|e| ConfigError::Backend {
            backend: "kafka",
            reason: e.to_string(),
        })?;
        debug!(brokers = %settings.brokers, "kafka producer created");
        Ok(Self { producer })
    }
}

#[async_trait]
impl Publisher for KafkaPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), PublishError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);
        match self.producer.send(record, QUEUE_TIMEOUT).await {
            Ok(_) => Ok(()),
            Err((e @ KafkaError::MessageProduction(_), _)) => {
                Err(PublishError::Rejected(e.to_string()))
            }
            Err((e, _)) => Err(PublishError::Transport(e.to_string())),
        }
    }

    async fn flush(&self, timeout: Duration) -> Result<(), PublishError> {
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || producer.flush(timeout))
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?
            .map_err(|e| PublishError::Transport(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "kafka"
    }
}

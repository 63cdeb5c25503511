//! Outbound channel
//!
//! [`RecordPublisher`] is what the delivery loop talks to. [`KafkaPublisher`]
//! is the production implementation on top of an rdkafka `FutureProducer`.

use async_trait::async_trait;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::ClientConfig;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Failure to hand a payload to the broker
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Publishing to '{topic}' blocked for longer than {timeout:?}")]
    Timeout { topic: String, timeout: Duration },

    #[error("Broker rejected message for '{topic}': {source}")]
    Broker {
        topic: String,
        #[source]
        source: KafkaError,
    },
}

/// Failure to construct the outbound client; aborts the whole run
#[derive(Error, Debug)]
#[error("Failed to create Kafka producer for {servers}: {source}")]
pub struct PublisherSetupError {
    servers: String,
    #[source]
    source: KafkaError,
}

/// Accepts encoded records under a topic name
#[async_trait]
pub trait RecordPublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), PublishError>;
}

/// Kafka-backed publisher
///
/// Owned by a single delivery run. Call [`KafkaPublisher::close`] when the
/// run ends to flush whatever is still queued.
pub struct KafkaPublisher {
    producer: FutureProducer,
    max_block: Duration,
}

impl KafkaPublisher {
    /// Create a producer for the given brokers.
    ///
    /// A send waits up to `max_block` for space in the local queue. Once
    /// queued, the broker has `max_block` (`message.timeout.ms`) to
    /// acknowledge it, so one publish can block for up to twice `max_block`.
    pub fn connect(
        bootstrap_servers: &[String],
        max_block: Duration,
    ) -> Result<Self, PublisherSetupError> {
        let servers = bootstrap_servers.join(",");
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &servers)
            .set("message.timeout.ms", max_block.as_millis().to_string())
            .create()
            .map_err(|source| PublisherSetupError {
                servers: servers.clone(),
                source,
            })?;

        info!(servers = %servers, max_block_ms = max_block.as_millis() as u64, "Kafka producer created");

        Ok(Self {
            producer,
            max_block,
        })
    }

    /// Flush queued messages and release the producer
    pub fn close(self) {
        if let Err(e) = self.producer.flush(self.max_block) {
            warn!(error = %e, "Kafka producer did not flush before closing");
        } else {
            info!("Kafka producer flushed and closed");
        }
    }
}

#[async_trait]
impl RecordPublisher for KafkaPublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        let record: FutureRecord<'_, (), [u8]> = FutureRecord::to(topic).payload(payload);

        match self.producer.send(record, self.max_block).await {
            Ok(_) => Ok(()),
            Err((e, _message)) => Err(classify(topic, self.max_block, e)),
        }
    }
}

fn classify(topic: &str, timeout: Duration, error: KafkaError) -> PublishError {
    match error.rdkafka_error_code() {
        Some(RDKafkaErrorCode::QueueFull) | Some(RDKafkaErrorCode::MessageTimedOut) => {
            PublishError::Timeout {
                topic: topic.to_string(),
                timeout,
            }
        },
        _ => PublishError::Broker {
            topic: topic.to_string(),
            source: error,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_full_is_timeout() {
        let err = classify(
            "users_created",
            Duration::from_millis(5000),
            KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull),
        );
        assert!(matches!(err, PublishError::Timeout { .. }));
    }

    #[test]
    fn test_message_timed_out_is_timeout() {
        let err = classify(
            "users_created",
            Duration::from_millis(5000),
            KafkaError::MessageProduction(RDKafkaErrorCode::MessageTimedOut),
        );
        assert!(err.to_string().contains("5s"));
    }

    #[test]
    fn test_other_errors_are_broker_errors() {
        let err = classify(
            "users_created",
            Duration::from_millis(5000),
            KafkaError::MessageProduction(RDKafkaErrorCode::TopicAuthorizationFailed),
        );
        assert!(matches!(err, PublishError::Broker { .. }));
    }

    #[test]
    fn test_connect_is_lazy() {
        // librdkafka does not contact brokers until the first send
        let publisher = KafkaPublisher::connect(
            &["localhost:1".to_string()],
            Duration::from_millis(100),
        )
        .unwrap();
        publisher.close();
    }
}

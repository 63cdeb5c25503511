//! One delivery invocation, wired to the real source and broker.
//!
//! Client construction failures abort the invocation. Everything after that
//! is absorbed by the delivery loop. The Kafka producer is flushed and closed
//! whichever way the loop ends.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::ProducerConfig;
use crate::delivery::{DeliveryConfig, DeliveryLoop, DeliveryReport};
use crate::publisher::KafkaPublisher;
use crate::source::RandomUserSource;

/// Stream identities from the source to the topic for the configured duration
pub async fn stream_data(config: &ProducerConfig) -> Result<DeliveryReport> {
    let source = RandomUserSource::new(config.source.url.clone(), config.source_timeout())
        .context("Failed to build HTTP client for identity source")?;
    let publisher = KafkaPublisher::connect(&config.kafka.bootstrap_servers, config.max_block())?;

    info!(
        source = %source.url(),
        topic = %config.kafka.topic,
        "Starting delivery run"
    );

    let delivery_config = DeliveryConfig {
        topic: config.kafka.topic.clone(),
        duration: config.stream_duration(),
    };

    let outcome = DeliveryLoop::new(&source, &publisher, delivery_config)
        .run()
        .await;

    publisher.close();

    match outcome {
        Ok(report) => {
            if report.published == 0 {
                warn!(
                    iterations = report.iterations,
                    "Delivery run finished without publishing anything"
                );
            }
            Ok(report)
        },
        Err(aborted) => Err(aborted.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publisher_setup_failure_aborts_invocation() {
        let mut config = ProducerConfig::default();
        // Nothing is ever fetched; the run fails before the loop starts
        config.source.url = "http://127.0.0.1:9/api/".to_string();
        // Out of range for librdkafka's message.timeout.ms
        config.kafka.max_block_ms = u64::MAX;

        let err = stream_data(&config).await.unwrap_err();

        assert!(
            err.to_string().contains("Failed to create Kafka producer"),
            "{err:#}"
        );
    }
}

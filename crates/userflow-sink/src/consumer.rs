//! Topic consumer
//!
//! [`SinkPipeline`] turns each received payload into at most one stored row.
//! Bad payloads and failed inserts are logged and counted; neither stops the
//! pipeline.

use futures::{Stream, StreamExt};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaResult;
use rdkafka::Message;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::ConsumerConfig;
use crate::error::SinkError;
use crate::payload::decode_payload;
use crate::store::RowWriter;

/// What happened to one payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadOutcome {
    Inserted,
    Rejected,
    Failed,
}

/// Counters for one sink run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkReport {
    /// Payloads taken off the topic
    pub received: u64,
    pub inserted: u64,
    /// Payloads that failed validation
    pub rejected: u64,
    /// Valid rows the store refused
    pub failed: u64,
    /// Broker errors while polling
    pub receive_errors: u64,
    pub elapsed: Duration,
}

/// Validates payloads and hands rows to a [`RowWriter`]
pub struct SinkPipeline<'a, W: ?Sized> {
    writer: &'a W,
    report: SinkReport,
}

impl<'a, W> SinkPipeline<'a, W>
where
    W: RowWriter + ?Sized,
{
    pub fn new(writer: &'a W) -> Self {
        Self {
            writer,
            report: SinkReport::default(),
        }
    }

    pub fn report(&self) -> &SinkReport {
        &self.report
    }

    /// Decode one payload and insert it
    pub async fn handle_payload(&mut self, payload: Option<&[u8]>) -> PayloadOutcome {
        self.report.received += 1;

        let row = match decode_payload(payload) {
            Ok(row) => row,
            Err(e) => {
                warn!(error = %e, "Skipping invalid payload");
                self.report.rejected += 1;
                return PayloadOutcome::Rejected;
            },
        };

        match self.writer.insert(&row).await {
            Ok(()) => {
                self.report.inserted += 1;
                PayloadOutcome::Inserted
            },
            Err(e) => {
                warn!(id = %row.id, error = %e, "Row insert failed, continuing");
                self.report.failed += 1;
                PayloadOutcome::Failed
            },
        }
    }

    /// Feed payloads from `messages` until the stream ends, `shutdown`
    /// resolves, or `max_messages` payloads have been received.
    pub async fn drain<S, E, F>(
        mut self,
        messages: S,
        max_messages: Option<u64>,
        shutdown: F,
    ) -> SinkReport
    where
        S: Stream<Item = Result<Option<Vec<u8>>, E>>,
        E: Display,
        F: Future<Output = ()>,
    {
        let started = Instant::now();
        futures::pin_mut!(messages);
        tokio::pin!(shutdown);

        loop {
            if max_messages.is_some_and(|limit| self.report.received >= limit) {
                info!(received = self.report.received, "Message limit reached");
                break;
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping consumer");
                    break;
                },
                next = messages.next() => match next {
                    Some(Ok(payload)) => {
                        self.handle_payload(payload.as_deref()).await;
                    },
                    Some(Err(e)) => {
                        warn!(error = %e, "Error receiving message");
                        self.report.receive_errors += 1;
                    },
                    None => {
                        info!("Message stream ended");
                        break;
                    },
                },
            }
        }

        self.report.elapsed = started.elapsed();
        self.report
    }
}

/// Kafka consumer subscribed to the users topic
pub struct KafkaRecordConsumer {
    consumer: StreamConsumer,
    topic: String,
}

impl KafkaRecordConsumer {
    /// Create the consumer and subscribe to the configured topic
    pub fn connect(config: &ConsumerConfig) -> Result<Self, SinkError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", config.bootstrap_servers.join(","))
            .set("group.id", &config.group_id)
            .set("auto.offset.reset", config.starting_offsets.as_kafka())
            .set("enable.partition.eof", "false")
            .set("enable.auto.commit", "true")
            .create()?;

        consumer.subscribe(&[config.topic.as_str()])?;

        info!(
            topic = %config.topic,
            group = %config.group_id,
            offsets = %config.starting_offsets,
            "Subscribed to topic"
        );

        Ok(Self {
            consumer,
            topic: config.topic.clone(),
        })
    }

    /// Payloads as they arrive. `None` marks a message without a payload.
    pub fn payloads(&self) -> impl Stream<Item = KafkaResult<Option<Vec<u8>>>> + '_ {
        self.consumer
            .stream()
            .map(|message| message.map(|m| m.payload().map(<[u8]>::to_vec)))
    }

    /// Leave the consumer group
    pub fn close(self) {
        self.consumer.unsubscribe();
        info!(topic = %self.topic, "Unsubscribed from topic");
    }
}

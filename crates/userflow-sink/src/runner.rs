//! One sink run.
//!
//! The store is connected first. If no session can be opened the run logs the
//! failure and returns without subscribing. Otherwise the consumer drains the
//! topic until shutdown or the message limit, then unsubscribes before the
//! store session is dropped.

use anyhow::{Context, Result};
use std::future::Future;
use tracing::{error, info};

use crate::config::SinkConfig;
use crate::consumer::{KafkaRecordConsumer, SinkPipeline, SinkReport};
use crate::error::StoreError;
use crate::store::CassandraStore;

/// Consume and store records. Returns `None` when the store was unreachable.
pub async fn run<F>(
    config: &SinkConfig,
    max_messages: Option<u64>,
    shutdown: F,
) -> Result<Option<SinkReport>>
where
    F: Future<Output = ()>,
{
    let schema = config.schema()?;

    let store = match CassandraStore::connect(&config.store, schema).await {
        Ok(store) => store,
        Err(e @ StoreError::Connection { .. }) => {
            error!(error = %e, "Store unavailable, skipping consumer");
            return Ok(None);
        },
        Err(e) => return Err(e).context("Failed to prepare store schema"),
    };

    let consumer =
        KafkaRecordConsumer::connect(&config.kafka).context("Failed to create Kafka consumer")?;

    info!(
        table = %store.schema().qualified_name(),
        limit = ?max_messages,
        "Sink started"
    );

    let report = SinkPipeline::new(&store)
        .drain(consumer.payloads(), max_messages, shutdown)
        .await;

    consumer.close();
    drop(store);

    info!(
        received = report.received,
        inserted = report.inserted,
        rejected = report.rejected,
        failed = report.failed,
        receive_errors = report.receive_errors,
        elapsed_secs = report.elapsed.as_secs_f64(),
        "Sink run complete"
    );

    Ok(Some(report))
}

//! Error types for the sink

use rdkafka::error::KafkaError;
use scylla::transport::errors::{NewSessionError, QueryError};
use thiserror::Error;
use userflow_common::UserflowError;
use uuid::Uuid;

/// Failures talking to the column store
#[derive(Error, Debug)]
pub enum StoreError {
    /// No session could be opened; downstream steps are skipped
    #[error("Could not connect to store at {nodes}: {source}")]
    Connection {
        nodes: String,
        #[source]
        source: NewSessionError,
    },

    #[error("Schema statement failed ({statement}): {source}")]
    Schema {
        statement: String,
        #[source]
        source: QueryError,
    },

    #[error("Insert of row {id} failed: {reason}")]
    RowInsert { id: Uuid, reason: String },

    #[error("Could not bind row values: {0}")]
    Bind(#[from] UserflowError),
}

/// Errors raised by the sink pipeline
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Invalid payload: {reason}")]
    InvalidPayload { reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Kafka consumer error: {0}")]
    Consumer(#[from] KafkaError),
}

impl SinkError {
    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            reason: reason.into(),
        }
    }
}

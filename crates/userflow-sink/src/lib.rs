//! Userflow Sink
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Reads normalized user records off the `users_created` topic and stores one
//! row per record in a Cassandra-compatible column store.
//!
//! # Overview
//!
//! - **Config**: environment-driven broker and store settings
//! - **Payload**: decoding and validation of topic payloads into [`payload::UserRow`]
//! - **Store**: keyspace and table creation plus prepared inserts
//! - **Consumer**: the Kafka subscription and the per-payload pipeline
//! - **Runner**: one sink run from connect to unsubscribe

pub mod config;
pub mod consumer;
pub mod error;
pub mod payload;
pub mod runner;
pub mod store;

pub use config::SinkConfig;
pub use consumer::{SinkPipeline, SinkReport};
pub use error::{SinkError, StoreError};
pub use payload::{decode_payload, UserRow};
pub use store::{CassandraStore, RowWriter};

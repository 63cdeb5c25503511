//! Userflow Producer Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Fetches random user identities, normalizes them and publishes them to the
//! `users_created` Kafka topic for a bounded time window.
//!
//! # Modules
//!
//! - **source**: HTTP fetcher for raw identities
//! - **normalize**: Raw identity to [`userflow_common::NormalizedUserRecord`]
//! - **publisher**: Kafka outbound channel
//! - **delivery**: The bounded delivery loop and its failure policy
//! - **pipeline**: One invocation wired to the real source and broker
//! - **scheduler**: Daily cron trigger
//!
//! # Example
//!
//! ```no_run
//! use userflow_producer::{config::ProducerConfig, pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ProducerConfig::load()?;
//!     let report = pipeline::stream_data(&config).await?;
//!     tracing::info!(published = report.published, "Done");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod delivery;
pub mod normalize;
pub mod pipeline;
pub mod publisher;
pub mod scheduler;
pub mod source;

pub use delivery::{DeliveryConfig, DeliveryLoop, DeliveryReport, LoopState};
pub use normalize::{normalize, MalformedRecordError};
pub use source::{FetchError, RawIdentityRecord, RecordSource};

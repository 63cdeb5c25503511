//! Userflow Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the userflow pipeline.
//!
//! # Overview
//!
//! - **Logging**: `tracing` subscriber setup shared by the producer and sink binaries
//! - **Error Handling**: Common error and result types
//! - **Env**: Typed environment-variable lookups used by both configs
//! - **Record**: The normalized user record that travels over the `users_created` topic
//! - **Schema**: The declared store schema used for both table creation and inserts
//!
//! # Example
//!
//! ```no_run
//! use userflow_common::record::NormalizedUserRecord;
//!
//! fn publishable(record: &NormalizedUserRecord) -> userflow_common::Result<Vec<u8>> {
//!     record.to_payload()
//! }
//! ```

pub mod env;
pub mod error;
pub mod logging;
pub mod record;
pub mod schema;

// Re-export commonly used types
pub use error::{Result, UserflowError};
pub use record::NormalizedUserRecord;
pub use schema::{TableSchema, USER_COLUMNS};

/// Topic the producer publishes normalized records to.
pub const USERS_TOPIC: &str = "users_created";

//! Sink configuration
//!
//! Read from the environment (after `.env`) with compiled-in defaults for a
//! broker and store running on the local machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use userflow_common::schema::{DEFAULT_KEYSPACE, DEFAULT_TABLE};
use userflow_common::{env, TableSchema, UserflowError, USERS_TOPIC};

// ============================================================================
// Sink Configuration Constants
// ============================================================================

/// Broker address as seen from the host.
pub const DEFAULT_KAFKA_BOOTSTRAP_SERVERS: &str = "localhost:9092";

/// Consumer group used when none is configured.
pub const DEFAULT_KAFKA_GROUP_ID: &str = "userflow-sink";

/// Store contact points.
pub const DEFAULT_CASSANDRA_NODES: &str = "localhost:9042";

/// Replication factor for the keyspace when it is first created.
pub const DEFAULT_REPLICATION_FACTOR: u32 = 1;

/// Where a new consumer group starts reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartingOffsets {
    #[default]
    Earliest,
    Latest,
}

impl StartingOffsets {
    /// Value for librdkafka's `auto.offset.reset`
    pub fn as_kafka(self) -> &'static str {
        match self {
            StartingOffsets::Earliest => "earliest",
            StartingOffsets::Latest => "latest",
        }
    }
}

impl fmt::Display for StartingOffsets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_kafka())
    }
}

impl FromStr for StartingOffsets {
    type Err = UserflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "earliest" | "smallest" => Ok(StartingOffsets::Earliest),
            "latest" | "largest" => Ok(StartingOffsets::Latest),
            other => Err(UserflowError::config(format!(
                "unknown starting offsets '{other}', expected earliest or latest"
            ))),
        }
    }
}

/// Full sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    pub kafka: ConsumerConfig,
    pub store: StoreConfig,
}

/// Broker settings for the consumer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    pub bootstrap_servers: Vec<String>,
    pub topic: String,
    pub group_id: String,
    pub starting_offsets: StartingOffsets,
}

/// Column store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub nodes: Vec<String>,
    pub keyspace: String,
    pub table: String,
    pub replication_factor: u32,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

impl SinkConfig {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = SinkConfig {
            kafka: ConsumerConfig {
                bootstrap_servers: env::list_or(
                    "KAFKA_BOOTSTRAP_SERVERS",
                    DEFAULT_KAFKA_BOOTSTRAP_SERVERS,
                ),
                topic: env::string_or("KAFKA_TOPIC", USERS_TOPIC),
                group_id: env::string_or("KAFKA_GROUP_ID", DEFAULT_KAFKA_GROUP_ID),
                starting_offsets: env::parse_or(
                    "KAFKA_STARTING_OFFSETS",
                    StartingOffsets::default(),
                )?,
            },
            store: StoreConfig {
                nodes: env::list_or("CASSANDRA_NODES", DEFAULT_CASSANDRA_NODES),
                keyspace: env::string_or("CASSANDRA_KEYSPACE", DEFAULT_KEYSPACE),
                table: env::string_or("CASSANDRA_TABLE", DEFAULT_TABLE),
                replication_factor: env::parse_or(
                    "CASSANDRA_REPLICATION_FACTOR",
                    DEFAULT_REPLICATION_FACTOR,
                )?,
                username: env::optional("CASSANDRA_USERNAME"),
                password: env::optional("CASSANDRA_PASSWORD"),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.kafka.bootstrap_servers.is_empty() {
            anyhow::bail!("KAFKA_BOOTSTRAP_SERVERS must name at least one broker");
        }

        if self.kafka.topic.trim().is_empty() {
            anyhow::bail!("KAFKA_TOPIC cannot be empty");
        }

        if self.kafka.group_id.trim().is_empty() {
            anyhow::bail!("KAFKA_GROUP_ID cannot be empty");
        }

        if self.store.nodes.is_empty() {
            anyhow::bail!("CASSANDRA_NODES must name at least one node");
        }

        if self.store.replication_factor == 0 {
            anyhow::bail!("CASSANDRA_REPLICATION_FACTOR must be greater than 0");
        }

        if self.store.username.is_some() != self.store.password.is_some() {
            anyhow::bail!("CASSANDRA_USERNAME and CASSANDRA_PASSWORD must be set together");
        }

        self.schema()?;

        Ok(())
    }

    /// The user table under the configured keyspace and table names
    pub fn schema(&self) -> userflow_common::Result<TableSchema> {
        TableSchema::users(&self.store.keyspace, &self.store.table)
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kafka: ConsumerConfig {
                bootstrap_servers: vec![DEFAULT_KAFKA_BOOTSTRAP_SERVERS.to_string()],
                topic: USERS_TOPIC.to_string(),
                group_id: DEFAULT_KAFKA_GROUP_ID.to_string(),
                starting_offsets: StartingOffsets::Earliest,
            },
            store: StoreConfig {
                nodes: vec![DEFAULT_CASSANDRA_NODES.to_string()],
                keyspace: DEFAULT_KEYSPACE.to_string(),
                table: DEFAULT_TABLE.to_string(),
                replication_factor: DEFAULT_REPLICATION_FACTOR,
                username: None,
                password: None,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 10] = [
        "KAFKA_BOOTSTRAP_SERVERS",
        "KAFKA_TOPIC",
        "KAFKA_GROUP_ID",
        "KAFKA_STARTING_OFFSETS",
        "CASSANDRA_NODES",
        "CASSANDRA_KEYSPACE",
        "CASSANDRA_TABLE",
        "CASSANDRA_REPLICATION_FACTOR",
        "CASSANDRA_USERNAME",
        "CASSANDRA_PASSWORD",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults_read_from_earliest() {
        let config = SinkConfig::default();

        assert_eq!(config.kafka.topic, "users_created");
        assert_eq!(config.kafka.starting_offsets.as_kafka(), "earliest");
        assert_eq!(config.store.keyspace, "spark_streams");
        assert_eq!(config.store.table, "created_users");
        assert_eq!(config.store.replication_factor, 1);
        config.validate().unwrap();
    }

    #[test]
    fn test_starting_offsets_parse() {
        assert_eq!(
            "LATEST".parse::<StartingOffsets>().unwrap(),
            StartingOffsets::Latest
        );
        assert_eq!(
            "smallest".parse::<StartingOffsets>().unwrap(),
            StartingOffsets::Earliest
        );
        assert!("beginning".parse::<StartingOffsets>().is_err());
    }

    #[test]
    #[serial]
    fn test_load_from_env() {
        clear_env();
        std::env::set_var("CASSANDRA_NODES", "cassandra:9042");
        std::env::set_var("CASSANDRA_KEYSPACE", "users_ks");
        std::env::set_var("CASSANDRA_USERNAME", "cassandra");
        std::env::set_var("CASSANDRA_PASSWORD", "cassandra");
        std::env::set_var("KAFKA_STARTING_OFFSETS", "latest");

        let config = SinkConfig::load().unwrap();
        assert_eq!(config.store.nodes, vec!["cassandra:9042"]);
        assert_eq!(config.schema().unwrap().qualified_name(), "users_ks.created_users");
        assert_eq!(config.store.username.as_deref(), Some("cassandra"));
        assert_eq!(config.kafka.starting_offsets, StartingOffsets::Latest);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_load_rejects_half_credentials() {
        clear_env();
        std::env::set_var("CASSANDRA_USERNAME", "cassandra");

        assert!(SinkConfig::load().is_err());

        clear_env();
    }

    #[test]
    fn test_validate_rejects_bad_keyspace() {
        let mut config = SinkConfig::default();
        config.store.keyspace = "spark-streams".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_replication() {
        let mut config = SinkConfig::default();
        config.store.replication_factor = 0;
        assert!(config.validate().is_err());
    }
}

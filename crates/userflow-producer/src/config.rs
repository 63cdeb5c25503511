//! Producer configuration
//!
//! Loaded from the environment (after `.env`) on top of compiled-in defaults,
//! then validated before anything connects.

use apalis_cron::Schedule;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use userflow_common::{env, USERS_TOPIC};

// ============================================================================
// Producer Configuration Constants
// ============================================================================

/// Public endpoint returning one random identity per request.
pub const DEFAULT_SOURCE_URL: &str = "https://randomuser.me/api/";

/// Timeout for a single source request in seconds.
pub const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 10;

/// Broker address as seen from inside the compose network.
pub const DEFAULT_KAFKA_BOOTSTRAP_SERVERS: &str = "broker:29092";

/// Upper bound on how long a publish may block, in milliseconds.
pub const DEFAULT_KAFKA_MAX_BLOCK_MS: u64 = 5000;

/// How long one delivery run keeps streaming, in seconds.
pub const DEFAULT_STREAM_DURATION_SECS: u64 = 60;

/// Longest accepted delivery window: one scheduling period.
pub const MAX_STREAM_DURATION_SECS: u64 = 86_400;

/// Largest `message.timeout.ms` librdkafka accepts.
pub const MAX_KAFKA_MAX_BLOCK_MS: u64 = i32::MAX as u64;

/// Job name registered with the scheduler.
pub const DEFAULT_JOB_NAME: &str = "user_automation";

/// Name of the job's single task.
pub const DEFAULT_TASK_NAME: &str = "stream_data_from_api";

/// Run once a day.
pub const DEFAULT_SCHEDULE: &str = "@daily";

/// Ticks before this date are ignored.
pub const DEFAULT_SCHEDULE_START_DATE: &str = "2024-12-21";

/// Full producer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerConfig {
    pub source: SourceConfig,
    pub kafka: KafkaConfig,
    pub stream: StreamConfig,
    pub schedule: ScheduleConfig,
}

/// Identity source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub url: String,
    pub timeout_secs: u64,
}

/// Broker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    pub bootstrap_servers: Vec<String>,
    pub topic: String,
    pub max_block_ms: u64,
}

/// Delivery loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    pub duration_secs: u64,
}

/// Recurring job definition handed to the scheduler
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub job_name: String,
    pub task_name: String,
    /// Cron expression or shorthand such as `@daily`
    pub cron: String,
    /// Missed runs are never replayed; `true` is rejected by validation
    pub catchup: bool,
    pub start_date: NaiveDate,
}

impl ProducerConfig {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = ProducerConfig {
            source: SourceConfig {
                url: env::string_or("USERFLOW_SOURCE_URL", DEFAULT_SOURCE_URL),
                timeout_secs: env::parse_or(
                    "USERFLOW_SOURCE_TIMEOUT_SECS",
                    DEFAULT_SOURCE_TIMEOUT_SECS,
                )?,
            },
            kafka: KafkaConfig {
                bootstrap_servers: env::list_or(
                    "KAFKA_BOOTSTRAP_SERVERS",
                    DEFAULT_KAFKA_BOOTSTRAP_SERVERS,
                ),
                topic: env::string_or("KAFKA_TOPIC", USERS_TOPIC),
                max_block_ms: env::parse_or("KAFKA_MAX_BLOCK_MS", DEFAULT_KAFKA_MAX_BLOCK_MS)?,
            },
            stream: StreamConfig {
                duration_secs: env::parse_or(
                    "USERFLOW_STREAM_DURATION_SECS",
                    DEFAULT_STREAM_DURATION_SECS,
                )?,
            },
            schedule: ScheduleConfig {
                job_name: DEFAULT_JOB_NAME.to_string(),
                task_name: DEFAULT_TASK_NAME.to_string(),
                cron: env::string_or("USERFLOW_SCHEDULE", DEFAULT_SCHEDULE),
                catchup: false,
                start_date: env::parse_or(
                    "USERFLOW_SCHEDULE_START_DATE",
                    default_start_date(),
                )?,
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        reqwest::Url::parse(&self.source.url)
            .map_err(|e| anyhow::anyhow!("Invalid source URL '{}': {}", self.source.url, e))?;

        if self.source.timeout_secs == 0 {
            anyhow::bail!("USERFLOW_SOURCE_TIMEOUT_SECS must be greater than 0");
        }

        if self.kafka.bootstrap_servers.is_empty() {
            anyhow::bail!("KAFKA_BOOTSTRAP_SERVERS must name at least one broker");
        }

        if self.kafka.topic.trim().is_empty() {
            anyhow::bail!("KAFKA_TOPIC cannot be empty");
        }

        if self.kafka.max_block_ms == 0 || self.kafka.max_block_ms > MAX_KAFKA_MAX_BLOCK_MS {
            anyhow::bail!(
                "KAFKA_MAX_BLOCK_MS must be between 1 and {}",
                MAX_KAFKA_MAX_BLOCK_MS
            );
        }

        if self.stream.duration_secs == 0 || self.stream.duration_secs > MAX_STREAM_DURATION_SECS {
            anyhow::bail!(
                "USERFLOW_STREAM_DURATION_SECS must be between 1 and {}",
                MAX_STREAM_DURATION_SECS
            );
        }

        self.schedule.validate()?;

        Ok(())
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_secs)
    }

    pub fn max_block(&self) -> Duration {
        Duration::from_millis(self.kafka.max_block_ms)
    }

    pub fn stream_duration(&self) -> Duration {
        Duration::from_secs(self.stream.duration_secs)
    }
}

impl ScheduleConfig {
    /// Parse the cron expression
    pub fn schedule(&self) -> anyhow::Result<Schedule> {
        Schedule::from_str(&self.cron)
            .map_err(|e| anyhow::anyhow!("Invalid schedule '{}': {}", self.cron, e))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.catchup {
            anyhow::bail!("Catching up missed runs is not supported");
        }
        self.schedule()?;
        Ok(())
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig {
                url: DEFAULT_SOURCE_URL.to_string(),
                timeout_secs: DEFAULT_SOURCE_TIMEOUT_SECS,
            },
            kafka: KafkaConfig {
                bootstrap_servers: vec![DEFAULT_KAFKA_BOOTSTRAP_SERVERS.to_string()],
                topic: USERS_TOPIC.to_string(),
                max_block_ms: DEFAULT_KAFKA_MAX_BLOCK_MS,
            },
            stream: StreamConfig {
                duration_secs: DEFAULT_STREAM_DURATION_SECS,
            },
            schedule: ScheduleConfig::default(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            job_name: DEFAULT_JOB_NAME.to_string(),
            task_name: DEFAULT_TASK_NAME.to_string(),
            cron: DEFAULT_SCHEDULE.to_string(),
            catchup: false,
            start_date: default_start_date(),
        }
    }
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_str(DEFAULT_SCHEDULE_START_DATE).unwrap_or_default()
}

//! Userflow Sink - stores records from Kafka in Cassandra

use anyhow::Result;
use clap::Parser;
use tracing::warn;
use userflow_common::logging::{init_logging, LogConfig, LogLevel};
use userflow_sink::{runner, SinkConfig};

#[derive(Parser, Debug)]
#[command(name = "userflow-sink")]
#[command(author, version, about = "Consume user records from Kafka into Cassandra")]
struct Cli {
    /// Stop after this many messages
    #[arg(short, long)]
    max_messages: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("userflow-sink")
        .filter_directives("rdkafka=warn,scylla=warn")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    let config = SinkConfig::load()?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    runner::run(&config, cli.max_messages, shutdown).await?;

    Ok(())
}

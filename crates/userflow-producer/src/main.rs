//! Userflow Producer - streams random users onto Kafka

use anyhow::Result;
use clap::Parser;
use tracing::info;
use userflow_common::logging::{init_logging, LogConfig, LogLevel};
use userflow_producer::{config::ProducerConfig, pipeline, scheduler::JobScheduler};

#[derive(Parser, Debug)]
#[command(name = "userflow-producer")]
#[command(author, version, about = "Publish random user records to Kafka")]
struct Cli {
    #[command(subcommand)]
    mode: Mode,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Mode {
    /// Run a single delivery window now and exit
    RunOnce {
        /// Override the stream duration in seconds
        #[arg(short, long)]
        duration: Option<u64>,
    },

    /// Run the daily job until interrupted
    Schedule,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the flag
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("userflow-producer")
        .filter_directives("rdkafka=warn,reqwest=info")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    let mut config = ProducerConfig::load()?;

    match cli.mode {
        Mode::RunOnce { duration } => {
            if let Some(secs) = duration {
                config.stream.duration_secs = secs;
                config.validate()?;
            }
            let report = pipeline::stream_data(&config).await?;
            info!(
                iterations = report.iterations,
                published = report.published,
                failed = report.failures(),
                "Delivery run complete"
            );
        },
        Mode::Schedule => {
            let handle = JobScheduler::new(config).start()?;
            handle.await?;
        },
    }

    Ok(())
}

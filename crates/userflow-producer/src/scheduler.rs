//! Job scheduler
//!
//! Registers the recurring `user_automation` job with apalis. Each cron tick
//! runs one delivery invocation. Invocations are serialized: a tick that fires
//! while a run is in progress waits for it to finish.

use anyhow::Result;
use apalis::prelude::*;
use apalis_cron::CronStream;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::ProducerConfig;
use crate::pipeline::stream_data;

/// Payload produced by the cron stream for every tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamTick(pub DateTime<Utc>);

impl From<DateTime<Utc>> for StreamTick {
    fn from(t: DateTime<Utc>) -> Self {
        StreamTick(t)
    }
}

impl StreamTick {
    /// Ticks before the job's start date are ignored
    pub fn is_due(&self, start_date: NaiveDate) -> bool {
        self.0.date_naive() >= start_date
    }
}

/// Shared by every tick of the job
#[derive(Clone)]
struct JobContext {
    config: Arc<ProducerConfig>,
    run_lock: Arc<Mutex<()>>,
}

/// Job scheduler
pub struct JobScheduler {
    config: ProducerConfig,
}

impl JobScheduler {
    pub fn new(config: ProducerConfig) -> Self {
        Self { config }
    }

    /// Start the cron worker in a background task.
    ///
    /// The task runs until Ctrl-C.
    pub fn start(self) -> Result<JoinHandle<()>> {
        let schedule = self.config.schedule.schedule()?;
        let job_name = self.config.schedule.job_name.clone();

        info!(
            job = %job_name,
            task = %self.config.schedule.task_name,
            schedule = %self.config.schedule.cron,
            start_date = %self.config.schedule.start_date,
            "Starting job scheduler"
        );

        let context = JobContext {
            config: Arc::new(self.config),
            run_lock: Arc::new(Mutex::new(())),
        };

        let worker = WorkerBuilder::new(job_name)
            .data(context)
            .backend(CronStream::new(schedule))
            .build_fn(stream_data_from_api);

        let handle = tokio::spawn(async move {
            info!("Job worker started");
            if let Err(e) = Monitor::new()
                .register(worker)
                .run_with_signal(tokio::signal::ctrl_c())
                .await
            {
                error!("Job worker error: {:?}", e);
            }
            info!("Job worker stopped");
        });

        Ok(handle)
    }
}

/// Run one delivery invocation for a cron tick
async fn stream_data_from_api(tick: StreamTick, context: Data<JobContext>) {
    let start_date = context.config.schedule.start_date;
    if !tick.is_due(start_date) {
        info!(tick = %tick.0, %start_date, "Tick precedes start date, skipping");
        return;
    }

    let _running = context.run_lock.lock().await;
    info!(tick = %tick.0, "Scheduled delivery run triggered");

    match stream_data(&context.config).await {
        Ok(report) => info!(
            published = report.published,
            failed = report.failures(),
            "Scheduled delivery run completed"
        ),
        Err(e) => error!(error = ?e, "Scheduled delivery run failed"),
    }
}

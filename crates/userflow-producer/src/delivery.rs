//! Bounded delivery loop
//!
//! Repeatedly fetches, normalizes, encodes and publishes one identity per
//! iteration until the configured duration has passed. Per-iteration failures
//! are logged and skipped; the loop has no pacing, no backoff and no retry
//! limit. The duration check happens at the top of each iteration only, so an
//! iteration in flight is never interrupted.

use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{error, info, info_span, Instrument};

use crate::normalize::{normalize, MalformedRecordError};
use crate::publisher::{PublishError, RecordPublisher};
use crate::source::{FetchError, RecordSource};

/// Settings for one delivery run
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    pub topic: String,
    pub duration: Duration,
}

/// Loop lifecycle. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Failure of a single stage within one iteration
#[derive(Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Malformed(#[from] MalformedRecordError),

    #[error("Failed to encode record: {0}")]
    Encode(#[from] userflow_common::UserflowError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// What the loop does after a stage fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Log and move on to the next iteration
    SkipIteration,
    /// Stop the run and return the error to the caller
    Abort,
}

impl StageError {
    /// Failure policy, one row per error kind
    pub fn disposition(&self) -> Disposition {
        match self {
            StageError::Fetch(_) => Disposition::SkipIteration,
            StageError::Malformed(_) => Disposition::SkipIteration,
            StageError::Encode(_) => Disposition::SkipIteration,
            StageError::Publish(PublishError::Timeout { .. }) => Disposition::SkipIteration,
            StageError::Publish(PublishError::Broker { .. }) => Disposition::SkipIteration,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StageError::Fetch(_) => "fetch",
            StageError::Malformed(_) => "malformed",
            StageError::Encode(_) => "encode",
            StageError::Publish(PublishError::Timeout { .. }) => "publish_timeout",
            StageError::Publish(PublishError::Broker { .. }) => "publish",
        }
    }
}

/// A stage error whose policy is [`Disposition::Abort`]
#[derive(Error, Debug)]
#[error("Delivery run aborted after {iterations} iterations: {source}")]
pub struct DeliveryAborted {
    pub iterations: u64,
    #[source]
    pub source: StageError,
}

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub iterations: u64,
    pub published: u64,
    pub fetch_failures: u64,
    pub malformed_records: u64,
    pub encode_failures: u64,
    pub publish_timeouts: u64,
    pub publish_failures: u64,
    pub elapsed: Duration,
}

impl DeliveryReport {
    pub fn failures(&self) -> u64 {
        self.fetch_failures
            + self.malformed_records
            + self.encode_failures
            + self.publish_timeouts
            + self.publish_failures
    }

    fn record_failure(&mut self, error: &StageError) {
        match error {
            StageError::Fetch(_) => self.fetch_failures += 1,
            StageError::Malformed(_) => self.malformed_records += 1,
            StageError::Encode(_) => self.encode_failures += 1,
            StageError::Publish(PublishError::Timeout { .. }) => self.publish_timeouts += 1,
            StageError::Publish(PublishError::Broker { .. }) => self.publish_failures += 1,
        }
    }
}

/// Drives a [`RecordSource`] into a [`RecordPublisher`] for a bounded time
pub struct DeliveryLoop<'a, S: ?Sized, P: ?Sized> {
    source: &'a S,
    publisher: &'a P,
    config: DeliveryConfig,
    state: LoopState,
}

impl<'a, S, P> DeliveryLoop<'a, S, P>
where
    S: RecordSource + ?Sized,
    P: RecordPublisher + ?Sized,
{
    pub fn new(source: &'a S, publisher: &'a P, config: DeliveryConfig) -> Self {
        Self {
            source,
            publisher,
            config,
            state: LoopState::Running,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Run until the duration has elapsed.
    ///
    /// Returns `Err` only for a stage error whose policy is
    /// [`Disposition::Abort`]. Either way the loop ends in [`LoopState::Stopped`].
    pub async fn run(&mut self) -> Result<DeliveryReport, DeliveryAborted> {
        let span = info_span!("delivery", topic = %self.config.topic);
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&mut self) -> Result<DeliveryReport, DeliveryAborted> {
        let started = Instant::now();
        // A duration too large to represent means the loop has no deadline
        let deadline = started.checked_add(self.config.duration);
        let mut report = DeliveryReport::default();

        info!(duration_secs = self.config.duration.as_secs_f64(), "Delivery loop started");

        while self.state == LoopState::Running {
            if deadline.is_some_and(|deadline| Instant::now() > deadline) {
                self.state = LoopState::Stopped;
                break;
            }

            report.iterations += 1;

            match self.deliver_one().await {
                Ok(()) => report.published += 1,
                Err(e) => {
                    report.record_failure(&e);
                    error!(kind = e.kind(), iteration = report.iterations, error = %e, "Delivery iteration failed");

                    if e.disposition() == Disposition::Abort {
                        self.state = LoopState::Stopped;
                        return Err(DeliveryAborted {
                            iterations: report.iterations,
                            source: e,
                        });
                    }
                },
            }
        }

        report.elapsed = started.elapsed();

        info!(
            iterations = report.iterations,
            published = report.published,
            failed = report.failures(),
            elapsed_secs = report.elapsed.as_secs_f64(),
            "Delivery loop stopped"
        );

        Ok(report)
    }

    async fn deliver_one(&self) -> Result<(), StageError> {
        let raw = self.source.fetch().await?;
        let record = normalize(&raw)?;
        let payload = record.to_payload()?;
        self.publisher.publish(&self.config.topic, &payload).await?;
        Ok(())
    }
}

//! Identity source
//!
//! Fetches one raw user record per call from the random-user API. The record
//! is kept as an opaque JSON value; shaping it is the normalizer's job.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// One element of the API's `results` array, as received
#[derive(Debug, Clone, PartialEq)]
pub struct RawIdentityRecord(serde_json::Value);

impl RawIdentityRecord {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Failure to obtain a raw record
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Source returned HTTP {status}")]
    Status { status: u16 },

    #[error("Source response could not be decoded: {0}")]
    Decode(String),

    #[error("Source response contained no results")]
    EmptyResults,
}

/// Anything that can hand the delivery loop one raw identity at a time
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch(&self) -> Result<RawIdentityRecord, FetchError>;
}

#[derive(Deserialize)]
struct ApiResponse {
    results: Vec<serde_json::Value>,
}

/// HTTP source backed by `https://randomuser.me/api/` (or a compatible endpoint)
pub struct RandomUserSource {
    client: Client,
    url: String,
}

impl RandomUserSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn transport_error(&self, source: reqwest::Error) -> FetchError {
        if source.is_timeout() {
            FetchError::Timeout {
                url: self.url.clone(),
            }
        } else {
            FetchError::Transport {
                url: self.url.clone(),
                source,
            }
        }
    }
}

#[async_trait]
impl RecordSource for RandomUserSource {
    async fn fetch(&self) -> Result<RawIdentityRecord, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        let parsed: ApiResponse =
            serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        debug!(results = parsed.results.len(), "Fetched identity batch");

        parsed
            .results
            .into_iter()
            .next()
            .map(RawIdentityRecord::new)
            .ok_or(FetchError::EmptyResults)
    }
}

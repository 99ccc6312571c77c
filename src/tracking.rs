//! Tracked-task signals
//!
//! Every effective supplier update is counted as one completed task for the
//! process in the municipality's task-tracking service.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Tracking errors
#[derive(Debug, Clone, Error)]
pub enum TrackingError {
    #[error("Tracking request failed: {0}")]
    RequestFailed(String),
    #[error("Tracking service returned status {0}")]
    UnexpectedStatus(u16),
}

/// Records completed tasks per process
#[async_trait]
pub trait TaskTracker: Send + Sync {
    async fn track_task(&self, process_name: &str) -> Result<(), TrackingError>;
}

#[derive(Debug, Serialize)]
struct TrackedTask<'a> {
    process_name: &'a str,
    timestamp: String,
}

/// Tracker posting to the tracking service over HTTP with basic auth
#[derive(Debug, Clone)]
pub struct HttpTracker {
    url: String,
    username: String,
    password: String,
    client: Client,
}

impl HttpTracker {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TrackingError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TrackingError::RequestFailed(e.to_string()))?;

        Ok(Self {
            url: url.into(),
            username: username.into(),
            password: password.into(),
            client,
        })
    }
}

#[async_trait]
impl TaskTracker for HttpTracker {
    async fn track_task(&self, process_name: &str) -> Result<(), TrackingError> {
        let body = TrackedTask {
            process_name,
            timestamp: Utc::now().to_rfc3339(),
        };

        let response = self
            .client
            .post(&self.url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| TrackingError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrackingError::UnexpectedStatus(status.as_u16()));
        }

        debug!(process_name, "Tracked task");
        Ok(())
    }
}

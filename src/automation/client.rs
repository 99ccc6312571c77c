//! HTTP client for the automation server
//!
//! Connection details come from the environment, the same way the scheduler
//! hands them to every process it starts:
//!
//! - `ATS_URL` - base URL of the automation server API
//! - `ATS_TOKEN` - bearer token for this process run
//! - `ATS_WORKQUEUE` - id of the workqueue bound to this process
//!
//! The variable names can be changed in the `[automation_server]` config
//! section.

use super::{AutomationError, Credential, CredentialStore, WorkItem, WorkItemStatus, WorkQueue};
use crate::config::{AutomationServerSection, JobConfig};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Automation server client implementing [`WorkQueue`] and [`CredentialStore`]
#[derive(Debug, Clone)]
pub struct AutomationServerClient {
    base_url: Url,
    token: String,
    workqueue_id: Option<i64>,
    client: Client,
}

impl AutomationServerClient {
    /// Create a client for an explicit server
    pub fn new(
        base_url: &str,
        token: impl Into<String>,
        workqueue_id: Option<i64>,
        timeout: Duration,
    ) -> Result<Self, AutomationError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AutomationError::NotConfigured(format!("invalid URL {base_url}: {e}")))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AutomationError::RequestFailed(e.to_string()))?;

        Ok(Self {
            base_url,
            token: token.into(),
            workqueue_id,
            client,
        })
    }

    /// Create a client from the environment variables named in `section`
    ///
    /// The workqueue variable is optional so that credential lookups work for
    /// processes without a queue; queue operations then fail with
    /// [`AutomationError::NotConfigured`].
    pub fn from_environment(section: &AutomationServerSection) -> Result<Self, AutomationError> {
        let url = JobConfig::get_env_var_required(&section.url_env)
            .map_err(|e| AutomationError::NotConfigured(e.to_string()))?;
        let token = JobConfig::get_env_var_required(&section.token_env)
            .map_err(|e| AutomationError::NotConfigured(e.to_string()))?;

        let workqueue_id = match std::env::var(&section.workqueue_env) {
            Ok(raw) => Some(raw.trim().parse::<i64>().map_err(|e| {
                AutomationError::NotConfigured(format!(
                    "{} is not a workqueue id: {e}",
                    section.workqueue_env
                ))
            })?),
            Err(_) => None,
        };

        info!(url = %url, workqueue_id = ?workqueue_id, "Connecting to automation server");
        Self::new(
            &url,
            token,
            workqueue_id,
            Duration::from_millis(section.timeout_ms),
        )
    }

    pub fn workqueue_id(&self) -> Option<i64> {
        self.workqueue_id
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, AutomationError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AutomationError::NotConfigured(format!("{} cannot be a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn workqueue_endpoint(&self, action: &str) -> Result<Url, AutomationError> {
        let id = self.workqueue_id.ok_or_else(|| {
            AutomationError::NotConfigured("no workqueue bound to this process".to_string())
        })?;
        self.endpoint(&["workqueues", &id.to_string(), action])
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, AutomationError> {
        request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| AutomationError::RequestFailed(e.to_string()))
    }
}

/// Turn non-success responses into errors
fn ensure_success(response: Response) -> Result<Response, AutomationError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(AutomationError::UnexpectedStatus {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    response: Response,
) -> Result<T, AutomationError> {
    response
        .json::<T>()
        .await
        .map_err(|e| AutomationError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl CredentialStore for AutomationServerClient {
    async fn get_credential(&self, name: &str) -> Result<Credential, AutomationError> {
        let url = self.endpoint(&["credentials", "by_name", name])?;
        debug!(credential = name, "Fetching credential");

        let response = self.send(self.client.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(AutomationError::CredentialNotFound(name.to_string()));
        }
        parse_json(ensure_success(response)?).await
    }
}

#[async_trait]
impl WorkQueue for AutomationServerClient {
    async fn add_item(&self, data: Value, reference: &str) -> Result<WorkItem, AutomationError> {
        let url = self.workqueue_endpoint("add")?;
        let body = json!({ "data": data, "reference": reference });

        let response = self.send(self.client.post(url).json(&body)).await?;
        parse_json(ensure_success(response)?).await
    }

    async fn clear(&self, status: WorkItemStatus) -> Result<(), AutomationError> {
        let url = self.workqueue_endpoint("clear")?;
        let body = json!({ "workitem_status": status });

        let response = self.send(self.client.post(url).json(&body)).await?;
        ensure_success(response)?;
        info!(status = %status, "Cleared workqueue partition");
        Ok(())
    }

    async fn next_item(&self) -> Result<Option<WorkItem>, AutomationError> {
        let url = self.workqueue_endpoint("next_item")?;

        let response = self.send(self.client.get(url)).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        parse_json(ensure_success(response)?).await.map(Some)
    }

    async fn set_status(
        &self,
        item_id: i64,
        status: WorkItemStatus,
        message: Option<&str>,
    ) -> Result<(), AutomationError> {
        let url = self.endpoint(&["workitems", &item_id.to_string(), "status"])?;
        let body = json!({ "status": status, "message": message.unwrap_or_default() });

        let response = self.send(self.client.put(url).json(&body)).await?;
        ensure_success(response)?;
        Ok(())
    }
}

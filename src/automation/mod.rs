//! Automation server collaborators: work queue and credential store
//!
//! The job only needs a handful of operations from the automation server,
//! expressed as two traits so the workflow can run against the HTTP client
//! in production and against mocks in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub mod client;
pub mod lease;

pub use client::AutomationServerClient;
pub use lease::WorkItemLease;

/// Named credential from the credential store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credential {
    pub username: String,
    pub password: String,
    /// Free-form extra fields, e.g. the Nexus `instance`
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Credential {
    /// String value from the extra data
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(Value::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// Work item as handed out by the queue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkItem {
    pub id: i64,
    pub data: Value,
    #[serde(default)]
    pub reference: String,
}

/// Work item states known to the automation server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemStatus {
    New,
    InProgress,
    Completed,
    Failed,
    PendingUserAction,
}

impl WorkItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkItemStatus::New => "new",
            WorkItemStatus::InProgress => "in_progress",
            WorkItemStatus::Completed => "completed",
            WorkItemStatus::Failed => "failed",
            WorkItemStatus::PendingUserAction => "pending_user_action",
        }
    }
}

impl std::fmt::Display for WorkItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Automation server errors
#[derive(Debug, Clone, Error)]
pub enum AutomationError {
    #[error("Automation server not configured: {0}")]
    NotConfigured(String),
    #[error("Credential not found: {0}")]
    CredentialNotFound(String),
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Credential lookup by logical name
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_credential(&self, name: &str) -> Result<Credential, AutomationError>;
}

/// Work queue used for both population and processing
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Add an item with a human-readable reference label
    async fn add_item(&self, data: Value, reference: &str) -> Result<WorkItem, AutomationError>;

    /// Remove every item currently in `status`
    async fn clear(&self, status: WorkItemStatus) -> Result<(), AutomationError>;

    /// Lease the next pending item, `None` once the queue is drained
    async fn next_item(&self) -> Result<Option<WorkItem>, AutomationError>;

    /// Move a leased item to a terminal state
    async fn set_status(
        &self,
        item_id: i64,
        status: WorkItemStatus,
        message: Option<&str>,
    ) -> Result<(), AutomationError>;

    async fn complete(&self, item_id: i64) -> Result<(), AutomationError> {
        self.set_status(item_id, WorkItemStatus::Completed, None)
            .await
    }

    async fn fail(&self, item_id: i64, message: &str) -> Result<(), AutomationError> {
        self.set_status(item_id, WorkItemStatus::Failed, Some(message))
            .await
    }
}

//! Data-quality reporting
//!
//! Suppliers without a postal code, or with a postal code the mapping table
//! does not know, are expected business exceptions. They are sent to the
//! reporting service grouped by category so someone can fix the source data;
//! the work item itself is simply consumed.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Reporting errors
#[derive(Debug, Clone, Error)]
pub enum ReportError {
    #[error("Report request failed: {0}")]
    RequestFailed(String),
    #[error("Reporting service returned status {0}")]
    UnexpectedStatus(u16),
}

/// Report groups used by this job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataQualityCategory {
    MissingPostalCode,
    UnmappedPostalCode,
}

impl DataQualityCategory {
    /// Group name as shown in the reports
    pub fn group(&self) -> &'static str {
        match self {
            DataQualityCategory::MissingPostalCode => "Manglende postnummer",
            DataQualityCategory::UnmappedPostalCode => "Postnummer uden kommunekode",
        }
    }
}

impl std::fmt::Display for DataQualityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.group())
    }
}

/// A reportable data-quality condition for one supplier
#[derive(Debug, Clone, PartialEq)]
pub struct DataQualityIssue {
    pub category: DataQualityCategory,
    /// Work item reference, `"<id> - <name>"`
    pub supplier: String,
    pub postal_code: Option<String>,
}

impl DataQualityIssue {
    pub fn missing_postal_code(supplier: impl Into<String>) -> Self {
        Self {
            category: DataQualityCategory::MissingPostalCode,
            supplier: supplier.into(),
            postal_code: None,
        }
    }

    pub fn unmapped_postal_code(supplier: impl Into<String>, postal_code: impl Into<String>) -> Self {
        Self {
            category: DataQualityCategory::UnmappedPostalCode,
            supplier: supplier.into(),
            postal_code: Some(postal_code.into()),
        }
    }

    /// Report payload
    pub fn payload(&self) -> Value {
        match &self.postal_code {
            Some(postal_code) => json!({
                "Leverandør": self.supplier,
                "Postnummer": postal_code,
            }),
            None => json!({ "Leverandør": self.supplier }),
        }
    }
}

/// Sink for structured exception reports
#[async_trait]
pub trait Reporter: Send + Sync {
    async fn report(&self, report_id: &str, group: &str, payload: &Value)
        -> Result<(), ReportError>;
}

#[derive(Debug, Serialize)]
struct ReportRecord<'a> {
    report_id: &'a str,
    group: &'a str,
    json: &'a Value,
}

/// Reporter posting to the reporting service over HTTP with basic auth
#[derive(Debug, Clone)]
pub struct HttpReporter {
    url: String,
    username: String,
    password: String,
    client: Client,
}

impl HttpReporter {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ReportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReportError::RequestFailed(e.to_string()))?;

        Ok(Self {
            url: url.into(),
            username: username.into(),
            password: password.into(),
            client,
        })
    }
}

#[async_trait]
impl Reporter for HttpReporter {
    async fn report(
        &self,
        report_id: &str,
        group: &str,
        payload: &Value,
    ) -> Result<(), ReportError> {
        let record = ReportRecord {
            report_id,
            group,
            json: payload,
        };

        let response = self
            .client
            .post(&self.url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&record)
            .send()
            .await
            .map_err(|e| ReportError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::UnexpectedStatus(status.as_u16()));
        }

        debug!(report_id, group, "Sent report");
        Ok(())
    }
}

/// Reporter used when reporting is disabled: the record only goes to the log
#[derive(Debug, Clone, Default)]
pub struct LogReporter;

#[async_trait]
impl Reporter for LogReporter {
    async fn report(
        &self,
        report_id: &str,
        group: &str,
        payload: &Value,
    ) -> Result<(), ReportError> {
        info!(report_id, group, payload = %payload, "Data-quality report");
        Ok(())
    }
}

//! Error types for the municipality code job
//!
//! [`JobError`] covers everything that stops a run before or between items.
//! Per-item problems never surface as `JobError`; they are folded into a
//! [`crate::workflow::StepOutcome`] and recorded against the work item.

use crate::automation::AutomationError;
use crate::config::ConfigError;
use crate::mapping::MappingError;
use crate::nexus::NexusError;
use crate::rules::RulesError;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Fatal errors that terminate the run with a non-zero exit status
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mapping table error: {0}")]
    Mapping(#[from] MappingError),

    #[error("Rules workbook error: {0}")]
    Rules(#[from] RulesError),

    #[error("Automation server error: {0}")]
    Automation(#[from] AutomationError),

    #[error("Nexus error: {0}")]
    Nexus(#[from] NexusError),

    #[error("Credential '{name}' is missing field '{field}'")]
    IncompleteCredential { name: String, field: String },

    #[error("Startup failed: {message}")]
    Startup { message: String },
}

impl JobError {
    /// Create a startup error
    pub fn startup<S: Into<String>>(message: S) -> Self {
        Self::Startup {
            message: message.into(),
        }
    }

    /// Create an incomplete credential error
    pub fn incomplete_credential(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::IncompleteCredential {
            name: name.into(),
            field: field.into(),
        }
    }
}

/// Result type for job-level operations
pub type JobResult<T> = Result<T, JobError>;

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(password|token|secret|client_secret|authorization)"?\s*[=:]\s*\S+"#)
        .expect("secret pattern is a valid regex")
});

static BEARER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)bearer\s+\S+").expect("bearer pattern is a valid regex"));

const MAX_FAILURE_MESSAGE_LEN: usize = 500;

/// Sanitize a failure message before it is stored on a work item
///
/// Work item messages are visible to the people doing manual follow-up, so
/// credentials echoed back in upstream error bodies are masked and very long
/// messages are truncated.
pub fn sanitize_failure_message(message: &str) -> String {
    let mut sanitized = SECRET_PATTERN
        .replace_all(message, "${1}=***")
        .to_string();
    sanitized = BEARER_PATTERN
        .replace_all(&sanitized, "Bearer ***")
        .to_string();

    if sanitized.len() > MAX_FAILURE_MESSAGE_LEN {
        let suffix = "...[truncated]";
        let mut cut = MAX_FAILURE_MESSAGE_LEN - suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..cut], suffix);
    }

    sanitized
}

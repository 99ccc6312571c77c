//! Job configuration
//!
//! Every section has defaults matching the production setup, so a run works
//! without a config file. Secrets never live here: the `[credentials]`
//! section only names entries in the automation server's credential store.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Placeholder substituted with the Nexus instance from the credential
pub const INSTANCE_PLACEHOLDER: &str = "{instance}";

/// Main job configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct JobConfig {
    #[serde(default)]
    pub process: ProcessSection,
    #[serde(default)]
    pub automation_server: AutomationServerSection,
    #[serde(default)]
    pub credentials: CredentialsSection,
    #[serde(default)]
    pub nexus: NexusSection,
    #[serde(default)]
    pub tracking: TrackingSection,
    #[serde(default)]
    pub reporting: ReportingSection,
}

/// Process identity and static inputs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProcessSection {
    /// Process name, also the task name sent to the tracker
    pub name: String,
    /// Report id used for data-quality reports
    pub report_id: String,
    /// Postal code to municipality code table
    pub mapping_file: PathBuf,
    /// Column in the rules workbook listing suppliers to skip
    pub exclusion_column: String,
}

impl Default for ProcessSection {
    fn default() -> Self {
        Self {
            name: "Opdatering af kommunekode på leverandør i Nexus".to_string(),
            report_id: "opdatering_af_kommunekode_paa_leverandoer_i_nexus".to_string(),
            mapping_file: PathBuf::from("postnumre_med_kommunekode.json"),
            exclusion_column: "Irrelevante leverandører".to_string(),
        }
    }
}

/// Where to find the automation server connection in the environment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AutomationServerSection {
    /// Environment variable containing the server base URL
    pub url_env: String,
    /// Environment variable containing the API token
    pub token_env: String,
    /// Environment variable containing the workqueue id
    pub workqueue_env: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for AutomationServerSection {
    fn default() -> Self {
        Self {
            url_env: "ATS_URL".to_string(),
            token_env: "ATS_TOKEN".to_string(),
            workqueue_env: "ATS_WORKQUEUE".to_string(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Logical credential names in the credential store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CredentialsSection {
    pub nexus: String,
    pub tracking: String,
    pub reporting: String,
}

impl Default for CredentialsSection {
    fn default() -> Self {
        Self {
            nexus: "KMD Nexus - produktion".to_string(),
            tracking: "Odense SQL Server".to_string(),
            reporting: "RoboA".to_string(),
        }
    }
}

/// Nexus endpoints, with `{instance}` placeholders
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NexusSection {
    pub base_url: String,
    pub token_url: String,
    pub timeout_ms: u64,
}

impl Default for NexusSection {
    fn default() -> Self {
        Self {
            base_url: "https://{instance}.nexus.kmd.dk/api/core/mobile/{instance}/v2/".to_string(),
            token_url:
                "https://iam.nexus.kmd.dk/authx/realms/{instance}/protocol/openid-connect/token"
                    .to_string(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl NexusSection {
    /// Base URL with the instance substituted
    pub fn base_url_for(&self, instance: &str) -> String {
        self.base_url.replace(INSTANCE_PLACEHOLDER, instance)
    }

    /// Token URL with the instance substituted
    pub fn token_url_for(&self, instance: &str) -> String {
        self.token_url.replace(INSTANCE_PLACEHOLDER, instance)
    }
}

/// Task tracking endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackingSection {
    pub url: String,
    pub timeout_ms: u64,
}

impl Default for TrackingSection {
    fn default() -> Self {
        Self {
            url: "https://tracking.odense.dk/api/tasks".to_string(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Data-quality reporting endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportingSection {
    /// When disabled, reports are written to the log only
    pub enabled: bool,
    pub url: String,
    pub timeout_ms: u64,
}

impl Default for ReportingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "https://reporting.odense.dk/api/reports".to_string(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl JobConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: JobConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde defaults cannot guard
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.process.name.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "process.name must not be empty".to_string(),
            ));
        }
        if self.process.report_id.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "process.report_id must not be empty".to_string(),
            ));
        }
        if self.process.exclusion_column.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "process.exclusion_column must not be empty".to_string(),
            ));
        }
        for (field, value) in [
            ("nexus.base_url", &self.nexus.base_url),
            ("nexus.token_url", &self.nexus.token_url),
        ] {
            if !value.contains(INSTANCE_PLACEHOLDER) {
                return Err(ConfigError::InvalidConfig(format!(
                    "{field} must contain the {INSTANCE_PLACEHOLDER} placeholder"
                )));
            }
        }
        if self.reporting.enabled && self.reporting.url.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "reporting.url must be set when reporting is enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// Read a required environment variable
    pub fn get_env_var_required(env_var_name: &str) -> Result<String, ConfigError> {
        std::env::var(env_var_name)
            .map_err(|_| ConfigError::EnvVarNotFound(env_var_name.to_string()))
    }
}

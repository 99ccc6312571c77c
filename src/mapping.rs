//! Postal code to municipality code table
//!
//! The table is a JSON array of `{"Postnr": .., "Kommunenr": ..}` objects
//! where either field may be written as a string or a number. It is loaded
//! once at startup and only read afterwards.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors while loading the mapping table
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Mapping file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read mapping file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse mapping file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One row of the mapping file as written on disk
#[derive(Debug, Clone, Deserialize)]
pub struct MappingEntry {
    #[serde(rename = "Postnr")]
    pub postal_code: Value,
    #[serde(rename = "Kommunenr")]
    pub municipality_code: Value,
}

/// Read-only lookup from postal code to municipality code
#[derive(Debug, Clone, Default)]
pub struct MunicipalityMapping {
    codes: HashMap<String, String>,
}

impl MunicipalityMapping {
    /// Load the mapping table from a JSON file
    pub fn load(path: &Path) -> Result<Self, MappingError> {
        if !path.is_file() {
            return Err(MappingError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| MappingError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mapping = Self::from_json(&content).map_err(|source| MappingError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        info!(
            path = %path.display(),
            entries = mapping.len(),
            "Loaded postal code mapping"
        );
        Ok(mapping)
    }

    /// Parse the mapping table from JSON text
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<MappingEntry> = serde_json::from_str(content)?;
        Ok(Self::from_entries(entries))
    }

    /// Build the lookup; the first entry for a postal code wins
    pub fn from_entries(entries: impl IntoIterator<Item = MappingEntry>) -> Self {
        let mut codes = HashMap::new();

        for entry in entries {
            let (Some(postal_code), Some(municipality_code)) = (
                normalize_code(&entry.postal_code),
                normalize_code(&entry.municipality_code),
            ) else {
                warn!(?entry, "Skipping mapping entry without usable codes");
                continue;
            };

            if let Some(existing) = codes.get(&postal_code) {
                debug!(
                    postal_code = %postal_code,
                    kept = %existing,
                    ignored = %municipality_code,
                    "Duplicate postal code in mapping"
                );
                continue;
            }
            codes.insert(postal_code, municipality_code);
        }

        Self { codes }
    }

    /// Municipality code for a postal code, if the table has one
    pub fn lookup(&self, postal_code: &str) -> Option<&str> {
        self.codes.get(postal_code.trim()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Render a string or number code as a trimmed string
///
/// Integral floats (`5000.0`) render without a fraction so they compare equal
/// to the string form. Null, empty strings and other JSON types yield `None`.
pub fn normalize_code(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                n.as_f64().map(|f| {
                    if f.fract() == 0.0 {
                        format!("{f:.0}")
                    } else {
                        f.to_string()
                    }
                })
            }
        }
        _ => None,
    }
}

//! Nexus supplier (organisation) access
//!
//! Nexus is a hypermedia API: listing entries carry `_links` that resolve to
//! the full resource, and full resources carry the link used to update them.
//! Records are kept as the complete JSON document so fields this job does not
//! know about survive a fetch, mutate, write-back cycle untouched.

use crate::mapping::normalize_code;
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub mod client;

pub use client::NexusClient;

/// Nexus API errors
#[derive(Debug, Clone, Error)]
pub enum NexusError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Resource has no '{0}' link")]
    MissingLink(String),
    #[error("Supplier {id} has no address")]
    MissingAddress { id: i64 },
}

/// Lightweight supplier entry from the bulk listing
#[derive(Debug, Clone, PartialEq)]
pub struct SupplierReference {
    pub id: i64,
    pub name: String,
    pub active: bool,
    raw: Value,
}

impl SupplierReference {
    /// Parse a listing entry; only `id` is required
    pub fn from_json(raw: Value) -> Result<Self, NexusError> {
        let id = raw.get("id").and_then(Value::as_i64).ok_or_else(|| {
            NexusError::InvalidResponse(format!("supplier reference without id: {raw}"))
        })?;
        let name = raw
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        // Anything but a literal `true` counts as inactive
        let active = raw.get("active").and_then(Value::as_bool) == Some(true);

        Ok(Self {
            id,
            name,
            active,
            raw,
        })
    }

    /// Build a reference without links, mostly useful for tests
    pub fn new(id: i64, name: impl Into<String>, active: bool) -> Self {
        let name = name.into();
        let raw = serde_json::json!({ "id": id, "name": name, "active": active });
        Self {
            id,
            name,
            active,
            raw,
        }
    }

    /// Work item label: `"<id> - <name>"`
    pub fn label(&self) -> String {
        format!("{} - {}", self.id, self.name)
    }

    pub fn link(&self, rel: &str) -> Option<&str> {
        link_href(&self.raw, rel)
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// Full supplier resource
#[derive(Debug, Clone, PartialEq)]
pub struct SupplierRecord(Value);

impl SupplierRecord {
    pub fn from_json(raw: Value) -> Result<Self, NexusError> {
        if raw.get("id").and_then(Value::as_i64).is_none() {
            return Err(NexusError::InvalidResponse(format!(
                "supplier record without id: {raw}"
            )));
        }
        Ok(Self(raw))
    }

    pub fn id(&self) -> i64 {
        self.0.get("id").and_then(Value::as_i64).unwrap_or_default()
    }

    fn address(&self) -> Result<&Map<String, Value>, NexusError> {
        self.0
            .get("address")
            .and_then(Value::as_object)
            .ok_or(NexusError::MissingAddress { id: self.id() })
    }

    /// `address.administrativeAreaCode`, normalised to a string
    pub fn municipality_code(&self) -> Result<Option<String>, NexusError> {
        Ok(self
            .address()?
            .get("administrativeAreaCode")
            .and_then(normalize_code))
    }

    /// `address.postalCode`, normalised to a string
    pub fn postal_code(&self) -> Result<Option<String>, NexusError> {
        Ok(self.address()?.get("postalCode").and_then(normalize_code))
    }

    /// Replace `address.administrativeAreaCode`
    pub fn set_municipality_code(&mut self, code: &str) -> Result<(), NexusError> {
        let id = self.id();
        let address = self
            .0
            .get_mut("address")
            .and_then(Value::as_object_mut)
            .ok_or(NexusError::MissingAddress { id })?;
        address.insert(
            "administrativeAreaCode".to_string(),
            Value::String(code.to_string()),
        );
        Ok(())
    }

    pub fn link(&self, rel: &str) -> Option<&str> {
        link_href(&self.0, rel)
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }
}

fn link_href<'a>(resource: &'a Value, rel: &str) -> Option<&'a str> {
    resource
        .get("_links")
        .and_then(|links| links.get(rel))
        .and_then(|link| link.get("href"))
        .and_then(Value::as_str)
}

/// Where suppliers come from and are written back to
#[async_trait]
pub trait SupplierSource: Send + Sync {
    /// Every supplier reference, active or not
    async fn list_suppliers(&self) -> Result<Vec<SupplierReference>, NexusError>;

    /// Only references whose `active` flag is `true`
    async fn list_active_suppliers(&self) -> Result<Vec<SupplierReference>, NexusError> {
        Ok(self
            .list_suppliers()
            .await?
            .into_iter()
            .filter(|supplier| supplier.active)
            .collect())
    }

    /// Expand a reference into the full record
    async fn resolve(&self, reference: &SupplierReference) -> Result<SupplierRecord, NexusError>;

    /// Persist a mutated record
    async fn update(&self, record: &SupplierRecord) -> Result<(), NexusError>;
}

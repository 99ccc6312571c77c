//! Mock implementations for testing
//!
//! Provides mock WorkQueue, CredentialStore, SupplierSource, TaskTracker and
//! Reporter implementations that record every call, so workflow tests can
//! run without an automation server or Nexus instance.

use crate::automation::{
    AutomationError, Credential, CredentialStore, WorkItem, WorkItemStatus, WorkQueue,
};
use crate::nexus::{NexusError, SupplierRecord, SupplierReference, SupplierSource};
use crate::reporting::{ReportError, Reporter};
use crate::tracking::{TaskTracker, TrackingError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// One observed collaborator call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    AddItem { reference: String },
    ClearQueue(WorkItemStatus),
    SetStatus { item_id: i64, status: WorkItemStatus },
    ListSuppliers,
    Resolve(i64),
    Update { supplier_id: i64 },
    TrackTask(String),
    Report { group: String },
}

/// Call log that several mocks can share to check ordering across them
pub type CallLog = Arc<Mutex<Vec<Call>>>;

/// Terminal state recorded for a work item
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub item_id: i64,
    pub status: WorkItemStatus,
    pub message: Option<String>,
}

/// Mock work queue; added items are also queued for processing
#[derive(Debug)]
pub struct MockWorkQueue {
    pending: Mutex<VecDeque<WorkItem>>,
    added: Mutex<Vec<WorkItem>>,
    statuses: Mutex<Vec<StatusUpdate>>,
    next_id: AtomicI64,
    fail_references: HashSet<String>,
    calls: CallLog,
}

impl Default for MockWorkQueue {
    fn default() -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            added: Mutex::new(Vec::new()),
            statuses: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
            fail_references: HashSet::new(),
            calls: CallLog::default(),
        }
    }
}

impl MockWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load pending items
    pub fn with_items<I, S>(self, items: I) -> Self
    where
        I: IntoIterator<Item = (Value, S)>,
        S: Into<String>,
    {
        let pending = items
            .into_iter()
            .map(|(data, reference)| WorkItem {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                data,
                reference: reference.into(),
            })
            .collect();
        Self {
            pending: Mutex::new(pending),
            ..self
        }
    }

    /// Make `add_item` fail for this reference label
    pub fn fail_add_for(mut self, reference: impl Into<String>) -> Self {
        self.fail_references.insert(reference.into());
        self
    }

    pub fn with_log(self, calls: CallLog) -> Self {
        Self { calls, ..self }
    }

    pub async fn added_items(&self) -> Vec<WorkItem> {
        self.added.lock().await.clone()
    }

    pub async fn pending_items(&self) -> Vec<WorkItem> {
        self.pending.lock().await.iter().cloned().collect()
    }

    pub async fn status_updates(&self) -> Vec<StatusUpdate> {
        self.statuses.lock().await.clone()
    }

    pub async fn status_of(&self, item_id: i64) -> Option<StatusUpdate> {
        self.statuses
            .lock()
            .await
            .iter()
            .find(|update| update.item_id == item_id)
            .cloned()
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl WorkQueue for MockWorkQueue {
    async fn add_item(&self, data: Value, reference: &str) -> Result<WorkItem, AutomationError> {
        self.calls.lock().await.push(Call::AddItem {
            reference: reference.to_string(),
        });

        if self.fail_references.contains(reference) {
            return Err(AutomationError::UnexpectedStatus {
                status: 500,
                url: "mock://workqueue/add".to_string(),
            });
        }

        let item = WorkItem {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            data,
            reference: reference.to_string(),
        };
        self.added.lock().await.push(item.clone());
        self.pending.lock().await.push_back(item.clone());
        Ok(item)
    }

    async fn clear(&self, status: WorkItemStatus) -> Result<(), AutomationError> {
        self.calls.lock().await.push(Call::ClearQueue(status));
        if status == WorkItemStatus::New {
            self.pending.lock().await.clear();
        }
        Ok(())
    }

    async fn next_item(&self) -> Result<Option<WorkItem>, AutomationError> {
        Ok(self.pending.lock().await.pop_front())
    }

    async fn set_status(
        &self,
        item_id: i64,
        status: WorkItemStatus,
        message: Option<&str>,
    ) -> Result<(), AutomationError> {
        self.calls
            .lock()
            .await
            .push(Call::SetStatus { item_id, status });
        self.statuses.lock().await.push(StatusUpdate {
            item_id,
            status,
            message: message.map(str::to_string),
        });
        Ok(())
    }
}

/// Mock credential store
#[derive(Debug, Default)]
pub struct MockCredentialStore {
    credentials: HashMap<String, Credential>,
}

impl MockCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(mut self, name: impl Into<String>, credential: Credential) -> Self {
        self.credentials.insert(name.into(), credential);
        self
    }
}

#[async_trait]
impl CredentialStore for MockCredentialStore {
    async fn get_credential(&self, name: &str) -> Result<Credential, AutomationError> {
        self.credentials
            .get(name)
            .cloned()
            .ok_or_else(|| AutomationError::CredentialNotFound(name.to_string()))
    }
}

/// Mock Nexus; updates are applied to the stored records
#[derive(Debug, Default)]
pub struct MockSupplierSource {
    suppliers: Vec<SupplierReference>,
    records: Mutex<HashMap<i64, Value>>,
    updates: Mutex<Vec<SupplierRecord>>,
    fail_resolve: HashSet<i64>,
    fail_update: HashSet<i64>,
    calls: CallLog,
}

impl MockSupplierSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listed supplier with the full record `resolve` returns
    pub fn with_supplier(mut self, reference: SupplierReference, record: Value) -> Self {
        self.records.get_mut().insert(reference.id, record);
        self.suppliers.push(reference);
        self
    }

    /// Add a listed supplier whose record has the given address codes
    pub fn with_address(
        self,
        id: i64,
        name: &str,
        active: bool,
        postal_code: Option<&str>,
        municipality_code: Option<&str>,
    ) -> Self {
        let record = supplier_record(id, name, postal_code, municipality_code);
        self.with_supplier(SupplierReference::new(id, name, active), record)
    }

    pub fn fail_resolve_for(mut self, id: i64) -> Self {
        self.fail_resolve.insert(id);
        self
    }

    pub fn fail_update_for(mut self, id: i64) -> Self {
        self.fail_update.insert(id);
        self
    }

    pub fn with_log(self, calls: CallLog) -> Self {
        Self { calls, ..self }
    }

    /// Records passed to `update`, in call order
    pub async fn updates(&self) -> Vec<SupplierRecord> {
        self.updates.lock().await.clone()
    }

    pub async fn record(&self, id: i64) -> Option<Value> {
        self.records.lock().await.get(&id).cloned()
    }

    /// Change a record behind the job's back
    pub async fn set_record(&self, id: i64, record: Value) {
        self.records.lock().await.insert(id, record);
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl SupplierSource for MockSupplierSource {
    async fn list_suppliers(&self) -> Result<Vec<SupplierReference>, NexusError> {
        self.calls.lock().await.push(Call::ListSuppliers);
        Ok(self.suppliers.clone())
    }

    async fn resolve(&self, reference: &SupplierReference) -> Result<SupplierRecord, NexusError> {
        self.calls.lock().await.push(Call::Resolve(reference.id));

        if self.fail_resolve.contains(&reference.id) {
            return Err(NexusError::RequestFailed(format!(
                "mock resolve failure for {}",
                reference.id
            )));
        }

        let record = self
            .records
            .lock()
            .await
            .get(&reference.id)
            .cloned()
            .ok_or_else(|| NexusError::UnexpectedStatus {
                status: 404,
                url: format!("mock://suppliers/{}", reference.id),
            })?;
        SupplierRecord::from_json(record)
    }

    async fn update(&self, record: &SupplierRecord) -> Result<(), NexusError> {
        self.calls.lock().await.push(Call::Update {
            supplier_id: record.id(),
        });

        if self.fail_update.contains(&record.id()) {
            return Err(NexusError::UnexpectedStatus {
                status: 409,
                url: format!("mock://suppliers/{}", record.id()),
            });
        }

        self.updates.lock().await.push(record.clone());
        self.records
            .lock()
            .await
            .insert(record.id(), record.as_json().clone());
        Ok(())
    }
}

/// Full supplier record with the given address codes
pub fn supplier_record(
    id: i64,
    name: &str,
    postal_code: Option<&str>,
    municipality_code: Option<&str>,
) -> Value {
    json!({
        "id": id,
        "name": name,
        "active": true,
        "address": {
            "administrativeAreaCode": municipality_code,
            "postalCode": postal_code,
        },
    })
}

/// Mock task tracker
#[derive(Debug, Default)]
pub struct MockTaskTracker {
    tracked: Mutex<Vec<String>>,
    should_fail: bool,
    calls: CallLog,
}

impl MockTaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub fn with_log(self, calls: CallLog) -> Self {
        Self { calls, ..self }
    }

    pub async fn tracked(&self) -> Vec<String> {
        self.tracked.lock().await.clone()
    }
}

#[async_trait]
impl TaskTracker for MockTaskTracker {
    async fn track_task(&self, process_name: &str) -> Result<(), TrackingError> {
        self.calls
            .lock()
            .await
            .push(Call::TrackTask(process_name.to_string()));

        if self.should_fail {
            return Err(TrackingError::UnexpectedStatus(503));
        }
        self.tracked.lock().await.push(process_name.to_string());
        Ok(())
    }
}

/// A report as received by [`MockReporter`]
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedReport {
    pub report_id: String,
    pub group: String,
    pub payload: Value,
}

/// Mock reporting sink
#[derive(Debug, Default)]
pub struct MockReporter {
    reports: Mutex<Vec<ReceivedReport>>,
    should_fail: bool,
    calls: CallLog,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub fn with_log(self, calls: CallLog) -> Self {
        Self { calls, ..self }
    }

    pub async fn reports(&self) -> Vec<ReceivedReport> {
        self.reports.lock().await.clone()
    }
}

#[async_trait]
impl Reporter for MockReporter {
    async fn report(
        &self,
        report_id: &str,
        group: &str,
        payload: &Value,
    ) -> Result<(), ReportError> {
        self.calls.lock().await.push(Call::Report {
            group: group.to_string(),
        });

        if self.should_fail {
            return Err(ReportError::RequestFailed("mock reporting failure".to_string()));
        }
        self.reports.lock().await.push(ReceivedReport {
            report_id: report_id.to_string(),
            group: group.to_string(),
            payload: payload.clone(),
        });
        Ok(())
    }
}

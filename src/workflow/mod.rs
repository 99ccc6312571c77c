//! The reconciliation workflow
//!
//! Two entry points share one [`JobContext`]:
//!
//! - [`populate::populate_queue`] puts one work item per active,
//!   non-excluded supplier on the queue
//! - [`process::process_queue`] drains the queue and fixes the municipality
//!   code of each supplier whose code disagrees with its postal code
//!
//! Per-item steps return a [`StepOutcome`] so the loops can tell apart
//! success, soft errors that route the item to manual handling, and
//! data-quality issues that are reported and otherwise ignored.

use crate::automation::WorkQueue;
use crate::config::ProcessSection;
use crate::mapping::normalize_code;
use crate::nexus::SupplierSource;
use crate::reporting::{DataQualityIssue, Reporter};
use crate::tracking::TaskTracker;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

pub mod populate;
pub mod process;
pub mod summary;

pub use populate::populate_queue;
pub use process::process_queue;
pub use summary::RunSummary;

/// Everything a run needs, built once at startup and passed by reference
pub struct JobContext {
    pub run_id: Uuid,
    /// Process name; also the task name sent to the tracker
    pub process_name: String,
    /// Report id for data-quality reports
    pub report_id: String,
    pub queue: Arc<dyn WorkQueue>,
    pub suppliers: Arc<dyn SupplierSource>,
    pub tracker: Arc<dyn TaskTracker>,
    pub reporter: Arc<dyn Reporter>,
}

impl JobContext {
    pub fn new(
        process: &ProcessSection,
        queue: Arc<dyn WorkQueue>,
        suppliers: Arc<dyn SupplierSource>,
        tracker: Arc<dyn TaskTracker>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            process_name: process.name.clone(),
            report_id: process.report_id.clone(),
            queue,
            suppliers,
            tracker,
            reporter,
        }
    }
}

impl std::fmt::Debug for JobContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobContext")
            .field("run_id", &self.run_id)
            .field("process_name", &self.process_name)
            .field("report_id", &self.report_id)
            .finish_non_exhaustive()
    }
}

/// Result of one per-item step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome<T> {
    /// The step succeeded
    Ok(T),
    /// Business-logic failure; the item goes to manual handling
    SoftError(String),
    /// Expected data problem; reported, the item is consumed
    DataQuality(DataQualityIssue),
}

impl<T> StepOutcome<T> {
    pub fn soft_error(message: impl std::fmt::Display) -> Self {
        StepOutcome::SoftError(message.to_string())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, StepOutcome::Ok(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> StepOutcome<U> {
        match self {
            StepOutcome::Ok(value) => StepOutcome::Ok(f(value)),
            StepOutcome::SoftError(message) => StepOutcome::SoftError(message),
            StepOutcome::DataQuality(issue) => StepOutcome::DataQuality(issue),
        }
    }
}

/// Unwrap an `Ok` step or return the interruption from the enclosing function
macro_rules! step {
    ($outcome:expr) => {
        match $outcome {
            $crate::workflow::StepOutcome::Ok(value) => value,
            $crate::workflow::StepOutcome::SoftError(message) => {
                return $crate::workflow::StepOutcome::SoftError(message)
            }
            $crate::workflow::StepOutcome::DataQuality(issue) => {
                return $crate::workflow::StepOutcome::DataQuality(issue)
            }
        }
    };
}
pub(crate) use step;

/// Work item payload: a snapshot of the supplier at population time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuePayload {
    #[serde(rename = "leverandør_id")]
    pub supplier_id: i64,
    #[serde(rename = "kommunekode", default, deserialize_with = "code_from_json")]
    pub municipality_code: Option<String>,
    #[serde(rename = "postnummer", default, deserialize_with = "code_from_json")]
    pub postal_code: Option<String>,
}

impl QueuePayload {
    pub fn from_json(data: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(data)
    }
}

fn code_from_json<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(normalize_code(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_serializes_with_queue_keys() {
        let payload = QueuePayload {
            supplier_id: 42,
            municipality_code: Some("461".to_string()),
            postal_code: None,
        };

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"leverandør_id": 42, "kommunekode": "461", "postnummer": null})
        );
    }

    #[test]
    fn test_payload_accepts_numeric_and_missing_codes() {
        let payload =
            QueuePayload::from_json(&json!({"leverandør_id": 42, "postnummer": 5000})).unwrap();

        assert_eq!(payload.supplier_id, 42);
        assert_eq!(payload.postal_code.as_deref(), Some("5000"));
        assert_eq!(payload.municipality_code, None);
    }

    #[test]
    fn test_payload_requires_supplier_id() {
        assert!(QueuePayload::from_json(&json!({"postnummer": "5000"})).is_err());
    }

    #[test]
    fn test_step_outcome_map() {
        let outcome: StepOutcome<i32> = StepOutcome::Ok(2);
        assert_eq!(outcome.map(|v| v * 2), StepOutcome::Ok(4));

        let outcome: StepOutcome<i32> = StepOutcome::soft_error("boom");
        assert_eq!(
            outcome.map(|v| v * 2),
            StepOutcome::SoftError("boom".to_string())
        );
    }

    fn first_ok(a: StepOutcome<i32>, b: StepOutcome<i32>) -> StepOutcome<i32> {
        let a = step!(a);
        let b = step!(b);
        StepOutcome::Ok(a + b)
    }

    #[test]
    fn test_step_macro_short_circuits() {
        assert_eq!(
            first_ok(StepOutcome::Ok(1), StepOutcome::Ok(2)),
            StepOutcome::Ok(3)
        );

        let issue = DataQualityIssue::missing_postal_code("1 - x");
        assert_eq!(
            first_ok(StepOutcome::DataQuality(issue.clone()), StepOutcome::Ok(2)),
            StepOutcome::DataQuality(issue)
        );
        assert!(!first_ok(StepOutcome::Ok(1), StepOutcome::soft_error("x")).is_ok());
    }
}

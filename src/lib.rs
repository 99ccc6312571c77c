//! Municipality code reconciliation for Nexus suppliers
//!
//! A scheduled job that keeps the municipality code (`administrativeAreaCode`)
//! on supplier records in KMD Nexus consistent with the supplier's postal
//! code.
//!
//! # Overview
//!
//! The job runs in one of two modes against a work queue on the automation
//! server:
//! - **populate** (`--queue`): one work item per active supplier that is not
//!   listed in the rules workbook, holding a snapshot of its id, postal code
//!   and municipality code
//! - **process**: drain the queue, look up the municipality code for each
//!   postal code and update suppliers whose live code differs
//!
//! Suppliers without a postal code, or with a postal code missing from the
//! mapping table, are reported as data-quality issues rather than failed.
//!
//! # Quick Start
//!
//! ```rust
//! use kommunekode_sync::mapping::MunicipalityMapping;
//! use kommunekode_sync::workflow::{process::check_municipality_code, QueuePayload, StepOutcome};
//!
//! let mapping = MunicipalityMapping::from_json(r#"[{"Postnr": 5000, "Kommunenr": "461"}]"#)
//!     .unwrap();
//! let payload = QueuePayload {
//!     supplier_id: 42,
//!     municipality_code: Some("999".to_string()),
//!     postal_code: Some("5000".to_string()),
//! };
//!
//! let outcome = check_municipality_code("42 - Fysioterapi Syd", &payload, &mapping);
//! assert_eq!(outcome, StepOutcome::Ok("461".to_string()));
//! ```

pub mod automation;
pub mod config;
pub mod error;
pub mod mapping;
pub mod nexus;
pub mod observability;
pub mod reporting;
pub mod rules;
pub mod testing;
pub mod tracking;
pub mod workflow;

pub use config::JobConfig;
pub use error::{JobError, JobResult};
pub use workflow::{populate_queue, process_queue, JobContext, RunSummary, StepOutcome};

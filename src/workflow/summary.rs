//! Per-run counters, logged when a run finishes

use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    // Population
    pub enqueued: u64,
    pub excluded: u64,
    pub populate_failures: u64,

    // Processing
    pub processed: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub supplier_gone: u64,
    pub missing_postal_code: u64,
    pub unmapped_postal_code: u64,
    pub failed: u64,
    pub report_failures: u64,
}

impl RunSummary {
    pub fn log_population(&self) {
        info!(
            enqueued = self.enqueued,
            excluded = self.excluded,
            failures = self.populate_failures,
            "Queue population finished"
        );
    }

    pub fn log_processing(&self) {
        info!(
            processed = self.processed,
            updated = self.updated,
            unchanged = self.unchanged,
            supplier_gone = self.supplier_gone,
            missing_postal_code = self.missing_postal_code,
            unmapped_postal_code = self.unmapped_postal_code,
            failed = self.failed,
            report_failures = self.report_failures,
            "Queue processing finished"
        );
    }
}

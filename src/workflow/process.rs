//! Queue processing
//!
//! Each item moves through the same steps:
//!
//! 1. no postal code in the snapshot: report "Manglende postnummer", done
//! 2. postal code not in the mapping: report "Postnummer uden kommunekode", done
//! 3. supplier no longer listed in Nexus: done
//! 4. live municipality code differs: update the supplier, then track the task
//!
//! Any soft error on the way fails the item with its message and the loop
//! moves on to the next item.

use super::{step, JobContext, QueuePayload, RunSummary, StepOutcome};
use crate::automation::{WorkItem, WorkItemLease};
use crate::error::{sanitize_failure_message, JobResult};
use crate::item_span;
use crate::mapping::MunicipalityMapping;
use crate::nexus::{SupplierRecord, SupplierReference};
use crate::reporting::{DataQualityCategory, DataQualityIssue};
use std::sync::Arc;
use tracing::{debug, error, info, warn, Instrument};

/// What happened to an item that was processed without interruption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemResult {
    /// The municipality code was corrected
    Updated,
    /// The supplier already had the right code
    Unchanged,
    /// The supplier is no longer in the Nexus listing
    SupplierGone,
}

/// Drain the queue, one leased item at a time
///
/// Fetching the supplier listing, leasing the next item and settling an item
/// are fatal when they fail; everything that happens to a single item is not.
pub async fn process_queue(
    ctx: &JobContext,
    mapping: &MunicipalityMapping,
) -> JobResult<RunSummary> {
    let suppliers = ctx.suppliers.list_suppliers().await?;
    info!(
        run_id = %ctx.run_id,
        suppliers = suppliers.len(),
        mapped_postal_codes = mapping.len(),
        "Processing workqueue"
    );

    let mut summary = RunSummary::default();

    while let Some(item) = ctx.queue.next_item().await? {
        let span = item_span!(item_id = item.id, reference = %item.reference);
        let lease = WorkItemLease::new(Arc::clone(&ctx.queue), item);

        let outcome = process_item(ctx, mapping, &suppliers, lease.item())
            .instrument(span.clone())
            .await;
        settle(ctx, lease, outcome, &mut summary)
            .instrument(span)
            .await?;
    }

    summary.log_processing();
    Ok(summary)
}

/// Run the per-item steps for one work item
pub async fn process_item(
    ctx: &JobContext,
    mapping: &MunicipalityMapping,
    suppliers: &[SupplierReference],
    item: &WorkItem,
) -> StepOutcome<ItemResult> {
    let payload = match QueuePayload::from_json(&item.data) {
        Ok(payload) => payload,
        Err(e) => {
            return StepOutcome::soft_error(format!("Invalid work item data {}: {e}", item.data))
        }
    };

    let correct_code = step!(check_municipality_code(&item.reference, &payload, mapping));

    let mut supplier = match step!(check_supplier(ctx, &payload, suppliers).await) {
        Some(supplier) => supplier,
        None => {
            info!(
                supplier_id = payload.supplier_id,
                "Supplier no longer listed in Nexus, skipping"
            );
            return StepOutcome::Ok(ItemResult::SupplierGone);
        }
    };

    let current_code = match supplier.municipality_code() {
        Ok(code) => code,
        Err(e) => return StepOutcome::soft_error(e),
    };

    if current_code.as_deref() == Some(correct_code.as_str()) {
        debug!(
            supplier_id = payload.supplier_id,
            municipality_code = %correct_code,
            "Municipality code already correct"
        );
        return StepOutcome::Ok(ItemResult::Unchanged);
    }

    info!(
        supplier_id = payload.supplier_id,
        current = ?current_code,
        correct = %correct_code,
        "Updating municipality code"
    );

    if let Err(e) = supplier.set_municipality_code(&correct_code) {
        return StepOutcome::soft_error(e);
    }
    if let Err(e) = ctx.suppliers.update(&supplier).await {
        return StepOutcome::soft_error(format!("Failed to update supplier: {e}"));
    }
    if let Err(e) = ctx.tracker.track_task(&ctx.process_name).await {
        return StepOutcome::soft_error(format!("Supplier updated but tracking failed: {e}"));
    }

    StepOutcome::Ok(ItemResult::Updated)
}

/// Steps 1 and 2: the municipality code the supplier should have
pub fn check_municipality_code(
    reference: &str,
    payload: &QueuePayload,
    mapping: &MunicipalityMapping,
) -> StepOutcome<String> {
    let Some(postal_code) = payload.postal_code.as_deref() else {
        info!(reference, "Supplier has no postal code");
        return StepOutcome::DataQuality(DataQualityIssue::missing_postal_code(reference));
    };

    match mapping.lookup(postal_code) {
        Some(code) => StepOutcome::Ok(code.to_string()),
        None => {
            info!(reference, postal_code, "Postal code has no municipality code");
            StepOutcome::DataQuality(DataQualityIssue::unmapped_postal_code(
                reference,
                postal_code,
            ))
        }
    }
}

/// Step 3: the live supplier record, `None` when it is no longer listed
async fn check_supplier(
    ctx: &JobContext,
    payload: &QueuePayload,
    suppliers: &[SupplierReference],
) -> StepOutcome<Option<SupplierRecord>> {
    let Some(reference) = suppliers.iter().find(|s| s.id == payload.supplier_id) else {
        return StepOutcome::Ok(None);
    };

    match ctx.suppliers.resolve(reference).await {
        Ok(record) => StepOutcome::Ok(Some(record)),
        Err(e) => StepOutcome::soft_error(format!("Failed to resolve supplier: {e}")),
    }
}

/// Commit the item's terminal state and count the outcome
async fn settle(
    ctx: &JobContext,
    lease: WorkItemLease,
    outcome: StepOutcome<ItemResult>,
    summary: &mut RunSummary,
) -> JobResult<()> {
    summary.processed += 1;

    match outcome {
        StepOutcome::Ok(result) => {
            match result {
                ItemResult::Updated => summary.updated += 1,
                ItemResult::Unchanged => summary.unchanged += 1,
                ItemResult::SupplierGone => summary.supplier_gone += 1,
            }
            lease.complete().await?;
        }
        StepOutcome::DataQuality(issue) => {
            match issue.category {
                DataQualityCategory::MissingPostalCode => summary.missing_postal_code += 1,
                DataQualityCategory::UnmappedPostalCode => summary.unmapped_postal_code += 1,
            }
            if !report_issue(ctx, &issue).await {
                summary.report_failures += 1;
            }
            lease.complete().await?;
        }
        StepOutcome::SoftError(message) => {
            error!(data = %lease.item().data, error = %message, "Error processing item");
            summary.failed += 1;
            lease.fail(&sanitize_failure_message(&message)).await?;
        }
    }

    Ok(())
}

/// Best-effort report; returns whether the report was delivered
async fn report_issue(ctx: &JobContext, issue: &DataQualityIssue) -> bool {
    match ctx
        .reporter
        .report(&ctx.report_id, issue.category.group(), &issue.payload())
        .await
    {
        Ok(()) => true,
        Err(e) => {
            warn!(
                supplier = %issue.supplier,
                group = issue.category.group(),
                error = %e,
                "Failed to report data-quality issue"
            );
            false
        }
    }
}

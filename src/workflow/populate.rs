//! Queue population

use super::{JobContext, QueuePayload, RunSummary};
use crate::error::JobResult;
use crate::nexus::SupplierReference;
use crate::populate_span;
use crate::rules::ExclusionList;
use tracing::{debug, error, info, Instrument};

/// Enqueue one work item per active supplier not on the exclusion list
///
/// A supplier that cannot be resolved or enqueued is logged and skipped;
/// population carries on with the remaining suppliers. Only failing to fetch
/// the supplier listing aborts the run.
pub async fn populate_queue(ctx: &JobContext, exclusions: &ExclusionList) -> JobResult<RunSummary> {
    let suppliers = ctx.suppliers.list_active_suppliers().await?;
    info!(
        run_id = %ctx.run_id,
        active_suppliers = suppliers.len(),
        excluded_names = exclusions.len(),
        "Populating workqueue"
    );

    let mut summary = RunSummary::default();

    for supplier in &suppliers {
        if exclusions.contains(&supplier.name) {
            debug!(supplier_id = supplier.id, name = %supplier.name, "Supplier excluded");
            summary.excluded += 1;
            continue;
        }

        let span = populate_span!(supplier_id = supplier.id, reference = %supplier.label());
        match enqueue_supplier(ctx, supplier).instrument(span).await {
            Ok(()) => summary.enqueued += 1,
            Err(message) => {
                error!(
                    supplier_id = supplier.id,
                    reference = %supplier.label(),
                    error = %message,
                    "Failed to add item to workqueue"
                );
                summary.populate_failures += 1;
            }
        }
    }

    summary.log_population();
    Ok(summary)
}

/// Resolve a supplier and put its snapshot on the queue
async fn enqueue_supplier(ctx: &JobContext, supplier: &SupplierReference) -> Result<(), String> {
    let record = ctx
        .suppliers
        .resolve(supplier)
        .await
        .map_err(|e| format!("could not resolve supplier: {e}"))?;

    let payload = QueuePayload {
        supplier_id: record.id(),
        municipality_code: record.municipality_code().map_err(|e| e.to_string())?,
        postal_code: record.postal_code().map_err(|e| e.to_string())?,
    };
    let data = serde_json::to_value(&payload).map_err(|e| e.to_string())?;

    ctx.queue
        .add_item(data.clone(), &supplier.label())
        .await
        .map_err(|e| format!("could not add item {data}: {e}"))?;

    debug!(payload = %data, "Added item to workqueue");
    Ok(())
}

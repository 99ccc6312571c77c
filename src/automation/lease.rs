//! Scoped work item lease
//!
//! A leased item must end in exactly one terminal state. [`WorkItemLease`]
//! is settled by consuming it through [`complete`](WorkItemLease::complete)
//! or [`fail`](WorkItemLease::fail); a lease dropped without being settled
//! (early return, panic unwinding) fails the item from a spawned task so it
//! never stays in progress.

use super::{AutomationError, WorkItem, WorkQueue};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Message stored on items whose lease was dropped unsettled
pub const ABANDONED_MESSAGE: &str = "Processing was aborted before the item was settled";

pub struct WorkItemLease {
    queue: Arc<dyn WorkQueue>,
    item: WorkItem,
    settled: bool,
}

impl WorkItemLease {
    pub fn new(queue: Arc<dyn WorkQueue>, item: WorkItem) -> Self {
        Self {
            queue,
            item,
            settled: false,
        }
    }

    pub fn item(&self) -> &WorkItem {
        &self.item
    }

    /// Mark the item completed
    pub async fn complete(mut self) -> Result<(), AutomationError> {
        self.settled = true;
        debug!(item_id = self.item.id, "Completing work item");
        self.queue.complete(self.item.id).await
    }

    /// Mark the item failed with a message for manual follow-up
    pub async fn fail(mut self, message: &str) -> Result<(), AutomationError> {
        self.settled = true;
        debug!(item_id = self.item.id, reason = %message, "Failing work item");
        self.queue.fail(self.item.id, message).await
    }
}

impl std::fmt::Debug for WorkItemLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkItemLease")
            .field("item", &self.item)
            .field("settled", &self.settled)
            .finish()
    }
}

impl Drop for WorkItemLease {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let item_id = self.item.id;
        warn!(
            item_id,
            reference = %self.item.reference,
            "Work item lease dropped without a terminal state, failing item"
        );

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let queue = Arc::clone(&self.queue);
                handle.spawn(async move {
                    if let Err(e) = queue.fail(item_id, ABANDONED_MESSAGE).await {
                        error!(item_id, error = %e, "Failed to fail abandoned work item");
                    }
                });
            }
            Err(_) => {
                error!(item_id, "No runtime available to fail abandoned work item");
            }
        }
    }
}

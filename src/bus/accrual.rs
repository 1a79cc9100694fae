//! Accrual subscriber for the order completion bus.

use std::sync::Arc;

use futures::future::BoxFuture;

use super::{BusError, OrderHandler, Result};
use crate::ledger::OrderCompleted;
use crate::services::{AccrualOutcome, AccrualTrigger};

/// Applies order completions through the [`AccrualTrigger`].
///
/// Reports an error when any posting failed so the bus retries the order.
/// Postings that did succeed stay committed and are skipped on redelivery.
pub struct AccrualHandler {
    trigger: Arc<AccrualTrigger>,
}

impl AccrualHandler {
    pub fn new(trigger: Arc<AccrualTrigger>) -> Self {
        Self { trigger }
    }
}

impl OrderHandler for AccrualHandler {
    fn handle(&self, order: Arc<OrderCompleted>) -> BoxFuture<'static, Result<()>> {
        let trigger = self.trigger.clone();
        Box::pin(async move {
            let report = trigger
                .process(&order)
                .await
                .map_err(|e| BusError::Accrual {
                    order_id: order.order_id.clone(),
                    reason: e.to_string(),
                })?;

            let failed = report
                .postings
                .iter()
                .find(|p| matches!(p.outcome, AccrualOutcome::Failed { .. }));
            if let Some(failed) = failed {
                return Err(BusError::Accrual {
                    order_id: report.order_id.clone(),
                    reason: format!("{} {}: {}", failed.role, failed.account_id, failed.outcome),
                });
            }
            Ok(())
        })
    }
}

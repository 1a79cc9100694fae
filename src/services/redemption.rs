//! Redemption engine.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::interfaces::ledger_store::{LedgerError, LedgerStore, Result};
use crate::ledger::NewTransaction;

/// Posts customer debits.
///
/// The balance check and the debit are one guarded store operation, so two
/// concurrent redemptions can never both pass against the same balance.
pub struct RedemptionEngine {
    ledger: Arc<dyn LedgerStore>,
}

impl RedemptionEngine {
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self { ledger }
    }

    /// Debit `points` from a customer account.
    ///
    /// Fails with [`LedgerError::InsufficientPoints`] and changes nothing when
    /// the balance is too low.
    pub async fn redeem(
        &self,
        customer_account_id: &str,
        points: i64,
        description: &str,
    ) -> Result<Uuid> {
        if points <= 0 {
            return Err(LedgerError::Validation(format!(
                "points to redeem must be positive, got {points}"
            )));
        }

        let tx = NewTransaction::redeemed(customer_account_id, points, description);
        match self.ledger.append(tx).await {
            Ok(transaction_id) => {
                info!(
                    account_id = customer_account_id,
                    points,
                    %transaction_id,
                    "Points redeemed"
                );
                Ok(transaction_id)
            }
            Err(e @ LedgerError::InsufficientPoints { .. }) => {
                info!(account_id = customer_account_id, points, error = %e, "Redemption rejected");
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}

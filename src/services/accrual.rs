//! Accrual trigger.
//!
//! Turns an order completion into `earned` postings for the customer and, when
//! assigned, the representative. Each account is posted independently: a
//! failure for one never blocks or undoes the other. Redelivery of the same
//! order is absorbed through the ledger's accrual uniqueness rule.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{AccrualConfig, CUSTOMER_POINTS_KEY, REPRESENTATIVE_POINTS_KEY};
use crate::interfaces::ledger_store::{LedgerError, LedgerStore, Result};
use crate::interfaces::settings_store::{SettingsError, SettingsStore};
use crate::ledger::{NewTransaction, OrderCompleted, Role};

/// Result of one account's posting for an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccrualOutcome {
    Posted { transaction_id: Uuid, points: i64 },
    /// An `earned` transaction for this order already exists.
    AlreadyProcessed,
    /// Configured rate is zero or negative.
    Skipped { points: i64 },
    Failed { reason: String },
}

impl AccrualOutcome {
    /// Whether the account ends up credited for this order.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            AccrualOutcome::Posted { .. } | AccrualOutcome::AlreadyProcessed
        )
    }
}

impl fmt::Display for AccrualOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccrualOutcome::Posted { points, .. } => write!(f, "posted {points} points"),
            AccrualOutcome::AlreadyProcessed => f.write_str("already processed"),
            AccrualOutcome::Skipped { points } => write!(f, "skipped (rate {points})"),
            AccrualOutcome::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccrualPosting {
    pub role: Role,
    pub account_id: String,
    pub outcome: AccrualOutcome,
}

/// Per-account outcomes for one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccrualReport {
    pub order_id: String,
    pub postings: Vec<AccrualPosting>,
}

impl AccrualReport {
    pub fn posting(&self, role: Role) -> Option<&AccrualPosting> {
        self.postings.iter().find(|p| p.role == role)
    }

    /// True when every beneficiary is credited, now or earlier.
    pub fn is_complete(&self) -> bool {
        self.postings.iter().all(|p| p.outcome.is_settled())
    }
}

/// Posts order-completion accruals.
///
/// Rates are read from the settings store on every event so admin edits apply
/// immediately; the configured defaults cover missing keys.
pub struct AccrualTrigger {
    ledger: Arc<dyn LedgerStore>,
    settings: Arc<dyn SettingsStore>,
    defaults: AccrualConfig,
}

impl AccrualTrigger {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        settings: Arc<dyn SettingsStore>,
        defaults: AccrualConfig,
    ) -> Self {
        Self {
            ledger,
            settings,
            defaults,
        }
    }

    /// Apply accrual for a completed order.
    ///
    /// Fails only for a malformed event; per-account problems are reported in
    /// the returned [`AccrualReport`].
    pub async fn process(&self, order: &OrderCompleted) -> Result<AccrualReport> {
        if order.order_id.trim().is_empty() {
            return Err(LedgerError::Validation("order_id is required".into()));
        }
        if order.customer_account_id.trim().is_empty() {
            return Err(LedgerError::Validation(
                "customer_account_id is required".into(),
            ));
        }

        debug!(
            order_id = %order.order_id,
            order_value = order.order_value,
            "Processing order completion"
        );

        let mut postings = Vec::with_capacity(2);
        for (role, account_id) in order.beneficiaries() {
            let outcome = self.post(order, role, account_id).await;
            postings.push(AccrualPosting {
                role,
                account_id: account_id.to_string(),
                outcome,
            });
        }

        Ok(AccrualReport {
            order_id: order.order_id.clone(),
            postings,
        })
    }

    async fn post(&self, order: &OrderCompleted, role: Role, account_id: &str) -> AccrualOutcome {
        let points = match self.points_per_order(role).await {
            Ok(points) => points,
            Err(e) => {
                warn!(
                    order_id = %order.order_id,
                    account_id,
                    %role,
                    error = %e,
                    "Accrual rate unavailable"
                );
                return AccrualOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        if points <= 0 {
            debug!(order_id = %order.order_id, account_id, %role, points, "Accrual disabled for role");
            return AccrualOutcome::Skipped { points };
        }

        let tx = NewTransaction::earned(
            account_id,
            role,
            points,
            order.order_id.as_str(),
            format!("Order {} completed", order.order_id),
        )
        .at(order.completed_at);

        match self.ledger.append(tx).await {
            Ok(transaction_id) => {
                info!(
                    order_id = %order.order_id,
                    account_id,
                    %role,
                    points,
                    %transaction_id,
                    "Accrual posted"
                );
                AccrualOutcome::Posted {
                    transaction_id,
                    points,
                }
            }
            Err(LedgerError::DuplicateAccrual { .. }) => {
                debug!(order_id = %order.order_id, account_id, %role, "Accrual already processed");
                AccrualOutcome::AlreadyProcessed
            }
            Err(e) => {
                warn!(
                    order_id = %order.order_id,
                    account_id,
                    %role,
                    error = %e,
                    "Accrual failed"
                );
                AccrualOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Current rate for `role`, falling back to the configured default.
    pub async fn points_per_order(&self, role: Role) -> std::result::Result<i64, SettingsError> {
        let (key, default) = match role {
            Role::Customer => (
                CUSTOMER_POINTS_KEY,
                self.defaults.customer_points_per_order,
            ),
            Role::Representative => (
                REPRESENTATIVE_POINTS_KEY,
                self.defaults.representative_points_per_order,
            ),
        };

        match self.settings.get_i64(key).await {
            Err(SettingsError::NotFound(_)) => {
                debug!(key, default, "Accrual setting missing, using default");
                Ok(default)
            }
            other => other,
        }
    }
}

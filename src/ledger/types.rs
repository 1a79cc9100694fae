//! Ledger domain types.
//!
//! An [`Account`] is a cached projection over its [`Transaction`]s. Accounts
//! are keyed by `(role, account_id)`; the id itself is owned by the external
//! customer or representative registry.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::interfaces::ledger_store::{LedgerError, Result};

/// Account holder role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Representative,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Customer, Role::Representative];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Representative => "representative",
        }
    }

    /// Whether accounts of this role may post the given transaction kind.
    ///
    /// Representatives never redeem.
    pub fn permits(&self, kind: TransactionKind) -> bool {
        !matches!(
            (self, kind),
            (Role::Representative, TransactionKind::Redeemed)
        )
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "customer" => Ok(Role::Customer),
            "representative" => Ok(Role::Representative),
            other => Err(LedgerError::Validation(format!("unknown role: {other}"))),
        }
    }
}

/// Transaction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Earned,
    Redeemed,
    AdminAdjustment,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Earned => "earned",
            TransactionKind::Redeemed => "redeemed",
            TransactionKind::AdminAdjustment => "admin_adjustment",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "earned" => Ok(TransactionKind::Earned),
            "redeemed" => Ok(TransactionKind::Redeemed),
            "admin_adjustment" => Ok(TransactionKind::AdminAdjustment),
            other => Err(LedgerError::Validation(format!(
                "unknown transaction kind: {other}"
            ))),
        }
    }
}

/// Cached balance record for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub role: Role,
    pub balance: i64,
    pub total_earned: i64,
    pub total_redeemed: i64,
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Zero-balance record for an identity with no history.
    pub fn empty(account_id: impl Into<String>, role: Role) -> Self {
        Self {
            account_id: account_id.into(),
            role,
            balance: 0,
            total_earned: 0,
            total_redeemed: 0,
            last_activity_at: None,
        }
    }
}

/// A transaction as stored in the ledger. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: Uuid,
    pub account_id: String,
    pub role: Role,
    pub kind: TransactionKind,
    pub points: i64,
    pub source_order_id: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// A transaction to be appended. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub account_id: String,
    pub role: Role,
    pub kind: TransactionKind,
    pub points: i64,
    pub source_order_id: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl NewTransaction {
    /// Order-triggered accrual. `source_order_id` is the idempotency key.
    pub fn earned(
        account_id: impl Into<String>,
        role: Role,
        points: i64,
        order_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            role,
            kind: TransactionKind::Earned,
            points,
            source_order_id: Some(order_id.into()),
            description: description.into(),
            created_at: Utc::now(),
        }
    }

    /// Debit of `points` (given as a positive amount) from a customer account.
    pub fn redeemed(
        account_id: impl Into<String>,
        points: i64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            role: Role::Customer,
            kind: TransactionKind::Redeemed,
            points: points.saturating_neg(),
            source_order_id: None,
            description: description.into(),
            created_at: Utc::now(),
        }
    }

    /// Signed manual correction.
    pub fn adjustment(
        account_id: impl Into<String>,
        role: Role,
        points: i64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            role,
            kind: TransactionKind::AdminAdjustment,
            points,
            source_order_id: None,
            description: description.into(),
            created_at: Utc::now(),
        }
    }

    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Check shape constraints before the transaction reaches storage.
    pub fn validate(&self) -> Result<()> {
        if self.account_id.trim().is_empty() {
            return Err(LedgerError::Validation("account_id is required".into()));
        }
        if self.points == 0 {
            return Err(LedgerError::Validation("points must be non-zero".into()));
        }
        // No positive counterpart; debits are negated downstream
        if self.points == i64::MIN {
            return Err(LedgerError::Validation(format!(
                "points out of range: {}",
                self.points
            )));
        }
        if !self.role.permits(self.kind) {
            return Err(LedgerError::RoleForbidsKind {
                role: self.role,
                kind: self.kind,
            });
        }
        match self.kind {
            TransactionKind::Earned => {
                if self.points < 0 {
                    return Err(LedgerError::Validation(
                        "earned points must be positive".into(),
                    ));
                }
                match self.source_order_id.as_deref() {
                    Some(order) if !order.trim().is_empty() => {}
                    _ => {
                        return Err(LedgerError::Validation(
                            "earned transactions require source_order_id".into(),
                        ))
                    }
                }
            }
            TransactionKind::Redeemed => {
                if self.points > 0 {
                    return Err(LedgerError::Validation(
                        "redeemed points must be negative".into(),
                    ));
                }
                if self.source_order_id.is_some() {
                    return Err(LedgerError::Validation(
                        "redemptions do not carry source_order_id".into(),
                    ));
                }
            }
            TransactionKind::AdminAdjustment => {
                if self.source_order_id.is_some() {
                    return Err(LedgerError::Validation(
                        "admin adjustments do not carry source_order_id".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Materialize with a fresh id.
    pub fn into_transaction(self) -> Transaction {
        Transaction {
            transaction_id: Uuid::new_v4(),
            account_id: self.account_id,
            role: self.role,
            kind: self.kind,
            points: self.points,
            source_order_id: self.source_order_id,
            description: self.description,
            created_at: self.created_at,
        }
    }
}

/// Order completion notification from the delivery workflow.
///
/// Delivered at least once; accrual is idempotent per order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCompleted {
    pub order_id: String,
    pub customer_account_id: String,
    pub representative_account_id: Option<String>,
    /// Minor currency units. Not used by the flat per-order rule.
    pub order_value: i64,
    pub completed_at: DateTime<Utc>,
}

impl OrderCompleted {
    pub fn new(order_id: impl Into<String>, customer_account_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            customer_account_id: customer_account_id.into(),
            representative_account_id: None,
            order_value: 0,
            completed_at: Utc::now(),
        }
    }

    pub fn with_representative(mut self, representative_account_id: impl Into<String>) -> Self {
        self.representative_account_id = Some(representative_account_id.into());
        self
    }

    pub fn with_order_value(mut self, order_value: i64) -> Self {
        self.order_value = order_value;
        self
    }

    pub fn at(mut self, completed_at: DateTime<Utc>) -> Self {
        self.completed_at = completed_at;
        self
    }

    /// Accounts to credit, customer first. Blank ids are ignored.
    pub fn beneficiaries(&self) -> Vec<(Role, &str)> {
        let mut accounts = Vec::with_capacity(2);
        if !self.customer_account_id.trim().is_empty() {
            accounts.push((Role::Customer, self.customer_account_id.as_str()));
        }
        if let Some(rep) = self
            .representative_account_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
        {
            accounts.push((Role::Representative, rep));
        }
        accounts
    }
}

/// Named configuration value. Interpretation is up to the reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub description: String,
}

/// Cached record compared against a fresh fold of the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub cached: Account,
    pub ledger_balance: i64,
    pub ledger_total_earned: i64,
    pub ledger_total_redeemed: i64,
    pub transaction_count: u64,
}

impl Reconciliation {
    pub fn consistent(&self) -> bool {
        self.cached.balance == self.ledger_balance
            && self.cached.total_earned == self.ledger_total_earned
            && self.cached.total_redeemed == self.ledger_total_redeemed
    }
}

//! Ledger storage interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::ledger::projection;
use crate::ledger::{Account, NewTransaction, Reconciliation, Role, Transaction, TransactionKind};

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// SQLite primary result codes that indicate lock contention.
const SQLITE_BUSY: &str = "5";
const SQLITE_LOCKED: &str = "6";
const SQLITE_BUSY_SNAPSHOT: &str = "517";

/// Errors that can occur during ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Account not found: role={role}, account_id={account_id}")]
    AccountNotFound { account_id: String, role: Role },

    #[error("Insufficient points: account {account_id} has {balance}, requested {requested}")]
    InsufficientPoints {
        account_id: String,
        balance: i64,
        requested: i64,
    },

    #[error("Duplicate accrual: account_id={account_id}, order_id={order_id}")]
    DuplicateAccrual { account_id: String, order_id: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{role} accounts cannot post {kind} transactions")]
    RoleForbidsKind { role: Role, kind: TransactionKind },

    #[error("Invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(#[from] chrono::ParseError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl LedgerError {
    /// Transient lock contention that a retry can clear.
    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::Database(sqlx::Error::Database(db)) => matches!(
                db.code().as_deref(),
                Some(SQLITE_BUSY) | Some(SQLITE_LOCKED) | Some(SQLITE_BUSY_SNAPSHOT)
            ),
            LedgerError::Database(sqlx::Error::PoolTimedOut) => true,
            _ => false,
        }
    }
}

/// Interface for the append-only ledger and its cached balances.
///
/// `append` writes the transaction and applies its [`BalanceDelta`] to the
/// cached account in one atomic unit. Accounts are created on first append.
/// Debits that would take the balance below zero fail with
/// [`LedgerError::InsufficientPoints`] and change nothing.
///
/// At most one `earned` transaction exists per
/// `(role, account_id, source_order_id)`; a second fails with
/// [`LedgerError::DuplicateAccrual`].
///
/// Implementations:
/// - `SqliteLedgerStore`: SQLite storage
/// - `MockLedgerStore`: In-memory store for testing
///
/// [`BalanceDelta`]: crate::ledger::BalanceDelta
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Append a transaction and update the cached balance.
    async fn append(&self, tx: NewTransaction) -> Result<Uuid>;

    /// Cached account record.
    async fn account(&self, account_id: &str, role: Role) -> Result<Account>;

    /// Account history, newest first.
    async fn transactions(
        &self,
        account_id: &str,
        role: Role,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>>;

    /// Accounts of `role` by balance descending, account_id ascending.
    async fn top_accounts(&self, role: Role, limit: usize) -> Result<Vec<Account>>;

    /// Net points per account posted in `[since, until)`.
    async fn window_totals(
        &self,
        role: Role,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<(String, i64)>>;

    /// Recompute the account from its ledger and compare with the cache.
    async fn verify(&self, account_id: &str, role: Role) -> Result<Reconciliation> {
        let cached = match self.account(account_id, role).await {
            Ok(account) => account,
            Err(LedgerError::AccountNotFound { .. }) => Account::empty(account_id, role),
            Err(e) => return Err(e),
        };
        let history = self.transactions(account_id, role, None).await?;
        let (ledger_balance, ledger_total_earned, ledger_total_redeemed) =
            projection::fold(&history);

        Ok(Reconciliation {
            cached,
            ledger_balance,
            ledger_total_earned,
            ledger_total_redeemed,
            transaction_count: history.len() as u64,
        })
    }
}

//! Mock LedgerStore implementation for testing.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::interfaces::ledger_store::{LedgerError, LedgerStore, Result};
use crate::ledger::{
    Account, BalanceDelta, DeltaRejected, NewTransaction, Role, Transaction, TransactionKind,
};

type AccountKey = (Role, String);
type AccrualKey = (Role, String, String);

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<AccountKey, Account>,
    transactions: Vec<Transaction>,
    accruals: HashSet<AccrualKey>,
}

/// Mock ledger store that keeps accounts and history in memory.
///
/// A single write lock covers the append and the balance update.
#[derive(Default)]
pub struct MockLedgerStore {
    state: RwLock<LedgerState>,
    fail_on_append: RwLock<HashSet<AccountKey>>,
}

impl MockLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make appends to one account fail with a storage error.
    pub async fn set_fail_on_append(&self, account_id: &str, role: Role, fail: bool) {
        let key = (role, account_id.to_string());
        let mut failing = self.fail_on_append.write().await;
        if fail {
            failing.insert(key);
        } else {
            failing.remove(&key);
        }
    }

    pub async fn transaction_count(&self) -> usize {
        self.state.read().await.transactions.len()
    }

    /// Overwrite a cached balance without touching the ledger.
    pub async fn corrupt_balance(&self, account_id: &str, role: Role, balance: i64) {
        let key = (role, account_id.to_string());
        if let Some(account) = self.state.write().await.accounts.get_mut(&key) {
            account.balance = balance;
        }
    }
}

#[async_trait]
impl LedgerStore for MockLedgerStore {
    async fn append(&self, tx: NewTransaction) -> Result<Uuid> {
        tx.validate()?;

        let key = (tx.role, tx.account_id.clone());
        if self.fail_on_append.read().await.contains(&key) {
            return Err(LedgerError::Database(sqlx::Error::PoolClosed));
        }

        let mut state = self.state.write().await;

        let accrual_key = match (&tx.kind, &tx.source_order_id) {
            (TransactionKind::Earned, Some(order_id)) => {
                let accrual_key = (tx.role, tx.account_id.clone(), order_id.clone());
                if state.accruals.contains(&accrual_key) {
                    return Err(LedgerError::DuplicateAccrual {
                        account_id: tx.account_id,
                        order_id: order_id.clone(),
                    });
                }
                Some(accrual_key)
            }
            _ => None,
        };

        let mut account = state
            .accounts
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Account::empty(tx.account_id.clone(), tx.role));

        let delta = BalanceDelta::from(&tx);
        match delta.apply(&mut account) {
            Ok(()) => {}
            Err(DeltaRejected::Overdraw) => {
                return Err(LedgerError::InsufficientPoints {
                    account_id: tx.account_id,
                    balance: account.balance,
                    requested: delta.requested(),
                });
            }
            Err(DeltaRejected::Overflow) => {
                return Err(LedgerError::Validation(format!(
                    "{} points would overflow account {}",
                    tx.points, tx.account_id
                )));
            }
        }
        account.last_activity_at = account.last_activity_at.max(Some(tx.created_at));

        let record = tx.into_transaction();
        let transaction_id = record.transaction_id;

        if let Some(accrual_key) = accrual_key {
            state.accruals.insert(accrual_key);
        }
        state.accounts.insert(key, account);
        state.transactions.push(record);

        Ok(transaction_id)
    }

    async fn account(&self, account_id: &str, role: Role) -> Result<Account> {
        let key = (role, account_id.to_string());
        self.state
            .read()
            .await
            .accounts
            .get(&key)
            .cloned()
            .ok_or_else(|| LedgerError::AccountNotFound {
                account_id: account_id.to_string(),
                role,
            })
    }

    async fn transactions(
        &self,
        account_id: &str,
        role: Role,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>> {
        let state = self.state.read().await;
        let mut history: Vec<Transaction> = state
            .transactions
            .iter()
            .rev()
            .filter(|tx| tx.role == role && tx.account_id == account_id)
            .cloned()
            .collect();
        // Stable: equal timestamps keep newest-appended first
        history.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            history.truncate(limit);
        }
        Ok(history)
    }

    async fn top_accounts(&self, role: Role, limit: usize) -> Result<Vec<Account>> {
        let state = self.state.read().await;
        let mut accounts: Vec<Account> = state
            .accounts
            .values()
            .filter(|a| a.role == role)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| {
            b.balance
                .cmp(&a.balance)
                .then_with(|| a.account_id.cmp(&b.account_id))
        });
        accounts.truncate(limit);
        Ok(accounts)
    }

    async fn window_totals(
        &self,
        role: Role,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<(String, i64)>> {
        let state = self.state.read().await;
        let mut totals: HashMap<String, i64> = HashMap::new();
        for tx in state
            .transactions
            .iter()
            .filter(|tx| tx.role == role && tx.created_at >= since && tx.created_at < until)
        {
            *totals.entry(tx.account_id.clone()).or_default() += tx.points;
        }
        Ok(totals.into_iter().collect())
    }
}

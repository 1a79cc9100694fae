//! Balance projection arithmetic.
//!
//! Every store applies a transaction to its cached account as a relative
//! [`BalanceDelta`] inside the same atomic unit as the ledger append. Debits
//! are guarded: the delta only applies when `balance + delta.balance >= 0`.

use super::types::{Account, NewTransaction, Transaction, TransactionKind};

/// Relative change to an account's cached fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalanceDelta {
    pub balance: i64,
    pub total_earned: i64,
    pub total_redeemed: i64,
}

/// Why a delta was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaRejected {
    /// The balance would drop below zero.
    Overdraw,
    /// A cached field would leave the `i64` range.
    Overflow,
}

impl BalanceDelta {
    pub fn of(kind: TransactionKind, points: i64) -> Self {
        Self {
            balance: points,
            total_earned: points.max(0),
            total_redeemed: if kind == TransactionKind::Redeemed {
                points.saturating_neg()
            } else {
                0
            },
        }
    }

    /// Whether applying this delta can lower the balance.
    pub fn is_debit(&self) -> bool {
        self.balance < 0
    }

    /// Points a debit takes out of the balance; zero for credits.
    pub fn requested(&self) -> i64 {
        if self.is_debit() {
            self.balance.saturating_neg()
        } else {
            0
        }
    }

    /// Apply to `account` unless the balance would go negative or a field
    /// would overflow. A rejected delta leaves the account untouched.
    pub fn apply(&self, account: &mut Account) -> Result<(), DeltaRejected> {
        let balance = account
            .balance
            .checked_add(self.balance)
            .ok_or(DeltaRejected::Overflow)?;
        if balance < 0 {
            return Err(DeltaRejected::Overdraw);
        }
        let total_earned = account
            .total_earned
            .checked_add(self.total_earned)
            .ok_or(DeltaRejected::Overflow)?;
        let total_redeemed = account
            .total_redeemed
            .checked_add(self.total_redeemed)
            .ok_or(DeltaRejected::Overflow)?;

        account.balance = balance;
        account.total_earned = total_earned;
        account.total_redeemed = total_redeemed;
        Ok(())
    }
}

impl From<&NewTransaction> for BalanceDelta {
    fn from(tx: &NewTransaction) -> Self {
        Self::of(tx.kind, tx.points)
    }
}

/// Fold a transaction history into `(balance, total_earned, total_redeemed)`.
pub fn fold<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> (i64, i64, i64) {
    transactions
        .into_iter()
        .map(|tx| BalanceDelta::of(tx.kind, tx.points))
        .fold((0, 0, 0), |(b, e, r), d| {
            (
                b.saturating_add(d.balance),
                e.saturating_add(d.total_earned),
                r.saturating_add(d.total_redeemed),
            )
        })
}

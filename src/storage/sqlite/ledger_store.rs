//! SQLite LedgerStore implementation.

use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use chrono::{DateTime, Utc};
use sea_query::{Alias, Expr, Func, OnConflict, Order, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::interfaces::ledger_store::{LedgerError, LedgerStore, Result};
use crate::ledger::{
    Account, BalanceDelta, DeltaRejected, NewTransaction, Role, Transaction, TransactionKind,
};
use crate::storage::helpers::{format_timestamp, parse_optional_timestamp, parse_timestamp, sql_limit};
use crate::storage::schema::{Accounts, Transactions, LEDGER_SCHEMA};
use crate::utils::retry::store_backoff;

/// SQLite implementation of LedgerStore.
///
/// Each append runs in a `BEGIN IMMEDIATE` transaction that inserts the
/// ledger row and applies a guarded relative update to the account row, so
/// concurrent writers to one account serialize on the database write lock.
pub struct SqliteLedgerStore {
    pool: SqlitePool,
    backoff: ExponentialBuilder,
}

impl SqliteLedgerStore {
    /// Create a new SQLite ledger store.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            backoff: store_backoff(),
        }
    }

    /// Override the busy-retry backoff.
    pub fn with_backoff(mut self, backoff: ExponentialBuilder) -> Self {
        self.backoff = backoff;
        self
    }

    /// Create tables and indexes if they do not exist.
    pub async fn init(&self) -> Result<()> {
        for ddl in LEDGER_SCHEMA {
            sqlx::query(ddl).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// One attempt at the append, with its own transaction.
    async fn append_once(&self, tx: &Transaction) -> Result<()> {
        // BEGIN IMMEDIATE acquires the write lock upfront, preventing deadlocks
        // when concurrent DEFERRED transactions race to upgrade from shared to exclusive.
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        match Self::apply(&mut conn, tx).await {
            Ok(()) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(())
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(e)
            }
        }
    }

    /// Ledger insert plus balance projection within an already-started transaction.
    async fn apply(conn: &mut SqliteConnection, tx: &Transaction) -> Result<()> {
        let delta = BalanceDelta::of(tx.kind, tx.points);
        let created_at = format_timestamp(&tx.created_at);

        let create_account = Query::insert()
            .into_table(Accounts::Table)
            .columns([
                Accounts::AccountId,
                Accounts::Role,
                Accounts::Balance,
                Accounts::TotalEarned,
                Accounts::TotalRedeemed,
                Accounts::LastActivityAt,
            ])
            .values_panic([
                tx.account_id.as_str().into(),
                tx.role.as_str().into(),
                0i64.into(),
                0i64.into(),
                0i64.into(),
                created_at.clone().into(),
            ])
            .on_conflict(
                OnConflict::columns([Accounts::Role, Accounts::AccountId])
                    .do_nothing()
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);
        sqlx::query(&create_account).execute(&mut *conn).await?;

        let insert = Query::insert()
            .into_table(Transactions::Table)
            .columns([
                Transactions::TransactionId,
                Transactions::AccountId,
                Transactions::Role,
                Transactions::Kind,
                Transactions::Points,
                Transactions::SourceOrderId,
                Transactions::Description,
                Transactions::CreatedAt,
            ])
            .values_panic([
                tx.transaction_id.to_string().into(),
                tx.account_id.as_str().into(),
                tx.role.as_str().into(),
                tx.kind.as_str().into(),
                tx.points.into(),
                tx.source_order_id.clone().into(),
                tx.description.as_str().into(),
                created_at.clone().into(),
            ])
            .to_string(SqliteQueryBuilder);

        if let Err(e) = sqlx::query(&insert).execute(&mut *conn).await {
            return Err(match e {
                sqlx::Error::Database(db)
                    if db.is_unique_violation() && tx.kind == TransactionKind::Earned =>
                {
                    LedgerError::DuplicateAccrual {
                        account_id: tx.account_id.clone(),
                        order_id: tx.source_order_id.clone().unwrap_or_default(),
                    }
                }
                other => other.into(),
            });
        }

        let update = {
            let mut update = Query::update();
            update
                .table(Accounts::Table)
                .value(
                    Accounts::Balance,
                    Expr::col(Accounts::Balance).add(delta.balance),
                )
                .value(
                    Accounts::TotalEarned,
                    Expr::col(Accounts::TotalEarned).add(delta.total_earned),
                )
                .value(
                    Accounts::TotalRedeemed,
                    Expr::col(Accounts::TotalRedeemed).add(delta.total_redeemed),
                )
                .value(
                    Accounts::LastActivityAt,
                    Expr::cust_with_values("max(last_activity_at, ?)", [created_at]),
                )
                .and_where(Expr::col(Accounts::Role).eq(tx.role.as_str()))
                .and_where(Expr::col(Accounts::AccountId).eq(tx.account_id.as_str()));
            if delta.is_debit() {
                update.and_where(Expr::col(Accounts::Balance).gte(delta.requested()));
            } else {
                // SQLite promotes an overflowing integer sum to REAL
                update.and_where(Expr::col(Accounts::Balance).lte(i64::MAX - delta.balance));
            }
            update
                .and_where(Expr::col(Accounts::TotalEarned).lte(i64::MAX - delta.total_earned))
                .and_where(
                    Expr::col(Accounts::TotalRedeemed).lte(i64::MAX - delta.total_redeemed),
                );
            update.to_string(SqliteQueryBuilder)
        };

        let updated = sqlx::query(&update).execute(&mut *conn).await?;
        if updated.rows_affected() == 0 {
            let mut account = Self::account_in(conn, &tx.account_id, tx.role).await?;
            let balance = account.balance;
            return Err(match delta.apply(&mut account) {
                Err(DeltaRejected::Overdraw) => LedgerError::InsufficientPoints {
                    account_id: tx.account_id.clone(),
                    balance,
                    requested: delta.requested(),
                },
                Err(DeltaRejected::Overflow) | Ok(()) => LedgerError::Validation(format!(
                    "{} points would overflow account {}",
                    tx.points, tx.account_id
                )),
            });
        }

        Ok(())
    }

    /// Account row as seen inside the open transaction.
    async fn account_in(
        conn: &mut SqliteConnection,
        account_id: &str,
        role: Role,
    ) -> Result<Account> {
        let query = Query::select()
            .columns(ACCOUNT_COLUMNS)
            .from(Accounts::Table)
            .and_where(Expr::col(Accounts::Role).eq(role.as_str()))
            .and_where(Expr::col(Accounts::AccountId).eq(account_id))
            .to_string(SqliteQueryBuilder);

        match sqlx::query(&query).fetch_optional(&mut *conn).await? {
            Some(row) => account_from_row(&row),
            None => Ok(Account::empty(account_id, role)),
        }
    }
}

fn account_from_row(row: &SqliteRow) -> Result<Account> {
    let role: String = row.try_get("role")?;
    Ok(Account {
        account_id: row.try_get("account_id")?,
        role: role.parse()?,
        balance: row.try_get("balance")?,
        total_earned: row.try_get("total_earned")?,
        total_redeemed: row.try_get("total_redeemed")?,
        last_activity_at: parse_optional_timestamp(row.try_get("last_activity_at")?)?,
    })
}

fn transaction_from_row(row: &SqliteRow) -> Result<Transaction> {
    let transaction_id: String = row.try_get("transaction_id")?;
    let role: String = row.try_get("role")?;
    let kind: String = row.try_get("kind")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(Transaction {
        transaction_id: Uuid::parse_str(&transaction_id)?,
        account_id: row.try_get("account_id")?,
        role: role.parse()?,
        kind: kind.parse()?,
        points: row.try_get("points")?,
        source_order_id: row.try_get("source_order_id")?,
        description: row.try_get("description")?,
        created_at: parse_timestamp(&created_at)?,
    })
}

const ACCOUNT_COLUMNS: [Accounts; 6] = [
    Accounts::AccountId,
    Accounts::Role,
    Accounts::Balance,
    Accounts::TotalEarned,
    Accounts::TotalRedeemed,
    Accounts::LastActivityAt,
];

const TRANSACTION_COLUMNS: [Transactions; 8] = [
    Transactions::TransactionId,
    Transactions::AccountId,
    Transactions::Role,
    Transactions::Kind,
    Transactions::Points,
    Transactions::SourceOrderId,
    Transactions::Description,
    Transactions::CreatedAt,
];

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn append(&self, tx: NewTransaction) -> Result<Uuid> {
        tx.validate()?;
        let record = tx.into_transaction();
        let record = &record;

        (|| async move { self.append_once(record).await })
            .retry(self.backoff)
            .when(LedgerError::is_retryable)
            .notify(|e: &LedgerError, delay: Duration| {
                warn!(
                    account_id = %record.account_id,
                    role = %record.role,
                    error = %e,
                    ?delay,
                    "Ledger write contended, retrying"
                );
            })
            .await?;

        debug!(
            transaction_id = %record.transaction_id,
            account_id = %record.account_id,
            role = %record.role,
            kind = %record.kind,
            points = record.points,
            "Ledger transaction appended"
        );
        Ok(record.transaction_id)
    }

    async fn account(&self, account_id: &str, role: Role) -> Result<Account> {
        let query = Query::select()
            .columns(ACCOUNT_COLUMNS)
            .from(Accounts::Table)
            .and_where(Expr::col(Accounts::Role).eq(role.as_str()))
            .and_where(Expr::col(Accounts::AccountId).eq(account_id))
            .to_string(SqliteQueryBuilder);

        match sqlx::query(&query).fetch_optional(&self.pool).await? {
            Some(row) => account_from_row(&row),
            None => Err(LedgerError::AccountNotFound {
                account_id: account_id.to_string(),
                role,
            }),
        }
    }

    async fn transactions(
        &self,
        account_id: &str,
        role: Role,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>> {
        // The builder is not Send; only the SQL string crosses the await
        let query = {
            let mut query = Query::select();
            query
                .columns(TRANSACTION_COLUMNS)
                .from(Transactions::Table)
                .and_where(Expr::col(Transactions::Role).eq(role.as_str()))
                .and_where(Expr::col(Transactions::AccountId).eq(account_id))
                .order_by(Transactions::CreatedAt, Order::Desc)
                .order_by(Transactions::Id, Order::Desc);
            if let Some(limit) = limit {
                query.limit(sql_limit(limit));
            }
            query.to_string(SqliteQueryBuilder)
        };

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(transaction_from_row).collect()
    }

    async fn top_accounts(&self, role: Role, limit: usize) -> Result<Vec<Account>> {
        let query = Query::select()
            .columns(ACCOUNT_COLUMNS)
            .from(Accounts::Table)
            .and_where(Expr::col(Accounts::Role).eq(role.as_str()))
            .order_by(Accounts::Balance, Order::Desc)
            .order_by(Accounts::AccountId, Order::Asc)
            .limit(sql_limit(limit))
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(account_from_row).collect()
    }

    async fn window_totals(
        &self,
        role: Role,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<(String, i64)>> {
        let query = Query::select()
            .column(Transactions::AccountId)
            .expr_as(Func::sum(Expr::col(Transactions::Points)), Alias::new("total"))
            .from(Transactions::Table)
            .and_where(Expr::col(Transactions::Role).eq(role.as_str()))
            .and_where(Expr::col(Transactions::CreatedAt).gte(format_timestamp(&since)))
            .and_where(Expr::col(Transactions::CreatedAt).lt(format_timestamp(&until)))
            .group_by_col(Transactions::AccountId)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| -> Result<(String, i64)> {
                Ok((row.try_get("account_id")?, row.try_get("total")?))
            })
            .collect()
    }
}

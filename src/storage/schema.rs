//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Cached account balances.
#[derive(Iden)]
pub enum Accounts {
    #[iden = "loyalty_accounts"]
    Table,
    #[iden = "account_id"]
    AccountId,
    #[iden = "role"]
    Role,
    #[iden = "balance"]
    Balance,
    #[iden = "total_earned"]
    TotalEarned,
    #[iden = "total_redeemed"]
    TotalRedeemed,
    #[iden = "last_activity_at"]
    LastActivityAt,
}

/// Append-only transaction log.
#[derive(Iden)]
pub enum Transactions {
    #[iden = "loyalty_transactions"]
    Table,
    #[iden = "id"]
    Id,
    #[iden = "transaction_id"]
    TransactionId,
    #[iden = "account_id"]
    AccountId,
    #[iden = "role"]
    Role,
    #[iden = "kind"]
    Kind,
    #[iden = "points"]
    Points,
    #[iden = "source_order_id"]
    SourceOrderId,
    #[iden = "description"]
    Description,
    #[iden = "created_at"]
    CreatedAt,
}

/// Named configuration values.
#[derive(Iden)]
pub enum Settings {
    #[iden = "loyalty_settings"]
    Table,
    #[iden = "key"]
    Key,
    #[iden = "value"]
    Value,
    #[iden = "description"]
    Description,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// SQL for creating the accounts table.
pub const CREATE_ACCOUNTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS loyalty_accounts (
    account_id TEXT NOT NULL,
    role TEXT NOT NULL,
    balance INTEGER NOT NULL DEFAULT 0 CHECK (balance >= 0),
    total_earned INTEGER NOT NULL DEFAULT 0,
    total_redeemed INTEGER NOT NULL DEFAULT 0,
    last_activity_at TEXT,
    PRIMARY KEY (role, account_id)
)
"#;

/// SQL for creating the transactions table.
pub const CREATE_TRANSACTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS loyalty_transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    transaction_id TEXT NOT NULL UNIQUE,
    account_id TEXT NOT NULL,
    role TEXT NOT NULL,
    kind TEXT NOT NULL,
    points INTEGER NOT NULL CHECK (points != 0),
    source_order_id TEXT,
    description TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL
)
"#;

pub const CREATE_TRANSACTIONS_ACCOUNT_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_loyalty_transactions_account
    ON loyalty_transactions(role, account_id, created_at)
"#;

pub const CREATE_TRANSACTIONS_WINDOW_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_loyalty_transactions_created
    ON loyalty_transactions(role, created_at)
"#;

/// One `earned` row per (role, account, order).
pub const CREATE_ACCRUAL_UNIQUE_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_loyalty_transactions_accrual
    ON loyalty_transactions(role, account_id, source_order_id)
    WHERE kind = 'earned'
"#;

/// SQL for creating the settings table.
pub const CREATE_SETTINGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS loyalty_settings (
    key TEXT NOT NULL PRIMARY KEY,
    value TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    updated_at TEXT NOT NULL
)
"#;

/// Ledger DDL in creation order.
pub const LEDGER_SCHEMA: &[&str] = &[
    CREATE_ACCOUNTS_TABLE,
    CREATE_TRANSACTIONS_TABLE,
    CREATE_TRANSACTIONS_ACCOUNT_INDEX,
    CREATE_TRANSACTIONS_WINDOW_INDEX,
    CREATE_ACCRUAL_UNIQUE_INDEX,
];

//! SQLite implementations of storage interfaces.

mod ledger_store;
mod settings_store;

pub use ledger_store::SqliteLedgerStore;
pub use settings_store::SqliteSettingsStore;

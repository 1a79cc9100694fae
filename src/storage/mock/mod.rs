//! Mock storage implementations for testing.

mod ledger_store;
mod settings_store;

pub use ledger_store::MockLedgerStore;
pub use settings_store::MockSettingsStore;

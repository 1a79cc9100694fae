//! Abstract interfaces for the loyalty ledger.
//!
//! These traits define the contracts for:
//! - Ledger storage (transactions + cached balances)
//! - Settings storage (accrual rules)
//! - Account directory (display names from the external registry)

pub mod directory;
pub mod ledger_store;
pub mod settings_store;

pub use directory::{AccountDirectory, StaticDirectory};
pub use ledger_store::{LedgerError, LedgerStore};
pub use settings_store::{SettingsError, SettingsStore};

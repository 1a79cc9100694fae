//! Shared storage integration tests.
//!
//! Tests the LedgerStore and SettingsStore interfaces against all implementations.
//! Each implementation module imports these test functions and runs them.

pub mod ledger_store_tests;
pub mod settings_store_tests;

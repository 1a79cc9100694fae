//! Storage implementations.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing::info;

use crate::config::{RetryConfig, StorageConfig, StorageType};
use crate::interfaces::{LedgerStore, SettingsStore};
use crate::utils::retry::backoff_from_config;

pub mod helpers;
pub mod mock;
pub mod schema;
pub mod sqlite;

pub use mock::{MockLedgerStore, MockSettingsStore};
pub use sqlite::{SqliteLedgerStore, SqliteSettingsStore};

/// Ledger and settings stores sharing one backend.
pub type Stores = (Arc<dyn LedgerStore>, Arc<dyn SettingsStore>);

/// Initialize storage based on configuration.
///
/// Returns tuple of (LedgerStore, SettingsStore) implementations based on
/// the configured storage type. SQLite schemas are created if missing.
pub async fn init_storage(
    config: &StorageConfig,
    retry: &RetryConfig,
) -> Result<Stores, Box<dyn std::error::Error>> {
    match config.storage_type {
        StorageType::Sqlite => {
            let sqlite = &config.sqlite;
            info!(
                storage = %config.storage_type,
                path = %sqlite.path,
                max_connections = sqlite.max_connections,
                "Initializing storage"
            );

            if let Some(parent) = std::path::Path::new(&sqlite.path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }

            let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", sqlite.path))?
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(Duration::from_secs(sqlite.busy_timeout_secs));
            let pool = SqlitePoolOptions::new()
                .max_connections(sqlite.max_connections)
                .connect_with(options)
                .await?;

            let ledger_store =
                SqliteLedgerStore::new(pool.clone()).with_backoff(backoff_from_config(retry));
            ledger_store.init().await?;

            let settings_store = SqliteSettingsStore::new(pool);
            settings_store.init().await?;

            Ok((Arc::new(ledger_store), Arc::new(settings_store)))
        }
        StorageType::Memory => {
            info!(storage = %config.storage_type, "Initializing storage (not persisted)");
            Ok((
                Arc::new(MockLedgerStore::new()),
                Arc::new(MockSettingsStore::new()),
            ))
        }
    }
}

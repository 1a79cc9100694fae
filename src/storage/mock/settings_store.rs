//! Mock SettingsStore implementation for testing.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::interfaces::settings_store::{validate_key, Result, SettingsError, SettingsStore};
use crate::ledger::Setting;

/// Mock settings store keyed in sorted order.
#[derive(Default)]
pub struct MockSettingsStore {
    settings: RwLock<BTreeMap<String, Setting>>,
    fail_on_get: RwLock<HashSet<String>>,
}

impl MockSettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make reads of `key` fail with a storage error.
    pub async fn set_fail_on_get(&self, key: &str, fail: bool) {
        let mut keys = self.fail_on_get.write().await;
        if fail {
            keys.insert(key.to_string());
        } else {
            keys.remove(key);
        }
    }
}

#[async_trait]
impl SettingsStore for MockSettingsStore {
    async fn get(&self, key: &str) -> Result<Setting> {
        if self.fail_on_get.read().await.contains(key) {
            return Err(SettingsError::Database(sqlx::Error::PoolClosed));
        }
        self.settings
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| SettingsError::NotFound(key.to_string()))
    }

    async fn upsert(&self, key: &str, value: &str, description: &str) -> Result<Setting> {
        validate_key(key)?;
        let setting = Setting {
            key: key.to_string(),
            value: value.to_string(),
            description: description.to_string(),
        };
        self.settings
            .write()
            .await
            .insert(key.to_string(), setting.clone());
        Ok(setting)
    }

    async fn list(&self) -> Result<Vec<Setting>> {
        Ok(self.settings.read().await.values().cloned().collect())
    }
}

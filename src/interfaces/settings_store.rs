//! Settings storage interface.

use async_trait::async_trait;

use crate::ledger::Setting;

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Setting not found: {0}")]
    NotFound(String),

    #[error("Invalid value for setting {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Named configuration values.
///
/// No validation of value semantics happens here; readers interpret values.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fails with [`SettingsError::NotFound`] when absent.
    async fn get(&self, key: &str) -> Result<Setting>;

    /// Insert or replace a setting.
    async fn upsert(&self, key: &str, value: &str, description: &str) -> Result<Setting>;

    /// All settings ordered by key.
    async fn list(&self) -> Result<Vec<Setting>>;

    /// Read a setting as an integer.
    async fn get_i64(&self, key: &str) -> Result<i64> {
        let setting = self.get(key).await?;
        setting
            .value
            .trim()
            .parse()
            .map_err(|_| SettingsError::InvalidValue {
                key: setting.key,
                value: setting.value,
            })
    }
}

pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(SettingsError::Validation("setting key is required".into()));
    }
    Ok(())
}

//! SQLite SettingsStore implementation.

use async_trait::async_trait;
use chrono::Utc;
use sea_query::{Expr, OnConflict, Order, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::interfaces::settings_store::{validate_key, Result, SettingsError, SettingsStore};
use crate::ledger::Setting;
use crate::storage::helpers::format_timestamp;
use crate::storage::schema::{Settings, CREATE_SETTINGS_TABLE};

/// SQLite implementation of SettingsStore.
pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the settings table if it does not exist.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(CREATE_SETTINGS_TABLE)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn setting_from_row(row: &SqliteRow) -> Result<Setting> {
    Ok(Setting {
        key: row.try_get("key")?,
        value: row.try_get("value")?,
        description: row.try_get("description")?,
    })
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn get(&self, key: &str) -> Result<Setting> {
        let query = Query::select()
            .columns([Settings::Key, Settings::Value, Settings::Description])
            .from(Settings::Table)
            .and_where(Expr::col(Settings::Key).eq(key))
            .to_string(SqliteQueryBuilder);

        match sqlx::query(&query).fetch_optional(&self.pool).await? {
            Some(row) => setting_from_row(&row),
            None => Err(SettingsError::NotFound(key.to_string())),
        }
    }

    async fn upsert(&self, key: &str, value: &str, description: &str) -> Result<Setting> {
        validate_key(key)?;

        let query = Query::insert()
            .into_table(Settings::Table)
            .columns([
                Settings::Key,
                Settings::Value,
                Settings::Description,
                Settings::UpdatedAt,
            ])
            .values_panic([
                key.into(),
                value.into(),
                description.into(),
                format_timestamp(&Utc::now()).into(),
            ])
            .on_conflict(
                OnConflict::column(Settings::Key)
                    .update_columns([Settings::Value, Settings::Description, Settings::UpdatedAt])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        debug!(key, value, "Setting stored");

        Ok(Setting {
            key: key.to_string(),
            value: value.to_string(),
            description: description.to_string(),
        })
    }

    async fn list(&self) -> Result<Vec<Setting>> {
        let query = Query::select()
            .columns([Settings::Key, Settings::Value, Settings::Description])
            .from(Settings::Table)
            .order_by(Settings::Key, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(setting_from_row).collect()
    }
}

//! PostgreSQL implementation of the settings repository
//!
//! The auto-search settings live as one JSON document under a
//! well-known key.

use crate::database::DatabasePool;
use async_trait::async_trait;
use fetcharr_core::{AutoSearchConfig, FetcharrError, Result, SettingsRepository};
use sqlx::Row;

const AUTOSEARCH_KEY: &str = "autosearch";

pub struct PostgresSettingsRepository {
    pool: DatabasePool,
}

impl PostgresSettingsRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for PostgresSettingsRepository {
    async fn load_autosearch(&self) -> Result<Option<AutoSearchConfig>> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = $1")
            .bind(AUTOSEARCH_KEY)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            let value: serde_json::Value = row.try_get("value")?;
            serde_json::from_value(value).map_err(|e| FetcharrError::ConfigurationError {
                field: AUTOSEARCH_KEY.to_string(),
                message: format!("Stored settings are not valid: {}", e),
            })
        })
        .transpose()
    }

    async fn save_autosearch(&self, config: &AutoSearchConfig) -> Result<()> {
        let value =
            serde_json::to_value(config).map_err(|e| FetcharrError::ConfigurationError {
                field: AUTOSEARCH_KEY.to_string(),
                message: format!("Failed to serialize settings: {}", e),
            })?;

        sqlx::query(
            "INSERT INTO settings (key, value) VALUES ($1, $2)
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
        )
        .bind(AUTOSEARCH_KEY)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

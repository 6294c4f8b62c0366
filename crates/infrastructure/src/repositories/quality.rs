//! PostgreSQL implementation of the quality service

use crate::database::DatabasePool;
use async_trait::async_trait;
use fetcharr_core::{FetcharrError, QualityProfile, QualityService, Result};
use sqlx::Row;

pub struct PostgresQualityService {
    pool: DatabasePool,
}

impl PostgresQualityService {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QualityService for PostgresQualityService {
    async fn get_profile(&self, id: i64) -> Result<QualityProfile> {
        let row = sqlx::query(
            "SELECT id, name, allowed_quality_ids, cutoff_quality_id, upgrade_allowed
             FROM quality_profiles
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(FetcharrError::InvalidQualityProfile {
            profile: id.to_string(),
        })?;

        Ok(QualityProfile {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            allowed_quality_ids: row.try_get("allowed_quality_ids")?,
            cutoff_quality_id: row.try_get("cutoff_quality_id")?,
            upgrade_allowed: row.try_get("upgrade_allowed")?,
        })
    }
}

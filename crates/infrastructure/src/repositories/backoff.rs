//! PostgreSQL implementation of the search backoff store
//!
//! Counters are keyed by `(item_kind, item_id, purpose)`. Both mutation
//! paths are single upsert statements so concurrent auto-search runs
//! never lose an update.

use crate::database::DatabasePool;
use async_trait::async_trait;
use fetcharr_core::{BackoffKind, BackoffRepository, Result, SearchPurpose};
use sqlx::Row;

pub struct PostgresBackoffRepository {
    pool: DatabasePool,
}

impl PostgresBackoffRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BackoffRepository for PostgresBackoffRepository {
    async fn failure_count(
        &self,
        kind: BackoffKind,
        id: i64,
        purpose: SearchPurpose,
    ) -> Result<Option<i64>> {
        let row = sqlx::query(
            "SELECT failure_count FROM search_backoff
             WHERE item_kind = $1 AND item_id = $2 AND purpose = $3",
        )
        .bind(kind.to_string())
        .bind(id)
        .bind(purpose.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Ok(row.try_get("failure_count")?)).transpose()
    }

    async fn increment_failure(
        &self,
        kind: BackoffKind,
        id: i64,
        purpose: SearchPurpose,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO search_backoff (item_kind, item_id, purpose, failure_count)
             VALUES ($1, $2, $3, 1)
             ON CONFLICT (item_kind, item_id, purpose)
             DO UPDATE SET failure_count = search_backoff.failure_count + 1,
                           updated_at = now()",
        )
        .bind(kind.to_string())
        .bind(id)
        .bind(purpose.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn reset_failure(&self, kind: BackoffKind, id: i64, purpose: SearchPurpose) -> Result<()> {
        sqlx::query(
            "INSERT INTO search_backoff (item_kind, item_id, purpose, failure_count)
             VALUES ($1, $2, $3, 0)
             ON CONFLICT (item_kind, item_id, purpose)
             DO UPDATE SET failure_count = 0, updated_at = now()",
        )
        .bind(kind.to_string())
        .bind(id)
        .bind(purpose.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

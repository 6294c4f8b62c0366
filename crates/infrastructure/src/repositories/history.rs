//! PostgreSQL implementation of the search history logger
//!
//! History writes are fire-and-forget: failures are logged and
//! swallowed so a history outage never fails a search.

use crate::database::DatabasePool;
use async_trait::async_trait;
use fetcharr_core::{BackoffKind, HistoryLogger, MediaStatus, Release, SearchableItem};
use tracing::warn;

pub struct PostgresHistoryRepository {
    pool: DatabasePool,
}

impl PostgresHistoryRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn insert(
        &self,
        event_type: &str,
        media_type: &str,
        media_id: i64,
        title: &str,
        release_title: Option<&str>,
        client_name: Option<&str>,
        download_id: Option<&str>,
        error: Option<&str>,
    ) {
        let result = sqlx::query(
            "INSERT INTO search_history
                 (event_type, media_type, media_id, title, release_title,
                  client_name, download_id, error)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(event_type)
        .bind(media_type)
        .bind(media_id)
        .bind(title)
        .bind(release_title)
        .bind(client_name)
        .bind(download_id)
        .bind(error)
        .execute(&self.pool)
        .await;

        if let Err(error) = result {
            warn!(event_type, media_id, %error, "Failed to write search history");
        }
    }
}

#[async_trait]
impl HistoryLogger for PostgresHistoryRepository {
    async fn log_download(
        &self,
        item: &SearchableItem,
        release: &Release,
        client_name: &str,
        download_id: &str,
    ) {
        self.insert(
            "download",
            &item.media_type.to_string(),
            item.media_id,
            &item.title,
            Some(&release.title),
            Some(client_name),
            Some(download_id),
            None,
        )
        .await;
    }

    async fn log_failed(&self, item: &SearchableItem, error: &str) {
        self.insert(
            "failed",
            &item.media_type.to_string(),
            item.media_id,
            &item.title,
            None,
            None,
            None,
            Some(error),
        )
        .await;
    }

    async fn log_status_changed(&self, kind: BackoffKind, id: i64, status: MediaStatus) {
        self.insert(
            "status_changed",
            &kind.to_string(),
            id,
            "",
            None,
            None,
            None,
            Some(&status.to_string()),
        )
        .await;
    }
}

// src/storage/postgres.rs

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;

use super::SnapshotStore;
use crate::error::StorageError;
use crate::models::Snapshot;

/// Keeps the snapshot as a single JSONB row (`singleton_id = TRUE`).
#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    db: PgPool,
}

impl PgSnapshotStore {
    pub async fn connect(database_url: &str, acquire_timeout: Duration) -> Result<Self, StorageError> {
        let db = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await?;
        tracing::info!("connected to postgres");
        let store = Self { db };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS spa_snapshot (
              singleton_id BOOLEAN PRIMARY KEY DEFAULT TRUE CHECK (singleton_id),
              document     JSONB NOT NULL,
              updated_at   TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn load(&self) -> Result<Option<Snapshot>, StorageError> {
        let row: Option<Json<Snapshot>> = sqlx::query_scalar(
            r#"
            SELECT document
            FROM spa_snapshot
            WHERE singleton_id = TRUE
            "#,
        )
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|Json(snapshot)| snapshot))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO spa_snapshot (singleton_id, document, updated_at)
            VALUES (TRUE, $1, now())
            ON CONFLICT (singleton_id)
            DO UPDATE SET document = EXCLUDED.document, updated_at = now()
            "#,
        )
        .bind(Json(snapshot))
        .execute(&self.db)
        .await?;
        Ok(())
    }

    fn describe(&self) -> String {
        "postgres:spa_snapshot".to_string()
    }
}

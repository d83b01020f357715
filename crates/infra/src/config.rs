//! System configuration key/value store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::error::{RepoError, RepoResult};
use crate::users::ensure_affected;

#[derive(Debug, Clone, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ConfigRepo {
    pool: PgPool,
}

impl ConfigRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> RepoResult<Vec<ConfigEntry>> {
        let rows = sqlx::query("SELECT key, value, updated_at FROM system_config ORDER BY key")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(entry_from_row).collect()
    }

    pub async fn get(&self, key: &str) -> RepoResult<Option<ConfigEntry>> {
        let row = sqlx::query("SELECT key, value, updated_at FROM system_config WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| entry_from_row(&r)).transpose()
    }

    pub async fn upsert(&self, key: &str, value: &str) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO system_config (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Apply several settings in one transaction; all or none land.
    pub async fn upsert_many(&self, entries: &[(String, String)]) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in entries {
            sqlx::query(
                "INSERT INTO system_config (key, value) VALUES ($1, $2) \
                 ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM system_config WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        ensure_affected(result.rows_affected())
    }
}

fn entry_from_row(row: &PgRow) -> Result<ConfigEntry, RepoError> {
    Ok(ConfigEntry {
        key: row.try_get("key")?,
        value: row.try_get("value")?,
        updated_at: row.try_get("updated_at")?,
    })
}

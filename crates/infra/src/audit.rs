//! Audit trail of mutating actions.
//!
//! Writes are best-effort: an audit failure is logged and swallowed, never
//! surfaced to the request that triggered it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use plantops_core::UserId;

use crate::error::{RepoError, RepoResult};

#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub audit_id: i64,
    pub user_id: Option<UserId>,
    pub user_name: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Optional filters for the audit listing surface.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub user_id: Option<UserId>,
    pub entity_type: Option<String>,
    pub action: Option<String>,
    pub limit: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditStats {
    pub total: i64,
    pub by_action: Vec<ActionCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionCount {
    pub action: String,
    pub count: i64,
}

#[derive(Clone)]
pub struct AuditRepo {
    pool: PgPool,
}

impl AuditRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record an audit event, swallowing storage failures.
    pub async fn record(
        &self,
        user_id: UserId,
        action: &str,
        entity_type: &str,
        entity_id: Option<i64>,
        details: Option<serde_json::Value>,
    ) {
        let result = sqlx::query(
            "INSERT INTO audit_logs (user_id, action, entity_type, entity_id, details) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user_id.as_i64())
        .bind(action)
        .bind(entity_type)
        .bind(entity_id)
        .bind(details)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, action, entity_type, "audit log write failed");
        }
    }

    pub async fn list(&self, filter: &AuditFilter) -> RepoResult<Vec<AuditRecord>> {
        let mut builder: sqlx::QueryBuilder<'_, sqlx::Postgres> = sqlx::QueryBuilder::new(
            "SELECT al.audit_id, al.user_id, al.action, al.entity_type, al.entity_id, \
             al.details, al.created_at, u.name AS user_name \
             FROM audit_logs al LEFT JOIN users u ON u.user_id = al.user_id WHERE 1=1",
        );

        if let Some(user_id) = filter.user_id {
            builder.push(" AND al.user_id = ");
            builder.push_bind(user_id.as_i64());
        }
        if let Some(entity_type) = &filter.entity_type {
            builder.push(" AND al.entity_type = ");
            builder.push_bind(entity_type);
        }
        if let Some(action) = &filter.action {
            builder.push(" AND al.action = ");
            builder.push_bind(action);
        }

        builder.push(" ORDER BY al.created_at DESC LIMIT ");
        builder.push_bind(if filter.limit > 0 { filter.limit } else { 100 });

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(audit_from_row).collect()
    }

    pub async fn stats(&self) -> RepoResult<AuditStats> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_logs")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(
            "SELECT action, COUNT(*) AS count FROM audit_logs \
             GROUP BY action ORDER BY count DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let by_action = rows
            .iter()
            .map(|r| {
                Ok(ActionCount {
                    action: r.try_get("action")?,
                    count: r.try_get("count")?,
                })
            })
            .collect::<Result<_, RepoError>>()?;

        Ok(AuditStats { total, by_action })
    }
}

fn audit_from_row(row: &PgRow) -> Result<AuditRecord, RepoError> {
    Ok(AuditRecord {
        audit_id: row.try_get("audit_id")?,
        user_id: row.try_get::<Option<i64>, _>("user_id")?.map(UserId::new),
        user_name: row.try_get("user_name")?,
        action: row.try_get("action")?,
        entity_type: row.try_get("entity_type")?,
        entity_id: row.try_get("entity_id")?,
        details: row.try_get("details")?,
        created_at: row.try_get("created_at")?,
    })
}

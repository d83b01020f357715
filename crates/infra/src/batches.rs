//! Production batches and their crew assignments.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use plantops_core::{BatchId, ProductId, UserId};

use crate::error::{RepoError, RepoResult};
use crate::users::ensure_affected;

#[derive(Debug, Clone, Serialize)]
pub struct BatchWorker {
    pub user_id: UserId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchRecord {
    pub batch_id: BatchId,
    pub batch_number: String,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit: String,
    pub target_quantity: Decimal,
    pub scheduled_date: NaiveDate,
    pub status: String,
    pub current_stage: String,
    pub notes: Option<String>,
    pub supervisors: Vec<BatchWorker>,
    pub workers: Vec<BatchWorker>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct BatchInput {
    pub product_id: ProductId,
    pub target_quantity: Decimal,
    pub scheduled_date: NaiveDate,
    pub status: String,
    pub current_stage: String,
    pub notes: Option<String>,
    pub supervisor_ids: Vec<UserId>,
    pub worker_ids: Vec<UserId>,
}

#[derive(Clone)]
pub struct BatchRepo {
    pool: PgPool,
}

impl BatchRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a batch with a generated `PB-<year>-<seq>` number. The number
    /// is computed inside the INSERT from its own sequence, so concurrent
    /// creates never collide on the unique batch number.
    pub async fn create(&self, input: &BatchInput) -> RepoResult<(BatchId, String)> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "INSERT INTO production_batches \
             (batch_number, product_id, target_quantity, scheduled_date, status, current_stage, notes) \
             VALUES ('PB-' || to_char(now(), 'YYYY') || '-' || lpad(nextval('batch_number_seq')::text, 4, '0'), \
                     $1, $2, $3, $4, $5, $6) \
             RETURNING batch_id, batch_number",
        )
        .bind(input.product_id.as_i64())
        .bind(input.target_quantity)
        .bind(input.scheduled_date)
        .bind(&input.status)
        .bind(&input.current_stage)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        let batch_id = BatchId::new(row.try_get("batch_id")?);
        let batch_number: String = row.try_get("batch_number")?;

        Self::assign_crew(&mut tx, batch_id, &input.supervisor_ids, &input.worker_ids).await?;

        tx.commit().await?;
        Ok((batch_id, batch_number))
    }

    pub async fn list(&self) -> RepoResult<Vec<BatchRecord>> {
        let rows = sqlx::query(
            "SELECT pb.batch_id, pb.batch_number, pb.product_id, pb.target_quantity, \
                    pb.scheduled_date, pb.status, pb.current_stage, pb.notes, pb.created_at, \
                    pb.updated_at, p.name AS product_name, p.unit \
             FROM production_batches pb \
             JOIN products p ON p.product_id = pb.product_id \
             ORDER BY pb.scheduled_date DESC, pb.batch_id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut batches: Vec<BatchRecord> =
            rows.iter().map(batch_from_row).collect::<Result<_, _>>()?;
        self.load_crews(&mut batches).await?;
        Ok(batches)
    }

    pub async fn get(&self, batch_id: BatchId) -> RepoResult<Option<BatchRecord>> {
        let row = sqlx::query(
            "SELECT pb.batch_id, pb.batch_number, pb.product_id, pb.target_quantity, \
                    pb.scheduled_date, pb.status, pb.current_stage, pb.notes, pb.created_at, \
                    pb.updated_at, p.name AS product_name, p.unit \
             FROM production_batches pb \
             JOIN products p ON p.product_id = pb.product_id \
             WHERE pb.batch_id = $1",
        )
        .bind(batch_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let mut batches = vec![batch_from_row(&row)?];
                self.load_crews(&mut batches).await?;
                Ok(batches.pop())
            }
            None => Ok(None),
        }
    }

    /// Update batch fields; crew lists are replaced wholesale when provided.
    pub async fn update(&self, batch_id: BatchId, input: &BatchInput) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE production_batches SET product_id = $2, target_quantity = $3, \
             scheduled_date = $4, status = $5, current_stage = $6, notes = $7, \
             updated_at = now() WHERE batch_id = $1",
        )
        .bind(batch_id.as_i64())
        .bind(input.product_id.as_i64())
        .bind(input.target_quantity)
        .bind(input.scheduled_date)
        .bind(&input.status)
        .bind(&input.current_stage)
        .bind(&input.notes)
        .execute(&mut *tx)
        .await?;
        ensure_affected(result.rows_affected())?;

        sqlx::query("DELETE FROM batch_workers WHERE batch_id = $1")
            .bind(batch_id.as_i64())
            .execute(&mut *tx)
            .await?;
        Self::assign_crew(&mut tx, batch_id, &input.supervisor_ids, &input.worker_ids).await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn delete(&self, batch_id: BatchId) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM production_batches WHERE batch_id = $1")
            .bind(batch_id.as_i64())
            .execute(&self.pool)
            .await?;
        ensure_affected(result.rows_affected())
    }

    async fn assign_crew(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        batch_id: BatchId,
        supervisor_ids: &[UserId],
        worker_ids: &[UserId],
    ) -> RepoResult<()> {
        for (ids, role_type) in [(supervisor_ids, "supervisor"), (worker_ids, "worker")] {
            for user_id in ids {
                sqlx::query(
                    "INSERT INTO batch_workers (batch_id, user_id, role_type) \
                     VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
                )
                .bind(batch_id.as_i64())
                .bind(user_id.as_i64())
                .bind(role_type)
                .execute(&mut **tx)
                .await?;
            }
        }
        Ok(())
    }

    async fn load_crews(&self, batches: &mut [BatchRecord]) -> RepoResult<()> {
        if batches.is_empty() {
            return Ok(());
        }

        let ids: Vec<i64> = batches.iter().map(|b| b.batch_id.as_i64()).collect();
        let rows = sqlx::query(
            "SELECT bw.batch_id, bw.user_id, bw.role_type, u.name \
             FROM batch_workers bw JOIN users u ON u.user_id = bw.user_id \
             WHERE bw.batch_id = ANY($1) ORDER BY u.name",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        for row in &rows {
            let batch_id: i64 = row.try_get("batch_id")?;
            let worker = BatchWorker {
                user_id: UserId::new(row.try_get("user_id")?),
                name: row.try_get("name")?,
            };
            let role_type: String = row.try_get("role_type")?;
            if let Some(batch) = batches.iter_mut().find(|b| b.batch_id.as_i64() == batch_id) {
                match role_type.as_str() {
                    "supervisor" => batch.supervisors.push(worker),
                    _ => batch.workers.push(worker),
                }
            }
        }
        Ok(())
    }
}

fn batch_from_row(row: &PgRow) -> Result<BatchRecord, RepoError> {
    Ok(BatchRecord {
        batch_id: BatchId::new(row.try_get("batch_id")?),
        batch_number: row.try_get("batch_number")?,
        product_id: ProductId::new(row.try_get("product_id")?),
        product_name: row.try_get("product_name")?,
        unit: row.try_get("unit")?,
        target_quantity: row.try_get("target_quantity")?,
        scheduled_date: row.try_get("scheduled_date")?,
        status: row.try_get("status")?,
        current_stage: row.try_get("current_stage")?,
        notes: row.try_get("notes")?,
        supervisors: Vec::new(),
        workers: Vec::new(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

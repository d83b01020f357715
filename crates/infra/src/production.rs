//! Production runs.
//!
//! Creating a run is the inbound side of the stock ledger: the output
//! quantity is credited to the run's location in the same transaction as the
//! run record itself.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use plantops_core::{ProductId, ProductionId, UserId};

use crate::error::{RepoError, RepoResult};
use crate::stock::StockLedger;
use crate::users::ensure_affected;

#[derive(Debug, Clone, Serialize)]
pub struct ProductionRecord {
    pub production_id: ProductionId,
    pub product_id: ProductId,
    pub product_name: String,
    pub supervisor_id: UserId,
    pub supervisor_name: String,
    pub input_qty: Decimal,
    pub output_qty: Decimal,
    pub location: String,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduction {
    pub product_id: ProductId,
    pub supervisor_id: UserId,
    pub input_qty: Decimal,
    pub output_qty: Decimal,
    pub location: String,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

const PRODUCTION_SELECT: &str = "SELECT pr.production_id, pr.product_id, pr.supervisor_id, \
     pr.input_qty, pr.output_qty, pr.location, pr.date, pr.notes, pr.created_at, \
     p.name AS product_name, u.name AS supervisor_name \
     FROM production pr \
     JOIN products p ON p.product_id = pr.product_id \
     JOIN users u ON u.user_id = pr.supervisor_id";

#[derive(Clone)]
pub struct ProductionRepo {
    pool: PgPool,
}

impl ProductionRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a completed production run and credit its output to stock.
    ///
    /// Ledger failure rolls the run record back; there is no state in which
    /// the run exists but the stock does not reflect it.
    pub async fn create(&self, new: &NewProduction) -> RepoResult<ProductionId> {
        let mut tx = self.pool.begin().await?;

        let production_id: i64 = sqlx::query_scalar(
            "INSERT INTO production (product_id, supervisor_id, input_qty, output_qty, location, date, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING production_id",
        )
        .bind(new.product_id.as_i64())
        .bind(new.supervisor_id.as_i64())
        .bind(new.input_qty)
        .bind(new.output_qty)
        .bind(&new.location)
        .bind(new.date)
        .bind(&new.notes)
        .fetch_one(&mut *tx)
        .await?;

        StockLedger::apply_delta_on(&mut *tx, new.product_id, &new.location, new.output_qty)
            .await?;

        tx.commit().await?;

        tracing::info!(production_id, product_id = %new.product_id, output_qty = %new.output_qty,
            "production run recorded");
        Ok(ProductionId::new(production_id))
    }

    pub async fn get(&self, production_id: ProductionId) -> RepoResult<Option<ProductionRecord>> {
        let row = sqlx::query(&format!("{PRODUCTION_SELECT} WHERE pr.production_id = $1"))
            .bind(production_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| production_from_row(&r)).transpose()
    }

    pub async fn list(&self, limit: i64) -> RepoResult<Vec<ProductionRecord>> {
        let rows = sqlx::query(&format!(
            "{PRODUCTION_SELECT} ORDER BY pr.date DESC, pr.production_id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(production_from_row).collect()
    }

    pub async fn by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<Vec<ProductionRecord>> {
        let rows = sqlx::query(&format!(
            "{PRODUCTION_SELECT} WHERE pr.date BETWEEN $1 AND $2 ORDER BY pr.date DESC"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(production_from_row).collect()
    }

    pub async fn by_product(&self, product_id: ProductId) -> RepoResult<Vec<ProductionRecord>> {
        let rows = sqlx::query(&format!(
            "{PRODUCTION_SELECT} WHERE pr.product_id = $1 ORDER BY pr.date DESC"
        ))
        .bind(product_id.as_i64())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(production_from_row).collect()
    }

    /// Correct a run's recorded fields. Quantities here are bookkeeping
    /// corrections only; stock is not re-adjusted retroactively.
    pub async fn update(&self, production_id: ProductionId, new: &NewProduction) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE production SET product_id = $2, supervisor_id = $3, input_qty = $4, \
             output_qty = $5, location = $6, date = $7, notes = $8 WHERE production_id = $1",
        )
        .bind(production_id.as_i64())
        .bind(new.product_id.as_i64())
        .bind(new.supervisor_id.as_i64())
        .bind(new.input_qty)
        .bind(new.output_qty)
        .bind(&new.location)
        .bind(new.date)
        .bind(&new.notes)
        .execute(&self.pool)
        .await?;
        ensure_affected(result.rows_affected())
    }

    pub async fn delete(&self, production_id: ProductionId) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM production WHERE production_id = $1")
            .bind(production_id.as_i64())
            .execute(&self.pool)
            .await?;
        ensure_affected(result.rows_affected())
    }

    pub async fn count_between(&self, start: NaiveDate, end: NaiveDate) -> RepoResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM production WHERE date BETWEEN $1 AND $2")
                .bind(start)
                .bind(end)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    pub async fn count(&self) -> RepoResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM production")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn production_from_row(row: &PgRow) -> Result<ProductionRecord, RepoError> {
    Ok(ProductionRecord {
        production_id: ProductionId::new(row.try_get("production_id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        product_name: row.try_get("product_name")?,
        supervisor_id: UserId::new(row.try_get("supervisor_id")?),
        supervisor_name: row.try_get("supervisor_name")?,
        input_qty: row.try_get("input_qty")?,
        output_qty: row.try_get("output_qty")?,
        location: row.try_get("location")?,
        date: row.try_get("date")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
    })
}

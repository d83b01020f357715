//! Stock records and the stock ledger.
//!
//! The ledger is the only sanctioned mutator of `inventory.quantity`.
//! Production completion, sale completion and withdrawal approval all route
//! through [`StockLedger::apply_delta_on`], inside their own transactions, so
//! a ledger refusal rolls the whole business write back.
//!
//! Every quantity change is a single in-place `quantity = quantity + delta`
//! statement. Postgres row locks serialize concurrent increments on one key;
//! there is no read-compute-write window to lose an update in.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};

use plantops_core::{DomainError, ProductId};
use plantops_inventory::{DeltaOutcome, StockRecord, stock};

use crate::error::{RepoError, RepoResult};

/// Stock level joined with its product, for listing surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct StockLevelRow {
    pub inventory_id: i64,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit: String,
    pub location: String,
    pub quantity: Decimal,
    pub minimum_threshold: Decimal,
    pub low_stock: bool,
    pub updated_at: DateTime<Utc>,
}

const STOCK_SELECT: &str = "SELECT i.inventory_id, i.product_id, i.location, i.quantity, \
     i.minimum_threshold, i.updated_at, p.name AS product_name, p.unit \
     FROM inventory i JOIN products p ON p.product_id = i.product_id";

#[derive(Clone)]
pub struct StockLedger {
    pool: PgPool,
}

impl StockLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply a signed delta to one (product, location) key.
    ///
    /// Returns the post-application quantity.
    pub async fn apply_delta(
        &self,
        product_id: ProductId,
        location: &str,
        delta: Decimal,
    ) -> RepoResult<Decimal> {
        let mut conn = self.pool.acquire().await?;
        Self::apply_delta_on(&mut *conn, product_id, location, delta).await
    }

    /// Apply a delta on an existing connection, typically a caller's
    /// transaction, so ledger failure aborts the enclosing business write.
    pub async fn apply_delta_on(
        conn: &mut PgConnection,
        product_id: ProductId,
        location: &str,
        delta: Decimal,
    ) -> RepoResult<Decimal> {
        // In-place increment; the row lock serializes concurrent callers.
        let updated: Option<Decimal> = sqlx::query_scalar(
            "UPDATE inventory SET quantity = quantity + $3, updated_at = now() \
             WHERE product_id = $1 AND location = $2 RETURNING quantity",
        )
        .bind(product_id.as_i64())
        .bind(location)
        .bind(delta)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(quantity) = updated {
            tracing::debug!(%product_id, location, %delta, %quantity, "stock delta applied");
            return Ok(quantity);
        }

        // Missing key: the domain rule decides create vs refuse.
        match stock::apply_delta(None, delta)? {
            DeltaOutcome::Created(opening) => {
                // Racing creators converge through ON CONFLICT into a plain
                // increment on whichever row won the insert.
                let quantity: Decimal = sqlx::query_scalar(
                    "INSERT INTO inventory (product_id, location, quantity) \
                     VALUES ($1, $2, $3) \
                     ON CONFLICT (product_id, location) DO UPDATE \
                     SET quantity = inventory.quantity + EXCLUDED.quantity, updated_at = now() \
                     RETURNING quantity",
                )
                .bind(product_id.as_i64())
                .bind(location)
                .bind(opening)
                .fetch_one(&mut *conn)
                .await?;

                tracing::debug!(%product_id, location, %quantity, "stock record created by delta");
                Ok(quantity)
            }
            DeltaOutcome::Updated(_) => unreachable!("missing record cannot yield an update"),
        }
    }

    pub async fn get(&self, product_id: ProductId, location: &str) -> RepoResult<Option<StockRecord>> {
        let row = sqlx::query(
            "SELECT product_id, location, quantity, minimum_threshold, updated_at \
             FROM inventory WHERE product_id = $1 AND location = $2",
        )
        .bind(product_id.as_i64())
        .bind(location)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| record_from_row(&r)).transpose()
    }

    pub async fn list(&self) -> RepoResult<Vec<StockLevelRow>> {
        let rows = sqlx::query(&format!("{STOCK_SELECT} ORDER BY i.updated_at DESC"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(level_from_row).collect()
    }

    pub async fn by_product(&self, product_id: ProductId) -> RepoResult<Vec<StockLevelRow>> {
        let rows = sqlx::query(&format!("{STOCK_SELECT} WHERE i.product_id = $1"))
            .bind(product_id.as_i64())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(level_from_row).collect()
    }

    pub async fn low_stock(&self) -> RepoResult<Vec<StockLevelRow>> {
        let rows = sqlx::query(&format!(
            "{STOCK_SELECT} WHERE i.quantity <= i.minimum_threshold ORDER BY i.quantity ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(level_from_row).collect()
    }

    /// Open a stock record directly (admin surface). Opening quantity goes
    /// through the same creation rule as a ledger delta.
    pub async fn create(
        &self,
        product_id: ProductId,
        location: &str,
        opening_quantity: Decimal,
        minimum_threshold: Decimal,
    ) -> RepoResult<i64> {
        let inventory_id: i64 = sqlx::query_scalar(
            "INSERT INTO inventory (product_id, location, quantity, minimum_threshold) \
             VALUES ($1, $2, $3, $4) RETURNING inventory_id",
        )
        .bind(product_id.as_i64())
        .bind(location)
        .bind(opening_quantity)
        .bind(minimum_threshold)
        .fetch_one(&self.pool)
        .await?;
        Ok(inventory_id)
    }

    /// Re-point a record's location or threshold. Quantity is deliberately
    /// not updatable here; deltas are the only way to move it.
    pub async fn update_settings(
        &self,
        inventory_id: i64,
        location: &str,
        minimum_threshold: Decimal,
    ) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE inventory SET location = $2, minimum_threshold = $3, updated_at = now() \
             WHERE inventory_id = $1",
        )
        .bind(inventory_id)
        .bind(location)
        .bind(minimum_threshold)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found().into());
        }
        Ok(())
    }

    pub async fn delete(&self, inventory_id: i64) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM inventory WHERE inventory_id = $1")
            .bind(inventory_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found().into());
        }
        Ok(())
    }
}

fn record_from_row(row: &PgRow) -> Result<StockRecord, RepoError> {
    Ok(StockRecord {
        product_id: ProductId::new(row.try_get("product_id")?),
        location: row.try_get("location")?,
        quantity: row.try_get("quantity")?,
        minimum_threshold: row.try_get("minimum_threshold")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn level_from_row(row: &PgRow) -> Result<StockLevelRow, RepoError> {
    let quantity: Decimal = row.try_get("quantity")?;
    let minimum_threshold: Decimal = row.try_get("minimum_threshold")?;
    Ok(StockLevelRow {
        inventory_id: row.try_get("inventory_id")?,
        product_id: ProductId::new(row.try_get("product_id")?),
        product_name: row.try_get("product_name")?,
        unit: row.try_get("unit")?,
        location: row.try_get("location")?,
        quantity,
        minimum_threshold,
        low_stock: stock::is_low(quantity, minimum_threshold),
        updated_at: row.try_get("updated_at")?,
    })
}

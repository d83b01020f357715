//! Sales.
//!
//! A sale only moves stock at the moment it becomes `completed`, and it can
//! become completed exactly once: `completed` is terminal, and the status
//! flip plus the ledger deduction commit or roll back together.

use core::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use plantops_core::{CustomerId, DomainError, ProductId, SaleId};

use crate::error::{RepoError, RepoResult};
use crate::stock::StockLedger;
use crate::users::ensure_affected;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Pending,
    Completed,
    Cancelled,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
        }
    }

    /// A completed sale has already moved stock; it cannot change again.
    pub fn ensure_not_completed(&self) -> Result<(), DomainError> {
        if *self == SaleStatus::Completed {
            Err(DomainError::invalid_transition(
                "sale is already completed".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

impl core::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SaleStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SaleStatus::Pending),
            "completed" => Ok(SaleStatus::Completed),
            "cancelled" => Ok(SaleStatus::Cancelled),
            other => Err(DomainError::validation(format!("unknown sale status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SaleRecord {
    pub sale_id: SaleId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    pub status: SaleStatus,
    pub location: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSale {
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub status: SaleStatus,
    pub location: String,
    pub date: NaiveDate,
}

const SALE_SELECT: &str = "SELECT s.sale_id, s.customer_id, s.product_id, s.quantity, \
     s.unit_price, s.total_amount, s.status, s.location, s.date, s.created_at, \
     c.name AS customer_name, p.name AS product_name \
     FROM sales s \
     JOIN customers c ON c.customer_id = s.customer_id \
     JOIN products p ON p.product_id = s.product_id";

#[derive(Clone)]
pub struct SaleRepo {
    pool: PgPool,
}

impl SaleRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a sale. Total is computed here, never taken from the caller.
    /// A sale created directly in `completed` state deducts stock in the
    /// same transaction; ledger refusal aborts the whole sale.
    pub async fn create(&self, new: &NewSale) -> RepoResult<(SaleId, Decimal)> {
        let total_amount = new.quantity * new.unit_price;
        let mut tx = self.pool.begin().await?;

        let sale_id: i64 = sqlx::query_scalar(
            "INSERT INTO sales (customer_id, product_id, quantity, unit_price, total_amount, status, location, date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING sale_id",
        )
        .bind(new.customer_id.as_i64())
        .bind(new.product_id.as_i64())
        .bind(new.quantity)
        .bind(new.unit_price)
        .bind(total_amount)
        .bind(new.status.as_str())
        .bind(&new.location)
        .bind(new.date)
        .fetch_one(&mut *tx)
        .await?;

        if new.status == SaleStatus::Completed {
            StockLedger::apply_delta_on(&mut *tx, new.product_id, &new.location, -new.quantity)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(sale_id, total_amount = %total_amount, status = %new.status, "sale recorded");
        Ok((SaleId::new(sale_id), total_amount))
    }

    /// Move a sale to a new status.
    ///
    /// The row is locked for the whole decision, so the pending → completed
    /// deduction can happen at most once even under concurrent requests.
    pub async fn update_status(&self, sale_id: SaleId, new_status: SaleStatus) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT status, product_id, location, quantity FROM sales \
             WHERE sale_id = $1 FOR UPDATE",
        )
        .bind(sale_id.as_i64())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DomainError::NotFound)?;

        let current = SaleStatus::from_str(row.try_get::<String, _>("status")?.as_str())?;
        if current == new_status {
            return Ok(());
        }
        current.ensure_not_completed()?;

        sqlx::query("UPDATE sales SET status = $2 WHERE sale_id = $1")
            .bind(sale_id.as_i64())
            .bind(new_status.as_str())
            .execute(&mut *tx)
            .await?;

        if new_status == SaleStatus::Completed {
            let product_id = ProductId::new(row.try_get("product_id")?);
            let location: String = row.try_get("location")?;
            let quantity: Decimal = row.try_get("quantity")?;
            StockLedger::apply_delta_on(&mut *tx, product_id, &location, -quantity).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn get(&self, sale_id: SaleId) -> RepoResult<Option<SaleRecord>> {
        let row = sqlx::query(&format!("{SALE_SELECT} WHERE s.sale_id = $1"))
            .bind(sale_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| sale_from_row(&r)).transpose()
    }

    pub async fn list(&self, limit: i64) -> RepoResult<Vec<SaleRecord>> {
        let rows = sqlx::query(&format!(
            "{SALE_SELECT} ORDER BY s.date DESC, s.sale_id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(sale_from_row).collect()
    }

    pub async fn by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<Vec<SaleRecord>> {
        let rows = sqlx::query(&format!(
            "{SALE_SELECT} WHERE s.date BETWEEN $1 AND $2 ORDER BY s.date DESC"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(sale_from_row).collect()
    }

    /// Correct a sale's bookkeeping fields. Status is out of scope here;
    /// transitions go through `update_status` so the ledger effect cannot
    /// be bypassed or duplicated.
    pub async fn update(&self, sale_id: SaleId, new: &NewSale) -> RepoResult<Decimal> {
        let total_amount = new.quantity * new.unit_price;
        let result = sqlx::query(
            "UPDATE sales SET customer_id = $2, product_id = $3, quantity = $4, \
             unit_price = $5, total_amount = $6, location = $7, date = $8 WHERE sale_id = $1",
        )
        .bind(sale_id.as_i64())
        .bind(new.customer_id.as_i64())
        .bind(new.product_id.as_i64())
        .bind(new.quantity)
        .bind(new.unit_price)
        .bind(total_amount)
        .bind(&new.location)
        .bind(new.date)
        .execute(&self.pool)
        .await?;
        ensure_affected(result.rows_affected())?;
        Ok(total_amount)
    }

    pub async fn delete(&self, sale_id: SaleId) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM sales WHERE sale_id = $1")
            .bind(sale_id.as_i64())
            .execute(&self.pool)
            .await?;
        ensure_affected(result.rows_affected())
    }

    /// Completed-sales revenue over a date range.
    pub async fn total_between(&self, start: NaiveDate, end: NaiveDate) -> RepoResult<Decimal> {
        let total: Option<Decimal> = sqlx::query_scalar(
            "SELECT SUM(total_amount) FROM sales \
             WHERE date BETWEEN $1 AND $2 AND status = 'completed'",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(total.unwrap_or(Decimal::ZERO))
    }

    /// Best-selling product by completed revenue over a date range.
    pub async fn top_product_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<Option<TopProduct>> {
        let row = sqlx::query(
            "SELECT p.name, SUM(s.quantity) AS total_qty, SUM(s.total_amount) AS total_sales \
             FROM sales s JOIN products p ON p.product_id = s.product_id \
             WHERE s.date BETWEEN $1 AND $2 AND s.status = 'completed' \
             GROUP BY p.product_id, p.name ORDER BY total_sales DESC LIMIT 1",
        )
        .bind(start)
        .bind(end)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Ok(TopProduct {
                name: r.try_get("name")?,
                quantity_sold: r.try_get("total_qty")?,
                total_sales: r.try_get("total_sales")?,
            })
        })
        .transpose()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TopProduct {
    pub name: String,
    pub quantity_sold: Decimal,
    pub total_sales: Decimal,
}

fn sale_from_row(row: &PgRow) -> Result<SaleRecord, RepoError> {
    let status = SaleStatus::from_str(row.try_get::<String, _>("status")?.as_str())?;
    Ok(SaleRecord {
        sale_id: SaleId::new(row.try_get("sale_id")?),
        customer_id: CustomerId::new(row.try_get("customer_id")?),
        customer_name: row.try_get("customer_name")?,
        product_id: ProductId::new(row.try_get("product_id")?),
        product_name: row.try_get("product_name")?,
        quantity: row.try_get("quantity")?,
        unit_price: row.try_get("unit_price")?,
        total_amount: row.try_get("total_amount")?,
        status,
        location: row.try_get("location")?,
        date: row.try_get("date")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_is_terminal() {
        assert!(SaleStatus::Pending.ensure_not_completed().is_ok());
        assert!(SaleStatus::Cancelled.ensure_not_completed().is_ok());
        assert!(matches!(
            SaleStatus::Completed.ensure_not_completed().unwrap_err(),
            DomainError::InvalidStateTransition(_)
        ));
    }

    #[test]
    fn status_round_trips_through_storage_form() {
        for status in [SaleStatus::Pending, SaleStatus::Completed, SaleStatus::Cancelled] {
            assert_eq!(SaleStatus::from_str(status.as_str()).unwrap(), status);
        }
    }
}

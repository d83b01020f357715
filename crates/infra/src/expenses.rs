//! Expenses.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use plantops_core::ExpenseId;

use crate::error::{RepoError, RepoResult};
use crate::users::ensure_affected;

#[derive(Debug, Clone, Serialize)]
pub struct ExpenseRecord {
    pub expense_id: ExpenseId,
    pub category: String,
    pub amount: Decimal,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ExpenseInput {
    pub category: String,
    pub amount: Decimal,
    pub description: Option<String>,
    pub date: NaiveDate,
}

/// Category subtotal for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Decimal,
}

#[derive(Clone)]
pub struct ExpenseRepo {
    pool: PgPool,
}

impl ExpenseRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: &ExpenseInput) -> RepoResult<ExpenseId> {
        let expense_id: i64 = sqlx::query_scalar(
            "INSERT INTO expenses (category, amount, description, date) \
             VALUES ($1, $2, $3, $4) RETURNING expense_id",
        )
        .bind(&input.category)
        .bind(input.amount)
        .bind(&input.description)
        .bind(input.date)
        .fetch_one(&self.pool)
        .await?;
        Ok(ExpenseId::new(expense_id))
    }

    pub async fn get(&self, expense_id: ExpenseId) -> RepoResult<Option<ExpenseRecord>> {
        let row = sqlx::query(
            "SELECT expense_id, category, amount, description, date, created_at \
             FROM expenses WHERE expense_id = $1",
        )
        .bind(expense_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| expense_from_row(&r)).transpose()
    }

    pub async fn list(&self, limit: i64) -> RepoResult<Vec<ExpenseRecord>> {
        let rows = sqlx::query(
            "SELECT expense_id, category, amount, description, date, created_at \
             FROM expenses ORDER BY date DESC, expense_id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(expense_from_row).collect()
    }

    pub async fn by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<Vec<ExpenseRecord>> {
        let rows = sqlx::query(
            "SELECT expense_id, category, amount, description, date, created_at \
             FROM expenses WHERE date BETWEEN $1 AND $2 ORDER BY date DESC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(expense_from_row).collect()
    }

    pub async fn by_category(&self, category: &str) -> RepoResult<Vec<ExpenseRecord>> {
        let rows = sqlx::query(
            "SELECT expense_id, category, amount, description, date, created_at \
             FROM expenses WHERE category = $1 ORDER BY date DESC",
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(expense_from_row).collect()
    }

    pub async fn update(&self, expense_id: ExpenseId, input: &ExpenseInput) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE expenses SET category = $2, amount = $3, description = $4, date = $5 \
             WHERE expense_id = $1",
        )
        .bind(expense_id.as_i64())
        .bind(&input.category)
        .bind(input.amount)
        .bind(&input.description)
        .bind(input.date)
        .execute(&self.pool)
        .await?;
        ensure_affected(result.rows_affected())
    }

    pub async fn delete(&self, expense_id: ExpenseId) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM expenses WHERE expense_id = $1")
            .bind(expense_id.as_i64())
            .execute(&self.pool)
            .await?;
        ensure_affected(result.rows_affected())
    }

    pub async fn total_between(&self, start: NaiveDate, end: NaiveDate) -> RepoResult<Decimal> {
        let total: Option<Decimal> =
            sqlx::query_scalar("SELECT SUM(amount) FROM expenses WHERE date BETWEEN $1 AND $2")
                .bind(start)
                .bind(end)
                .fetch_one(&self.pool)
                .await?;
        Ok(total.unwrap_or(Decimal::ZERO))
    }

    pub async fn totals_by_category(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<Vec<CategoryTotal>> {
        let rows = sqlx::query(
            "SELECT category, SUM(amount) AS total FROM expenses \
             WHERE date BETWEEN $1 AND $2 GROUP BY category ORDER BY total DESC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| {
                Ok(CategoryTotal {
                    category: r.try_get("category")?,
                    total: r.try_get("total")?,
                })
            })
            .collect()
    }
}

fn expense_from_row(row: &PgRow) -> Result<ExpenseRecord, RepoError> {
    Ok(ExpenseRecord {
        expense_id: ExpenseId::new(row.try_get("expense_id")?),
        category: row.try_get("category")?,
        amount: row.try_get("amount")?,
        description: row.try_get("description")?,
        date: row.try_get("date")?,
        created_at: row.try_get("created_at")?,
    })
}

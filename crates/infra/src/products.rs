//! Product catalogue.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use plantops_core::ProductId;

use crate::error::{RepoError, RepoResult};
use crate::users::ensure_affected;

#[derive(Debug, Clone, Serialize)]
pub struct ProductRecord {
    pub product_id: ProductId,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ProductRepo {
    pool: PgPool,
}

impl ProductRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        name: &str,
        category: &str,
        unit: &str,
        description: Option<&str>,
    ) -> RepoResult<ProductId> {
        let product_id: i64 = sqlx::query_scalar(
            "INSERT INTO products (name, category, unit, description) \
             VALUES ($1, $2, $3, $4) RETURNING product_id",
        )
        .bind(name)
        .bind(category)
        .bind(unit)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(ProductId::new(product_id))
    }

    pub async fn get(&self, product_id: ProductId) -> RepoResult<Option<ProductRecord>> {
        let row = sqlx::query(
            "SELECT product_id, name, category, unit, description, created_at \
             FROM products WHERE product_id = $1",
        )
        .bind(product_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| product_from_row(&r)).transpose()
    }

    pub async fn list(&self) -> RepoResult<Vec<ProductRecord>> {
        let rows = sqlx::query(
            "SELECT product_id, name, category, unit, description, created_at \
             FROM products ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(product_from_row).collect()
    }

    pub async fn by_category(&self, category: &str) -> RepoResult<Vec<ProductRecord>> {
        let rows = sqlx::query(
            "SELECT product_id, name, category, unit, description, created_at \
             FROM products WHERE category = $1 ORDER BY name",
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(product_from_row).collect()
    }

    pub async fn update(
        &self,
        product_id: ProductId,
        name: &str,
        category: &str,
        unit: &str,
        description: Option<&str>,
    ) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE products SET name = $2, category = $3, unit = $4, description = $5 \
             WHERE product_id = $1",
        )
        .bind(product_id.as_i64())
        .bind(name)
        .bind(category)
        .bind(unit)
        .bind(description)
        .execute(&self.pool)
        .await?;
        ensure_affected(result.rows_affected())
    }

    pub async fn delete(&self, product_id: ProductId) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE product_id = $1")
            .bind(product_id.as_i64())
            .execute(&self.pool)
            .await?;
        ensure_affected(result.rows_affected())
    }

    pub async fn count(&self) -> RepoResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn product_from_row(row: &PgRow) -> Result<ProductRecord, RepoError> {
    Ok(ProductRecord {
        product_id: ProductId::new(row.try_get("product_id")?),
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        unit: row.try_get("unit")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
    })
}

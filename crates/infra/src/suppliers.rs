//! Supplier directory.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use plantops_core::SupplierId;

use crate::error::{RepoError, RepoResult};
use crate::users::ensure_affected;

#[derive(Debug, Clone, Serialize)]
pub struct SupplierRecord {
    pub supplier_id: SupplierId,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SupplierInput {
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Clone)]
pub struct SupplierRepo {
    pool: PgPool,
}

impl SupplierRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: &SupplierInput) -> RepoResult<SupplierId> {
        let supplier_id: i64 = sqlx::query_scalar(
            "INSERT INTO suppliers (name, contact_person, phone, email, address) \
             VALUES ($1, $2, $3, $4, $5) RETURNING supplier_id",
        )
        .bind(&input.name)
        .bind(&input.contact_person)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .fetch_one(&self.pool)
        .await?;
        Ok(SupplierId::new(supplier_id))
    }

    pub async fn get(&self, supplier_id: SupplierId) -> RepoResult<Option<SupplierRecord>> {
        let row = sqlx::query(
            "SELECT supplier_id, name, contact_person, phone, email, address, created_at \
             FROM suppliers WHERE supplier_id = $1",
        )
        .bind(supplier_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| supplier_from_row(&r)).transpose()
    }

    pub async fn list(&self) -> RepoResult<Vec<SupplierRecord>> {
        let rows = sqlx::query(
            "SELECT supplier_id, name, contact_person, phone, email, address, created_at \
             FROM suppliers ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(supplier_from_row).collect()
    }

    pub async fn update(&self, supplier_id: SupplierId, input: &SupplierInput) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE suppliers SET name = $2, contact_person = $3, phone = $4, email = $5, \
             address = $6 WHERE supplier_id = $1",
        )
        .bind(supplier_id.as_i64())
        .bind(&input.name)
        .bind(&input.contact_person)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .execute(&self.pool)
        .await?;
        ensure_affected(result.rows_affected())
    }

    pub async fn delete(&self, supplier_id: SupplierId) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM suppliers WHERE supplier_id = $1")
            .bind(supplier_id.as_i64())
            .execute(&self.pool)
            .await?;
        ensure_affected(result.rows_affected())
    }
}

fn supplier_from_row(row: &PgRow) -> Result<SupplierRecord, RepoError> {
    Ok(SupplierRecord {
        supplier_id: SupplierId::new(row.try_get("supplier_id")?),
        name: row.try_get("name")?,
        contact_person: row.try_get("contact_person")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        address: row.try_get("address")?,
        created_at: row.try_get("created_at")?,
    })
}

//! Customer directory.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use plantops_core::CustomerId;

use crate::error::{RepoError, RepoResult};
use crate::users::ensure_affected;

#[derive(Debug, Clone, Serialize)]
pub struct CustomerRecord {
    pub customer_id: CustomerId,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when creating or updating a customer.
#[derive(Debug, Clone)]
pub struct CustomerInput {
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Clone)]
pub struct CustomerRepo {
    pool: PgPool,
}

impl CustomerRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: &CustomerInput) -> RepoResult<CustomerId> {
        let customer_id: i64 = sqlx::query_scalar(
            "INSERT INTO customers (name, contact_person, phone, email, address) \
             VALUES ($1, $2, $3, $4, $5) RETURNING customer_id",
        )
        .bind(&input.name)
        .bind(&input.contact_person)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .fetch_one(&self.pool)
        .await?;
        Ok(CustomerId::new(customer_id))
    }

    pub async fn get(&self, customer_id: CustomerId) -> RepoResult<Option<CustomerRecord>> {
        let row = sqlx::query(
            "SELECT customer_id, name, contact_person, phone, email, address, created_at \
             FROM customers WHERE customer_id = $1",
        )
        .bind(customer_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| customer_from_row(&r)).transpose()
    }

    pub async fn list(&self) -> RepoResult<Vec<CustomerRecord>> {
        let rows = sqlx::query(
            "SELECT customer_id, name, contact_person, phone, email, address, created_at \
             FROM customers ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(customer_from_row).collect()
    }

    pub async fn update(&self, customer_id: CustomerId, input: &CustomerInput) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE customers SET name = $2, contact_person = $3, phone = $4, email = $5, \
             address = $6 WHERE customer_id = $1",
        )
        .bind(customer_id.as_i64())
        .bind(&input.name)
        .bind(&input.contact_person)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .execute(&self.pool)
        .await?;
        ensure_affected(result.rows_affected())
    }

    pub async fn delete(&self, customer_id: CustomerId) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE customer_id = $1")
            .bind(customer_id.as_i64())
            .execute(&self.pool)
            .await?;
        ensure_affected(result.rows_affected())
    }
}

fn customer_from_row(row: &PgRow) -> Result<CustomerRecord, RepoError> {
    Ok(CustomerRecord {
        customer_id: CustomerId::new(row.try_get("customer_id")?),
        name: row.try_get("name")?,
        contact_person: row.try_get("contact_person")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        address: row.try_get("address")?,
        created_at: row.try_get("created_at")?,
    })
}

//! User accounts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use plantops_auth::Role;
use plantops_core::{DomainError, UserId};

use crate::error::{RepoError, RepoResult};

/// User row without credential material.
#[derive(Debug, Clone, Serialize)]
pub struct UserRecord {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User row with its password hash, for the login path only.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: UserRecord,
    pub password_hash: String,
}

#[derive(Clone)]
pub struct UserRepo {
    pool: PgPool,
}

impl UserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        name: &str,
        email: &str,
        role: Role,
        password_hash: &str,
    ) -> RepoResult<UserId> {
        let user_id: i64 = sqlx::query_scalar(
            "INSERT INTO users (name, email, role, password_hash) \
             VALUES ($1, $2, $3, $4) RETURNING user_id",
        )
        .bind(name)
        .bind(email)
        .bind(role.as_str())
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(UserId::new(user_id))
    }

    pub async fn get(&self, user_id: UserId) -> RepoResult<Option<UserRecord>> {
        let row = sqlx::query(
            "SELECT user_id, name, email, role, created_at, updated_at \
             FROM users WHERE user_id = $1",
        )
        .bind(user_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| user_from_row(&r)).transpose()
    }

    pub async fn find_credentials(&self, email: &str) -> RepoResult<Option<UserCredentials>> {
        let row = sqlx::query(
            "SELECT user_id, name, email, role, password_hash, created_at, updated_at \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Ok(UserCredentials {
                user: user_from_row(&r)?,
                password_hash: r.try_get("password_hash")?,
            })
        })
        .transpose()
    }

    pub async fn list(&self) -> RepoResult<Vec<UserRecord>> {
        let rows = sqlx::query(
            "SELECT user_id, name, email, role, created_at, updated_at \
             FROM users ORDER BY user_id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(user_from_row).collect()
    }

    pub async fn update(
        &self,
        user_id: UserId,
        name: &str,
        email: &str,
        role: Role,
    ) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE users SET name = $2, email = $3, role = $4, updated_at = now() \
             WHERE user_id = $1",
        )
        .bind(user_id.as_i64())
        .bind(name)
        .bind(email)
        .bind(role.as_str())
        .execute(&self.pool)
        .await?;
        ensure_affected(result.rows_affected())
    }

    pub async fn update_role(&self, user_id: UserId, role: Role) -> RepoResult<()> {
        let result =
            sqlx::query("UPDATE users SET role = $2, updated_at = now() WHERE user_id = $1")
                .bind(user_id.as_i64())
                .bind(role.as_str())
                .execute(&self.pool)
                .await?;
        ensure_affected(result.rows_affected())
    }

    pub async fn update_password(&self, user_id: UserId, password_hash: &str) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = now() WHERE user_id = $1",
        )
        .bind(user_id.as_i64())
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        ensure_affected(result.rows_affected())
    }

    pub async fn delete(&self, user_id: UserId) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id.as_i64())
            .execute(&self.pool)
            .await?;
        ensure_affected(result.rows_affected())
    }

    pub async fn count(&self) -> RepoResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn user_from_row(row: &PgRow) -> Result<UserRecord, RepoError> {
    let role: String = row.try_get("role")?;
    Ok(UserRecord {
        user_id: UserId::new(row.try_get("user_id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        role: role.parse()?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn ensure_affected(rows: u64) -> RepoResult<()> {
    if rows == 0 {
        Err(RepoError::Domain(DomainError::not_found()))
    } else {
        Ok(())
    }
}

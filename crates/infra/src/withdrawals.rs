//! Material withdrawals.
//!
//! Approval is the only path from a withdrawal to the stock ledger. The row
//! is locked for the whole decision and the status guard runs against the
//! locked value, so a decided withdrawal can never be decided again and can
//! never deduct stock twice.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};

use plantops_core::{BatchId, DomainError, ProductId, UserId, WithdrawalId};
use plantops_inventory::WithdrawalStatus;

use crate::error::{RepoError, RepoResult};
use crate::stock::StockLedger;

/// Withdrawal joined with product, stock, requester and approver context.
#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalRecord {
    pub withdrawal_id: WithdrawalId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit: String,
    pub location: String,
    pub requested_quantity: Decimal,
    pub available_stock: Option<Decimal>,
    pub requested_by: UserId,
    pub requested_by_name: String,
    pub batch_id: Option<BatchId>,
    pub batch_number: Option<String>,
    pub purpose: Option<String>,
    pub status: WithdrawalStatus,
    pub requested_at: DateTime<Utc>,
    pub approved_by: Option<UserId>,
    pub approved_by_name: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewWithdrawal {
    pub product_id: ProductId,
    pub location: String,
    pub requested_quantity: Decimal,
    pub requested_by: UserId,
    pub batch_id: Option<BatchId>,
    pub purpose: Option<String>,
}

#[derive(Clone)]
pub struct WithdrawalRepo {
    pool: PgPool,
}

impl WithdrawalRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: &NewWithdrawal) -> RepoResult<WithdrawalId> {
        let withdrawal_id: i64 = sqlx::query_scalar(
            "INSERT INTO material_withdrawals \
             (product_id, location, requested_quantity, requested_by, batch_id, purpose) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING withdrawal_id",
        )
        .bind(new.product_id.as_i64())
        .bind(&new.location)
        .bind(new.requested_quantity)
        .bind(new.requested_by.as_i64())
        .bind(new.batch_id.map(|b| b.as_i64()))
        .bind(&new.purpose)
        .fetch_one(&self.pool)
        .await?;
        Ok(WithdrawalId::new(withdrawal_id))
    }

    pub async fn list(&self) -> RepoResult<Vec<WithdrawalRecord>> {
        let rows = sqlx::query(
            "SELECT mw.withdrawal_id, mw.product_id, mw.location, mw.requested_quantity, \
                    mw.requested_by, mw.batch_id, mw.purpose, mw.status, mw.requested_at, \
                    mw.approved_by, mw.approved_at, mw.rejection_reason, \
                    p.name AS product_name, p.unit, \
                    i.quantity AS available_stock, \
                    u_req.name AS requested_by_name, \
                    u_app.name AS approved_by_name, \
                    pb.batch_number \
             FROM material_withdrawals mw \
             JOIN products p ON p.product_id = mw.product_id \
             LEFT JOIN inventory i ON i.product_id = mw.product_id AND i.location = mw.location \
             JOIN users u_req ON u_req.user_id = mw.requested_by \
             LEFT JOIN users u_app ON u_app.user_id = mw.approved_by \
             LEFT JOIN production_batches pb ON pb.batch_id = mw.batch_id \
             ORDER BY mw.requested_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(withdrawal_from_row).collect()
    }

    /// Approve a pending withdrawal and deduct the requested quantity.
    pub async fn approve(&self, withdrawal_id: WithdrawalId, approver: UserId) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        let (product_id, location, quantity) =
            Self::lock_pending(&mut *tx, withdrawal_id).await?;

        sqlx::query(
            "UPDATE material_withdrawals \
             SET status = 'approved', approved_by = $2, approved_at = now() \
             WHERE withdrawal_id = $1 AND status = 'pending'",
        )
        .bind(withdrawal_id.as_i64())
        .bind(approver.as_i64())
        .execute(&mut *tx)
        .await?;

        StockLedger::apply_delta_on(&mut *tx, product_id, &location, -quantity).await?;

        tx.commit().await?;

        tracing::info!(%withdrawal_id, %approver, quantity = %quantity, "withdrawal approved");
        Ok(())
    }

    /// Reject a pending withdrawal. No ledger effect.
    pub async fn reject(
        &self,
        withdrawal_id: WithdrawalId,
        approver: UserId,
        reason: &str,
    ) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        Self::lock_pending(&mut *tx, withdrawal_id).await?;

        sqlx::query(
            "UPDATE material_withdrawals \
             SET status = 'rejected', approved_by = $2, approved_at = now(), \
                 rejection_reason = $3 \
             WHERE withdrawal_id = $1 AND status = 'pending'",
        )
        .bind(withdrawal_id.as_i64())
        .bind(approver.as_i64())
        .bind(reason)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(%withdrawal_id, %approver, "withdrawal rejected");
        Ok(())
    }

    /// Lock the withdrawal row and enforce the pending-state guard against
    /// the locked value. Returns the fields approval needs for the ledger.
    async fn lock_pending(
        tx: &mut PgConnection,
        withdrawal_id: WithdrawalId,
    ) -> RepoResult<(ProductId, String, Decimal)> {
        let row = sqlx::query(
            "SELECT status, product_id, location, requested_quantity \
             FROM material_withdrawals WHERE withdrawal_id = $1 FOR UPDATE",
        )
        .bind(withdrawal_id.as_i64())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DomainError::NotFound)?;

        let status = WithdrawalStatus::from_str(row.try_get::<String, _>("status")?.as_str())?;
        status.ensure_pending()?;

        Ok((
            ProductId::new(row.try_get("product_id")?),
            row.try_get("location")?,
            row.try_get("requested_quantity")?,
        ))
    }
}

fn withdrawal_from_row(row: &PgRow) -> Result<WithdrawalRecord, RepoError> {
    let status = WithdrawalStatus::from_str(row.try_get::<String, _>("status")?.as_str())?;
    Ok(WithdrawalRecord {
        withdrawal_id: WithdrawalId::new(row.try_get("withdrawal_id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        product_name: row.try_get("product_name")?,
        unit: row.try_get("unit")?,
        location: row.try_get("location")?,
        requested_quantity: row.try_get("requested_quantity")?,
        available_stock: row.try_get("available_stock")?,
        requested_by: UserId::new(row.try_get("requested_by")?),
        requested_by_name: row.try_get("requested_by_name")?,
        batch_id: row.try_get::<Option<i64>, _>("batch_id")?.map(BatchId::new),
        batch_number: row.try_get("batch_number")?,
        purpose: row.try_get("purpose")?,
        status,
        requested_at: row.try_get("requested_at")?,
        approved_by: row.try_get::<Option<i64>, _>("approved_by")?.map(UserId::new),
        approved_by_name: row.try_get("approved_by_name")?,
        approved_at: row.try_get("approved_at")?,
        rejection_reason: row.try_get("rejection_reason")?,
    })
}

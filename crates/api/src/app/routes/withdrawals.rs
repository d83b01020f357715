//! Material withdrawal routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use plantops_core::{BatchId, ProductId, WithdrawalId};
use plantops_infra::withdrawals::NewWithdrawal;

use crate::app::AppServices;
use crate::app::errors::{json_error, repo_error_to_response};
use crate::authz;
use crate::context::CurrentUser;

const DEFAULT_LOCATION: &str = "Main Warehouse";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id/approve", post(approve))
        .route("/:id/reject", post(reject))
}

async fn list(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.withdrawals.list().await {
        Ok(withdrawals) => (StatusCode::OK, Json(withdrawals)).into_response(),
        Err(e) => repo_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct CreateWithdrawalRequest {
    product_id: i64,
    location: Option<String>,
    requested_quantity: Decimal,
    batch_id: Option<i64>,
    purpose: Option<String>,
}

async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CreateWithdrawalRequest>,
) -> axum::response::Response {
    if body.requested_quantity <= Decimal::ZERO {
        return json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "requested quantity must be positive",
        );
    }

    let new = NewWithdrawal {
        product_id: ProductId::new(body.product_id),
        location: body.location.unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
        requested_quantity: body.requested_quantity,
        requested_by: user.user_id,
        batch_id: body.batch_id.map(BatchId::new),
        purpose: body.purpose,
    };

    match services.withdrawals.create(&new).await {
        Ok(withdrawal_id) => {
            services
                .audit
                .record(
                    user.user_id,
                    "create",
                    "withdrawal",
                    Some(withdrawal_id.as_i64()),
                    Some(json!({ "requested_quantity": new.requested_quantity })),
                )
                .await;
            (
                StatusCode::CREATED,
                Json(json!({ "withdrawal_id": withdrawal_id })),
            )
                .into_response()
        }
        Err(e) => repo_error_to_response(e),
    }
}

async fn approve(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::MANAGE_TIER) {
        return resp;
    }

    match services.withdrawals.approve(WithdrawalId::new(id), user.user_id).await {
        Ok(()) => {
            services
                .audit
                .record(user.user_id, "approve", "withdrawal", Some(id), None)
                .await;
            (
                StatusCode::OK,
                Json(json!({ "message": "withdrawal approved and stock updated" })),
            )
                .into_response()
        }
        Err(e) => repo_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct RejectRequest {
    reason: Option<String>,
}

async fn reject(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<RejectRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::MANAGE_TIER) {
        return resp;
    }

    let reason = body.reason.unwrap_or_else(|| "no reason provided".to_string());

    match services
        .withdrawals
        .reject(WithdrawalId::new(id), user.user_id, &reason)
        .await
    {
        Ok(()) => {
            services
                .audit
                .record(
                    user.user_id,
                    "reject",
                    "withdrawal",
                    Some(id),
                    Some(json!({ "reason": reason })),
                )
                .await;
            (StatusCode::OK, Json(json!({ "message": "withdrawal rejected" }))).into_response()
        }
        Err(e) => repo_error_to_response(e),
    }
}

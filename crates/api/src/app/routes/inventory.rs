//! Stock record routes.
//!
//! Quantity is never set through this surface; it only moves through the
//! stock ledger from production, sales and withdrawal flows.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use plantops_core::ProductId;

use crate::app::AppServices;
use crate::app::errors::repo_error_to_response;
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/low-stock", get(low_stock))
        .route("/product/:product_id", get(by_product))
        .route("/:inventory_id", axum::routing::put(update).delete(remove))
}

async fn list(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.stock.list().await {
        Ok(levels) => (StatusCode::OK, Json(levels)).into_response(),
        Err(e) => repo_error_to_response(e),
    }
}

async fn low_stock(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.stock.low_stock().await {
        Ok(levels) => (StatusCode::OK, Json(levels)).into_response(),
        Err(e) => repo_error_to_response(e),
    }
}

async fn by_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(product_id): Path<i64>,
) -> axum::response::Response {
    match services.stock.by_product(ProductId::new(product_id)).await {
        Ok(levels) => (StatusCode::OK, Json(levels)).into_response(),
        Err(e) => repo_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct CreateStockRequest {
    product_id: i64,
    location: String,
    #[serde(default)]
    quantity: Decimal,
    #[serde(default)]
    minimum_threshold: Decimal,
}

async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CreateStockRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::MANAGE_TIER) {
        return resp;
    }

    match services
        .stock
        .create(
            ProductId::new(body.product_id),
            &body.location,
            body.quantity,
            body.minimum_threshold,
        )
        .await
    {
        Ok(inventory_id) => {
            services
                .audit
                .record(
                    user.user_id,
                    "create",
                    "inventory",
                    Some(inventory_id),
                    Some(json!({ "location": body.location })),
                )
                .await;
            (StatusCode::CREATED, Json(json!({ "inventory_id": inventory_id }))).into_response()
        }
        Err(e) => repo_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct UpdateStockRequest {
    location: String,
    minimum_threshold: Decimal,
}

async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(inventory_id): Path<i64>,
    Json(body): Json<UpdateStockRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::MANAGE_TIER) {
        return resp;
    }

    match services
        .stock
        .update_settings(inventory_id, &body.location, body.minimum_threshold)
        .await
    {
        Ok(()) => {
            services
                .audit
                .record(user.user_id, "update", "inventory", Some(inventory_id), None)
                .await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => repo_error_to_response(e),
    }
}

async fn remove(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(inventory_id): Path<i64>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::ADMIN_TIER) {
        return resp;
    }
    match services.stock.delete(inventory_id).await {
        Ok(()) => {
            services
                .audit
                .record(user.user_id, "delete", "inventory", Some(inventory_id), None)
                .await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => repo_error_to_response(e),
    }
}

//! Sales routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use plantops_core::{CustomerId, ProductId, SaleId};
use plantops_infra::sales::{NewSale, SaleStatus};

use crate::app::AppServices;
use crate::app::errors::{json_error, repo_error_to_response};
use crate::authz;
use crate::context::CurrentUser;

const DEFAULT_LOCATION: &str = "Main Warehouse";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(get_one).put(update).delete(remove))
        .route("/:id/status", patch(update_status))
        .route("/filter/by-date", get(filter_by_date))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<i64>,
}

async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ListQuery>,
) -> axum::response::Response {
    match services.sales.list(query.limit.unwrap_or(100)).await {
        Ok(sales) => (StatusCode::OK, Json(sales)).into_response(),
        Err(e) => repo_error_to_response(e),
    }
}

async fn get_one(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    match services.sales.get(SaleId::new(id)).await {
        Ok(Some(sale)) => (StatusCode::OK, Json(sale)).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "not_found", "sale not found"),
        Err(e) => repo_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct CreateSaleRequest {
    customer_id: i64,
    product_id: i64,
    quantity: Decimal,
    unit_price: Decimal,
    status: Option<SaleStatus>,
    location: Option<String>,
    date: Option<NaiveDate>,
}

async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CreateSaleRequest>,
) -> axum::response::Response {
    let new = NewSale {
        customer_id: CustomerId::new(body.customer_id),
        product_id: ProductId::new(body.product_id),
        quantity: body.quantity,
        unit_price: body.unit_price,
        status: body.status.unwrap_or(SaleStatus::Pending),
        location: body.location.unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
        date: body.date.unwrap_or_else(|| chrono::Utc::now().date_naive()),
    };

    match services.sales.create(&new).await {
        Ok((sale_id, total_amount)) => {
            services
                .audit
                .record(
                    user.user_id,
                    "create",
                    "sale",
                    Some(sale_id.as_i64()),
                    Some(json!({ "total_amount": total_amount })),
                )
                .await;
            (
                StatusCode::CREATED,
                Json(json!({ "sale_id": sale_id, "total_amount": total_amount })),
            )
                .into_response()
        }
        Err(e) => repo_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct DateRangeQuery {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

async fn filter_by_date(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<DateRangeQuery>,
) -> axum::response::Response {
    match services
        .sales
        .by_date_range(query.start_date, query.end_date)
        .await
    {
        Ok(sales) => (StatusCode::OK, Json(sales)).into_response(),
        Err(e) => repo_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct UpdateSaleRequest {
    customer_id: i64,
    product_id: i64,
    quantity: Decimal,
    unit_price: Decimal,
    location: Option<String>,
    date: NaiveDate,
}

async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateSaleRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::MANAGE_TIER) {
        return resp;
    }

    let new = NewSale {
        customer_id: CustomerId::new(body.customer_id),
        product_id: ProductId::new(body.product_id),
        quantity: body.quantity,
        unit_price: body.unit_price,
        // Status is never updated here; transitions go through the status
        // endpoint so the stock effect stays exactly-once.
        status: SaleStatus::Pending,
        location: body.location.unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
        date: body.date,
    };

    match services.sales.update(SaleId::new(id), &new).await {
        Ok(total_amount) => {
            services
                .audit
                .record(user.user_id, "update", "sale", Some(id), None)
                .await;
            (StatusCode::OK, Json(json!({ "total_amount": total_amount }))).into_response()
        }
        Err(e) => repo_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: SaleStatus,
}

async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateStatusRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::MANAGE_TIER) {
        return resp;
    }

    match services.sales.update_status(SaleId::new(id), body.status).await {
        Ok(()) => {
            services
                .audit
                .record(
                    user.user_id,
                    "update_status",
                    "sale",
                    Some(id),
                    Some(json!({ "status": body.status })),
                )
                .await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => repo_error_to_response(e),
    }
}

async fn remove(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::ADMIN_TIER) {
        return resp;
    }
    match services.sales.delete(SaleId::new(id)).await {
        Ok(()) => {
            services
                .audit
                .record(user.user_id, "delete", "sale", Some(id), None)
                .await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => repo_error_to_response(e),
    }
}

//! Production run routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use plantops_core::{ProductId, ProductionId, UserId};
use plantops_infra::production::NewProduction;

use crate::app::AppServices;
use crate::app::errors::{json_error, repo_error_to_response};
use crate::authz;
use crate::context::CurrentUser;

const DEFAULT_LOCATION: &str = "Main Warehouse";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(get_one).put(update).delete(remove))
        .route("/filter/by-date", get(filter_by_date))
        .route("/filter/by-product", get(filter_by_product))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<i64>,
}

async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ListQuery>,
) -> axum::response::Response {
    match services.production.list(query.limit.unwrap_or(100)).await {
        Ok(runs) => (StatusCode::OK, Json(runs)).into_response(),
        Err(e) => repo_error_to_response(e),
    }
}

async fn get_one(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    match services.production.get(ProductionId::new(id)).await {
        Ok(Some(run)) => (StatusCode::OK, Json(run)).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "not_found", "production run not found"),
        Err(e) => repo_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct CreateProductionRequest {
    product_id: i64,
    input_qty: Decimal,
    output_qty: Decimal,
    date: NaiveDate,
    location: Option<String>,
    notes: Option<String>,
}

async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CreateProductionRequest>,
) -> axum::response::Response {
    let new = NewProduction {
        product_id: ProductId::new(body.product_id),
        supervisor_id: user.user_id,
        input_qty: body.input_qty,
        output_qty: body.output_qty,
        location: body.location.unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
        date: body.date,
        notes: body.notes,
    };

    match services.production.create(&new).await {
        Ok(production_id) => {
            services
                .audit
                .record(
                    user.user_id,
                    "create",
                    "production",
                    Some(production_id.as_i64()),
                    Some(json!({ "output_qty": new.output_qty })),
                )
                .await;
            (
                StatusCode::CREATED,
                Json(json!({ "production_id": production_id })),
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
        .production
        .by_date_range(query.start_date, query.end_date)
        .await
    {
        Ok(runs) => (StatusCode::OK, Json(runs)).into_response(),
        Err(e) => repo_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct ProductQuery {
    product_id: i64,
}

async fn filter_by_product(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ProductQuery>,
) -> axum::response::Response {
    match services
        .production
        .by_product(ProductId::new(query.product_id))
        .await
    {
        Ok(runs) => (StatusCode::OK, Json(runs)).into_response(),
        Err(e) => repo_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct UpdateProductionRequest {
    product_id: i64,
    supervisor_id: i64,
    input_qty: Decimal,
    output_qty: Decimal,
    date: NaiveDate,
    location: Option<String>,
    notes: Option<String>,
}

async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateProductionRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::MANAGE_TIER) {
        return resp;
    }

    let new = NewProduction {
        product_id: ProductId::new(body.product_id),
        supervisor_id: UserId::new(body.supervisor_id),
        input_qty: body.input_qty,
        output_qty: body.output_qty,
        location: body.location.unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
        date: body.date,
        notes: body.notes,
    };

    match services.production.update(ProductionId::new(id), &new).await {
        Ok(()) => {
            services
                .audit
                .record(user.user_id, "update", "production", Some(id), None)
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
    match services.production.delete(ProductionId::new(id)).await {
        Ok(()) => {
            services
                .audit
                .record(user.user_id, "delete", "production", Some(id), None)
                .await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => repo_error_to_response(e),
    }
}

//! Production batch routes (production-planning tier).

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use plantops_core::{BatchId, ProductId, UserId};
use plantops_infra::batches::BatchInput;

use crate::app::AppServices;
use crate::app::errors::{json_error, repo_error_to_response};
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(get_one).put(update).delete(remove))
}

#[derive(Debug, Deserialize)]
struct BatchRequest {
    product_id: i64,
    target_quantity: Decimal,
    scheduled_date: NaiveDate,
    status: Option<String>,
    current_stage: Option<String>,
    notes: Option<String>,
    #[serde(default)]
    supervisor_ids: Vec<i64>,
    #[serde(default)]
    worker_ids: Vec<i64>,
}

impl BatchRequest {
    fn into_input(self) -> BatchInput {
        BatchInput {
            product_id: ProductId::new(self.product_id),
            target_quantity: self.target_quantity,
            scheduled_date: self.scheduled_date,
            status: self.status.unwrap_or_else(|| "planned".to_string()),
            current_stage: self.current_stage.unwrap_or_else(|| "mixing".to_string()),
            notes: self.notes,
            supervisor_ids: self.supervisor_ids.into_iter().map(UserId::new).collect(),
            worker_ids: self.worker_ids.into_iter().map(UserId::new).collect(),
        }
    }
}

async fn list(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.batches.list().await {
        Ok(batches) => (StatusCode::OK, Json(batches)).into_response(),
        Err(e) => repo_error_to_response(e),
    }
}

async fn get_one(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    match services.batches.get(BatchId::new(id)).await {
        Ok(Some(batch)) => (StatusCode::OK, Json(batch)).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "not_found", "batch not found"),
        Err(e) => repo_error_to_response(e),
    }
}

async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<BatchRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::PRODUCTION_TIER) {
        return resp;
    }

    match services.batches.create(&body.into_input()).await {
        Ok((batch_id, batch_number)) => {
            services
                .audit
                .record(
                    user.user_id,
                    "create",
                    "batch",
                    Some(batch_id.as_i64()),
                    Some(json!({ "batch_number": batch_number })),
                )
                .await;
            (
                StatusCode::CREATED,
                Json(json!({ "batch_id": batch_id, "batch_number": batch_number })),
            )
                .into_response()
        }
        Err(e) => repo_error_to_response(e),
    }
}

async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<BatchRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::PRODUCTION_TIER) {
        return resp;
    }

    match services.batches.update(BatchId::new(id), &body.into_input()).await {
        Ok(()) => {
            services
                .audit
                .record(user.user_id, "update", "batch", Some(id), None)
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
    if let Err(resp) = authz::require_role(&user, authz::PRODUCTION_TIER) {
        return resp;
    }
    match services.batches.delete(BatchId::new(id)).await {
        Ok(()) => {
            services
                .audit
                .record(user.user_id, "delete", "batch", Some(id), None)
                .await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => repo_error_to_response(e),
    }
}

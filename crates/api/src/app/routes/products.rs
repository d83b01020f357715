//! Product catalogue routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use serde_json::json;

use plantops_core::ProductId;

use crate::app::AppServices;
use crate::app::errors::{json_error, repo_error_to_response};
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(get_one).put(update).delete(remove))
        .route("/category/:category", get(by_category))
}

async fn list(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.products.list().await {
        Ok(products) => (StatusCode::OK, Json(products)).into_response(),
        Err(e) => repo_error_to_response(e),
    }
}

async fn get_one(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    match services.products.get(ProductId::new(id)).await {
        Ok(Some(product)) => (StatusCode::OK, Json(product)).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
        Err(e) => repo_error_to_response(e),
    }
}

async fn by_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(category): Path<String>,
) -> axum::response::Response {
    match services.products.by_category(&category).await {
        Ok(products) => (StatusCode::OK, Json(products)).into_response(),
        Err(e) => repo_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct ProductRequest {
    name: String,
    category: String,
    unit: String,
    description: Option<String>,
}

async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<ProductRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::MANAGE_TIER) {
        return resp;
    }
    if body.name.trim().is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "validation_error", "name cannot be empty");
    }

    match services
        .products
        .create(&body.name, &body.category, &body.unit, body.description.as_deref())
        .await
    {
        Ok(product_id) => {
            services
                .audit
                .record(user.user_id, "create", "product", Some(product_id.as_i64()), None)
                .await;
            (StatusCode::CREATED, Json(json!({ "product_id": product_id }))).into_response()
        }
        Err(e) => repo_error_to_response(e),
    }
}

async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<ProductRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::MANAGE_TIER) {
        return resp;
    }

    match services
        .products
        .update(
            ProductId::new(id),
            &body.name,
            &body.category,
            &body.unit,
            body.description.as_deref(),
        )
        .await
    {
        Ok(()) => {
            services
                .audit
                .record(user.user_id, "update", "product", Some(id), None)
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
    match services.products.delete(ProductId::new(id)).await {
        Ok(()) => {
            services
                .audit
                .record(user.user_id, "delete", "product", Some(id), None)
                .await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => repo_error_to_response(e),
    }
}

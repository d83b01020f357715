//! Supplier directory routes.

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

use plantops_core::SupplierId;
use plantops_infra::suppliers::SupplierInput;

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
struct SupplierRequest {
    name: String,
    contact_person: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
}

impl SupplierRequest {
    fn into_input(self) -> SupplierInput {
        SupplierInput {
            name: self.name,
            contact_person: self.contact_person,
            phone: self.phone,
            email: self.email,
            address: self.address,
        }
    }
}

async fn list(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.suppliers.list().await {
        Ok(suppliers) => (StatusCode::OK, Json(suppliers)).into_response(),
        Err(e) => repo_error_to_response(e),
    }
}

async fn get_one(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    match services.suppliers.get(SupplierId::new(id)).await {
        Ok(Some(supplier)) => (StatusCode::OK, Json(supplier)).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "not_found", "supplier not found"),
        Err(e) => repo_error_to_response(e),
    }
}

async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<SupplierRequest>,
) -> axum::response::Response {
    if body.name.trim().is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "validation_error", "name cannot be empty");
    }

    match services.suppliers.create(&body.into_input()).await {
        Ok(supplier_id) => {
            services
                .audit
                .record(user.user_id, "create", "supplier", Some(supplier_id.as_i64()), None)
                .await;
            (StatusCode::CREATED, Json(json!({ "supplier_id": supplier_id }))).into_response()
        }
        Err(e) => repo_error_to_response(e),
    }
}

async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<SupplierRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::MANAGE_TIER) {
        return resp;
    }

    match services.suppliers.update(SupplierId::new(id), &body.into_input()).await {
        Ok(()) => {
            services
                .audit
                .record(user.user_id, "update", "supplier", Some(id), None)
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
    match services.suppliers.delete(SupplierId::new(id)).await {
        Ok(()) => {
            services
                .audit
                .record(user.user_id, "delete", "supplier", Some(id), None)
                .await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => repo_error_to_response(e),
    }
}

//! System configuration routes (admin tier).

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use serde::Deserialize;
use serde_json::json;

use crate::app::AppServices;
use crate::app::errors::{json_error, repo_error_to_response};
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list).put(upsert))
        .route("/bulk", put(upsert_bulk))
        .route("/:key", get(get_one).delete(remove))
}

async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::ADMIN_TIER) {
        return resp;
    }
    match services.config.list().await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => repo_error_to_response(e),
    }
}

async fn get_one(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(key): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::ADMIN_TIER) {
        return resp;
    }
    match services.config.get(&key).await {
        Ok(Some(entry)) => (StatusCode::OK, Json(entry)).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "not_found", "config key not found"),
        Err(e) => repo_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct UpsertRequest {
    key: String,
    value: String,
}

async fn upsert(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<UpsertRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::ADMIN_TIER) {
        return resp;
    }
    match services.config.upsert(&body.key, &body.value).await {
        Ok(()) => {
            services
                .audit
                .record(
                    user.user_id,
                    "update",
                    "config",
                    None,
                    Some(json!({ "key": body.key })),
                )
                .await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => repo_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct BulkEntry {
    key: String,
    value: String,
}

async fn upsert_bulk(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<Vec<BulkEntry>>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::ADMIN_TIER) {
        return resp;
    }

    let entries: Vec<(String, String)> =
        body.into_iter().map(|e| (e.key, e.value)).collect();

    match services.config.upsert_many(&entries).await {
        Ok(()) => {
            services
                .audit
                .record(
                    user.user_id,
                    "update_bulk",
                    "config",
                    None,
                    Some(json!({ "count": entries.len() })),
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
    Path(key): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::ADMIN_TIER) {
        return resp;
    }
    match services.config.delete(&key).await {
        Ok(()) => {
            services
                .audit
                .record(
                    user.user_id,
                    "delete",
                    "config",
                    None,
                    Some(json!({ "key": key })),
                )
                .await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => repo_error_to_response(e),
    }
}

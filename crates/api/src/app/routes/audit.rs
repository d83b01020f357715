//! Audit log routes (admin tier).

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;

use plantops_core::UserId;
use plantops_infra::audit::AuditFilter;

use crate::app::AppServices;
use crate::app::errors::repo_error_to_response;
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list))
        .route("/stats", get(stats))
}

#[derive(Debug, Deserialize)]
struct AuditQuery {
    user_id: Option<i64>,
    entity_type: Option<String>,
    action: Option<String>,
    limit: Option<i64>,
}

async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<AuditQuery>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::ADMIN_TIER) {
        return resp;
    }

    let filter = AuditFilter {
        user_id: query.user_id.map(UserId::new),
        entity_type: query.entity_type,
        action: query.action,
        limit: query.limit.unwrap_or(100),
    };

    match services.audit.list(&filter).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => repo_error_to_response(e),
    }
}

async fn stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::ADMIN_TIER) {
        return resp;
    }
    match services.audit.stats().await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => repo_error_to_response(e),
    }
}

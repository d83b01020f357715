//! User administration (admin tier).

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use serde::Deserialize;
use serde_json::json;

use plantops_auth::Role;
use plantops_core::UserId;

use crate::app::AppServices;
use crate::app::errors::{json_error, repo_error_to_response};
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(get_one).put(update).delete(remove))
        .route("/:id/role", patch(update_role))
        .route("/:id/reset-password", post(reset_password))
}

async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::ADMIN_TIER) {
        return resp;
    }
    match services.users.list().await {
        Ok(users) => (StatusCode::OK, Json(users)).into_response(),
        Err(e) => repo_error_to_response(e),
    }
}

async fn get_one(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::ADMIN_TIER) {
        return resp;
    }
    match services.users.get(UserId::new(id)).await {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
        Err(e) => repo_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct CreateUserRequest {
    name: String,
    email: String,
    password: String,
    role: String,
}

async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CreateUserRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::ADMIN_TIER) {
        return resp;
    }

    let role = match body.role.parse::<Role>() {
        Ok(role) => role,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
    };

    let password_hash = match plantops_auth::hash_password(&body.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!(error = %e, "password hashing failed");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_failure", "user creation failed");
        }
    };

    match services
        .users
        .create(&body.name, &body.email, role, &password_hash)
        .await
    {
        Ok(user_id) => {
            services
                .audit
                .record(user.user_id, "create", "user", Some(user_id.as_i64()), None)
                .await;
            (StatusCode::CREATED, Json(json!({ "user_id": user_id }))).into_response()
        }
        Err(e) => repo_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct UpdateUserRequest {
    name: String,
    email: String,
    role: String,
}

async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::ADMIN_TIER) {
        return resp;
    }

    let role = match body.role.parse::<Role>() {
        Ok(role) => role,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
    };

    match services
        .users
        .update(UserId::new(id), &body.name, &body.email, role)
        .await
    {
        Ok(()) => {
            services
                .audit
                .record(user.user_id, "update", "user", Some(id), None)
                .await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => repo_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct UpdateRoleRequest {
    role: String,
}

async fn update_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateRoleRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::ADMIN_TIER) {
        return resp;
    }

    let role = match body.role.parse::<Role>() {
        Ok(role) => role,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
    };

    match services.users.update_role(UserId::new(id), role).await {
        Ok(()) => {
            services
                .audit
                .record(
                    user.user_id,
                    "update_role",
                    "user",
                    Some(id),
                    Some(json!({ "role": role })),
                )
                .await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => repo_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct ResetPasswordRequest {
    password: String,
}

async fn reset_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<ResetPasswordRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::ADMIN_TIER) {
        return resp;
    }

    let password_hash = match plantops_auth::hash_password(&body.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!(error = %e, "password hashing failed");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_failure", "password reset failed");
        }
    };

    match services
        .users
        .update_password(UserId::new(id), &password_hash)
        .await
    {
        Ok(()) => {
            services
                .audit
                .record(user.user_id, "reset_password", "user", Some(id), None)
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
    match services.users.delete(UserId::new(id)).await {
        Ok(()) => {
            services
                .audit
                .record(user.user_id, "delete", "user", Some(id), None)
                .await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => repo_error_to_response(e),
    }
}

//! Login, registration and session introspection.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;

use plantops_auth::Role;

use crate::app::AppServices;
use crate::app::errors::{json_error, repo_error_to_response};
use crate::context::CurrentUser;

pub fn public_router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
}

pub fn protected_router() -> Router {
    Router::new()
        .route("/verify", get(verify))
        .route("/profile", get(profile))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<LoginRequest>,
) -> axum::response::Response {
    let credentials = match services.users.find_credentials(&body.email).await {
        Ok(c) => c,
        Err(e) => return repo_error_to_response(e),
    };

    let Some(credentials) = credentials else {
        tracing::warn!(email = %body.email, "login failed: unknown email");
        return json_error(StatusCode::UNAUTHORIZED, "unauthorized", "invalid email or password");
    };

    match plantops_auth::verify_password(&body.password, &credentials.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(email = %body.email, "login failed: wrong password");
            return json_error(StatusCode::UNAUTHORIZED, "unauthorized", "invalid email or password");
        }
        Err(e) => {
            tracing::error!(error = %e, "stored password hash unusable");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_failure", "credential check failed");
        }
    }

    let user = credentials.user;
    let token = services.tokens.issue(user.user_id, &user.email, user.role);

    tracing::info!(user_id = %user.user_id, "login succeeded");
    (
        StatusCode::OK,
        Json(json!({ "token": token, "user": user })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    name: String,
    email: String,
    password: String,
    role: Option<String>,
}

async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<RegisterRequest>,
) -> axum::response::Response {
    if body.name.trim().is_empty() || body.email.trim().is_empty() || body.password.is_empty() {
        return json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "name, email and password are required",
        );
    }

    let role = match body.role.as_deref() {
        Some(role) => match role.parse::<Role>() {
            Ok(role) => role,
            Err(e) => return json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
        },
        None => Role::DEFAULT,
    };

    match services.users.find_credentials(&body.email).await {
        Ok(Some(_)) => {
            tracing::warn!(email = %body.email, "registration refused: email already exists");
            return json_error(StatusCode::BAD_REQUEST, "validation_error", "email already exists");
        }
        Ok(None) => {}
        Err(e) => return repo_error_to_response(e),
    }

    let password_hash = match plantops_auth::hash_password(&body.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!(error = %e, "password hashing failed");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_failure", "registration failed");
        }
    };

    let user_id = match services
        .users
        .create(&body.name, &body.email, role, &password_hash)
        .await
    {
        Ok(id) => id,
        Err(e) => return repo_error_to_response(e),
    };

    let token = services.tokens.issue(user_id, &body.email, role);

    tracing::info!(%user_id, email = %body.email, role = %role, "user registered");
    (
        StatusCode::CREATED,
        Json(json!({
            "token": token,
            "user": {
                "user_id": user_id,
                "name": body.name,
                "email": body.email,
                "role": role,
            },
        })),
    )
        .into_response()
}

async fn verify(Extension(user): Extension<CurrentUser>) -> impl IntoResponse {
    Json(json!({
        "user": {
            "user_id": user.user_id,
            "email": user.email,
            "role": user.role,
        },
    }))
}

async fn profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
) -> axum::response::Response {
    match services.users.get(user.user_id).await {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
        Err(e) => repo_error_to_response(e),
    }
}

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use plantops_auth::TokenService;

use crate::app::errors::json_error;
use crate::context::CurrentUser;

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<TokenService>,
}

/// Bearer-token gate for all protected routes.
///
/// On success the verified identity is inserted as a [`CurrentUser`]
/// extension; on failure the request is answered with a tagged 401 and never
/// reaches a handler.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer(req.headers()) {
        Ok(token) => token,
        Err(response) => return response,
    };

    match state.tokens.verify(token) {
        Ok(claims) => {
            req.extensions_mut().insert(CurrentUser::from(claims));
            next.run(req).await
        }
        Err(_) => json_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "invalid or expired token",
        ),
    }
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, Response> {
    let missing = || {
        json_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "no authorization token provided",
        )
    };

    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(missing)?;

    let header = header.to_str().map_err(|_| missing())?;

    let token = header.strip_prefix("Bearer ").ok_or_else(missing)?.trim();
    if token.is_empty() {
        return Err(missing());
    }

    Ok(token)
}

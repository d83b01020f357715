use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use plantops_core::DomainError;
use plantops_infra::RepoError;

pub fn repo_error_to_response(err: RepoError) -> axum::response::Response {
    match err {
        RepoError::Domain(e) => domain_error_to_response(e),
        RepoError::Storage(e) => {
            tracing::error!(error = %e, "storage failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_failure",
                "storage failure",
            )
        }
    }
}

fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::NoSuchStockRecord => json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "no_such_stock_record",
            "no stock record for the requested product/location",
        ),
        DomainError::InvalidStateTransition(msg) => json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_state_transition",
            msg,
        ),
        DomainError::Unauthorized => {
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", "unauthorized")
        }
        DomainError::Forbidden => json_error(StatusCode::FORBIDDEN, "forbidden", "forbidden"),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

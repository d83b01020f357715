//! Expense routes.

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

use plantops_core::ExpenseId;
use plantops_infra::expenses::ExpenseInput;

use crate::app::AppServices;
use crate::app::errors::{json_error, repo_error_to_response};
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(get_one).put(update).delete(remove))
        .route("/filter/by-date", get(filter_by_date))
        .route("/filter/by-category", get(filter_by_category))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<i64>,
}

async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ListQuery>,
) -> axum::response::Response {
    match services.expenses.list(query.limit.unwrap_or(100)).await {
        Ok(expenses) => (StatusCode::OK, Json(expenses)).into_response(),
        Err(e) => repo_error_to_response(e),
    }
}

async fn get_one(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    match services.expenses.get(ExpenseId::new(id)).await {
        Ok(Some(expense)) => (StatusCode::OK, Json(expense)).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "not_found", "expense not found"),
        Err(e) => repo_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct ExpenseRequest {
    category: String,
    amount: Decimal,
    description: Option<String>,
    date: NaiveDate,
}

impl ExpenseRequest {
    fn into_input(self) -> ExpenseInput {
        ExpenseInput {
            category: self.category,
            amount: self.amount,
            description: self.description,
            date: self.date,
        }
    }
}

async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<ExpenseRequest>,
) -> axum::response::Response {
    match services.expenses.create(&body.into_input()).await {
        Ok(expense_id) => {
            services
                .audit
                .record(user.user_id, "create", "expense", Some(expense_id.as_i64()), None)
                .await;
            (StatusCode::CREATED, Json(json!({ "expense_id": expense_id }))).into_response()
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
        .expenses
        .by_date_range(query.start_date, query.end_date)
        .await
    {
        Ok(expenses) => (StatusCode::OK, Json(expenses)).into_response(),
        Err(e) => repo_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct CategoryQuery {
    category: String,
}

async fn filter_by_category(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<CategoryQuery>,
) -> axum::response::Response {
    match services.expenses.by_category(&query.category).await {
        Ok(expenses) => (StatusCode::OK, Json(expenses)).into_response(),
        Err(e) => repo_error_to_response(e),
    }
}

async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<ExpenseRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&user, authz::MANAGE_TIER) {
        return resp;
    }

    match services.expenses.update(ExpenseId::new(id), &body.into_input()).await {
        Ok(()) => {
            services
                .audit
                .record(user.user_id, "update", "expense", Some(id), None)
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
    match services.expenses.delete(ExpenseId::new(id)).await {
        Ok(()) => {
            services
                .audit
                .record(user.user_id, "delete", "expense", Some(id), None)
                .await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => repo_error_to_response(e),
    }
}

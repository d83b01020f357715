//! Report routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;

use crate::app::AppServices;
use crate::app::errors::repo_error_to_response;

pub fn router() -> Router {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/monthly", get(monthly))
        .route("/production-summary", get(production_summary))
}

async fn dashboard(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.reports.dashboard(Utc::now().date_naive()).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => repo_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct MonthlyQuery {
    year: Option<i32>,
    month: Option<u32>,
}

async fn monthly(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<MonthlyQuery>,
) -> axum::response::Response {
    let today = Utc::now().date_naive();
    let year = query.year.unwrap_or_else(|| today.year());
    let month = query.month.unwrap_or_else(|| today.month());

    match services.reports.monthly(year, month).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => repo_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct SummaryQuery {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

async fn production_summary(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<SummaryQuery>,
) -> axum::response::Response {
    let today = Utc::now().date_naive();
    let start = query
        .start_date
        .unwrap_or_else(|| today.with_day(1).unwrap_or(today));
    let end = query.end_date.unwrap_or(today);

    match services.reports.production_summary(start, end).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => repo_error_to_response(e),
    }
}

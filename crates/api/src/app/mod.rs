//! Application wiring: services, router and error mapping.

use std::sync::Arc;

use axum::{Extension, Router, http::StatusCode, routing::get};
use sqlx::PgPool;

use plantops_auth::TokenService;
use plantops_infra::audit::AuditRepo;
use plantops_infra::batches::BatchRepo;
use plantops_infra::config::ConfigRepo;
use plantops_infra::customers::CustomerRepo;
use plantops_infra::expenses::ExpenseRepo;
use plantops_infra::production::ProductionRepo;
use plantops_infra::products::ProductRepo;
use plantops_infra::reports::ReportsRepo;
use plantops_infra::sales::SaleRepo;
use plantops_infra::stock::StockLedger;
use plantops_infra::suppliers::SupplierRepo;
use plantops_infra::users::UserRepo;
use plantops_infra::withdrawals::WithdrawalRepo;

use crate::middleware::AuthState;

pub mod errors;
pub mod routes;

/// All request-scoped collaborators, shared via an `Extension`.
pub struct AppServices {
    pub tokens: Arc<TokenService>,
    pub users: UserRepo,
    pub products: ProductRepo,
    pub stock: StockLedger,
    pub production: ProductionRepo,
    pub sales: SaleRepo,
    pub expenses: ExpenseRepo,
    pub customers: CustomerRepo,
    pub suppliers: SupplierRepo,
    pub batches: BatchRepo,
    pub withdrawals: WithdrawalRepo,
    pub config: ConfigRepo,
    pub audit: AuditRepo,
    pub reports: ReportsRepo,
}

impl AppServices {
    pub fn new(pool: PgPool, token_secret: String) -> Self {
        Self {
            tokens: Arc::new(TokenService::new(token_secret.into_bytes())),
            users: UserRepo::new(pool.clone()),
            products: ProductRepo::new(pool.clone()),
            stock: StockLedger::new(pool.clone()),
            production: ProductionRepo::new(pool.clone()),
            sales: SaleRepo::new(pool.clone()),
            expenses: ExpenseRepo::new(pool.clone()),
            customers: CustomerRepo::new(pool.clone()),
            suppliers: SupplierRepo::new(pool.clone()),
            batches: BatchRepo::new(pool.clone()),
            withdrawals: WithdrawalRepo::new(pool.clone()),
            config: ConfigRepo::new(pool.clone()),
            audit: AuditRepo::new(pool.clone()),
            reports: ReportsRepo::new(pool),
        }
    }
}

pub fn build_app(pool: PgPool, token_secret: String) -> Router {
    let services = Arc::new(AppServices::new(pool, token_secret));
    let auth_state = AuthState {
        tokens: services.tokens.clone(),
    };

    let public = Router::new()
        .route("/health", get(health))
        .nest("/auth", routes::auth::public_router())
        .layer(Extension(services.clone()));

    // Protected routes: bearer token required; identity arrives as an
    // extension inserted by the middleware.
    let protected = Router::new()
        .nest("/auth", routes::auth::protected_router())
        .nest("/users", routes::users::router())
        .nest("/products", routes::products::router())
        .nest("/inventory", routes::inventory::router())
        .nest("/production", routes::production::router())
        .nest("/sales", routes::sales::router())
        .nest("/expenses", routes::expenses::router())
        .nest("/customers", routes::customers::router())
        .nest("/suppliers", routes::suppliers::router())
        .nest("/batches", routes::batches::router())
        .nest("/withdrawals", routes::withdrawals::router())
        .nest("/config", routes::config::router())
        .nest("/audit", routes::audit::router())
        .nest("/reports", routes::reports::router())
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            crate::middleware::auth_middleware,
        ));

    Router::new().merge(public).merge(protected)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

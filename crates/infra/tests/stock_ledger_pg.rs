//! Postgres-backed ledger and approval-flow tests.
//!
//! These exercise the real atomic statements, so they need a database:
//! set `TEST_DATABASE_URL` to run them; they skip silently otherwise.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::PgPool;

use plantops_auth::Role;
use plantops_core::{CustomerId, DomainError, ProductId, UserId};
use plantops_infra::customers::{CustomerInput, CustomerRepo};
use plantops_infra::products::ProductRepo;
use plantops_infra::sales::{NewSale, SaleRepo, SaleStatus};
use plantops_infra::users::UserRepo;
use plantops_infra::withdrawals::{NewWithdrawal, WithdrawalRepo};
use plantops_infra::{RepoError, StockLedger};

async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = plantops_infra::connect(&url).await.expect("connect test db");
    plantops_infra::run_migrations(&pool).await.expect("migrate test db");
    Some(pool)
}

async fn seed_product(pool: &PgPool) -> ProductId {
    ProductRepo::new(pool.clone())
        .create("Cement Mix", "raw_material", "kg", None)
        .await
        .expect("seed product")
}

async fn seed_user(pool: &PgPool, email_tag: &str) -> UserId {
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let email = format!("{email_tag}-{nonce}@test.local");
    UserRepo::new(pool.clone())
        .create("Test Operator", &email, Role::Supervisor, "x")
        .await
        .expect("seed user")
}

#[tokio::test]
async fn delta_creates_then_accumulates() {
    let Some(pool) = test_pool().await else { return };
    let ledger = StockLedger::new(pool.clone());
    let product = seed_product(&pool).await;

    let after = ledger.apply_delta(product, "Main Warehouse", dec!(10)).await.unwrap();
    assert_eq!(after, dec!(10));

    let after = ledger.apply_delta(product, "Main Warehouse", dec!(-3)).await.unwrap();
    assert_eq!(after, dec!(7));

    let record = ledger.get(product, "Main Warehouse").await.unwrap().unwrap();
    assert_eq!(record.quantity, dec!(7));
}

#[tokio::test]
async fn negative_delta_on_missing_key_is_refused() {
    let Some(pool) = test_pool().await else { return };
    let ledger = StockLedger::new(pool.clone());
    let product = seed_product(&pool).await;

    let err = ledger
        .apply_delta(product, "Main Warehouse", dec!(-5))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Domain(DomainError::NoSuchStockRecord)
    ));

    // No record was conjured by the refused delta.
    assert!(ledger.get(product, "Main Warehouse").await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_deltas_never_lose_updates() {
    let Some(pool) = test_pool().await else { return };
    let ledger = StockLedger::new(pool.clone());
    let product = seed_product(&pool).await;

    ledger.apply_delta(product, "Main Warehouse", dec!(100)).await.unwrap();

    let a = {
        let ledger = ledger.clone();
        tokio::spawn(async move { ledger.apply_delta(product, "Main Warehouse", dec!(5)).await })
    };
    let b = {
        let ledger = ledger.clone();
        tokio::spawn(async move { ledger.apply_delta(product, "Main Warehouse", dec!(-2)).await })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let record = ledger.get(product, "Main Warehouse").await.unwrap().unwrap();
    assert_eq!(record.quantity, dec!(103));

    // A wider interleaving: twenty concurrent unit increments all land.
    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                ledger.apply_delta(product, "Main Warehouse", dec!(1)).await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let record = ledger.get(product, "Main Warehouse").await.unwrap().unwrap();
    assert_eq!(record.quantity, dec!(123));
}

#[tokio::test]
async fn withdrawal_is_approved_exactly_once() {
    let Some(pool) = test_pool().await else { return };
    let ledger = StockLedger::new(pool.clone());
    let withdrawals = WithdrawalRepo::new(pool.clone());
    let product = seed_product(&pool).await;
    let requester = seed_user(&pool, "requester").await;
    let approver = seed_user(&pool, "approver").await;

    ledger.apply_delta(product, "Main Warehouse", dec!(50)).await.unwrap();

    let id = withdrawals
        .create(&NewWithdrawal {
            product_id: product,
            location: "Main Warehouse".to_string(),
            requested_quantity: dec!(10),
            requested_by: requester,
            batch_id: None,
            purpose: Some("line refill".to_string()),
        })
        .await
        .unwrap();

    withdrawals.approve(id, approver).await.unwrap();
    let record = ledger.get(product, "Main Warehouse").await.unwrap().unwrap();
    assert_eq!(record.quantity, dec!(40));

    // Re-approval is an invalid transition and must not deduct again.
    let err = withdrawals.approve(id, approver).await.unwrap_err();
    assert!(matches!(
        err,
        RepoError::Domain(DomainError::InvalidStateTransition(_))
    ));
    let record = ledger.get(product, "Main Warehouse").await.unwrap().unwrap();
    assert_eq!(record.quantity, dec!(40));
}

#[tokio::test]
async fn rejected_withdrawal_cannot_be_approved() {
    let Some(pool) = test_pool().await else { return };
    let ledger = StockLedger::new(pool.clone());
    let withdrawals = WithdrawalRepo::new(pool.clone());
    let product = seed_product(&pool).await;
    let requester = seed_user(&pool, "req2").await;
    let approver = seed_user(&pool, "app2").await;

    ledger.apply_delta(product, "Main Warehouse", dec!(20)).await.unwrap();

    let id = withdrawals
        .create(&NewWithdrawal {
            product_id: product,
            location: "Main Warehouse".to_string(),
            requested_quantity: dec!(5),
            requested_by: requester,
            batch_id: None,
            purpose: None,
        })
        .await
        .unwrap();

    withdrawals.reject(id, approver, "not needed").await.unwrap();

    let err = withdrawals.approve(id, approver).await.unwrap_err();
    assert!(matches!(
        err,
        RepoError::Domain(DomainError::InvalidStateTransition(_))
    ));

    // Rejection never touches stock.
    let record = ledger.get(product, "Main Warehouse").await.unwrap().unwrap();
    assert_eq!(record.quantity, dec!(20));
}

async fn seed_customer(pool: &PgPool) -> CustomerId {
    CustomerRepo::new(pool.clone())
        .create(&CustomerInput {
            name: "Acme Builders".to_string(),
            contact_person: None,
            phone: None,
            email: None,
            address: None,
        })
        .await
        .expect("seed customer")
}

#[tokio::test]
async fn sale_completion_deducts_stock_exactly_once() {
    let Some(pool) = test_pool().await else { return };
    let ledger = StockLedger::new(pool.clone());
    let sales = SaleRepo::new(pool.clone());
    let product = seed_product(&pool).await;
    let customer = seed_customer(&pool).await;

    ledger.apply_delta(product, "Main Warehouse", dec!(30)).await.unwrap();

    let (sale_id, total) = sales
        .create(&NewSale {
            customer_id: customer,
            product_id: product,
            quantity: dec!(4),
            unit_price: dec!(2.50),
            status: SaleStatus::Pending,
            location: "Main Warehouse".to_string(),
            date: chrono::Utc::now().date_naive(),
        })
        .await
        .unwrap();
    assert_eq!(total, dec!(10.00));

    // Pending sales leave stock alone.
    let record = ledger.get(product, "Main Warehouse").await.unwrap().unwrap();
    assert_eq!(record.quantity, dec!(30));

    sales.update_status(sale_id, SaleStatus::Completed).await.unwrap();
    let record = ledger.get(product, "Main Warehouse").await.unwrap().unwrap();
    assert_eq!(record.quantity, dec!(26));

    // Re-completing is a no-op; leaving completed is refused.
    sales.update_status(sale_id, SaleStatus::Completed).await.unwrap();
    let record = ledger.get(product, "Main Warehouse").await.unwrap().unwrap();
    assert_eq!(record.quantity, dec!(26));

    let err = sales
        .update_status(sale_id, SaleStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Domain(DomainError::InvalidStateTransition(_))
    ));
}

#[tokio::test]
async fn failed_ledger_application_rolls_back_the_sale() {
    let Some(pool) = test_pool().await else { return };
    let sales = SaleRepo::new(pool.clone());
    let ledger = StockLedger::new(pool.clone());
    let product = seed_product(&pool).await;
    let customer = seed_customer(&pool).await;

    // Completed sale against a key with no stock record: the ledger refuses
    // and the sale row must not survive.
    let err = sales
        .create(&NewSale {
            customer_id: customer,
            product_id: product,
            quantity: dec!(1),
            unit_price: dec!(9.99),
            status: SaleStatus::Completed,
            location: "Main Warehouse".to_string(),
            date: chrono::Utc::now().date_naive(),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Domain(DomainError::NoSuchStockRecord)
    ));

    assert!(ledger.get(product, "Main Warehouse").await.unwrap().is_none());
    let listed = sales.list(1000).await.unwrap();
    assert!(
        !listed.iter().any(|s| s.product_id == product),
        "rolled-back sale must not be listed"
    );
}

#[tokio::test]
async fn quantity_may_go_negative_under_current_policy() {
    let Some(pool) = test_pool().await else { return };
    let ledger = StockLedger::new(pool.clone());
    let product = seed_product(&pool).await;

    ledger.apply_delta(product, "Main Warehouse", dec!(2)).await.unwrap();
    let after = ledger.apply_delta(product, "Main Warehouse", dec!(-5)).await.unwrap();
    assert_eq!(after, Decimal::from(-3));
}

//! Black-box tests over the real HTTP surface.
//!
//! Needs a database: set `TEST_DATABASE_URL` to run; each test skips
//! silently otherwise.

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::json;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Option<Self> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let pool = plantops_infra::connect(&url).await.expect("connect test db");
        plantops_infra::run_migrations(&pool).await.expect("migrate test db");

        // Same router as prod, bound to an ephemeral port.
        let app = plantops_api::app::build_app(pool, "test-secret".to_string());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Some(Self { base_url, handle })
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn unique_email(tag: &str) -> String {
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    format!("{tag}-{nonce}@test.local")
}

/// Register a user with the given role and return its bearer token.
async fn register(client: &reqwest::Client, base_url: &str, tag: &str, role: &str) -> String {
    let res = client
        .post(format!("{base_url}/auth/register"))
        .json(&json!({
            "name": "Test User",
            "email": unique_email(tag),
            "password": "plant-pass-1",
            "role": role,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

fn as_decimal(value: &serde_json::Value) -> Decimal {
    match value {
        serde_json::Value::String(s) => s.parse().unwrap(),
        serde_json::Value::Number(n) => n.to_string().parse().unwrap(),
        other => panic!("not a decimal value: {other:?}"),
    }
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let Some(srv) = TestServer::spawn().await else { return };
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/auth/verify", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");

    // A tampered token is also a 401.
    let res = client
        .get(format!("{}/auth/verify", srv.base_url))
        .bearer_auth("aaa.bbb.ccc")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_login_verify_round_trip() {
    let Some(srv) = TestServer::spawn().await else { return };
    let client = reqwest::Client::new();

    let email = unique_email("login");
    let res = client
        .post(format!("{}/auth/register", srv.base_url))
        .json(&json!({
            "name": "Shift Lead",
            "email": email,
            "password": "plant-pass-1",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    // Default role for self-registration.
    assert_eq!(body["user"]["role"], "supervisor");

    let res = client
        .post(format!("{}/auth/login", srv.base_url))
        .json(&json!({ "email": email, "password": "plant-pass-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let token = body["token"].as_str().unwrap();

    let res = client
        .get(format!("{}/auth/verify", srv.base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["user"]["email"], email);

    // Wrong password never yields a token.
    let res = client
        .post(format!("{}/auth/login", srv.base_url))
        .json(&json!({ "email": email, "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn viewer_role_is_forbidden_on_gated_surfaces() {
    let Some(srv) = TestServer::spawn().await else { return };
    let client = reqwest::Client::new();
    let viewer = register(&client, &srv.base_url, "viewer", "viewer").await;

    let res = client
        .post(format!("{}/products", srv.base_url))
        .bearer_auth(&viewer)
        .json(&json!({ "name": "Widget", "category": "finished", "unit": "pcs" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");

    let res = client
        .get(format!("{}/users", srv.base_url))
        .bearer_auth(&viewer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn production_credits_stock_and_withdrawal_deducts_once() {
    let Some(srv) = TestServer::spawn().await else { return };
    let client = reqwest::Client::new();
    let admin = register(&client, &srv.base_url, "admin", "admin").await;

    // Product
    let res = client
        .post(format!("{}/products", srv.base_url))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Cement Mix", "category": "raw_material", "unit": "kg" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let product_id = res.json::<serde_json::Value>().await.unwrap()["product_id"]
        .as_i64()
        .unwrap();

    // Production run credits output quantity to the location.
    let res = client
        .post(format!("{}/production", srv.base_url))
        .bearer_auth(&admin)
        .json(&json!({
            "product_id": product_id,
            "input_qty": 60,
            "output_qty": 50,
            "date": "2025-06-01",
            "location": "Line A",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .get(format!("{}/inventory/product/{}", srv.base_url, product_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let levels: serde_json::Value = res.json().await.unwrap();
    assert_eq!(as_decimal(&levels[0]["quantity"]), Decimal::from(50));

    // Withdrawal: pending on creation, deducts on approval.
    let res = client
        .post(format!("{}/withdrawals", srv.base_url))
        .bearer_auth(&admin)
        .json(&json!({
            "product_id": product_id,
            "location": "Line A",
            "requested_quantity": 10,
            "purpose": "line refill",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let withdrawal_id = res.json::<serde_json::Value>().await.unwrap()["withdrawal_id"]
        .as_i64()
        .unwrap();

    let res = client
        .post(format!("{}/withdrawals/{}/approve", srv.base_url, withdrawal_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Approving again is an invalid transition and must not deduct twice.
    let res = client
        .post(format!("{}/withdrawals/{}/approve", srv.base_url, withdrawal_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_state_transition");

    let res = client
        .get(format!("{}/inventory/product/{}", srv.base_url, product_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let levels: serde_json::Value = res.json().await.unwrap();
    assert_eq!(as_decimal(&levels[0]["quantity"]), Decimal::from(40));
}

#[tokio::test]
async fn completed_sale_without_stock_record_is_rejected_whole() {
    let Some(srv) = TestServer::spawn().await else { return };
    let client = reqwest::Client::new();
    let admin = register(&client, &srv.base_url, "sales-admin", "admin").await;

    let res = client
        .post(format!("{}/products", srv.base_url))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Paver Block", "category": "finished", "unit": "pcs" }))
        .send()
        .await
        .unwrap();
    let product_id = res.json::<serde_json::Value>().await.unwrap()["product_id"]
        .as_i64()
        .unwrap();

    let res = client
        .post(format!("{}/customers", srv.base_url))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Acme Builders" }))
        .send()
        .await
        .unwrap();
    let customer_id = res.json::<serde_json::Value>().await.unwrap()["customer_id"]
        .as_i64()
        .unwrap();

    // No stock record exists at this location, so a completed sale must be
    // refused and leave nothing behind.
    let res = client
        .post(format!("{}/sales", srv.base_url))
        .bearer_auth(&admin)
        .json(&json!({
            "customer_id": customer_id,
            "product_id": product_id,
            "quantity": 5,
            "unit_price": 4,
            "status": "completed",
            "location": "Nowhere Depot",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "no_such_stock_record");
}

#[tokio::test]
async fn health_is_public() {
    let Some(srv) = TestServer::spawn().await else { return };
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

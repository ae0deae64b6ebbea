//! Black-box tests: the real router on an ephemeral port, driven over HTTP.

use reqwest::StatusCode;
use serde_json::{json, Value};

use agency_server::{build_app, open_database, AppState, ServerConfig};

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let config = ServerConfig {
            database_path: ":memory:".into(),
            ..Default::default()
        };
        let db = open_database(&config).await.expect("in-memory database");
        let app = build_app(AppState::new(db, config));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let res = self.client.get(self.url(path)).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .post(self.url(path))
            .header("X-Actor", "marie")
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn create_product(&self, sku: &str, price_cents: i64, stock: i64) -> String {
        let (status, category) = self
            .post("/api/categories", json!({ "name": format!("Cat {sku}") }))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, product) = self
            .post(
                "/api/products",
                json!({
                    "name": format!("Product {sku}"),
                    "sku": sku,
                    "category_id": category["id"],
                    "price_cents": price_cents,
                    "cost_price_cents": price_cents / 2,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{product}");
        let id = product["id"].as_str().unwrap().to_string();

        if stock > 0 {
            let (status, _) = self
                .post(
                    "/api/stock/movements",
                    json!({ "product_id": id, "movement_type": "IN", "quantity": stock }),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
        }
        id
    }

    async fn create_customer(&self, name: &str) -> String {
        let (status, customer) = self.post("/api/customers", json!({ "name": name })).await;
        assert_eq!(status, StatusCode::CREATED);
        customer["id"].as_str().unwrap().to_string()
    }

    async fn current_stock(&self, product_id: &str) -> i64 {
        let (_, product) = self.get(&format!("/api/products/{product_id}")).await;
        product["current_stock"].as_i64().unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_reports_database() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn sale_lifecycle_moves_stock_both_ways() {
    let srv = TestServer::spawn().await;
    let resistor = srv.create_product("RES-10K", 500, 10).await;
    let led = srv.create_product("LED-RED-5MM", 150, 10).await;
    let customer = srv.create_customer("TechSolutions SARL").await;

    let (status, sale) = srv
        .post("/api/sales", json!({ "customer_id": customer, "notes": "Commande 1" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sale["status"], "PENDING");
    assert_eq!(sale["created_by"], "marie");
    let sale_id = sale["id"].as_str().unwrap().to_string();

    srv.post(
        &format!("/api/sales/{sale_id}/items"),
        json!({ "product_id": resistor, "quantity": 2 }),
    )
    .await;
    let (status, detail) = srv
        .post(
            &format!("/api/sales/{sale_id}/items"),
            json!({ "product_id": led, "quantity": 3 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(detail["items"].as_array().unwrap().len(), 2);
    assert_eq!(detail["total_amount_cents"], 1450);

    let (status, completed) = srv
        .post(&format!("/api/sales/{sale_id}/complete"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{completed}");
    assert_eq!(completed["status"], "COMPLETED");
    assert_eq!(srv.current_stock(&resistor).await, 8);
    assert_eq!(srv.current_stock(&led).await, 7);

    // Items are frozen once the sale left PENDING
    let (status, body) = srv
        .post(
            &format!("/api/sales/{sale_id}/items"),
            json!({ "product_id": led, "quantity": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_STATUS");

    let (status, cancelled) = srv
        .post(&format!("/api/sales/{sale_id}/cancel"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "CANCELLED");
    assert_eq!(srv.current_stock(&resistor).await, 10);
    assert_eq!(srv.current_stock(&led).await, 10);

    let (_, ledger) = srv
        .get(&format!("/api/stock/movements?product_id={resistor}"))
        .await;
    // opening IN, sale OUT, cancellation IN
    assert_eq!(ledger["total"], 3);
}

#[tokio::test]
async fn completing_without_stock_is_conflict() {
    let srv = TestServer::spawn().await;
    let board = srv.create_product("ARD-UNO", 2500, 3).await;
    let customer = srv.create_customer("ElectroMart").await;

    let (_, sale) = srv.post("/api/sales", json!({ "customer_id": customer })).await;
    let sale_id = sale["id"].as_str().unwrap().to_string();
    srv.post(
        &format!("/api/sales/{sale_id}/items"),
        json!({ "product_id": board, "quantity": 5 }),
    )
    .await;

    let (status, body) = srv
        .post(&format!("/api/sales/{sale_id}/complete"), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");

    let (_, detail) = srv.get(&format!("/api/sales/{sale_id}")).await;
    assert_eq!(detail["status"], "PENDING");
    assert_eq!(srv.current_stock(&board).await, 3);
}

#[tokio::test]
async fn oversized_unit_price_is_rejected() {
    let srv = TestServer::spawn().await;
    let board = srv.create_product("ESP32-DEV", 1200, 10).await;
    let customer = srv.create_customer("MakerSpace Lyon").await;

    let (_, sale) = srv.post("/api/sales", json!({ "customer_id": customer })).await;
    let sale_id = sale["id"].as_str().unwrap().to_string();

    let (status, body) = srv
        .post(
            &format!("/api/sales/{sale_id}/items"),
            json!({ "product_id": board, "quantity": 2, "unit_price_cents": i64::MAX / 2 + 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, total) = srv
        .post(&format!("/api/sales/{sale_id}/recompute"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(total["total_amount_cents"], 0);

    let (status, _) = srv
        .post(
            "/api/products",
            json!({
                "name": "Oscilloscope",
                "sku": "OSC-1",
                "category_id": "unused",
                "price_cents": 10_000_000_000_i64,
                "cost_price_cents": 100,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ledger_writes_need_an_actor() {
    let srv = TestServer::spawn().await;
    let product = srv.create_product("SENS-PIR", 200, 0).await;

    let res = srv
        .client
        .post(srv.url("/api/stock/movements"))
        .json(&json!({ "product_id": product, "movement_type": "IN", "quantity": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "MISSING_ACTOR");

    let (_, ledger) = srv.get("/api/stock/movements").await;
    assert_eq!(ledger["total"], 0);
}

#[tokio::test]
async fn movement_rules_enforced() {
    let srv = TestServer::spawn().await;
    let product = srv.create_product("CAP-100UF", 120, 4).await;

    let (status, body) = srv
        .post(
            "/api/stock/movements",
            json!({ "product_id": product, "movement_type": "OUT", "quantity": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");

    let (status, body) = srv
        .post(
            "/api/stock/movements",
            json!({ "product_id": product, "movement_type": "TRANSFER", "quantity": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNSUPPORTED_MOVEMENT");

    let (status, outcome) = srv
        .post(
            "/api/stock/movements",
            json!({ "product_id": product, "movement_type": "ADJUSTMENT", "quantity": 12 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(outcome["level"]["current_stock"], 12);
    assert_eq!(outcome["movement"]["created_by"], "marie");
}

#[tokio::test]
async fn validation_and_not_found() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.post("/api/categories", json!({ "name": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = srv.get("/api/products/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = srv.get("/api/sales?date_from=2024-05-01&date_to=2024-04-01").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_sku_is_conflict() {
    let srv = TestServer::spawn().await;
    srv.create_product("RPI-PICO", 800, 0).await;

    let (_, categories) = srv.get("/api/categories").await;
    let category_id = categories[0]["id"].clone();
    let (status, body) = srv
        .post(
            "/api/products",
            json!({
                "name": "Another Pico",
                "sku": "RPI-PICO",
                "category_id": category_id,
                "price_cents": 800,
                "cost_price_cents": 500,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE");
}

#[tokio::test]
async fn list_pages_are_bounded() {
    let srv = TestServer::spawn().await;
    for n in 0..3 {
        srv.create_customer(&format!("Client {n}")).await;
    }

    let (_, page) = srv.get("/api/customers?per_page=2&page=2").await;
    assert_eq!(page["total"], 3);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);

    let (_, page) = srv.get("/api/customers?per_page=500").await;
    assert_eq!(page["per_page"], 100);

    let (_, page) = srv.get("/api/customers?search=client%201").await;
    assert_eq!(page["total"], 1);
}

#[tokio::test]
async fn csv_import_then_export() {
    let srv = TestServer::spawn().await;
    let data = "Name,SKU,Category,Price,Cost_Price,Status,Description,Stock_Actuel,Stock_Minimum\n\
                ESP32 DevKit,ESP32-DEV,Microcontrôleurs,12.00,7.00,Active,WiFi,100,20\n\
                Broken,BRK-1,Capteurs,abc,1.00,Active,,1,1\n";

    let res = srv
        .client
        .post(srv.url("/api/products/import"))
        .header("X-Actor", "marie")
        .header("Content-Type", "text/csv")
        .body(data)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let report: Value = res.json().await.unwrap();
    assert_eq!(report["created"], 1);
    assert_eq!(report["errors"][0]["line"], 3);

    let res = srv.client.get(srv.url("/api/products/export")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let content_type = res.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/csv"));
    let csv = res.text().await.unwrap();
    assert!(csv.contains("ESP32 DevKit,ESP32-DEV,Microcontrôleurs,12.00,7.00,Active,WiFi,100,20"));

    let (_, summary) = srv.get("/api/stock/summary").await;
    assert_eq!(summary[0]["sku"], "ESP32-DEV");
    assert_eq!(summary[0]["current_stock"], 100);
}

#[tokio::test]
async fn reports_have_expected_shape() {
    let srv = TestServer::spawn().await;
    let product = srv.create_product("BRD-830", 550, 20).await;
    let customer = srv.create_customer("MakerSpace Lyon").await;
    let (_, sale) = srv.post("/api/sales", json!({ "customer_id": customer })).await;
    let sale_id = sale["id"].as_str().unwrap().to_string();
    srv.post(
        &format!("/api/sales/{sale_id}/items"),
        json!({ "product_id": product, "quantity": 4 }),
    )
    .await;
    srv.post(&format!("/api/sales/{sale_id}/complete"), json!({})).await;

    let (status, summary) = srv.get("/api/sales/summary").await;
    assert_eq!(status, StatusCode::OK);
    let days = summary["daily_sales"].as_array().unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0]["total_sales"], 1);
    assert_eq!(days[0]["total_revenue"], 2200);

    let (_, monthly) = srv.get("/api/sales/monthly").await;
    assert_eq!(monthly.as_array().unwrap().len(), 1);

    let (status, dashboard) = srv.get("/api/dashboard").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["completed_sales"], 1);
    assert_eq!(dashboard["today_revenue_cents"], 2200);
    assert_eq!(dashboard["top_products"][0]["sku"], "BRD-830");
}

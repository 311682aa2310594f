//! Router-level tests: access policy, role checks and the bill flow, driven
//! through `tower::ServiceExt::oneshot` against an in-memory database.

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tally_db::{Database, DbConfig, NewUser};
use tally_web::{build_router, AppState, WebConfig};
use tower::util::ServiceExt;

struct TestApp {
    router: Router,
    admin: String,
    staff: String,
    plain: String,
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl TestResponse {
    fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    fn set_cookie(&self) -> Option<&str> {
        self.headers.get(SET_COOKIE).and_then(|v| v.to_str().ok())
    }
}

impl TestApp {
    async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (username, is_staff, is_admin) in [("admin", true, true), ("staff", true, false), ("plain", false, false)] {
            db.users()
                .create(&NewUser {
                    username: username.to_string(),
                    password: format!("{username}-pass"),
                    is_staff,
                    is_admin,
                })
                .await
                .unwrap();
        }

        let config = WebConfig::from_lookup(|_| None).unwrap();
        let router = build_router(AppState::new(db, config));

        let mut app = TestApp {
            router,
            admin: String::new(),
            staff: String::new(),
            plain: String::new(),
        };
        app.admin = app.login("admin").await;
        app.staff = app.login("staff").await;
        app.plain = app.login("plain").await;
        app
    }

    async fn login(&self, username: &str) -> String {
        let body = json!({ "username": username, "password": format!("{username}-pass") });
        let response = self.send(Method::POST, "/login", None, Some(body)).await;
        assert_eq!(response.status, StatusCode::OK);
        response.body["token"].as_str().unwrap().to_string()
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.call(request).await
    }

    async fn call(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse { status, headers, body }
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, token, None).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    /// Stock 10, price 100.00, 18% tax.
    async fn create_phone(&self) -> String {
        let response = self
            .post(
                "/api/products/create/",
                &self.admin,
                json!({
                    "name": "Phone X",
                    "selling_price_cents": 10_000,
                    "purchase_price_cents": 8_000,
                    "tax_rate_bps": 1800,
                    "category": "Mobiles",
                    "stock": 10
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        response.body["id"].as_str().unwrap().to_string()
    }

    async fn stock_of(&self, product_id: &str) -> i64 {
        let response = self.get("/api/products/", Some(&self.plain)).await;
        response.body["results"]
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["id"] == product_id)
            .and_then(|p| p["stock"].as_i64())
            .unwrap()
    }
}

fn bill(product_id: &str, quantity: i64) -> Value {
    json!({
        "customer_name": "Asha",
        "customer_phone": "9845012345",
        "items": [{ "product_id": product_id, "quantity": quantity }]
    })
}

// =============================================================================
// Access policy
// =============================================================================

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;

    let response = app.get("/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_anonymous_requests_are_refused() {
    let app = TestApp::new().await;

    let api = app.get("/api/products/", None).await;
    assert_eq!(api.status, StatusCode::UNAUTHORIZED);
    assert_eq!(api.body["code"], "UNAUTHENTICATED");

    let page = app.get("/billing", None).await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(page.location(), Some("/login"));

    let bad_token = app.get("/api/products/", Some("not-a-token")).await;
    assert_eq!(bad_token.status, StatusCode::UNAUTHORIZED);

    assert_eq!(app.get("/login", None).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_staff_pages_redirect_plain_users() {
    let app = TestApp::new().await;

    let response = app.get("/inventory/", Some(&app.plain)).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/billing?denied=staff"));

    assert_eq!(app.get("/inventory", Some(&app.staff)).await.status, StatusCode::OK);
    assert_eq!(app.get("/billing", Some(&app.plain)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_proforma_page_is_admin_only() {
    let app = TestApp::new().await;

    let response = app.get("/proforma-invoice", Some(&app.staff)).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/billing?denied=admin"));

    assert_eq!(app.get("/proforma-invoice", Some(&app.admin)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_logged_in_user_skips_login_page() {
    let app = TestApp::new().await;

    let response = app.get("/login", Some(&app.plain)).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/billing"));
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn test_login_sets_cookie_and_logout_clears_it() {
    let app = TestApp::new().await;

    let login = app
        .send(
            Method::POST,
            "/login",
            None,
            Some(json!({ "username": "staff", "password": "staff-pass" })),
        )
        .await;
    let cookie = login.set_cookie().unwrap();
    assert!(cookie.starts_with("tally_session="));
    assert!(cookie.contains("HttpOnly"));
    assert_eq!(login.body["user"]["is_staff"], true);

    // The cookie alone authenticates.
    let session = cookie.split(';').next().unwrap().to_string();
    let page = app
        .call(
            Request::builder()
                .uri("/billing")
                .header(COOKIE, &session)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(page.status, StatusCode::OK);

    let logout = app
        .call(
            Request::builder()
                .uri("/logout")
                .header(COOKIE, &session)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(logout.status, StatusCode::SEE_OTHER);
    assert_eq!(logout.location(), Some("/login"));
    let cleared = logout.set_cookie().unwrap();
    assert!(cleared.starts_with("tally_session=;"));
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_wrong_password() {
    let app = TestApp::new().await;

    let json_login = app
        .send(
            Method::POST,
            "/login",
            None,
            Some(json!({ "username": "admin", "password": "nope" })),
        )
        .await;
    assert_eq!(json_login.status, StatusCode::UNAUTHORIZED);
    assert_eq!(json_login.body["message"], "Invalid username or password");
    assert!(json_login.set_cookie().is_none());

    let form_login = app
        .call(
            Request::builder()
                .method(Method::POST)
                .uri("/login")
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("username=admin&password=nope"))
                .unwrap(),
        )
        .await;
    assert_eq!(form_login.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_form_login_redirects_to_billing() {
    let app = TestApp::new().await;

    let response = app
        .call(
            Request::builder()
                .method(Method::POST)
                .uri("/login")
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("username=plain&password=plain-pass"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/billing"));
    assert!(response.set_cookie().is_some());
}

// =============================================================================
// Role checks
// =============================================================================

#[tokio::test]
async fn test_product_writes_need_admin() {
    let app = TestApp::new().await;

    let response = app
        .post(
            "/api/products/create/",
            &app.staff,
            json!({ "name": "Cable", "selling_price_cents": 500, "purchase_price_cents": 300 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_plain_user_cannot_bill() {
    let app = TestApp::new().await;
    let phone = app.create_phone().await;

    let response = app.post("/api/bills/create/", &app.plain, bill(&phone, 1)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(app.stock_of(&phone).await, 10);
}

#[tokio::test]
async fn test_reports_need_admin() {
    let app = TestApp::new().await;

    assert_eq!(app.get("/api/reports/", Some(&app.staff)).await.status, StatusCode::FORBIDDEN);

    let response = app.get("/api/reports/", Some(&app.admin)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total_sales_cents"], 0);
    assert_eq!(response.body["service_income_cents"], 0);
    assert_eq!(response.body["total_revenue_cents"], 0);
}

// =============================================================================
// Bills
// =============================================================================

#[tokio::test]
async fn test_bill_deducts_stock() {
    let app = TestApp::new().await;
    let phone = app.create_phone().await;

    let response = app.post("/api/bills/create/", &app.staff, bill(&phone, 3)).await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["grand_total_cents"], 35_400);
    assert!(response.body["invoice_no"].as_str().unwrap().starts_with("INV-"));

    assert_eq!(app.stock_of(&phone).await, 7);

    let bills = app.get("/api/bills/", Some(&app.plain)).await;
    let first = &bills.body["results"][0];
    assert_eq!(first["invoice_no"], response.body["invoice_no"]);
    assert_eq!(first["items"][0]["total_cents"], 30_000);
    assert_eq!(first["items"][0]["tax_cents"], 5_400);

    let report = app.get("/api/reports/", Some(&app.admin)).await;
    assert_eq!(report.body["total_sales_cents"], 35_400);
    assert_eq!(report.body["daily_sales_cents"], 35_400);
}

#[tokio::test]
async fn test_insufficient_stock_conflict() {
    let app = TestApp::new().await;
    let phone = app.create_phone().await;

    let response = app.post("/api/bills/create/", &app.staff, bill(&phone, 50)).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["code"], "INSUFFICIENT_STOCK");

    assert_eq!(app.stock_of(&phone).await, 10);
    let bills = app.get("/api/bills/", Some(&app.plain)).await;
    assert_eq!(bills.body["results"], json!([]));
}

#[tokio::test]
async fn test_bill_validation_errors_by_field() {
    let app = TestApp::new().await;

    let response = app
        .post(
            "/api/bills/create/",
            &app.staff,
            json!({ "customer_name": "", "items": [] }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "VALIDATION_ERROR");
    assert_eq!(response.body["fields"]["customer_name"][0], "customer_name is required");
    assert_eq!(response.body["fields"]["items"][0], "items is required");
}

#[tokio::test]
async fn test_unknown_product_not_found() {
    let app = TestApp::new().await;

    let response = app.post("/api/bills/create/", &app.staff, bill("no-such-id", 1)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = TestApp::new().await;

    let response = app
        .call(
            Request::builder()
                .method(Method::POST)
                .uri("/api/bills/create/")
                .header(AUTHORIZATION, format!("Bearer {}", app.staff))
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from("{\"customer_name\": "))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "VALIDATION_ERROR");
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn test_referenced_product_cannot_be_deleted() {
    let app = TestApp::new().await;
    let phone = app.create_phone().await;
    app.post("/api/bills/create/", &app.staff, bill(&phone, 1)).await;

    let response = app
        .send(Method::DELETE, &format!("/api/products/{phone}/delete/"), Some(&app.admin), None)
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["code"], "REFERENTIAL_CONFLICT");
    assert_eq!(app.stock_of(&phone).await, 9);
}

#[tokio::test]
async fn test_unreferenced_product_deleted() {
    let app = TestApp::new().await;
    let phone = app.create_phone().await;

    let response = app
        .send(Method::DELETE, &format!("/api/products/{phone}/delete/"), Some(&app.admin), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Product deleted successfully");

    let products = app.get("/api/products/", Some(&app.plain)).await;
    assert_eq!(products.body["results"], json!([]));
}

#[tokio::test]
async fn test_update_and_restock() {
    let app = TestApp::new().await;
    let phone = app.create_phone().await;

    let updated = app
        .send(
            Method::PUT,
            &format!("/api/products/{phone}/"),
            Some(&app.admin),
            Some(json!({ "selling_price_cents": 12_000 })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["selling_price_cents"], 12_000);
    assert_eq!(updated.body["name"], "Phone X");

    let restocked = app
        .post(&format!("/api/products/{phone}/restock/"), &app.admin, json!({ "quantity": 5 }))
        .await;
    assert_eq!(restocked.status, StatusCode::OK);
    assert_eq!(restocked.body["stock"], 15);

    let categories = app.get("/api/categories/", Some(&app.plain)).await;
    assert_eq!(categories.body["results"][0]["name"], "Mobiles");
}

// =============================================================================
// Proformas, services, returns
// =============================================================================

#[tokio::test]
async fn test_proforma_leaves_stock_alone() {
    let app = TestApp::new().await;
    let phone = app.create_phone().await;

    let body = json!({
        "customer_name": "Meridian Traders",
        "valid_until": "2099-12-31",
        "shipping_charge_cents": 2_500,
        "items": [{ "product_id": phone, "quantity": 20, "hsn_sac": "8517" }]
    });

    assert_eq!(
        app.post("/api/proforma/create/", &app.staff, body.clone()).await.status,
        StatusCode::FORBIDDEN
    );

    let response = app.post("/api/proforma/create/", &app.admin, body).await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert!(response.body["proforma_no"].as_str().unwrap().starts_with("PF-"));
    assert_eq!(app.stock_of(&phone).await, 10);

    let list = app.get("/api/proforma/", Some(&app.plain)).await;
    let proforma = &list.body["results"][0];
    assert_eq!(proforma["grand_total_cents"], 236_000);
    assert_eq!(proforma["shipping_charge_cents"], 2_500);
    assert_eq!(proforma["currency"], "INR");
}

#[tokio::test]
async fn test_proforma_list_embeds_linked_invoice() {
    let app = TestApp::new().await;
    let phone = app.create_phone().await;

    let sale = app.post("/api/bills/create/", &app.staff, bill(&phone, 2)).await;
    let invoice_no = sale.body["invoice_no"].as_str().unwrap().to_string();

    let created = app
        .post(
            "/api/proforma/create/",
            &app.admin,
            json!({
                "customer_name": "Meridian Traders",
                "related_invoice_no": invoice_no,
                "items": [{ "product_id": phone, "quantity": 1 }]
            }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);

    let list = app.get("/api/proforma/", Some(&app.plain)).await;
    let related = &list.body["results"][0]["related_invoice"];
    assert_eq!(related["invoice_no"], invoice_no.as_str());
    assert_eq!(related["customer_name"], "Asha");
    assert_eq!(related["grand_total_cents"], 23_600);
}

#[tokio::test]
async fn test_restock_past_stock_ceiling_is_rejected() {
    let app = TestApp::new().await;

    let oversized = app
        .post(
            "/api/products/create/",
            &app.admin,
            json!({
                "name": "Bulk Cable",
                "selling_price_cents": 500,
                "purchase_price_cents": 300,
                "stock": i64::MAX
            }),
        )
        .await;
    assert_eq!(oversized.status, StatusCode::BAD_REQUEST);
    assert!(oversized.body["fields"]["stock"].is_array());

    let created = app
        .post(
            "/api/products/create/",
            &app.admin,
            json!({
                "name": "Bulk Cable",
                "selling_price_cents": 500,
                "purchase_price_cents": 300,
                "stock": 999_999_999
            }),
        )
        .await;
    let id = created.body["id"].as_str().unwrap().to_string();

    let restocked = app
        .post(&format!("/api/products/{id}/restock/"), &app.admin, json!({ "quantity": 5 }))
        .await;
    assert_eq!(restocked.status, StatusCode::BAD_REQUEST);
    assert!(restocked.body["fields"]["quantity"].is_array());

    // Nothing changed and every product still lists.
    assert_eq!(app.stock_of(&id).await, 999_999_999);
}

#[tokio::test]
async fn test_service_and_return_flow() {
    let app = TestApp::new().await;
    let phone = app.create_phone().await;

    let service = app
        .post(
            "/api/services/create/",
            &app.staff,
            json!({
                "customer_name": "Ravi",
                "service_type": "Battery replacement",
                "service_price_cents": 150_000
            }),
        )
        .await;
    assert_eq!(service.status, StatusCode::CREATED);
    assert!(service.body["service_id"].as_str().unwrap().starts_with("SVC-"));
    assert!(service.body["service_invoice_no"].as_str().unwrap().starts_with("SIN-"));

    let sale = app.post("/api/bills/create/", &app.staff, bill(&phone, 1)).await;
    let invoice_no = sale.body["invoice_no"].as_str().unwrap().to_string();

    let returned = app
        .post(
            "/api/returns/create/",
            &app.staff,
            json!({
                "invoice_no": invoice_no,
                "product_name": "Phone X",
                "quantity": 1,
                "return_type": "refund",
                "reason": "Changed mind"
            }),
        )
        .await;
    assert_eq!(returned.status, StatusCode::CREATED);
    assert_eq!(returned.body["invoice_no"], invoice_no.as_str());

    let unknown = app
        .post(
            "/api/returns/create/",
            &app.staff,
            json!({
                "invoice_no": "INV-FFFFFFFF",
                "product_name": "Phone X",
                "quantity": 1,
                "return_type": "refund"
            }),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let returns = app.get("/api/returns/", Some(&app.plain)).await;
    assert_eq!(returns.body["results"].as_array().unwrap().len(), 1);
    // Returns don't restock.
    assert_eq!(app.stock_of(&phone).await, 9);

    let report = app.get("/api/reports/", Some(&app.admin)).await;
    assert_eq!(report.body["service_income_cents"], 150_000);
    assert_eq!(report.body["total_revenue_cents"], 150_000 + 11_800);
}

use async_trait::async_trait;
use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{Method, Request, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Datelike, Utc};
use serde_json::{Value, json};
use std::sync::Arc;
use storefront_api::{
    AppConfig, AppState, InMemoryRecordStore, create_router,
    access::Principal,
    error::AppError,
    handlers::{self, products::ProductFilter},
    models::{CreateProductRequest, RegisterRequest},
    store::{
        Collection, Document, Filter, FindQuery, Measure, MonthlyTotal, RecordStore, StoreError,
    },
};
use tower::ServiceExt;

// --- Test scaffolding ---

struct TestApp {
    router: Router,
    state: AppState,
}

impl TestApp {
    fn new() -> Self {
        let state = AppState::new(AppConfig::default(), Arc::new(InMemoryRecordStore::new()));
        Self {
            router: create_router(state.clone()),
            state,
        }
    }

    async fn user(&self, username: &str) -> (String, String) {
        let account = self
            .state
            .accounts()
            .register(RegisterRequest {
                username: username.to_string(),
                email: format!("{}@x.io", username),
                password: "pw1".to_string(),
            })
            .await
            .unwrap();
        let token = self.state.tokens.issue(&account.id, false).unwrap();
        (account.id, format!("Bearer {}", token))
    }

    fn admin(&self) -> String {
        format!("Bearer {}", self.state.tokens.issue("root", true).unwrap())
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("token", token);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn product(&self, title: &str, categories: &[&str], price: f64) -> Value {
        let admin = self.admin();
        let (status, body) = self
            .call(
                Method::POST,
                "/api/products",
                Some(&admin),
                Some(json!({
                    "title": title,
                    "desc": "desc",
                    "img": "img.png",
                    "categories": categories,
                    "price": price
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body
    }
}

// --- Products ---

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_creates_product_and_public_reads_it() {
    let app = TestApp::new();

    let created = app.product("Tee", &["men"], 19.99).await;
    let id = created["_id"].as_str().unwrap();

    let (status, body) = app
        .call(Method::GET, &format!("/api/products/find/{}", id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Tee");
    assert_eq!(body["price"], 19.99);
}

#[tokio::test]
async fn test_regular_user_cannot_manage_products() {
    let app = TestApp::new();
    let (_, token) = app.user("user1").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/products",
            Some(&token),
            Some(json!({ "title": "Tee", "desc": "d", "img": "i", "price": 1.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!("You are not allowed to do that!"));

    let (status, _) = app
        .call(Method::POST, "/api/products", None, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_product_validation_and_uniqueness() {
    let app = TestApp::new();
    let admin = app.admin();

    let (status, _) = app
        .call(
            Method::POST,
            "/api/products",
            Some(&admin),
            Some(json!({ "title": "Tee", "desc": "d", "img": "i", "price": -1.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.product("Tee", &[], 5.0).await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/products",
            Some(&admin),
            Some(json!({ "title": "Tee", "desc": "d", "img": "i", "price": 5.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!("Internal server error"));
}

#[tokio::test]
async fn test_list_products_by_category_and_newest() {
    let app = TestApp::new();
    for i in 0..6 {
        let category = if i % 2 == 0 { "even" } else { "odd" };
        app.product(&format!("P{}", i), &[category], i as f64).await;
    }

    let (_, all) = app.call(Method::GET, "/api/products", None, None).await;
    assert_eq!(all.as_array().unwrap().len(), 6);

    let (_, even) = app
        .call(Method::GET, "/api/products?category=even", None, None)
        .await;
    let titles: Vec<&str> = even
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["P0", "P2", "P4"]);

    let (_, newest) = app
        .call(Method::GET, "/api/products?new=true", None, None)
        .await;
    let newest = newest.as_array().unwrap();
    assert_eq!(newest.len(), 5);
    assert_eq!(newest[0]["title"], "P5");

    // `new` wins over `category`.
    let (_, both) = app
        .call(Method::GET, "/api/products?new=1&category=odd", None, None)
        .await;
    assert_eq!(both.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_update_and_delete_product() {
    let app = TestApp::new();
    let admin = app.admin();
    let created = app.product("Tee", &[], 5.0).await;
    let uri = format!("/api/products/{}", created["_id"].as_str().unwrap());

    let (status, body) = app
        .call(Method::PUT, &uri, Some(&admin), Some(json!({ "price": 7.5 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price"], 7.5);
    assert_eq!(body["title"], "Tee");

    let (status, body) = app.call(Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("Product has been deleted..."));

    let (status, body) = app.call(Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!("Resource not found"));
}

#[tokio::test]
async fn test_missing_product_is_not_found() {
    let app = TestApp::new();

    let (status, _) = app
        .call(Method::GET, "/api/products/find/nope", None, None)
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

// --- Carts ---

#[tokio::test]
async fn test_cart_defaults_to_caller_and_owner_can_read_it() {
    let app = TestApp::new();
    let (u1, token) = app.user("user1").await;

    let (status, cart) = app
        .call(
            Method::POST,
            "/api/carts",
            Some(&token),
            Some(json!({ "products": [{ "productId": "p1" }] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["userId"], u1.as_str());
    assert_eq!(cart["products"][0]["quantity"], 1);

    let (status, found) = app
        .call(Method::GET, &format!("/api/carts/find/{}", u1), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["_id"], cart["_id"]);
}

#[tokio::test]
async fn test_user_cannot_touch_someone_elses_cart() {
    let app = TestApp::new();
    let (u1, t1) = app.user("user1").await;
    let (_, t2) = app.user("user2").await;

    let (_, cart) = app
        .call(Method::POST, "/api/carts", Some(&t1), Some(json!({ "products": [] })))
        .await;
    let uri = format!("/api/carts/{}", cart["_id"].as_str().unwrap());

    let (status, _) = app
        .call(Method::PUT, &uri, Some(&t2), Some(json!({ "products": [] })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call(Method::DELETE, &uri, Some(&t2), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(Method::GET, &format!("/api/carts/find/{}", u1), Some(&t2), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Creating a cart on someone else's behalf is refused as well.
    let (status, _) = app
        .call(
            Method::POST,
            "/api/carts",
            Some(&t2),
            Some(json!({ "userId": u1, "products": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The owner still can.
    let (status, body) = app.call(Method::DELETE, &uri, Some(&t1), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("Cart has been deleted..."));
}

#[tokio::test]
async fn test_admin_manages_any_cart() {
    let app = TestApp::new();
    let admin = app.admin();
    let (u1, _) = app.user("user1").await;

    let (status, cart) = app
        .call(
            Method::POST,
            "/api/carts",
            Some(&admin),
            Some(json!({ "userId": u1, "products": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["userId"], u1.as_str());

    let uri = format!("/api/carts/{}", cart["_id"].as_str().unwrap());
    let (status, updated) = app
        .call(
            Method::PUT,
            &uri,
            Some(&admin),
            Some(json!({ "products": [{ "productId": "p9", "quantity": 3 }] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["products"][0]["quantity"], 3);

    let (status, carts) = app.call(Method::GET, "/api/carts", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(carts.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cart_rejects_zero_quantity() {
    let app = TestApp::new();
    let (_, token) = app.user("user1").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/carts",
            Some(&token),
            Some(json!({ "products": [{ "productId": "p1", "quantity": 0 }] })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// --- Orders ---

#[tokio::test]
async fn test_order_lifecycle_and_income() {
    let app = TestApp::new();
    let admin = app.admin();
    let (u1, token) = app.user("user1").await;

    for amount in [40.0, 2.5] {
        let (status, order) = app
            .call(
                Method::POST,
                "/api/orders",
                Some(&token),
                Some(json!({
                    "products": [{ "productId": "p1", "quantity": 2 }],
                    "amount": amount,
                    "address": { "city": "Dublin" }
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(order["status"], "pending");
        assert_eq!(order["userId"], u1.as_str());
        assert_eq!(order["address"]["city"], "Dublin");
    }

    let (status, mine) = app
        .call(Method::GET, &format!("/api/orders/find/{}", u1), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let mine = mine.as_array().unwrap().clone();
    assert_eq!(mine.len(), 2);

    // Only admins move an order along.
    let uri = format!("/api/orders/{}", mine[0]["_id"].as_str().unwrap());
    let (status, _) = app
        .call(Method::PUT, &uri, Some(&token), Some(json!({ "status": "shipped" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, shipped) = app
        .call(Method::PUT, &uri, Some(&admin), Some(json!({ "status": "shipped" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shipped["status"], "shipped");

    let (status, income) = app
        .call(Method::GET, "/api/orders/income", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        income,
        json!([{ "_id": Utc::now().month(), "total": 42.5 }])
    );

    let (status, body) = app.call(Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("Order has been deleted..."));

    let (_, all) = app.call(Method::GET, "/api/orders", Some(&admin), None).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_user_cannot_read_other_users_orders() {
    let app = TestApp::new();
    let (u1, _) = app.user("user1").await;
    let (_, t2) = app.user("user2").await;

    let (status, _) = app
        .call(Method::GET, &format!("/api/orders/find/{}", u1), Some(&t2), None)
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_stats_endpoints() {
    let app = TestApp::new();
    let admin = app.admin();
    app.user("user1").await;
    app.user("user2").await;
    app.product("Tee", &[], 1.0).await;

    let (status, users) = app.call(Method::GET, "/api/users/stats", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users[0]["total"], 2.0);

    let (status, products) = app
        .call(Method::GET, "/api/products/stats", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(products[0]["total"], 1.0);
}

// --- Store failures surface opaquely ---

/// A store whose every operation fails, as a broken database connection would.
struct BrokenStore;

fn broken() -> StoreError {
    StoreError::Malformed("connection reset".to_string())
}

#[async_trait]
impl RecordStore for BrokenStore {
    async fn create(&self, _c: Collection, _doc: Document) -> Result<Document, StoreError> {
        Err(broken())
    }
    async fn find_by_id(&self, _c: Collection, _id: &str) -> Result<Option<Document>, StoreError> {
        Err(broken())
    }
    async fn find_one(
        &self,
        _c: Collection,
        _filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        Err(broken())
    }
    async fn find(&self, _c: Collection, _q: &FindQuery) -> Result<Vec<Document>, StoreError> {
        Err(broken())
    }
    async fn find_by_id_and_update(
        &self,
        _c: Collection,
        _id: &str,
        _patch: Document,
    ) -> Result<Option<Document>, StoreError> {
        Err(broken())
    }
    async fn find_by_id_and_delete(
        &self,
        _c: Collection,
        _id: &str,
    ) -> Result<Option<Document>, StoreError> {
        Err(broken())
    }
    async fn monthly_totals(
        &self,
        _c: Collection,
        _since: DateTime<Utc>,
        _m: Measure,
    ) -> Result<Vec<MonthlyTotal>, StoreError> {
        Err(broken())
    }
}

fn broken_state() -> AppState {
    AppState::new(AppConfig::default(), Arc::new(BrokenStore))
}

#[tokio::test]
async fn test_store_failure_is_an_opaque_500() {
    let state = broken_state();

    let err = handlers::products::get_product(State(state.clone()), Path("p1".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Persistence(_)));

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(bytes.as_ref(), br#""Internal server error""#);
}

#[tokio::test]
async fn test_login_against_broken_store_is_not_a_credential_error() {
    let state = broken_state();

    let result = handlers::auth::login(
        State(state),
        Json(storefront_api::models::LoginRequest {
            username: "alice".to_string(),
            password: "pw1".to_string(),
        }),
    )
    .await;

    assert!(matches!(result, Err(AppError::Persistence(_))));
}

#[tokio::test]
async fn test_handlers_called_directly() {
    let app = TestApp::new();
    let (u1, _) = app.user("user1").await;

    let Json(product) = handlers::products::create_product(
        State(app.state.clone()),
        Json(CreateProductRequest {
            title: "Mug".to_string(),
            desc: "ceramic".to_string(),
            img: "mug.png".to_string(),
            categories: vec!["kitchen".to_string()],
            size: None,
            color: Some("white".to_string()),
            price: 8.0,
        }),
    )
    .await
    .unwrap();
    assert_eq!(product.color.as_deref(), Some("white"));

    let Json(listed) = handlers::products::list_products(
        State(app.state.clone()),
        Query(ProductFilter {
            new: None,
            category: Some("kitchen".to_string()),
        }),
    )
    .await
    .unwrap();
    assert_eq!(listed, vec![product]);

    let principal = Principal {
        account_id: u1.clone(),
        is_admin: false,
    };
    let Json(cart) = handlers::carts::create_cart(
        principal,
        State(app.state.clone()),
        Json(Default::default()),
    )
    .await
    .unwrap();
    assert_eq!(cart.user_id, u1);
    assert!(cart.products.is_empty());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = TestApp::new();
    let response: Response = app
        .router
        .clone()
        .oneshot(Request::get("/api/nothing").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

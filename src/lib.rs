use axum::{Router, extract::FromRef, http::HeaderName, routing::get};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Security core: credential codec, session tokens, gates and their HTTP middleware.
pub mod access;
pub mod auth;
pub mod codec;
pub mod token;

// Account directory and the record store behind it.
pub mod accounts;
pub mod store;

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod validation;

// One router per resource; each merges its access groups.
pub mod routes;

// --- Public Re-exports ---

pub use accounts::AccountDirectory;
pub use config::AppConfig;
pub use store::{InMemoryRecordStore, PostgresRecordStore, RecordStoreState};

use codec::CredentialCodec;
use token::TokenService;

/// ApiDoc
///
/// The OpenAPI document for every route, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register, handlers::auth::login,
        handlers::users::update_user, handlers::users::delete_user, handlers::users::get_user,
        handlers::users::list_users, handlers::users::user_stats,
        handlers::products::create_product, handlers::products::update_product,
        handlers::products::delete_product, handlers::products::get_product,
        handlers::products::list_products, handlers::products::product_stats,
        handlers::carts::create_cart, handlers::carts::update_cart, handlers::carts::delete_cart,
        handlers::carts::get_user_cart, handlers::carts::list_carts,
        handlers::orders::create_order, handlers::orders::update_order,
        handlers::orders::delete_order, handlers::orders::get_user_orders,
        handlers::orders::list_orders, handlers::orders::income,
    ),
    components(
        schemas(
            models::Account, models::AccountView, models::Product, models::LineItem,
            models::Cart, models::Order, models::RegisterRequest, models::LoginRequest,
            models::LoginResponse, models::UpdateAccountRequest, models::CreateProductRequest,
            models::UpdateProductRequest, models::CreateCartRequest, models::UpdateCartRequest,
            models::CreateOrderRequest, models::UpdateOrderRequest, store::MonthlyTotal,
        )
    ),
    tags(
        (name = "storefront", description = "Storefront API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container every request sees. Cloning is cheap: each service
/// sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Record store: Postgres in production, in-memory for local runs and tests.
    pub store: RecordStoreState,
    pub config: AppConfig,
    /// Password encryption keyed by `PASS_SEC`.
    pub codec: Arc<CredentialCodec>,
    /// Session token signing keyed by `JWT_SEC`.
    pub tokens: Arc<TokenService>,
}

impl AppState {
    /// Builds the codec and the token service from the configured secrets.
    pub fn new(config: AppConfig, store: RecordStoreState) -> Self {
        let codec = Arc::new(CredentialCodec::new(&config.pass_secret));
        let tokens = Arc::new(TokenService::new(&config.jwt_secret));
        Self {
            store,
            config,
            codec,
            tokens,
        }
    }

    pub fn accounts(&self) -> AccountDirectory {
        AccountDirectory::new(self.store.clone(), self.codec.clone(), self.tokens.clone())
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RecordStoreState {
    fn from_ref(app_state: &AppState) -> RecordStoreState {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

// The gate middleware only needs the token service.
impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(app_state: &AppState) -> Arc<TokenService> {
        app_state.tokens.clone()
    }
}

/// create_router
///
/// Assembles every resource router under `/api`, applies the observability layers and
/// registers the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        .nest("/api/auth", routes::auth::routes())
        .nest("/api/users", routes::users::routes(state.clone()))
        .nest("/api/products", routes::products::routes(state.clone()))
        .nest("/api/carts", routes::carts::routes(state.clone()))
        .nest("/api/orders", routes::orders::routes(state.clone()))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens one span per request carrying the method, the URI and the `x-request-id`,
/// so every log line of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}

use crate::{AppState, auth::require_admin, handlers::products};
use axum::{
    Router, middleware,
    routing::{get, post, put},
};

/// Products Router Module
///
/// Anyone may browse the catalog. Only administrators change it or read its statistics.
pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        // GET /api/products?new | ?category=...
        .route("/", get(products::list_products))
        // GET /api/products/find/{id}
        .route("/find/{id}", get(products::get_product));

    let admin = Router::new()
        .route("/", post(products::create_product))
        .route(
            "/{id}",
            put(products::update_product).delete(products::delete_product),
        )
        // GET /api/products/stats
        .route("/stats", get(products::product_stats))
        .route_layer(middleware::from_fn_with_state(state, require_admin));

    public.merge(admin)
}

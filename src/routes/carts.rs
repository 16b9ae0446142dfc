use crate::{
    AppState,
    auth::{require_admin, require_self_or_admin, require_token},
    handlers::carts,
};
use axum::{
    Router, middleware,
    routing::{get, post, put},
};

/// Carts Router Module
///
/// Any authenticated caller may create a cart and manage the carts they own. The
/// per-cart ownership check happens in the handlers, since the owner is only known
/// once the cart is loaded.
pub fn routes(state: AppState) -> Router<AppState> {
    let authenticated = Router::new()
        // POST /api/carts
        .route("/", post(carts::create_cart))
        // PUT/DELETE /api/carts/{id}
        .route("/{id}", put(carts::update_cart).delete(carts::delete_cart))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    let self_or_admin = Router::new()
        // GET /api/carts/find/{user_id}
        .route("/find/{user_id}", get(carts::get_user_cart))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_self_or_admin,
        ));

    let admin = Router::new()
        // GET /api/carts
        .route("/", get(carts::list_carts))
        .route_layer(middleware::from_fn_with_state(state, require_admin));

    authenticated.merge(self_or_admin).merge(admin)
}

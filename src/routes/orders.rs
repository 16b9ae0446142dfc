use crate::{
    AppState,
    auth::{require_admin, require_self_or_admin, require_token},
    handlers::orders,
};
use axum::{
    Router, middleware,
    routing::{get, post, put},
};

/// Orders Router Module
///
/// Customers place orders and read their own history. Changing an order, listing all
/// of them and the income report are administrator functions.
pub fn routes(state: AppState) -> Router<AppState> {
    let authenticated = Router::new()
        // POST /api/orders
        .route("/", post(orders::create_order))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    let self_or_admin = Router::new()
        // GET /api/orders/find/{user_id}
        .route("/find/{user_id}", get(orders::get_user_orders))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_self_or_admin,
        ));

    let admin = Router::new()
        // GET /api/orders
        .route("/", get(orders::list_orders))
        // PUT/DELETE /api/orders/{id}
        .route(
            "/{id}",
            put(orders::update_order).delete(orders::delete_order),
        )
        // GET /api/orders/income
        // Order amounts per month over the last two months.
        .route("/income", get(orders::income))
        .route_layer(middleware::from_fn_with_state(state, require_admin));

    authenticated.merge(self_or_admin).merge(admin)
}

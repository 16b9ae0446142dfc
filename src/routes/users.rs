use crate::{
    AppState,
    auth::{require_admin, require_self_or_admin},
    handlers::users,
};
use axum::{
    Router, middleware,
    routing::{get, put},
};

/// Users Router Module
///
/// Account maintenance. An account may change or delete itself; everything that reads
/// across accounts is reserved for administrators.
pub fn routes(state: AppState) -> Router<AppState> {
    let self_or_admin = Router::new()
        // PUT/DELETE /api/users/{id}
        .route(
            "/{id}",
            put(users::update_user).delete(users::delete_user),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_self_or_admin,
        ));

    let admin = Router::new()
        // GET /api/users?new
        .route("/", get(users::list_users))
        // GET /api/users/find/{id}
        .route("/find/{id}", get(users::get_user))
        // GET /api/users/stats
        // Sign-ups per calendar month over the last year.
        .route("/stats", get(users::user_stats))
        .route_layer(middleware::from_fn_with_state(state, require_admin));

    self_or_admin.merge(admin)
}

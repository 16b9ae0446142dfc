use crate::{AppState, handlers::auth};
use axum::{Router, routing::post};

/// Auth Router Module
///
/// The two public entry points of the identity flow. Neither route runs a gate.
pub fn routes() -> Router<AppState> {
    Router::new()
        // POST /api/auth/register
        // Creates a non-admin account; answers 201 with the stored record.
        .route("/register", post(auth::register))
        // POST /api/auth/login
        // Exchanges credentials for a three-day session token.
        .route("/login", post(auth::login))
}

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    error::Result,
    models::{Account, LoginRequest, LoginResponse, RegisterRequest},
};

/// register
///
/// [Public Route] Creates an account. The stored password is ciphertext, and the
/// response echoes the stored record.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = Account),
        (status = 400, description = "Invalid input"),
        (status = 500, description = "Store rejected the account (e.g. duplicate username)")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Account>)> {
    let account = state.accounts().register(payload).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// login
///
/// [Public Route] Exchanges a username/password pair for a session token valid for
/// three days.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Wrong credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let response = state.accounts().login(payload).await?;
    Ok(Json(response))
}

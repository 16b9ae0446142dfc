use axum::{
    Json,
    extract::{Path, Query, State},
};

use super::{ListFilter, deleted};
use crate::{
    AppState,
    access::Principal,
    error::Result,
    models::{AccountView, UpdateAccountRequest},
    store::MonthlyTotal,
};

/// update_user
///
/// [Self-or-Admin Route] Partially updates an account. Passwords are re-encrypted;
/// only admins may flip `isAdmin`.
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "Account ID")),
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Updated", body = AccountView),
        (status = 403, description = "Not this account and not an admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<Json<AccountView>> {
    let account = state.accounts().update(&principal, &id, payload).await?;
    Ok(Json(account))
}

/// delete_user
///
/// [Self-or-Admin Route] Removes an account.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Deleted", body = String),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<String>> {
    state.accounts().delete(&id).await?;
    Ok(deleted("User"))
}

/// get_user
///
/// [Admin Route] Looks up one account, without its password.
#[utoipa::path(
    get,
    path = "/api/users/find/{id}",
    params(("id" = String, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Found", body = AccountView),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AccountView>> {
    Ok(Json(state.accounts().find(&id).await?))
}

/// list_users
///
/// [Admin Route] Lists accounts; `?new` returns only the five newest.
#[utoipa::path(
    get,
    path = "/api/users",
    params(ListFilter),
    responses((status = 200, description = "Accounts", body = [AccountView]))
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(filter): Query<ListFilter>,
) -> Result<Json<Vec<AccountView>>> {
    Ok(Json(state.accounts().list(filter.newest()).await?))
}

/// user_stats
///
/// [Admin Route] Sign-ups per month over the last year.
#[utoipa::path(
    get,
    path = "/api/users/stats",
    responses((status = 200, description = "Monthly sign-ups", body = [MonthlyTotal]))
)]
pub async fn user_stats(State(state): State<AppState>) -> Result<Json<Vec<MonthlyTotal>>> {
    Ok(Json(state.accounts().signups_by_month().await?))
}

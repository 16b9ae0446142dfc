use axum::{
    Json,
    extract::{Path, State},
};

use super::deleted;
use crate::{
    AppState,
    access::{AccessError, Principal},
    error::{AppError, Result},
    models::{Cart, CreateCartRequest, NewCart, UpdateCartRequest},
    store::{Collection, Filter, FindQuery, from_document, from_documents, to_document},
    validation::validate_line_items,
};

/// Loads a cart and checks the caller owns it (or is an admin).
async fn owned_cart(state: &AppState, principal: &Principal, id: &str) -> Result<Cart> {
    let doc = state
        .store
        .find_by_id(Collection::Carts, id)
        .await?
        .ok_or(AppError::NotFound)?;
    let cart: Cart = from_document(doc)?;

    if !principal.may_act_on(&cart.user_id) {
        return Err(AccessError::Forbidden.into());
    }
    Ok(cart)
}

/// create_cart
///
/// [Authenticated Route] Creates a cart. Without a `userId` the cart belongs to the
/// caller; naming another user requires admin rights.
#[utoipa::path(
    post,
    path = "/api/carts",
    request_body = CreateCartRequest,
    responses(
        (status = 200, description = "Created", body = Cart),
        (status = 403, description = "Cart for another user")
    )
)]
pub async fn create_cart(
    principal: Principal,
    State(state): State<AppState>,
    Json(payload): Json<CreateCartRequest>,
) -> Result<Json<Cart>> {
    let user_id = payload
        .user_id
        .unwrap_or_else(|| principal.account_id.clone());
    if !principal.may_act_on(&user_id) {
        return Err(AccessError::Forbidden.into());
    }
    validate_line_items(&payload.products)?;

    let draft = NewCart {
        user_id,
        products: payload.products,
    };
    let doc = state
        .store
        .create(Collection::Carts, to_document(&draft)?)
        .await?;
    Ok(Json(from_document(doc)?))
}

/// update_cart
///
/// [Authenticated Route] Replaces the cart's line items. Owner or admin only.
#[utoipa::path(
    put,
    path = "/api/carts/{id}",
    params(("id" = String, Path, description = "Cart ID")),
    request_body = UpdateCartRequest,
    responses(
        (status = 200, description = "Updated", body = Cart),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_cart(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateCartRequest>,
) -> Result<Json<Cart>> {
    owned_cart(&state, &principal, &id).await?;
    if let Some(products) = &payload.products {
        validate_line_items(products)?;
    }

    let doc = state
        .store
        .find_by_id_and_update(Collection::Carts, &id, to_document(&payload)?)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(from_document(doc)?))
}

/// delete_cart
///
/// [Authenticated Route] Deletes a cart. Owner or admin only.
#[utoipa::path(
    delete,
    path = "/api/carts/{id}",
    params(("id" = String, Path, description = "Cart ID")),
    responses(
        (status = 200, description = "Deleted", body = String),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_cart(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<String>> {
    owned_cart(&state, &principal, &id).await?;
    state
        .store
        .find_by_id_and_delete(Collection::Carts, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(deleted("Cart"))
}

/// get_user_cart
///
/// [Self-or-Admin Route] The cart belonging to `user_id`.
#[utoipa::path(
    get,
    path = "/api/carts/find/{user_id}",
    params(("user_id" = String, Path, description = "Owner account ID")),
    responses(
        (status = 200, description = "Found", body = Cart),
        (status = 404, description = "No cart for this user")
    )
)]
pub async fn get_user_cart(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Cart>> {
    let doc = state
        .store
        .find_one(Collection::Carts, &Filter::new().eq("userId", user_id))
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(from_document(doc)?))
}

/// list_carts
///
/// [Admin Route] Every cart in the store.
#[utoipa::path(
    get,
    path = "/api/carts",
    responses((status = 200, description = "Carts", body = [Cart]))
)]
pub async fn list_carts(State(state): State<AppState>) -> Result<Json<Vec<Cart>>> {
    let docs = state.store.find(Collection::Carts, &FindQuery::all()).await?;
    Ok(Json(from_documents(docs)?))
}

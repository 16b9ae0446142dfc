use axum::{
    Json,
    extract::{Path, State},
};

use super::deleted;
use crate::{
    AppState,
    access::{AccessError, Principal},
    accounts::months_ago,
    error::{AppError, Result},
    models::{CreateOrderRequest, NewOrder, Order, UpdateOrderRequest},
    store::{
        Collection, Filter, FindQuery, Measure, MonthlyTotal, from_document, from_documents,
        to_document,
    },
    validation::{validate_line_items, validate_price},
};

/// Months of order history the income report covers.
pub const INCOME_WINDOW_MONTHS: u32 = 2;

/// create_order
///
/// [Authenticated Route] Places an order in `pending` status. Without a `userId` the
/// order belongs to the caller; naming another user requires admin rights.
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Created", body = Order),
        (status = 403, description = "Order for another user")
    )
)]
pub async fn create_order(
    principal: Principal,
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>> {
    let user_id = payload
        .user_id
        .clone()
        .unwrap_or_else(|| principal.account_id.clone());
    if !principal.may_act_on(&user_id) {
        return Err(AccessError::Forbidden.into());
    }
    validate_line_items(&payload.products)?;
    validate_price(payload.amount)?;

    let draft = NewOrder::pending(user_id, payload);
    let doc = state
        .store
        .create(Collection::Orders, to_document(&draft)?)
        .await?;
    let order: Order = from_document(doc)?;

    tracing::info!(order_id = %order.id, user_id = %order.user_id, "order placed");
    Ok(Json(order))
}

/// update_order
///
/// [Admin Route] Partially updates an order, usually its status.
#[utoipa::path(
    put,
    path = "/api/orders/{id}",
    params(("id" = String, Path, description = "Order ID")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Updated", body = Order),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateOrderRequest>,
) -> Result<Json<Order>> {
    if let Some(products) = &payload.products {
        validate_line_items(products)?;
    }
    if let Some(amount) = payload.amount {
        validate_price(amount)?;
    }

    let doc = state
        .store
        .find_by_id_and_update(Collection::Orders, &id, to_document(&payload)?)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(from_document(doc)?))
}

/// delete_order
///
/// [Admin Route] Removes an order.
#[utoipa::path(
    delete,
    path = "/api/orders/{id}",
    params(("id" = String, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Deleted", body = String),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<String>> {
    state
        .store
        .find_by_id_and_delete(Collection::Orders, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(deleted("Order"))
}

/// get_user_orders
///
/// [Self-or-Admin Route] All orders placed by `user_id`.
#[utoipa::path(
    get,
    path = "/api/orders/find/{user_id}",
    params(("user_id" = String, Path, description = "Owner account ID")),
    responses((status = 200, description = "Orders", body = [Order]))
)]
pub async fn get_user_orders(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Order>>> {
    let query = FindQuery::filtered(Filter::new().eq("userId", user_id));
    let docs = state.store.find(Collection::Orders, &query).await?;
    Ok(Json(from_documents(docs)?))
}

/// list_orders
///
/// [Admin Route] Every order in the store.
#[utoipa::path(
    get,
    path = "/api/orders",
    responses((status = 200, description = "Orders", body = [Order]))
)]
pub async fn list_orders(State(state): State<AppState>) -> Result<Json<Vec<Order>>> {
    let docs = state.store.find(Collection::Orders, &FindQuery::all()).await?;
    Ok(Json(from_documents(docs)?))
}

/// income
///
/// [Admin Route] Order amounts summed per month over the last two months.
#[utoipa::path(
    get,
    path = "/api/orders/income",
    responses((status = 200, description = "Monthly income", body = [MonthlyTotal]))
)]
pub async fn income(State(state): State<AppState>) -> Result<Json<Vec<MonthlyTotal>>> {
    let totals = state
        .store
        .monthly_totals(
            Collection::Orders,
            months_ago(INCOME_WINDOW_MONTHS),
            Measure::Sum("amount".to_string()),
        )
        .await?;
    Ok(Json(totals))
}

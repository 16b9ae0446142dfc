use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use utoipa::IntoParams;

use super::deleted;
use crate::{
    AppState,
    accounts::months_ago,
    error::{AppError, Result},
    models::{CreateProductRequest, Product, UpdateProductRequest},
    store::{
        Collection, Filter, FindQuery, Measure, MonthlyTotal, from_document, from_documents,
        to_document,
    },
    validation::validate_price,
};

/// How many products `?new` returns.
pub const NEWEST_PRODUCTS: usize = 5;

/// ProductFilter
///
/// Query parameters for the public catalog listing. `new` wins over `category`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductFilter {
    /// Any value returns the five most recently added products.
    pub new: Option<String>,
    /// Only products tagged with this category.
    pub category: Option<String>,
}

/// create_product
///
/// [Admin Route] Adds a product to the catalog. Titles are unique.
#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductRequest,
    responses((status = 200, description = "Created", body = Product))
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<Json<Product>> {
    validate_price(payload.price)?;
    if payload.title.trim().is_empty() {
        return Err(AppError::Validation("Title cannot be empty".to_string()));
    }

    let doc = state
        .store
        .create(Collection::Products, to_document(&payload)?)
        .await?;
    Ok(Json(from_document(doc)?))
}

/// update_product
///
/// [Admin Route] Partially updates a product.
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(("id" = String, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated", body = Product),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<Product>> {
    if let Some(price) = payload.price {
        validate_price(price)?;
    }

    let doc = state
        .store
        .find_by_id_and_update(Collection::Products, &id, to_document(&payload)?)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(from_document(doc)?))
}

/// delete_product
///
/// [Admin Route] Removes a product from the catalog.
#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = String, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Deleted", body = String),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<String>> {
    state
        .store
        .find_by_id_and_delete(Collection::Products, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(deleted("Product"))
}

/// get_product
///
/// [Public Route] Fetches one product.
#[utoipa::path(
    get,
    path = "/api/products/find/{id}",
    params(("id" = String, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Found", body = Product),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>> {
    let doc = state
        .store
        .find_by_id(Collection::Products, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(from_document(doc)?))
}

/// list_products
///
/// [Public Route] Lists the catalog: the newest five, one category, or everything.
#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductFilter),
    responses((status = 200, description = "Products", body = [Product]))
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>> {
    let query = match (&filter.new, &filter.category) {
        (Some(_), _) => FindQuery::newest(NEWEST_PRODUCTS),
        (None, Some(category)) => {
            FindQuery::filtered(Filter::new().contains("categories", category.as_str()))
        }
        (None, None) => FindQuery::all(),
    };

    let docs = state.store.find(Collection::Products, &query).await?;
    Ok(Json(from_documents(docs)?))
}

/// product_stats
///
/// [Admin Route] Products added per month over the last year.
#[utoipa::path(
    get,
    path = "/api/products/stats",
    responses((status = 200, description = "Monthly additions", body = [MonthlyTotal]))
)]
pub async fn product_stats(State(state): State<AppState>) -> Result<Json<Vec<MonthlyTotal>>> {
    let totals = state
        .store
        .monthly_totals(Collection::Products, months_ago(12), Measure::Count)
        .await?;
    Ok(Json(totals))
}

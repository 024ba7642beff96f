//! Request handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use shopcore::model::{BuyItem, Order, Product, ProductDraft};
use shopcore::query::{OrderQueryParams, ProductQueryParams};
use shopcore::types::{ProductId, UserId};
use tracing::error;

use crate::error::ApiError;
use crate::{AppState, Backend};

/// The listing envelope shared by product and order listings.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    /// Page size that was applied.
    pub limit: u32,
    /// Offset that was applied.
    pub offset: u64,
    /// Size of the whole filtered set, independent of pagination.
    pub total: u64,
    /// The page contents.
    pub results: Vec<T>,
}

/// Raw product listing query string, validated into typed params.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListingQuery {
    category: Option<String>,
    search: Option<String>,
    order_by: Option<String>,
    sort: Option<String>,
    limit: Option<u32>,
    offset: Option<u64>,
}

/// Raw order listing query string.
#[derive(Debug, Deserialize)]
pub struct OrderListingQuery {
    limit: Option<u32>,
    offset: Option<u64>,
}

/// Checkout request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    buy_item_list: Vec<BuyItem>,
}

/// `GET /products`
pub async fn list_products<S: Backend>(
    State(state): State<AppState<S>>,
    Query(query): Query<ProductListingQuery>,
) -> Result<Json<Page<Product>>, ApiError> {
    let params = ProductQueryParams::parse(
        query.category.as_deref(),
        query.search.as_deref(),
        query.order_by.as_deref(),
        query.sort.as_deref(),
        query.limit,
        query.offset,
    )?;
    let (results, total) = state.catalog.list_products(&params).await?;
    Ok(Json(Page {
        limit: params.limit.into(),
        offset: params.offset.into(),
        total,
        results,
    }))
}

/// `GET /products/{productId}`
pub async fn get_product<S: Backend>(
    State(state): State<AppState<S>>,
    Path(product_id): Path<i64>,
) -> Result<Json<Product>, ApiError> {
    let product_id = ProductId::try_new(product_id).map_err(|_| ApiError::NotFound)?;
    state
        .catalog
        .product_by_id(product_id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// `POST /products`
pub async fn create_product<S: Backend>(
    State(state): State<AppState<S>>,
    Json(draft): Json<ProductDraft>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.catalog.create_product(&draft).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /products/{productId}`
pub async fn update_product<S: Backend>(
    State(state): State<AppState<S>>,
    Path(product_id): Path<i64>,
    Json(draft): Json<ProductDraft>,
) -> Result<Json<Product>, ApiError> {
    let product_id = ProductId::try_new(product_id).map_err(|_| ApiError::NotFound)?;
    state
        .catalog
        .update_product(product_id, &draft)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// `DELETE /products/{productId}`
pub async fn delete_product<S: Backend>(
    State(state): State<AppState<S>>,
    Path(product_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    // Deleting an id that could never exist is as gone as it gets.
    if let Ok(product_id) = ProductId::try_new(product_id) {
        state.catalog.delete_product(product_id).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /users/{userId}/orders`
pub async fn create_order<S: Backend>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<i64>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let user_id = UserId::try_new(user_id)
        .map_err(|_| ApiError::BadRequest(format!("user {user_id} does not exist")))?;
    let order_id = state
        .checkout
        .place_order(user_id, &request.buy_item_list)
        .await?;
    let order = state
        .checkout
        .order_by_id(order_id)
        .await?
        .ok_or_else(|| {
            error!(order_id = %order_id, "[server.create_order] committed order not readable");
            ApiError::Internal
        })?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// `GET /users/{userId}/orders`
pub async fn list_user_orders<S: Backend>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<i64>,
    Query(query): Query<OrderListingQuery>,
) -> Result<Json<Page<Order>>, ApiError> {
    let user_id = UserId::try_new(user_id)
        .map_err(|_| ApiError::BadRequest(format!("user {user_id} does not exist")))?;
    let params = OrderQueryParams::for_user(user_id, query.limit, query.offset)?;
    let (results, total) = state.checkout.list_orders(&params).await?;
    Ok(Json(Page {
        limit: params.limit.into(),
        offset: params.offset.into(),
        total,
        results,
    }))
}

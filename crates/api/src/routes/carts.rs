//! Cart endpoints.

use std::sync::Arc;

use application::{Line, Storefront};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::{DateTime, Utc};
use common::{CartId, CartItemId, ProductId, UserId};
use domain::{Cart, CartItem};
use serde::{Deserialize, Serialize};

use super::{AppState, PageParams, PageResponse, actor, parse_id};
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl From<&LineRequest> for Line {
    fn from(req: &LineRequest) -> Self {
        Line::new(req.product_id, req.quantity)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCartRequest {
    pub store_name: String,
    #[serde(default)]
    pub items: Vec<LineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct AddItemsRequest {
    pub items: Vec<LineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeCartRequest {
    /// New buyer; defaults to the acting user.
    pub bought_by: Option<UserId>,
    /// New sale date; defaults to now.
    pub sold_at: Option<DateTime<Utc>>,
    pub store_name: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteItemsRequest {
    pub item_ids: Vec<CartItemId>,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub id: CartId,
    pub bought_by: UserId,
    pub store_name: String,
    pub sold_at: DateTime<Utc>,
    pub purchase_status: String,
    pub total_sale_amount_cents: i64,
    pub items: Vec<CartItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct CartItemResponse {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub purchase_status: String,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<UserId>,
}

impl From<&CartItem> for CartItemResponse {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id(),
            product_id: item.product_id(),
            quantity: item.quantity(),
            unit_price_cents: item.unit_price().cents(),
            purchase_status: item.purchase_status().to_string(),
            cancelled_at: item.cancelled_at(),
            cancelled_by: item.cancelled_by(),
        }
    }
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        Self {
            id: cart.id(),
            bought_by: cart.bought_by(),
            store_name: cart.store_name().to_string(),
            sold_at: cart.sold_at(),
            purchase_status: cart.purchase_status().to_string(),
            total_sale_amount_cents: cart.total_sale_amount().cents(),
            items: cart.items().iter().map(CartItemResponse::from).collect(),
            created_at: cart.created_at(),
            updated_at: cart.updated_at(),
        }
    }
}

fn lines(items: &[LineRequest]) -> Vec<Line> {
    items.iter().map(Line::from).collect()
}

// -- Handlers --

/// POST /carts: create a cart for the acting user.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<CreateCartRequest>,
) -> Result<(StatusCode, Json<CartResponse>), ApiError> {
    let cart = state
        .cart_service
        .create_cart(actor(&headers)?, &req.store_name, &lines(&req.items))
        .await?;
    Ok((StatusCode::CREATED, Json(cart.into())))
}

/// GET /carts: page through carts that are not deleted.
#[tracing::instrument(skip(state))]
pub async fn list<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<PageParams>,
) -> Result<Json<PageResponse<CartResponse>>, ApiError> {
    let page = state.cart_service.list_carts(&params.into()).await?;
    Ok(Json(PageResponse::from_result(page, CartResponse::from)))
}

/// GET /carts/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.cart_service.get_cart(parse_id(&id)?).await?;
    Ok(Json(cart.into()))
}

/// PUT /carts/{id}: change buyer, sale date and store.
#[tracing::instrument(skip(state, headers, req))]
pub async fn change<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<ChangeCartRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let bought_by = match req.bought_by {
        Some(user) => Some(user),
        None => actor(&headers)?,
    };
    let cart = state
        .cart_service
        .change_cart(
            parse_id(&id)?,
            bought_by,
            req.sold_at.unwrap_or_else(Utc::now),
            &req.store_name,
        )
        .await?;
    Ok(Json(cart.into()))
}

/// POST /carts/{id}/items: append lines to a cart.
#[tracing::instrument(skip(state, req))]
pub async fn add_items<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<AddItemsRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state
        .cart_service
        .add_items(parse_id(&id)?, &lines(&req.items))
        .await?;
    Ok(Json(cart.into()))
}

/// POST /carts/{id}/cancel: cancel every live item.
#[tracing::instrument(skip(state, headers))]
pub async fn cancel<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state
        .cart_service
        .cancel_cart(parse_id(&id)?, actor(&headers)?)
        .await?;
    Ok(Json(cart.into()))
}

/// DELETE /carts/{id}: soft-delete a cart.
#[tracing::instrument(skip(state, headers))]
pub async fn delete<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .cart_service
        .delete_cart(parse_id(&id)?, actor(&headers)?)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /carts/{id}/items/delete: soft-delete selected items.
#[tracing::instrument(skip(state, headers, req))]
pub async fn delete_items<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<DeleteItemsRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state
        .cart_service
        .delete_items(parse_id(&id)?, actor(&headers)?, &req.item_ids)
        .await?;
    Ok(Json(cart.into()))
}

//! Product catalog endpoints.

use std::sync::Arc;

use application::{ProductInput, Storefront};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::ProductId;
use domain::{Money, Product, Rating};
use serde::{Deserialize, Serialize};

use super::{AppState, PageParams, PageResponse, parse_id};
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub title: String,
    pub price_cents: i64,
    pub description: String,
    pub image: String,
    #[serde(default)]
    pub rating: RatingBody,
    pub category: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RatingBody {
    pub rate: f64,
    pub count: u32,
}

impl From<ProductRequest> for ProductInput {
    fn from(req: ProductRequest) -> Self {
        ProductInput {
            title: req.title,
            price: Money::from_cents(req.price_cents),
            description: req.description,
            image: req.image,
            rating: Rating::new(req.rating.rate, req.rating.count),
            category: req.category,
        }
    }
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: ProductId,
    pub title: String,
    pub price_cents: i64,
    pub description: String,
    pub image: String,
    pub rating: RatingBody,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id(),
            title: product.title().to_string(),
            price_cents: product.price().cents(),
            description: product.description().to_string(),
            image: product.image().to_string(),
            rating: RatingBody {
                rate: product.rating().rate,
                count: product.rating().count,
            },
            category: product.category().map(|c| c.name.clone()),
            created_at: product.created_at(),
            updated_at: product.updated_at(),
        }
    }
}

// -- Handlers --

/// POST /products: validate and create a product.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<ProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let product = state.product_service.create_product(req.into()).await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// GET /products: page through the catalog.
#[tracing::instrument(skip(state))]
pub async fn list<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<PageParams>,
) -> Result<Json<PageResponse<ProductResponse>>, ApiError> {
    let page = state
        .product_service
        .list_products(&params.into())
        .await?;
    Ok(Json(PageResponse::from_result(page, ProductResponse::from)))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state.product_service.get_product(parse_id(&id)?).await?;
    Ok(Json(product.into()))
}

/// PUT /products/{id}: replace every attribute of a product.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<ProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .product_service
        .update_product(parse_id(&id)?, req.into())
        .await?;
    Ok(Json(product.into()))
}

/// DELETE /products/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.product_service.delete_product(parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /products/category/{name}: products of one category.
#[tracing::instrument(skip(state))]
pub async fn by_category<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    Path(name): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<PageResponse<ProductResponse>>, ApiError> {
    let page = state
        .product_service
        .list_products_by_category(&name, &params.into())
        .await?;
    Ok(Json(PageResponse::from_result(page, ProductResponse::from)))
}

/// GET /products/categories: names of the categories in use.
#[tracing::instrument(skip(state))]
pub async fn categories<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.category_service.list_categories().await?))
}

//! HTTP handlers and the helpers they share.

pub mod carts;
pub mod health;
pub mod metrics;
pub mod products;

use std::str::FromStr;

use application::{CartService, CategoryService, ProductService, Storefront};
use axum::http::HeaderMap;
use common::{PaginationQuery, PaginationQueryResult, UserId};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Header carrying the id of the acting user.
pub const USER_HEADER: &str = "x-user-id";

/// Shared application state accessible from all handlers.
pub struct AppState<S: Storefront> {
    pub cart_service: CartService<S>,
    pub product_service: ProductService<S>,
    pub category_service: CategoryService<S>,
}

impl<S: Storefront> AppState<S> {
    pub fn new(store: S) -> Self {
        Self {
            cart_service: CartService::new(store.clone()),
            product_service: ProductService::new(store.clone()),
            category_service: CategoryService::new(store),
        }
    }
}

/// Reads the acting user from the `x-user-id` header.
///
/// A missing header yields `None`; the service decides whether an actor is
/// required.
pub fn actor(headers: &HeaderMap) -> Result<Option<UserId>, ApiError> {
    let Some(value) = headers.get(USER_HEADER) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {USER_HEADER} header")))?;
    parse_id(raw).map(Some)
}

/// Parses a typed uuid id from a path segment.
pub fn parse_id<T: FromStr<Err = uuid::Error>>(id: &str) -> Result<T, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}

/// `?page=&size=&order=` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    /// Order clause such as `title desc, price`.
    pub order: Option<String>,
}

impl From<PageParams> for PaginationQuery {
    fn from(params: PageParams) -> Self {
        let mut query = PaginationQuery::new();
        if let Some(page) = params.page {
            query = query.page(page);
        }
        if let Some(size) = params.size {
            query = query.size(size);
        }
        if let Some(order) = params.order {
            query = query.with_order(&order);
        }
        query
    }
}

/// One page of a listing.
#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_count: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> PageResponse<T> {
    pub fn from_result<U>(result: PaginationQueryResult<U>, f: impl FnMut(U) -> T) -> Self {
        let total_pages = result.total_pages();
        let has_next = result.has_next();
        let has_previous = result.has_previous();
        let result = result.map(f);
        Self {
            items: result.items,
            page: result.page,
            size: result.size,
            total_count: result.total_count,
            total_pages,
            has_next,
            has_previous,
        }
    }
}

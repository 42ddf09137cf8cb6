//! Shared types used across the storefront crates.

pub mod pagination;
pub mod types;

pub use pagination::{PaginationQuery, PaginationQueryResult, SortDirection, SortOrder};
pub use types::{CartId, CartItemId, CategoryId, ProductId, UserId};

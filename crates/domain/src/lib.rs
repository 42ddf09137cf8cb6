//! Domain layer for the storefront backend.
//!
//! This crate provides the core domain model including:
//! - `Cart` aggregate owning its `CartItem` lines, with soft-delete lifecycle
//!   and total recomputation
//! - `Product` entity with category comparison and field validation
//! - `Money` and `PurchaseStatus` value types
//!
//! Nothing here performs I/O; repositories load and save these types.

pub mod cart;
pub mod error;
pub mod money;
pub mod product;
pub mod status;
pub mod validation;

pub use cart::{Cart, CartItem, CartItemSnapshot, CartSnapshot};
pub use error::DomainError;
pub use money::Money;
pub use product::{Category, Product, ProductSnapshot, Rating};
pub use status::{PurchaseStatus, UnknownPurchaseStatus};
pub use validation::{ValidationErrorDetail, ValidationResultDetail};

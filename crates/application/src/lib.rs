//! Application services for the storefront backend.
//!
//! Each service follows the same cycle: load an aggregate through a
//! repository, call its synchronous mutation methods, save it back.

pub mod cart_service;
pub mod category_service;
pub mod error;
pub mod product_service;

pub use cart_service::{CartService, Line};
pub use category_service::CategoryService;
pub use error::{ApplicationError, Result};
pub use product_service::{ProductInput, ProductService};

use store::{CartRepository, CategoryRepository, ProductRepository};

/// A backend that implements every repository.
pub trait Storefront:
    CartRepository + ProductRepository + CategoryRepository + Clone + 'static
{
}

impl<T> Storefront for T where
    T: CartRepository + ProductRepository + CategoryRepository + Clone + 'static
{
}

//! Product entity, its category and rating.

mod category;
mod entity;

pub use category::{Category, Rating};
pub use entity::{Product, ProductSnapshot};

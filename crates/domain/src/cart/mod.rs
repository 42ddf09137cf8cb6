//! Cart aggregate and its line items.

mod aggregate;
mod item;

pub use aggregate::{Cart, CartSnapshot};
pub use item::{CartItem, CartItemSnapshot};

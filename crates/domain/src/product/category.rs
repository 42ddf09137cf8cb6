use common::CategoryId;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A product category, referenced by name from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

impl Category {
    /// Creates a category with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CategoryId::new(),
            name: name.into(),
        }
    }
}

/// Customer rating of a product: average score and number of votes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Validate)]
pub struct Rating {
    #[validate(range(min = 0.0, max = 5.0, message = "rate must be between 0 and 5"))]
    pub rate: f64,
    pub count: u32,
}

impl Rating {
    pub fn new(rate: f64, count: u32) -> Self {
        Self { rate, count }
    }
}

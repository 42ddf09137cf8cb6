//! Product entity.

use chrono::{DateTime, Utc};
use common::{CategoryId, ProductId};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::{Money, ValidationResultDetail};

use super::{Category, Rating};

/// A catalog product.
///
/// Field rules are declared on the struct and checked by
/// [`Product::validate`], which reports instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Product {
    id: ProductId,

    #[validate(length(min = 1, max = 100, message = "title must have 1 to 100 characters"))]
    title: String,

    #[validate(custom(function = "non_negative_price"))]
    price: Money,

    #[validate(length(
        min = 1,
        max = 500,
        message = "description must have 1 to 500 characters"
    ))]
    description: String,

    #[validate(url(message = "image must be a valid URL"))]
    image: String,

    #[validate(nested)]
    rating: Rating,

    category: Option<Category>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

/// Stored state of a product, used to rebuild it after loading.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub title: String,
    pub price: Money,
    pub description: String,
    pub image: String,
    pub rating: Rating,
    pub category: Option<Category>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

fn non_negative_price(price: &Money) -> Result<(), ValidationError> {
    if price.is_negative() {
        return Err(ValidationError::new("price").with_message("price must not be negative".into()));
    }
    Ok(())
}

impl Product {
    /// Creates a product with a fresh id. No rule is checked here.
    pub fn new(
        title: impl Into<String>,
        price: Money,
        description: impl Into<String>,
        image: impl Into<String>,
        rating: Rating,
        category: Option<Category>,
    ) -> Self {
        Self {
            id: ProductId::new(),
            title: title.into(),
            price,
            description: description.into(),
            image: image.into(),
            rating,
            category,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Rebuilds a product from stored state.
    pub fn restore(snapshot: ProductSnapshot) -> Self {
        Self {
            id: snapshot.id,
            title: snapshot.title,
            price: snapshot.price,
            description: snapshot.description,
            image: snapshot.image,
            rating: snapshot.rating,
            category: snapshot.category,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
        }
    }

    /// Captures the stored state of the product.
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.id,
            title: self.title.clone(),
            price: self.price,
            description: self.description.clone(),
            image: self.image.clone(),
            rating: self.rating,
            category: self.category.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn rating(&self) -> Rating {
        self.rating
    }

    pub fn category(&self) -> Option<&Category> {
        self.category.as_ref()
    }

    pub fn category_id(&self) -> Option<CategoryId> {
        self.category.as_ref().map(|c| c.id)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Replaces every mutable attribute and stamps `updated_at`.
    pub fn change(
        &mut self,
        title: impl Into<String>,
        price: Money,
        description: impl Into<String>,
        image: impl Into<String>,
        rating: Rating,
        category: Option<Category>,
    ) {
        self.title = title.into();
        self.price = price;
        self.description = description.into();
        self.image = image.into();
        self.rating = rating;
        self.category = category;
        self.updated_at = Some(Utc::now());
    }

    /// Returns true if the product's category is named exactly `name`.
    ///
    /// The comparison is case-sensitive; a product without a category never
    /// matches.
    pub fn same_category_name(&self, name: &str) -> bool {
        self.category.as_ref().is_some_and(|c| c.name == name)
    }

    /// Checks the field rules and reports every failure.
    pub fn validate(&self) -> ValidationResultDetail {
        Validate::validate(self).into()
    }
}

impl Default for Product {
    fn default() -> Self {
        Self::new("", Money::zero(), "", "", Rating::default(), None)
    }
}

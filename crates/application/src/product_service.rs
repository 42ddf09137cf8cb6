//! Product catalog use cases.

use common::{PaginationQuery, PaginationQueryResult, ProductId};
use domain::{Category, Money, Product, Rating};
use store::{CategoryRepository, ProductRepository};

use crate::{ApplicationError, Result};

/// Attributes of a product as supplied by a caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductInput {
    pub title: String,
    pub price: Money,
    pub description: String,
    pub image: String,
    pub rating: Rating,
    /// Category name; the category is created on first use.
    pub category: Option<String>,
}

/// Service for managing catalog products.
#[derive(Clone)]
pub struct ProductService<S> {
    store: S,
}

impl<S: ProductRepository + CategoryRepository> ProductService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Finds the category named exactly `name` (ignoring case) or prepares a
    /// new one. The returned flag is true when the category still has to be
    /// stored.
    async fn resolve_category(&self, name: Option<&str>) -> Result<Option<(Category, bool)>> {
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return Ok(None);
        };

        match self.store.find_category_by_exact_name(name).await? {
            Some(existing) => Ok(Some((existing, false))),
            None => Ok(Some((Category::new(name), true))),
        }
    }

    /// Stores the category when it is new and returns it, so it can be
    /// discarded if the product write fails.
    async fn store_new_category<'a>(
        &self,
        resolved: &'a Option<(Category, bool)>,
    ) -> Result<Option<&'a Category>> {
        match resolved {
            Some((category, true)) => {
                self.store.create_category(category).await?;
                Ok(Some(category))
            }
            _ => Ok(None),
        }
    }

    /// Keeps a freshly stored category only once its product is written.
    async fn settle_category(
        &self,
        created: Option<&Category>,
        written: store::Result<()>,
    ) -> Result<()> {
        match (written, created) {
            (Ok(()), Some(category)) => {
                tracing::info!(category = %category.name, "category created");
                Ok(())
            }
            (Ok(()), None) => Ok(()),
            (Err(err), Some(category)) => {
                if let Err(cleanup) = self.store.delete_category(category.id).await {
                    tracing::warn!(
                        category = %category.name,
                        error = %cleanup,
                        "failed to discard category"
                    );
                }
                Err(err.into())
            }
            (Err(err), None) => Err(err.into()),
        }
    }

    async fn ensure_title_free(&self, title: &str, owner: Option<ProductId>) -> Result<()> {
        match self.store.get_product_by_title(title).await? {
            Some(existing) if Some(existing.id()) != owner => Err(ApplicationError::Conflict(
                format!("product already exists: {title}"),
            )),
            _ => Ok(()),
        }
    }

    /// Validates and stores a new product.
    #[tracing::instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_product(&self, input: ProductInput) -> Result<Product> {
        let resolved = self.resolve_category(input.category.as_deref()).await?;
        let product = Product::new(
            input.title,
            input.price,
            input.description,
            input.image,
            input.rating,
            resolved.as_ref().map(|(c, _)| c.clone()),
        );

        let report = product.validate();
        if !report.is_valid {
            return Err(ApplicationError::Validation(report.errors));
        }
        self.ensure_title_free(product.title(), None).await?;

        let created = self.store_new_category(&resolved).await?;
        let written = self.store.create_product(&product).await;
        self.settle_category(created, written).await?;

        metrics::counter!("products_created_total").increment(1);
        tracing::info!(product_id = %product.id(), "product created");
        Ok(product)
    }

    /// Replaces every attribute of an existing product.
    #[tracing::instrument(skip(self, input))]
    pub async fn update_product(&self, id: ProductId, input: ProductInput) -> Result<Product> {
        let mut product = self.get_product(id).await?;
        let resolved = self.resolve_category(input.category.as_deref()).await?;

        product.change(
            input.title,
            input.price,
            input.description,
            input.image,
            input.rating,
            resolved.as_ref().map(|(c, _)| c.clone()),
        );

        let report = product.validate();
        if !report.is_valid {
            return Err(ApplicationError::Validation(report.errors));
        }
        self.ensure_title_free(product.title(), Some(id)).await?;

        let created = self.store_new_category(&resolved).await?;
        let written = self.store.save_product(&product).await;
        self.settle_category(created, written).await?;
        Ok(product)
    }

    /// Removes a product that no cart references.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<()> {
        self.store.delete_product(id).await?;
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.store
            .get_product_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("product", id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_products(
        &self,
        query: &PaginationQuery,
    ) -> Result<PaginationQueryResult<Product>> {
        Ok(self.store.paginate_products(query).await?)
    }

    /// Pages through the products of one category, matched ignoring case.
    #[tracing::instrument(skip(self))]
    pub async fn list_products_by_category(
        &self,
        category_name: &str,
        query: &PaginationQuery,
    ) -> Result<PaginationQueryResult<Product>> {
        Ok(self
            .store
            .list_products_by_category_name(category_name, query)
            .await?)
    }
}

//! Cart use cases.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{CartId, CartItemId, PaginationQuery, PaginationQueryResult, ProductId, UserId};
use domain::{Cart, CartItem, DomainError};
use store::{CartRepository, ProductRepository};

use crate::{ApplicationError, Result};

/// A requested cart line: which product and how many.
///
/// The unit price is taken from the product when the line becomes an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl Line {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Service for managing carts.
#[derive(Clone)]
pub struct CartService<S> {
    store: S,
}

impl<S: CartRepository + ProductRepository> CartService<S> {
    /// Creates a new cart service over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Turns lines into items priced from the catalog.
    async fn price_lines(&self, lines: &[Line]) -> Result<Vec<CartItem>> {
        let ids: Vec<ProductId> = lines.iter().map(|l| l.product_id).collect();
        let prices: HashMap<ProductId, _> = self
            .store
            .list_products_by_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id(), p.price()))
            .collect();

        lines
            .iter()
            .map(|line| -> Result<CartItem> {
                let price = prices
                    .get(&line.product_id)
                    .ok_or_else(|| ApplicationError::not_found("product", line.product_id))?;
                Ok(CartItem::new(line.product_id, line.quantity, *price)?)
            })
            .collect()
    }

    /// Creates a cart for `bought_by` with one item per line.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn create_cart(
        &self,
        bought_by: Option<UserId>,
        store_name: &str,
        lines: &[Line],
    ) -> Result<Cart> {
        let bought_by = bought_by.ok_or_else(|| DomainError::required("bought_by"))?;
        let items = self.price_lines(lines).await?;

        let mut cart = Cart::new(bought_by, store_name);
        cart.add_items(items);
        self.store.create_cart(&cart).await?;

        metrics::counter!("carts_created_total").increment(1);
        tracing::info!(cart_id = %cart.id(), total = %cart.total_sale_amount(), "cart created");
        Ok(cart)
    }

    /// Returns a non-deleted cart with its non-deleted items.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, id: CartId) -> Result<Cart> {
        self.store
            .get_cart_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("cart", id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_carts(&self, query: &PaginationQuery) -> Result<PaginationQueryResult<Cart>> {
        Ok(self.store.paginate_carts(query).await?)
    }

    /// Appends priced lines to an existing cart.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn add_items(&self, id: CartId, lines: &[Line]) -> Result<Cart> {
        let mut cart = self.get_cart(id).await?;
        let items = self.price_lines(lines).await?;

        cart.add_items(items);
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Changes buyer, sale date and store of a cart.
    #[tracing::instrument(skip(self))]
    pub async fn change_cart(
        &self,
        id: CartId,
        bought_by: Option<UserId>,
        sold_at: DateTime<Utc>,
        store_name: &str,
    ) -> Result<Cart> {
        let mut cart = self.get_cart(id).await?;
        cart.change(bought_by, sold_at, store_name)?;
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Cancels every live item of a cart.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_cart(&self, id: CartId, actor: Option<UserId>) -> Result<Cart> {
        let actor = actor.ok_or_else(|| DomainError::required("actor"))?;
        let mut cart = self.get_cart(id).await?;

        let cancelled = cart.cancel(actor);
        self.store.save_cart(&cart).await?;

        metrics::counter!("carts_cancelled_total").increment(1);
        tracing::info!(cart_id = %id, cancelled, "cart cancelled");
        Ok(cart)
    }

    /// Soft-deletes a cart. It is hidden from every read afterwards.
    #[tracing::instrument(skip(self))]
    pub async fn delete_cart(&self, id: CartId, actor: Option<UserId>) -> Result<()> {
        let mut cart = self.get_cart(id).await?;
        cart.delete(actor)?;
        self.store.save_cart(&cart).await?;

        metrics::counter!("carts_deleted_total").increment(1);
        tracing::info!(cart_id = %id, "cart deleted");
        Ok(())
    }

    /// Soft-deletes the named items and returns the cart as read back.
    #[tracing::instrument(skip(self, item_ids), fields(requested = item_ids.len()))]
    pub async fn delete_items(
        &self,
        id: CartId,
        actor: Option<UserId>,
        item_ids: &[CartItemId],
    ) -> Result<Cart> {
        let actor = actor.ok_or_else(|| DomainError::required("actor"))?;
        let mut cart = self
            .store
            .get_cart_by_id_active_items(id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("cart", id))?;

        let deleted = cart.delete_items(actor, item_ids);
        self.store.save_cart(&cart).await?;

        metrics::counter!("cart_items_deleted_total").increment(deleted as u64);
        tracing::info!(cart_id = %id, deleted, "cart items deleted");
        self.get_cart(id).await
    }
}

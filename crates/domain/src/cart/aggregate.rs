//! Cart aggregate implementation.

use chrono::{DateTime, Utc};
use common::{CartId, CartItemId, UserId};
use serde::{Deserialize, Serialize};

use crate::{DomainError, Money, PurchaseStatus};

use super::{CartItem, CartItemSnapshot};

/// Cart aggregate root.
///
/// Owns its items exclusively and keeps them in insertion order. Items are
/// never removed from the collection: deleting or cancelling only changes
/// their status. `total_sale_amount` always equals the sum of
/// `unit_price * quantity` over the items whose status is `Created`,
/// saturating at the largest `Money` amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    id: CartId,
    bought_by: UserId,
    store_name: String,
    sold_at: DateTime<Utc>,
    purchase_status: PurchaseStatus,
    items: Vec<CartItem>,
    total_sale_amount: Money,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancelled_by: Option<UserId>,
    deleted_at: Option<DateTime<Utc>>,
    deleted_by: Option<UserId>,
}

/// Stored state of a cart, used to rebuild it after loading.
///
/// The total is not part of the snapshot; it is derived from `items`.
#[derive(Debug, Clone)]
pub struct CartSnapshot {
    pub id: CartId,
    pub bought_by: UserId,
    pub store_name: String,
    pub sold_at: DateTime<Utc>,
    pub purchase_status: PurchaseStatus,
    pub items: Vec<CartItemSnapshot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<UserId>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<UserId>,
}

impl Cart {
    /// Creates an empty cart for `bought_by`.
    pub fn new(bought_by: UserId, store_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: CartId::new(),
            bought_by,
            store_name: store_name.into(),
            sold_at: now,
            purchase_status: PurchaseStatus::Created,
            items: Vec::new(),
            total_sale_amount: Money::zero(),
            created_at: now,
            updated_at: None,
            cancelled_at: None,
            cancelled_by: None,
            deleted_at: None,
            deleted_by: None,
        }
    }

    /// Rebuilds a cart from stored state and recomputes its total.
    pub fn restore(snapshot: CartSnapshot) -> Self {
        let mut cart = Self {
            id: snapshot.id,
            bought_by: snapshot.bought_by,
            store_name: snapshot.store_name,
            sold_at: snapshot.sold_at,
            purchase_status: snapshot.purchase_status,
            items: snapshot.items.into_iter().map(CartItem::restore).collect(),
            total_sale_amount: Money::zero(),
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
            cancelled_at: snapshot.cancelled_at,
            cancelled_by: snapshot.cancelled_by,
            deleted_at: snapshot.deleted_at,
            deleted_by: snapshot.deleted_by,
        };
        cart.refresh_total_amount();
        cart
    }

    /// Captures the stored state of the cart and its loaded items.
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            id: self.id,
            bought_by: self.bought_by,
            store_name: self.store_name.clone(),
            sold_at: self.sold_at,
            purchase_status: self.purchase_status,
            items: self.items.iter().filter_map(CartItem::snapshot).collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            cancelled_at: self.cancelled_at,
            cancelled_by: self.cancelled_by,
            deleted_at: self.deleted_at,
            deleted_by: self.deleted_by,
        }
    }
}

// Query methods
impl Cart {
    pub fn id(&self) -> CartId {
        self.id
    }

    pub fn bought_by(&self) -> UserId {
        self.bought_by
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    pub fn sold_at(&self) -> DateTime<Utc> {
        self.sold_at
    }

    pub fn purchase_status(&self) -> PurchaseStatus {
        self.purchase_status
    }

    /// Returns the total of all `Created` items.
    pub fn total_sale_amount(&self) -> Money {
        self.total_sale_amount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn cancelled_by(&self) -> Option<UserId> {
        self.cancelled_by
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn deleted_by(&self) -> Option<UserId> {
        self.deleted_by
    }

    /// Returns every item in insertion order, whatever its status.
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Returns an item by id.
    pub fn item(&self, item_id: CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id() == item_id)
    }

    /// Returns the items that still count toward the total.
    pub fn active_items(&self) -> impl Iterator<Item = &CartItem> {
        self.items.iter().filter(|item| item.is_active())
    }

    /// Returns the number of items, including cancelled and deleted ones.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_deleted(&self) -> bool {
        self.purchase_status == PurchaseStatus::Deleted
    }
}

// Mutation methods
impl Cart {
    /// Appends items to the cart and recomputes the total.
    ///
    /// Every item becomes a new line; repeated products are not merged.
    pub fn add_items(&mut self, items: impl IntoIterator<Item = CartItem>) {
        for mut item in items {
            item.attach_to(self.id);
            self.items.push(item);
        }
        self.refresh_total_amount();
    }

    /// Recomputes the total from the `Created` items in the collection.
    pub fn refresh_total_amount(&mut self) {
        self.total_sale_amount = self.active_items().map(CartItem::line_total).sum();
    }

    /// Changes the buyer, sale date and store.
    ///
    /// Fails with `InvalidArgument` when `bought_by` is unset.
    pub fn change(
        &mut self,
        bought_by: Option<UserId>,
        sold_at: DateTime<Utc>,
        store_name: impl Into<String>,
    ) -> Result<(), DomainError> {
        let bought_by = bought_by.ok_or_else(|| DomainError::required("bought_by"))?;

        self.store_name = store_name.into();
        self.sold_at = sold_at;
        self.bought_by = bought_by;
        self.updated_at = Some(Utc::now());
        Ok(())
    }

    /// Cancels every `Created` item on behalf of `actor`.
    ///
    /// The cart's own status is left as is. Returns the number of items that
    /// were cancelled.
    pub fn cancel(&mut self, actor: UserId) -> usize {
        let now = Utc::now();
        let cancelled = self
            .items
            .iter_mut()
            .map(|item| item.cancel(actor, now))
            .filter(|&cancelled| cancelled)
            .count();
        self.refresh_total_amount();
        cancelled
    }

    /// Soft-deletes the cart on behalf of `actor`.
    ///
    /// Items still `Created` are deleted with it. Fails with
    /// `InvalidArgument` when `actor` is unset.
    pub fn delete(&mut self, actor: Option<UserId>) -> Result<(), DomainError> {
        let actor = actor.ok_or_else(|| DomainError::required("actor"))?;
        let now = Utc::now();

        self.purchase_status = PurchaseStatus::Deleted;
        self.cancelled_at = Some(now);
        self.cancelled_by = Some(actor);
        self.deleted_at = Some(now);
        self.deleted_by = Some(actor);
        self.updated_at = Some(now);

        for item in &mut self.items {
            item.delete(actor, now);
        }
        self.refresh_total_amount();
        Ok(())
    }

    /// Soft-deletes the named items and recomputes the total.
    ///
    /// Ids that are not in the cart are ignored, as are items already
    /// cancelled or deleted. Returns the number of items deleted.
    pub fn delete_items(&mut self, actor: UserId, item_ids: &[CartItemId]) -> usize {
        let now = Utc::now();
        let deleted = self
            .items
            .iter_mut()
            .filter(|item| item_ids.contains(&item.id()))
            .map(|item| item.delete(actor, now))
            .filter(|&deleted| deleted)
            .count();
        self.refresh_total_amount();
        deleted
    }
}

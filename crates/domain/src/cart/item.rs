//! Cart line items.

use chrono::{DateTime, Utc};
use common::{CartId, CartItemId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::{DomainError, Money, PurchaseStatus};

/// A single line of a cart: one product at a fixed unit price.
///
/// Items are owned by exactly one [`Cart`](super::Cart). Their status only
/// moves forward from `Created`, so a cancelled or deleted line stays in the
/// cart's collection but no longer counts toward its total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    id: CartItemId,
    cart_id: Option<CartId>,
    product_id: ProductId,
    quantity: u32,
    unit_price: Money,
    purchase_status: PurchaseStatus,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancelled_by: Option<UserId>,
    deleted_at: Option<DateTime<Utc>>,
    deleted_by: Option<UserId>,
}

/// Stored state of a cart item, used to rebuild it after loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItemSnapshot {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub purchase_status: PurchaseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<UserId>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<UserId>,
}

impl CartItem {
    /// Creates a new line for `product_id`.
    ///
    /// Fails when `quantity` is zero, `unit_price` is negative, or the line
    /// total does not fit in `Money`.
    pub fn new(
        product_id: ProductId,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidArgument {
                argument: "quantity",
                reason: "must be greater than 0",
            });
        }
        if unit_price.is_negative() {
            return Err(DomainError::InvalidArgument {
                argument: "unit_price",
                reason: "must not be negative",
            });
        }
        if unit_price.checked_multiply(quantity).is_none() {
            return Err(DomainError::InvalidArgument {
                argument: "quantity",
                reason: "line total is out of range",
            });
        }

        Ok(Self {
            id: CartItemId::new(),
            cart_id: None,
            product_id,
            quantity,
            unit_price,
            purchase_status: PurchaseStatus::Created,
            created_at: Utc::now(),
            updated_at: None,
            cancelled_at: None,
            cancelled_by: None,
            deleted_at: None,
            deleted_by: None,
        })
    }

    /// Rebuilds an item from stored state.
    pub fn restore(snapshot: CartItemSnapshot) -> Self {
        Self {
            id: snapshot.id,
            cart_id: Some(snapshot.cart_id),
            product_id: snapshot.product_id,
            quantity: snapshot.quantity,
            unit_price: snapshot.unit_price,
            purchase_status: snapshot.purchase_status,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
            cancelled_at: snapshot.cancelled_at,
            cancelled_by: snapshot.cancelled_by,
            deleted_at: snapshot.deleted_at,
            deleted_by: snapshot.deleted_by,
        }
    }

    /// Captures the stored state of the item.
    ///
    /// Returns `None` for an item that has not been added to a cart yet.
    pub fn snapshot(&self) -> Option<CartItemSnapshot> {
        Some(CartItemSnapshot {
            id: self.id,
            cart_id: self.cart_id?,
            product_id: self.product_id,
            quantity: self.quantity,
            unit_price: self.unit_price,
            purchase_status: self.purchase_status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            cancelled_at: self.cancelled_at,
            cancelled_by: self.cancelled_by,
            deleted_at: self.deleted_at,
            deleted_by: self.deleted_by,
        })
    }

    pub fn id(&self) -> CartItemId {
        self.id
    }

    /// Returns the owning cart, once the item has been added to one.
    pub fn cart_id(&self) -> Option<CartId> {
        self.cart_id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn purchase_status(&self) -> PurchaseStatus {
        self.purchase_status
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

    /// Returns unit price times quantity.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }

    /// Returns true if the item still counts toward the cart total.
    pub fn is_active(&self) -> bool {
        self.purchase_status.is_active()
    }

    pub(crate) fn attach_to(&mut self, cart_id: CartId) {
        self.cart_id = Some(cart_id);
    }

    /// Moves a `Created` item to `Cancelled`. Returns false if the item was
    /// already in a terminal state.
    pub(crate) fn cancel(&mut self, actor: UserId, at: DateTime<Utc>) -> bool {
        if !self.is_active() {
            return false;
        }
        self.purchase_status = PurchaseStatus::Cancelled;
        self.cancelled_by = Some(actor);
        self.cancelled_at = Some(at);
        self.updated_at = Some(at);
        true
    }

    /// Moves a `Created` item to `Deleted`. Returns false if the item was
    /// already in a terminal state.
    pub(crate) fn delete(&mut self, actor: UserId, at: DateTime<Utc>) -> bool {
        if !self.is_active() {
            return false;
        }
        self.purchase_status = PurchaseStatus::Deleted;
        self.deleted_by = Some(actor);
        self.deleted_at = Some(at);
        self.updated_at = Some(at);
        true
    }
}

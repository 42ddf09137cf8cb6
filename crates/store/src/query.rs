//! Sort key resolution shared by the repository backends.
//!
//! Callers pass free-form keys such as `storeName`, `store_name` or
//! `items.unitPrice`. Keys are matched ignoring case and underscores; keys
//! that match nothing are dropped so user input never reaches SQL.

use std::cmp::Ordering;

use common::{PaginationQuery, SortDirection};
use domain::{Cart, CartItemSnapshot, Product};

/// Prefix that routes a sort key to the items of each cart.
pub const ITEMS_PREFIX: &str = "items";

/// A sortable field of some record type.
pub trait SortKey: Copy + Sized {
    type Target;

    /// Matches a normalized key (lowercase, no underscores).
    fn parse(normalized: &str) -> Option<Self>;

    /// Column expression used in `ORDER BY`.
    fn column(self) -> &'static str;

    fn compare(self, a: &Self::Target, b: &Self::Target) -> Ordering;
}

fn normalize(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Resolves `(key, direction)` pairs, dropping unknown keys.
pub fn resolve<'a, K: SortKey>(
    orders: impl Iterator<Item = (&'a str, SortDirection)>,
) -> Vec<(K, SortDirection)> {
    orders
        .filter_map(|(key, direction)| K::parse(&normalize(key)).map(|k| (k, direction)))
        .collect()
}

/// Resolves the root-level keys of a query.
pub fn root_keys<K: SortKey>(query: &PaginationQuery) -> Vec<(K, SortDirection)> {
    resolve(query.root_orders().map(|o| (o.key.as_str(), o.direction)))
}

/// Resolves the `items.` keys of a query.
pub fn item_keys(query: &PaginationQuery) -> Vec<(ItemSortKey, SortDirection)> {
    resolve(query.child_orders(ITEMS_PREFIX))
}

/// Compares two records by every key in turn.
pub fn compare_by<K: SortKey>(
    keys: &[(K, SortDirection)],
    a: &K::Target,
    b: &K::Target,
) -> Ordering {
    keys.iter()
        .map(|(key, direction)| match direction {
            SortDirection::Asc => key.compare(a, b),
            SortDirection::Desc => key.compare(b, a),
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Builds an `ORDER BY` list from resolved keys followed by `tiebreak`.
///
/// NULLs sort before every value, the same as `None` in [`compare_by`].
pub fn order_by_sql<K: SortKey>(keys: &[(K, SortDirection)], tiebreak: &str) -> String {
    let mut parts: Vec<String> = keys
        .iter()
        .map(|(key, direction)| match direction {
            SortDirection::Asc => format!("{} ASC NULLS FIRST", key.column()),
            SortDirection::Desc => format!("{} DESC NULLS LAST", key.column()),
        })
        .collect();
    parts.push(tiebreak.to_string());
    parts.join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartSortKey {
    StoreName,
    SoldAt,
    TotalSaleAmount,
    BoughtBy,
    CreatedAt,
}

impl SortKey for CartSortKey {
    type Target = Cart;

    fn parse(normalized: &str) -> Option<Self> {
        match normalized {
            "storename" => Some(Self::StoreName),
            "soldat" => Some(Self::SoldAt),
            "totalsaleamount" => Some(Self::TotalSaleAmount),
            "boughtby" => Some(Self::BoughtBy),
            "createdat" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::StoreName => "store_name",
            Self::SoldAt => "sold_at",
            Self::TotalSaleAmount => "total_sale_amount_cents",
            Self::BoughtBy => "bought_by",
            Self::CreatedAt => "created_at",
        }
    }

    fn compare(self, a: &Cart, b: &Cart) -> Ordering {
        match self {
            Self::StoreName => a.store_name().cmp(b.store_name()),
            Self::SoldAt => a.sold_at().cmp(&b.sold_at()),
            Self::TotalSaleAmount => a.total_sale_amount().cmp(&b.total_sale_amount()),
            Self::BoughtBy => a.bought_by().cmp(&b.bought_by()),
            Self::CreatedAt => a.created_at().cmp(&b.created_at()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSortKey {
    Quantity,
    UnitPrice,
    CreatedAt,
}

impl SortKey for ItemSortKey {
    type Target = CartItemSnapshot;

    fn parse(normalized: &str) -> Option<Self> {
        match normalized {
            "quantity" => Some(Self::Quantity),
            "unitprice" => Some(Self::UnitPrice),
            "createdat" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Quantity => "quantity",
            Self::UnitPrice => "unit_price_cents",
            Self::CreatedAt => "created_at",
        }
    }

    fn compare(self, a: &CartItemSnapshot, b: &CartItemSnapshot) -> Ordering {
        match self {
            Self::Quantity => a.quantity.cmp(&b.quantity),
            Self::UnitPrice => a.unit_price.cmp(&b.unit_price),
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductSortKey {
    Title,
    Price,
    Rating,
    Category,
    CreatedAt,
}

impl SortKey for ProductSortKey {
    type Target = Product;

    fn parse(normalized: &str) -> Option<Self> {
        match normalized {
            "title" => Some(Self::Title),
            "price" => Some(Self::Price),
            "rating" | "ratingrate" => Some(Self::Rating),
            "category" | "categoryname" => Some(Self::Category),
            "createdat" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Title => "p.title",
            Self::Price => "p.price_cents",
            Self::Rating => "p.rating_rate",
            Self::Category => "c.name",
            Self::CreatedAt => "p.created_at",
        }
    }

    fn compare(self, a: &Product, b: &Product) -> Ordering {
        match self {
            Self::Title => a.title().cmp(b.title()),
            Self::Price => a.price().cmp(&b.price()),
            Self::Rating => a.rating().rate.total_cmp(&b.rating().rate),
            Self::Category => a
                .category()
                .map(|c| c.name.as_str())
                .cmp(&b.category().map(|c| c.name.as_str())),
            Self::CreatedAt => a.created_at().cmp(&b.created_at()),
        }
    }
}

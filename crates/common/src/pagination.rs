//! Page requests and page results shared by every repository.

use serde::{Deserialize, Serialize};

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Direction of a sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// A single `key direction` pair of an order clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    /// Field name, compared case-insensitively by the repositories.
    pub key: String,
    pub direction: SortDirection,
}

impl SortOrder {
    /// Creates an ascending sort key.
    pub fn asc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Asc,
        }
    }

    /// Creates a descending sort key.
    pub fn desc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Returns the key with `prefix.` stripped, if the key carries that prefix.
    ///
    /// Used to route `items.unitPrice`-style keys to a child collection.
    pub fn strip_prefix(&self, prefix: &str) -> Option<&str> {
        let (head, rest) = self.key.split_once('.')?;
        head.eq_ignore_ascii_case(prefix).then_some(rest)
    }
}

/// Builder for a page request.
///
/// Pages are 1-based. Sizes are clamped to `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationQuery {
    pub page: u32,
    pub size: u32,
    #[serde(default)]
    pub orders: Vec<SortOrder>,
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
            orders: Vec::new(),
        }
    }
}

impl PaginationQuery {
    /// Creates a query for the first page with the default size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page number (values below 1 become 1).
    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// Sets the page size, clamped to `1..=MAX_PAGE_SIZE`.
    pub fn size(mut self, size: u32) -> Self {
        self.size = size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Appends a sort key.
    pub fn order_by(mut self, order: SortOrder) -> Self {
        self.orders.push(order);
        self
    }

    /// Parses an order clause such as `"title desc, price"` and appends its keys.
    ///
    /// Direction defaults to ascending; blank segments are skipped.
    pub fn with_order(mut self, clause: &str) -> Self {
        for segment in clause.split(',') {
            let mut parts = segment.split_whitespace();
            let Some(key) = parts.next() else {
                continue;
            };
            let direction = match parts.next() {
                Some(dir) if dir.eq_ignore_ascii_case("desc") => SortDirection::Desc,
                _ => SortDirection::Asc,
            };
            self.orders.push(SortOrder {
                key: key.to_string(),
                direction,
            });
        }
        self
    }

    /// Number of rows to skip for this page.
    pub fn offset(&self) -> usize {
        (self.page.max(1) as usize - 1) * self.limit()
    }

    /// Number of rows in a full page.
    pub fn limit(&self) -> usize {
        self.size.clamp(1, MAX_PAGE_SIZE) as usize
    }

    /// Sort keys addressed to the child collection `prefix` (e.g. `items`).
    pub fn child_orders<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, SortDirection)> {
        self.orders
            .iter()
            .filter_map(move |o| o.strip_prefix(prefix).map(|key| (key, o.direction)))
    }

    /// Sort keys that address the root collection (no dotted prefix).
    pub fn root_orders(&self) -> impl Iterator<Item = &SortOrder> {
        self.orders.iter().filter(|o| !o.key.contains('.'))
    }
}

/// One page of results plus the totals needed to navigate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationQueryResult<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_count: u64,
}

impl<T> PaginationQueryResult<T> {
    /// Creates a page result for `query`.
    pub fn new(items: Vec<T>, query: &PaginationQuery, total_count: u64) -> Self {
        Self {
            items,
            page: query.page.max(1),
            size: query.limit() as u32,
            total_count,
        }
    }

    /// Total number of pages (0 when there are no rows).
    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total_count.div_ceil(u64::from(self.size))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Maps the items while keeping the paging totals.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginationQueryResult<U> {
        PaginationQueryResult {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_count: self.total_count,
        }
    }
}

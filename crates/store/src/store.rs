use async_trait::async_trait;
use common::{CartId, CategoryId, PaginationQuery, PaginationQueryResult, ProductId};
use domain::{Cart, Category, Product};

use crate::Result;

/// Which cart items to load along with a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemFilter {
    /// Every item whose status is not `Deleted`.
    NotDeleted,
    /// Only items whose status is `Created`.
    ActiveOnly,
}

/// Persistence for the cart aggregate.
///
/// Carts follow an explicit load, mutate, save cycle: `save_cart` writes the
/// cart row and every item that was loaded with it. Items that were filtered
/// out on load are left untouched.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Inserts a new cart with its items.
    async fn create_cart(&self, cart: &Cart) -> Result<()>;

    /// Writes back a cart and its loaded items (items are upserted by id).
    async fn save_cart(&self, cart: &Cart) -> Result<()>;

    /// Loads a cart that is not deleted, with the items matching `filter`.
    async fn find_cart(&self, id: CartId, filter: ItemFilter) -> Result<Option<Cart>>;

    /// Loads a non-deleted cart with every non-deleted item.
    async fn get_cart_by_id(&self, id: CartId) -> Result<Option<Cart>> {
        self.find_cart(id, ItemFilter::NotDeleted).await
    }

    /// Loads a non-deleted cart with only its `Created` items.
    async fn get_cart_by_id_active_items(&self, id: CartId) -> Result<Option<Cart>> {
        self.find_cart(id, ItemFilter::ActiveOnly).await
    }

    /// Pages through non-deleted carts, each with its non-deleted items.
    ///
    /// Sort keys prefixed with `items.` order the items inside each cart;
    /// other keys order the carts.
    async fn paginate_carts(&self, query: &PaginationQuery)
    -> Result<PaginationQueryResult<Cart>>;
}

/// Persistence for catalog products.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create_product(&self, product: &Product) -> Result<()>;

    /// Overwrites an existing product. Fails with `NotFound` if absent.
    async fn save_product(&self, product: &Product) -> Result<()>;

    /// Physically removes a product. Fails with `NotFound` if absent.
    async fn delete_product(&self, id: ProductId) -> Result<()>;

    /// Loads a product together with its category.
    async fn get_product_by_id(&self, id: ProductId) -> Result<Option<Product>>;

    /// Finds a product by exact title.
    async fn get_product_by_title(&self, title: &str) -> Result<Option<Product>>;

    /// Loads every product whose id is in `ids`; missing ids are skipped.
    async fn list_products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>>;

    async fn paginate_products(
        &self,
        query: &PaginationQuery,
    ) -> Result<PaginationQueryResult<Product>>;

    /// Pages through products whose category name equals `category_name`,
    /// ignoring case.
    async fn list_products_by_category_name(
        &self,
        category_name: &str,
        query: &PaginationQuery,
    ) -> Result<PaginationQueryResult<Product>>;
}

/// Persistence for product categories.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Inserts a category. Names are unique.
    async fn create_category(&self, category: &Category) -> Result<()>;

    /// Returns the first category (by name) whose name contains `name`,
    /// ignoring case.
    async fn get_category_by_name(&self, name: &str) -> Result<Option<Category>>;

    /// Returns the category whose whole name equals `name`, ignoring case.
    async fn find_category_by_exact_name(&self, name: &str) -> Result<Option<Category>>;

    /// Removes a category no product references. `NotFound` if absent,
    /// `Constraint` if still in use.
    async fn delete_category(&self, id: CategoryId) -> Result<()>;

    /// Returns the names of categories used by at least one product, sorted.
    async fn list_all_categories(&self) -> Result<Vec<String>>;
}

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{CartId, CategoryId, PaginationQuery, PaginationQueryResult, ProductId};
use domain::{Cart, CartSnapshot, Category, Product, ProductSnapshot, PurchaseStatus};
use tokio::sync::RwLock;

use crate::{
    CartRepository, CategoryRepository, ItemFilter, ProductRepository, Result, StoreError,
    query::{self, CartSortKey, ProductSortKey, SortKey},
};

/// In-memory implementation of every repository.
///
/// Behaves like the PostgreSQL store, including its reference checks, so
/// services can be tested without a database.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    carts: Arc<RwLock<HashMap<CartId, CartSnapshot>>>,
    products: Arc<RwLock<HashMap<ProductId, ProductSnapshot>>>,
    categories: Arc<RwLock<HashMap<CategoryId, Category>>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored carts, deleted ones included.
    pub async fn cart_count(&self) -> usize {
        self.carts.read().await.len()
    }

    /// Removes every record.
    pub async fn clear(&self) {
        self.carts.write().await.clear();
        self.products.write().await.clear();
        self.categories.write().await.clear();
    }

    async fn check_products_exist(&self, snapshot: &CartSnapshot) -> Result<()> {
        let products = self.products.read().await;
        match snapshot
            .items
            .iter()
            .find(|item| !products.contains_key(&item.product_id))
        {
            Some(item) => Err(StoreError::Constraint(format!(
                "cart item {} references unknown product {}",
                item.id, item.product_id
            ))),
            None => Ok(()),
        }
    }

    async fn check_category_exists(&self, product: &Product) -> Result<()> {
        let Some(category) = product.category() else {
            return Ok(());
        };
        if self.categories.read().await.contains_key(&category.id) {
            Ok(())
        } else {
            Err(StoreError::Constraint(format!(
                "product {} references unknown category {}",
                product.id(),
                category.id
            )))
        }
    }

    fn check_title_free(
        products: &HashMap<ProductId, ProductSnapshot>,
        product: &Product,
    ) -> Result<()> {
        let taken = products
            .values()
            .any(|p| p.id != product.id() && p.title == product.title());
        if taken {
            return Err(StoreError::Duplicate {
                entity: "product",
                key: product.title().to_string(),
            });
        }
        Ok(())
    }

    fn restore_cart(snapshot: &CartSnapshot, filter: ItemFilter) -> Cart {
        let mut snapshot = snapshot.clone();
        snapshot.items.retain(|item| match filter {
            ItemFilter::NotDeleted => item.purchase_status != PurchaseStatus::Deleted,
            ItemFilter::ActiveOnly => item.purchase_status.is_active(),
        });
        Cart::restore(snapshot)
    }

    fn page_of_products(
        mut products: Vec<Product>,
        query: &PaginationQuery,
    ) -> PaginationQueryResult<Product> {
        let keys = query::root_keys::<ProductSortKey>(query);
        products.sort_by(|a, b| {
            query::compare_by(&keys, a, b)
                .then_with(|| a.created_at().cmp(&b.created_at()))
                .then_with(|| a.id().cmp(&b.id()))
        });

        let total = products.len() as u64;
        let items = products
            .into_iter()
            .skip(query.offset())
            .take(query.limit())
            .collect();
        PaginationQueryResult::new(items, query, total)
    }
}

#[async_trait]
impl CartRepository for InMemoryStore {
    async fn create_cart(&self, cart: &Cart) -> Result<()> {
        let snapshot = cart.snapshot();
        self.check_products_exist(&snapshot).await?;

        let mut carts = self.carts.write().await;
        if carts.contains_key(&cart.id()) {
            return Err(StoreError::Duplicate {
                entity: "cart",
                key: cart.id().to_string(),
            });
        }
        carts.insert(cart.id(), snapshot);
        Ok(())
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        let mut snapshot = cart.snapshot();
        self.check_products_exist(&snapshot).await?;

        let mut carts = self.carts.write().await;
        let stored = carts.get_mut(&cart.id()).ok_or_else(|| StoreError::NotFound {
            entity: "cart",
            id: cart.id().to_string(),
        })?;

        let mut merged = std::mem::take(&mut stored.items);
        for item in std::mem::take(&mut snapshot.items) {
            match merged.iter_mut().find(|existing| existing.id == item.id) {
                Some(existing) => *existing = item,
                None => merged.push(item),
            }
        }

        snapshot.items = merged;
        *stored = snapshot;
        Ok(())
    }

    async fn find_cart(&self, id: CartId, filter: ItemFilter) -> Result<Option<Cart>> {
        let carts = self.carts.read().await;
        Ok(carts
            .get(&id)
            .filter(|snapshot| snapshot.purchase_status != PurchaseStatus::Deleted)
            .map(|snapshot| Self::restore_cart(snapshot, filter)))
    }

    async fn paginate_carts(
        &self,
        query: &PaginationQuery,
    ) -> Result<PaginationQueryResult<Cart>> {
        let cart_keys = query::root_keys::<CartSortKey>(query);
        let item_keys = query::item_keys(query);

        let carts = self.carts.read().await;
        let mut live: Vec<Cart> = carts
            .values()
            .filter(|snapshot| snapshot.purchase_status != PurchaseStatus::Deleted)
            .map(|snapshot| {
                let mut snapshot = snapshot.clone();
                snapshot
                    .items
                    .retain(|item| item.purchase_status != PurchaseStatus::Deleted);
                // Stable sort keeps insertion order among equal items.
                snapshot
                    .items
                    .sort_by(|a, b| query::compare_by(&item_keys, a, b));
                Cart::restore(snapshot)
            })
            .collect();

        live.sort_by(|a, b| {
            query::compare_by(&cart_keys, a, b)
                .then_with(|| CartSortKey::CreatedAt.compare(a, b))
                .then_with(|| a.id().cmp(&b.id()))
        });

        let total = live.len() as u64;
        let items = live
            .into_iter()
            .skip(query.offset())
            .take(query.limit())
            .collect();
        Ok(PaginationQueryResult::new(items, query, total))
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn create_product(&self, product: &Product) -> Result<()> {
        self.check_category_exists(product).await?;

        let mut products = self.products.write().await;
        Self::check_title_free(&products, product)?;
        if products.contains_key(&product.id()) {
            return Err(StoreError::Duplicate {
                entity: "product",
                key: product.id().to_string(),
            });
        }
        products.insert(product.id(), product.snapshot());
        Ok(())
    }

    async fn save_product(&self, product: &Product) -> Result<()> {
        self.check_category_exists(product).await?;

        let mut products = self.products.write().await;
        Self::check_title_free(&products, product)?;
        let stored = products
            .get_mut(&product.id())
            .ok_or_else(|| StoreError::NotFound {
                entity: "product",
                id: product.id().to_string(),
            })?;
        *stored = product.snapshot();
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let referenced = self
            .carts
            .read()
            .await
            .values()
            .flat_map(|cart| cart.items.iter())
            .any(|item| item.product_id == id);
        if referenced {
            return Err(StoreError::Constraint(format!(
                "product {id} is referenced by cart items"
            )));
        }

        match self.products.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                entity: "product",
                id: id.to_string(),
            }),
        }
    }

    async fn get_product_by_id(&self, id: ProductId) -> Result<Option<Product>> {
        let products = self.products.read().await;
        Ok(products.get(&id).cloned().map(Product::restore))
    }

    async fn get_product_by_title(&self, title: &str) -> Result<Option<Product>> {
        let products = self.products.read().await;
        Ok(products
            .values()
            .find(|p| p.title == title)
            .cloned()
            .map(Product::restore))
    }

    async fn list_products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let products = self.products.read().await;
        let mut found: Vec<Product> = ids
            .iter()
            .filter_map(|id| products.get(id))
            .cloned()
            .map(Product::restore)
            .collect();
        found.sort_by_key(|p| p.id());
        found.dedup_by_key(|p| p.id());
        Ok(found)
    }

    async fn paginate_products(
        &self,
        query: &PaginationQuery,
    ) -> Result<PaginationQueryResult<Product>> {
        let products: Vec<Product> = self
            .products
            .read()
            .await
            .values()
            .cloned()
            .map(Product::restore)
            .collect();
        Ok(Self::page_of_products(products, query))
    }

    async fn list_products_by_category_name(
        &self,
        category_name: &str,
        query: &PaginationQuery,
    ) -> Result<PaginationQueryResult<Product>> {
        let wanted = category_name.to_lowercase();
        let products: Vec<Product> = self
            .products
            .read()
            .await
            .values()
            .filter(|p| {
                p.category
                    .as_ref()
                    .is_some_and(|c| c.name.to_lowercase() == wanted)
            })
            .cloned()
            .map(Product::restore)
            .collect();
        Ok(Self::page_of_products(products, query))
    }
}

#[async_trait]
impl CategoryRepository for InMemoryStore {
    async fn create_category(&self, category: &Category) -> Result<()> {
        let mut categories = self.categories.write().await;
        if categories.values().any(|c| c.name == category.name) {
            return Err(StoreError::Duplicate {
                entity: "category",
                key: category.name.clone(),
            });
        }
        categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let needle = name.to_lowercase();
        let categories = self.categories.read().await;
        Ok(categories
            .values()
            .filter(|c| c.name.to_lowercase().contains(&needle))
            .min_by(|a, b| a.name.cmp(&b.name))
            .cloned())
    }

    async fn find_category_by_exact_name(&self, name: &str) -> Result<Option<Category>> {
        let needle = name.to_lowercase();
        let categories = self.categories.read().await;
        Ok(categories
            .values()
            .filter(|c| c.name.to_lowercase() == needle)
            .min_by(|a, b| a.name.cmp(&b.name))
            .cloned())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<()> {
        let products = self.products.read().await;
        if products
            .values()
            .any(|p| p.category.as_ref().is_some_and(|c| c.id == id))
        {
            return Err(StoreError::Constraint(format!(
                "category {id} is referenced by products"
            )));
        }

        match self.categories.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                entity: "category",
                id: id.to_string(),
            }),
        }
    }

    async fn list_all_categories(&self) -> Result<Vec<String>> {
        let products = self.products.read().await;
        let mut names: Vec<String> = products
            .values()
            .filter_map(|p| p.category.as_ref().map(|c| c.name.clone()))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CartItemId, SortOrder, UserId};
    use domain::{CartItem, Money, Rating};

    async fn seed_product(store: &InMemoryStore, title: &str, cents: i64, category: &str) -> Product {
        let category = match store.find_category_by_exact_name(category).await.unwrap() {
            Some(existing) => existing,
            None => {
                let created = Category::new(category);
                store.create_category(&created).await.unwrap();
                created
            }
        };
        let product = Product::new(
            title,
            Money::from_cents(cents),
            "description",
            "https://cdn.example.com/p.jpg",
            Rating::new(4.0, 10),
            Some(category),
        );
        store.create_product(&product).await.unwrap();
        product
    }

    fn cart_with(products: &[(&Product, u32)], store_name: &str) -> Cart {
        let mut cart = Cart::new(UserId::new(), store_name);
        cart.add_items(
            products
                .iter()
                .map(|(p, qty)| CartItem::new(p.id(), *qty, p.price()).unwrap()),
        );
        cart
    }

    #[tokio::test]
    async fn create_and_load_cart() {
        let store = InMemoryStore::new();
        let product = seed_product(&store, "Mug", 450, "kitchen").await;
        let cart = cart_with(&[(&product, 2)], "Downtown");

        store.create_cart(&cart).await.unwrap();

        let loaded = store.get_cart_by_id(cart.id()).await.unwrap().unwrap();
        assert_eq!(loaded.id(), cart.id());
        assert_eq!(loaded.item_count(), 1);
        assert_eq!(loaded.total_sale_amount(), Money::from_cents(900));
    }

    #[tokio::test]
    async fn create_cart_twice_is_duplicate() {
        let store = InMemoryStore::new();
        let cart = Cart::new(UserId::new(), "Downtown");
        store.create_cart(&cart).await.unwrap();

        let result = store.create_cart(&cart).await;
        assert!(matches!(result, Err(StoreError::Duplicate { entity: "cart", .. })));
    }

    #[tokio::test]
    async fn cart_with_unknown_product_is_rejected() {
        let store = InMemoryStore::new();
        let mut cart = Cart::new(UserId::new(), "Downtown");
        cart.add_items([CartItem::new(ProductId::new(), 1, Money::from_cents(1)).unwrap()]);

        let result = store.create_cart(&cart).await;
        assert!(matches!(result, Err(StoreError::Constraint(_))));
    }

    #[tokio::test]
    async fn deleted_cart_is_hidden() {
        let store = InMemoryStore::new();
        let mut cart = Cart::new(UserId::new(), "Downtown");
        store.create_cart(&cart).await.unwrap();

        cart.delete(Some(UserId::new())).unwrap();
        store.save_cart(&cart).await.unwrap();

        assert!(store.get_cart_by_id(cart.id()).await.unwrap().is_none());
        assert_eq!(store.cart_count().await, 1);
    }

    #[tokio::test]
    async fn save_keeps_items_that_were_not_loaded() {
        let store = InMemoryStore::new();
        let a = seed_product(&store, "A", 100, "misc").await;
        let b = seed_product(&store, "B", 200, "misc").await;
        let mut cart = cart_with(&[(&a, 1), (&b, 1)], "Downtown");
        store.create_cart(&cart).await.unwrap();

        let first = cart.items()[0].id();
        cart.delete_items(UserId::new(), &[first]);
        store.save_cart(&cart).await.unwrap();

        // Only the Created item comes back, and saving it must not drop the other.
        let mut active = store
            .get_cart_by_id_active_items(cart.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active.item_count(), 1);
        active
            .change(Some(UserId::new()), chrono::Utc::now(), "Uptown")
            .unwrap();
        store.save_cart(&active).await.unwrap();

        let stored = store.carts.read().await.get(&cart.id()).cloned().unwrap();
        assert_eq!(stored.items.len(), 2);
        assert_eq!(stored.store_name, "Uptown");
        assert_eq!(stored.items[0].purchase_status, PurchaseStatus::Deleted);
    }

    #[tokio::test]
    async fn item_filters() {
        let store = InMemoryStore::new();
        let a = seed_product(&store, "A", 100, "misc").await;
        let mut cart = cart_with(&[(&a, 1), (&a, 2), (&a, 3)], "Downtown");
        store.create_cart(&cart).await.unwrap();

        let ids: Vec<CartItemId> = cart.items().iter().map(|i| i.id()).collect();
        cart.delete_items(UserId::new(), &[ids[0]]);
        store.save_cart(&cart).await.unwrap();
        let mut loaded = store.get_cart_by_id(cart.id()).await.unwrap().unwrap();
        loaded.cancel(UserId::new());
        store.save_cart(&loaded).await.unwrap();

        let visible = store.get_cart_by_id(cart.id()).await.unwrap().unwrap();
        let active = store
            .get_cart_by_id_active_items(cart.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(visible.item_count(), 2);
        assert_eq!(active.item_count(), 0);
        assert!(visible.total_sale_amount().is_zero());
    }

    #[tokio::test]
    async fn save_unknown_cart_is_not_found() {
        let store = InMemoryStore::new();
        let cart = Cart::new(UserId::new(), "Downtown");
        let result = store.save_cart(&cart).await;
        assert!(matches!(result, Err(StoreError::NotFound { entity: "cart", .. })));
    }

    #[tokio::test]
    async fn paginate_carts_sorts_roots_and_items() {
        let store = InMemoryStore::new();
        let cheap = seed_product(&store, "Cheap", 100, "misc").await;
        let pricey = seed_product(&store, "Pricey", 900, "misc").await;

        for name in ["Charlie", "Alpha", "Bravo"] {
            let cart = cart_with(&[(&cheap, 1), (&pricey, 1)], name);
            store.create_cart(&cart).await.unwrap();
        }

        let query = PaginationQuery::new()
            .size(2)
            .with_order("store_name, items.unitPrice desc");
        let page = store.paginate_carts(&query).await.unwrap();

        assert_eq!(page.total_count, 3);
        assert_eq!(page.items.len(), 2);
        assert!(page.has_next());
        let names: Vec<_> = page.items.iter().map(|c| c.store_name()).collect();
        assert_eq!(names, vec!["Alpha", "Bravo"]);
        let prices: Vec<_> = page.items[0]
            .items()
            .iter()
            .map(|i| i.unit_price().cents())
            .collect();
        assert_eq!(prices, vec![900, 100]);

        let second = store
            .paginate_carts(&query.clone().page(2))
            .await
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].store_name(), "Charlie");
    }

    #[tokio::test]
    async fn paginate_products_by_price_desc() {
        let store = InMemoryStore::new();
        seed_product(&store, "Low", 100, "misc").await;
        seed_product(&store, "High", 900, "misc").await;
        seed_product(&store, "Mid", 500, "misc").await;

        let query = PaginationQuery::new().order_by(SortOrder::desc("price"));
        let page = store.paginate_products(&query).await.unwrap();

        let titles: Vec<_> = page.items.iter().map(|p| p.title()).collect();
        assert_eq!(titles, vec!["High", "Mid", "Low"]);
    }

    #[tokio::test]
    async fn duplicate_title_is_rejected() {
        let store = InMemoryStore::new();
        seed_product(&store, "Mug", 100, "kitchen").await;
        let other = Product::new(
            "Mug",
            Money::from_cents(1),
            "d",
            "https://x.io/m.jpg",
            Rating::default(),
            None,
        );

        let result = store.create_product(&other).await;
        assert!(matches!(result, Err(StoreError::Duplicate { entity: "product", .. })));
    }

    #[tokio::test]
    async fn referenced_product_cannot_be_deleted() {
        let store = InMemoryStore::new();
        let product = seed_product(&store, "Mug", 450, "kitchen").await;
        let cart = cart_with(&[(&product, 1)], "Downtown");
        store.create_cart(&cart).await.unwrap();

        let result = store.delete_product(product.id()).await;
        assert!(matches!(result, Err(StoreError::Constraint(_))));

        let missing = store.delete_product(ProductId::new()).await;
        assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn products_by_category_name_ignore_case() {
        let store = InMemoryStore::new();
        seed_product(&store, "Mug", 450, "Kitchen").await;
        seed_product(&store, "Pan", 2500, "Kitchen").await;
        seed_product(&store, "Lamp", 3000, "Lighting").await;

        let page = store
            .list_products_by_category_name("kitchen", &PaginationQuery::new().with_order("title"))
            .await
            .unwrap();

        let titles: Vec<_> = page.items.iter().map(|p| p.title()).collect();
        assert_eq!(titles, vec!["Mug", "Pan"]);
        assert_eq!(page.total_count, 2);
    }

    #[tokio::test]
    async fn category_lookup_and_listing() {
        let store = InMemoryStore::new();
        seed_product(&store, "Lamp", 3000, "Lighting").await;
        seed_product(&store, "Mug", 450, "Kitchen").await;
        store.create_category(&Category::new("Unused")).await.unwrap();

        let found = store.get_category_by_name("CHEN").await.unwrap().unwrap();
        assert_eq!(found.name, "Kitchen");
        assert!(store.get_category_by_name("garden").await.unwrap().is_none());

        let names = store.list_all_categories().await.unwrap();
        assert_eq!(names, vec!["Kitchen".to_string(), "Lighting".to_string()]);

        let dup = store.create_category(&Category::new("Kitchen")).await;
        assert!(matches!(dup, Err(StoreError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn exact_category_lookup_ignores_longer_names() {
        let store = InMemoryStore::new();
        store.create_category(&Category::new("kitchen")).await.unwrap();
        store.create_category(&Category::new("Acme kitchen")).await.unwrap();

        let contains = store.get_category_by_name("kitchen").await.unwrap().unwrap();
        assert_eq!(contains.name, "Acme kitchen");

        let exact = store.find_category_by_exact_name("KITCHEN").await.unwrap().unwrap();
        assert_eq!(exact.name, "kitchen");
        assert!(store.find_category_by_exact_name("kitch").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn category_in_use_cannot_be_deleted() {
        let store = InMemoryStore::new();
        let mug = seed_product(&store, "Mug", 450, "Kitchen").await;
        let unused = Category::new("Unused");
        store.create_category(&unused).await.unwrap();

        let in_use = mug.category_id().unwrap();
        let result = store.delete_category(in_use).await;
        assert!(matches!(result, Err(StoreError::Constraint(_))));

        store.delete_category(unused.id).await.unwrap();
        assert!(store.find_category_by_exact_name("Unused").await.unwrap().is_none());
        let missing = store.delete_category(unused.id).await;
        assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn concurrent_creates_with_same_title_keep_one() {
        let store = InMemoryStore::new();
        let product = || {
            Product::new(
                "Mug",
                Money::from_cents(100),
                "d",
                "https://x.io/m.jpg",
                Rating::default(),
                None,
            )
        };
        let (first, second) = (product(), product());

        let (a, b) = tokio::join!(store.create_product(&first), store.create_product(&second));

        assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
        let page = store.paginate_products(&PaginationQuery::new()).await.unwrap();
        assert_eq!(page.total_count, 1);
    }

    #[tokio::test]
    async fn list_products_by_ids_skips_missing() {
        let store = InMemoryStore::new();
        let mug = seed_product(&store, "Mug", 450, "Kitchen").await;

        let found = store
            .list_products_by_ids(&[mug.id(), ProductId::new(), mug.id()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title(), "Mug");
    }
}

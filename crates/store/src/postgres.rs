use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    CartId, CartItemId, CategoryId, PaginationQuery, PaginationQueryResult, ProductId, UserId,
};
use domain::{
    Cart, CartItemSnapshot, CartSnapshot, Category, Money, Product, ProductSnapshot,
    PurchaseStatus, Rating,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    CartRepository, CategoryRepository, ItemFilter, ProductRepository, Result, StoreError,
    query::{self, CartSortKey, ProductSortKey},
};

const CART_COLUMNS: &str = "id, bought_by, store_name, sold_at, purchase_status, \
     created_at, updated_at, cancelled_at, cancelled_by, deleted_at, deleted_by";

const ITEM_COLUMNS: &str = "id, cart_id, product_id, quantity, unit_price_cents, purchase_status, \
     created_at, updated_at, cancelled_at, cancelled_by, deleted_at, deleted_by";

const PRODUCT_SELECT: &str = r#"
    SELECT p.id, p.title, p.price_cents, p.description, p.image, p.rating_rate,
           p.rating_count, p.created_at, p.updated_at,
           c.id AS category_id, c.name AS category_name
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
"#;

const CART_TIEBREAK: &str = "created_at ASC, id ASC";
const PRODUCT_TIEBREAK: &str = "p.created_at ASC, p.id ASC";

/// PostgreSQL-backed implementation of every repository.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn load_items(
        &self,
        cart_ids: &[Uuid],
        filter: ItemFilter,
        order_by: &str,
    ) -> Result<HashMap<Uuid, Vec<CartItemSnapshot>>> {
        let condition = match filter {
            ItemFilter::NotDeleted => "purchase_status <> $2",
            ItemFilter::ActiveOnly => "purchase_status = $2",
        };
        let status = match filter {
            ItemFilter::NotDeleted => PurchaseStatus::Deleted,
            ItemFilter::ActiveOnly => PurchaseStatus::Created,
        };

        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM cart_items \
             WHERE cart_id = ANY($1) AND {condition} \
             ORDER BY {order_by}"
        );
        let rows = sqlx::query(&sql)
            .bind(cart_ids)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;

        let mut by_cart: HashMap<Uuid, Vec<CartItemSnapshot>> = HashMap::new();
        for row in rows {
            let item = row_to_item(&row)?;
            by_cart
                .entry(item.cart_id.as_uuid())
                .or_default()
                .push(item);
        }
        Ok(by_cart)
    }

    async fn page_of_products(
        &self,
        category_name: Option<&str>,
        query: &PaginationQuery,
    ) -> Result<PaginationQueryResult<Product>> {
        let keys = query::root_keys::<ProductSortKey>(query);
        let order_by = query::order_by_sql(&keys, PRODUCT_TIEBREAK);
        let mut count_sql = String::from(
            "SELECT COUNT(*) FROM products p LEFT JOIN categories c ON c.id = p.category_id",
        );
        let mut page_sql = String::from(PRODUCT_SELECT);
        if category_name.is_some() {
            count_sql.push_str(" WHERE lower(c.name) = lower($1)");
            page_sql.push_str(" WHERE lower(c.name) = lower($3)");
        }
        page_sql.push_str(&format!(" ORDER BY {order_by} LIMIT $1 OFFSET $2"));

        let mut count = sqlx::query_scalar::<_, i64>(&count_sql);
        let mut page = sqlx::query(&page_sql)
            .bind(query.limit() as i64)
            .bind(query.offset() as i64);
        if let Some(name) = category_name {
            count = count.bind(name);
            page = page.bind(name);
        }

        let total = count.fetch_one(&self.pool).await?;
        let products = page
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(row_to_product)
            .collect::<Result<Vec<_>>>()?;

        Ok(PaginationQueryResult::new(products, query, total as u64))
    }
}

async fn upsert_items(tx: &mut Transaction<'_, Postgres>, cart: &CartSnapshot) -> Result<()> {
    for item in &cart.items {
        sqlx::query(
            r#"
            INSERT INTO cart_items (id, cart_id, product_id, quantity, unit_price_cents,
                purchase_status, created_at, updated_at, cancelled_at, cancelled_by,
                deleted_at, deleted_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO UPDATE SET
                quantity = EXCLUDED.quantity,
                unit_price_cents = EXCLUDED.unit_price_cents,
                purchase_status = EXCLUDED.purchase_status,
                updated_at = EXCLUDED.updated_at,
                cancelled_at = EXCLUDED.cancelled_at,
                cancelled_by = EXCLUDED.cancelled_by,
                deleted_at = EXCLUDED.deleted_at,
                deleted_by = EXCLUDED.deleted_by
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(item.cart_id.as_uuid())
        .bind(item.product_id.as_uuid())
        .bind(i32::try_from(item.quantity).map_err(|_| {
            StoreError::InvalidData(format!("quantity {} out of range", item.quantity))
        })?)
        .bind(item.unit_price.cents())
        .bind(item.purchase_status.as_str())
        .bind(item.created_at)
        .bind(item.updated_at)
        .bind(item.cancelled_at)
        .bind(item.cancelled_by.map(|u| u.as_uuid()))
        .bind(item.deleted_at)
        .bind(item.deleted_by.map(|u| u.as_uuid()))
        .execute(&mut **tx)
        .await
        .map_err(|e| classify(e, "cart item", item.id.to_string()))?;
    }
    Ok(())
}

/// Maps constraint violations to store errors; everything else stays a
/// database error.
fn classify(err: sqlx::Error, entity: &'static str, key: String) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return StoreError::Duplicate { entity, key };
        }
        if db_err.is_foreign_key_violation() {
            return StoreError::Constraint(format!("{entity} {key}: {}", db_err.message()));
        }
    }
    StoreError::Database(err)
}

fn status_column(row: &PgRow, column: &str) -> Result<PurchaseStatus> {
    let raw: String = row.try_get(column)?;
    raw.parse::<PurchaseStatus>()
        .map_err(|e| StoreError::InvalidData(e.to_string()))
}

fn user_column(row: &PgRow, column: &str) -> Result<Option<UserId>> {
    Ok(row
        .try_get::<Option<Uuid>, _>(column)?
        .map(UserId::from_uuid))
}

fn row_to_item(row: &PgRow) -> Result<CartItemSnapshot> {
    let quantity: i32 = row.try_get("quantity")?;
    Ok(CartItemSnapshot {
        id: CartItemId::from_uuid(row.try_get("id")?),
        cart_id: CartId::from_uuid(row.try_get("cart_id")?),
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        quantity: u32::try_from(quantity)
            .map_err(|_| StoreError::InvalidData(format!("negative quantity {quantity}")))?,
        unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        purchase_status: status_column(row, "purchase_status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        cancelled_at: row.try_get("cancelled_at")?,
        cancelled_by: user_column(row, "cancelled_by")?,
        deleted_at: row.try_get("deleted_at")?,
        deleted_by: user_column(row, "deleted_by")?,
    })
}

fn row_to_cart(row: &PgRow, items: Vec<CartItemSnapshot>) -> Result<Cart> {
    Ok(Cart::restore(CartSnapshot {
        id: CartId::from_uuid(row.try_get("id")?),
        bought_by: UserId::from_uuid(row.try_get("bought_by")?),
        store_name: row.try_get("store_name")?,
        sold_at: row.try_get::<DateTime<Utc>, _>("sold_at")?,
        purchase_status: status_column(row, "purchase_status")?,
        items,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        cancelled_at: row.try_get("cancelled_at")?,
        cancelled_by: user_column(row, "cancelled_by")?,
        deleted_at: row.try_get("deleted_at")?,
        deleted_by: user_column(row, "deleted_by")?,
    }))
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    let category = match row.try_get::<Option<Uuid>, _>("category_id")? {
        Some(id) => Some(Category {
            id: CategoryId::from_uuid(id),
            name: row.try_get("category_name")?,
        }),
        None => None,
    };
    let rating_count: i32 = row.try_get("rating_count")?;

    Ok(Product::restore(ProductSnapshot {
        id: ProductId::from_uuid(row.try_get("id")?),
        title: row.try_get("title")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        description: row.try_get("description")?,
        image: row.try_get("image")?,
        rating: Rating::new(
            row.try_get("rating_rate")?,
            u32::try_from(rating_count).map_err(|_| {
                StoreError::InvalidData(format!("negative rating count {rating_count}"))
            })?,
        ),
        category,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    }))
}

fn rating_count_column(product: &Product) -> Result<i32> {
    let count = product.rating().count;
    i32::try_from(count)
        .map_err(|_| StoreError::InvalidData(format!("rating count {count} out of range")))
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len() + 2);
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl CartRepository for PostgresStore {
    async fn create_cart(&self, cart: &Cart) -> Result<()> {
        let snapshot = cart.snapshot();
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "INSERT INTO carts ({CART_COLUMNS}, total_sale_amount_cents) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        ))
        .bind(snapshot.id.as_uuid())
        .bind(snapshot.bought_by.as_uuid())
        .bind(&snapshot.store_name)
        .bind(snapshot.sold_at)
        .bind(snapshot.purchase_status.as_str())
        .bind(snapshot.created_at)
        .bind(snapshot.updated_at)
        .bind(snapshot.cancelled_at)
        .bind(snapshot.cancelled_by.map(|u| u.as_uuid()))
        .bind(snapshot.deleted_at)
        .bind(snapshot.deleted_by.map(|u| u.as_uuid()))
        .bind(cart.total_sale_amount().cents())
        .execute(&mut *tx)
        .await
        .map_err(|e| classify(e, "cart", snapshot.id.to_string()))?;

        upsert_items(&mut tx, &snapshot).await?;
        tx.commit().await?;

        tracing::debug!(cart_id = %cart.id(), items = snapshot.items.len(), "cart inserted");
        Ok(())
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        let snapshot = cart.snapshot();
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE carts SET
                bought_by = $2,
                store_name = $3,
                sold_at = $4,
                purchase_status = $5,
                total_sale_amount_cents = $6,
                updated_at = $7,
                cancelled_at = $8,
                cancelled_by = $9,
                deleted_at = $10,
                deleted_by = $11
            WHERE id = $1
            "#,
        )
        .bind(snapshot.id.as_uuid())
        .bind(snapshot.bought_by.as_uuid())
        .bind(&snapshot.store_name)
        .bind(snapshot.sold_at)
        .bind(snapshot.purchase_status.as_str())
        .bind(cart.total_sale_amount().cents())
        .bind(snapshot.updated_at)
        .bind(snapshot.cancelled_at)
        .bind(snapshot.cancelled_by.map(|u| u.as_uuid()))
        .bind(snapshot.deleted_at)
        .bind(snapshot.deleted_by.map(|u| u.as_uuid()))
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "cart",
                id: snapshot.id.to_string(),
            });
        }

        upsert_items(&mut tx, &snapshot).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_cart(&self, id: CartId, filter: ItemFilter) -> Result<Option<Cart>> {
        let row = sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE id = $1 AND purchase_status <> $2"
        ))
        .bind(id.as_uuid())
        .bind(PurchaseStatus::Deleted.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut items = self.load_items(&[id.as_uuid()], filter, "seq ASC").await?;
        let items = items.remove(&id.as_uuid()).unwrap_or_default();
        row_to_cart(&row, items).map(Some)
    }

    async fn paginate_carts(
        &self,
        query: &PaginationQuery,
    ) -> Result<PaginationQueryResult<Cart>> {
        let cart_keys = query::root_keys::<CartSortKey>(query);
        let item_keys = query::item_keys(query);
        let deleted = PurchaseStatus::Deleted.as_str();

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM carts WHERE purchase_status <> $1")
                .bind(deleted)
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE purchase_status <> $1 \
             ORDER BY {} LIMIT $2 OFFSET $3",
            query::order_by_sql(&cart_keys, CART_TIEBREAK)
        ))
        .bind(deleted)
        .bind(query.limit() as i64)
        .bind(query.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut items = self
            .load_items(
                &ids,
                ItemFilter::NotDeleted,
                &query::order_by_sql(&item_keys, "seq ASC"),
            )
            .await?;

        let carts = rows
            .iter()
            .zip(&ids)
            .map(|(row, id)| row_to_cart(row, items.remove(id).unwrap_or_default()))
            .collect::<Result<Vec<_>>>()?;

        Ok(PaginationQueryResult::new(carts, query, total as u64))
    }
}

#[async_trait]
impl ProductRepository for PostgresStore {
    async fn create_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, title, price_cents, description, image, rating_rate,
                rating_count, category_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(product.id().as_uuid())
        .bind(product.title())
        .bind(product.price().cents())
        .bind(product.description())
        .bind(product.image())
        .bind(product.rating().rate)
        .bind(rating_count_column(product)?)
        .bind(product.category_id().map(|c| c.as_uuid()))
        .bind(product.created_at())
        .bind(product.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, "product", product.title().to_string()))?;
        Ok(())
    }

    async fn save_product(&self, product: &Product) -> Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE products SET
                title = $2,
                price_cents = $3,
                description = $4,
                image = $5,
                rating_rate = $6,
                rating_count = $7,
                category_id = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(product.id().as_uuid())
        .bind(product.title())
        .bind(product.price().cents())
        .bind(product.description())
        .bind(product.image())
        .bind(product.rating().rate)
        .bind(rating_count_column(product)?)
        .bind(product.category_id().map(|c| c.as_uuid()))
        .bind(product.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, "product", product.title().to_string()))?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "product",
                id: product.id().to_string(),
            });
        }
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, "product", id.to_string()))?;

        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "product",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn get_product_by_id(&self, id: ProductId) -> Result<Option<Product>> {
        sqlx::query(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(row_to_product)
            .transpose()
    }

    async fn get_product_by_title(&self, title: &str) -> Result<Option<Product>> {
        sqlx::query(&format!("{PRODUCT_SELECT} WHERE p.title = $1"))
            .bind(title)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(row_to_product)
            .transpose()
    }

    async fn list_products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        sqlx::query(&format!("{PRODUCT_SELECT} WHERE p.id = ANY($1) ORDER BY p.id"))
            .bind(&uuids)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(row_to_product)
            .collect()
    }

    async fn paginate_products(
        &self,
        query: &PaginationQuery,
    ) -> Result<PaginationQueryResult<Product>> {
        self.page_of_products(None, query).await
    }

    async fn list_products_by_category_name(
        &self,
        category_name: &str,
        query: &PaginationQuery,
    ) -> Result<PaginationQueryResult<Product>> {
        self.page_of_products(Some(category_name), query).await
    }
}

#[async_trait]
impl CategoryRepository for PostgresStore {
    async fn create_category(&self, category: &Category) -> Result<()> {
        sqlx::query("INSERT INTO categories (id, name) VALUES ($1, $2)")
            .bind(category.id.as_uuid())
            .bind(&category.name)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, "category", category.name.clone()))?;
        Ok(())
    }

    async fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let row = sqlx::query(
            "SELECT id, name FROM categories WHERE name ILIKE $1 ORDER BY name LIMIT 1",
        )
        .bind(format!("%{}%", escape_like(name)))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Category {
                id: CategoryId::from_uuid(row.try_get("id")?),
                name: row.try_get("name")?,
            })),
            None => Ok(None),
        }
    }

    async fn find_category_by_exact_name(&self, name: &str) -> Result<Option<Category>> {
        let row = sqlx::query(
            "SELECT id, name FROM categories WHERE lower(name) = lower($1) ORDER BY name LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Category {
                id: CategoryId::from_uuid(row.try_get("id")?),
                name: row.try_get("name")?,
            })),
            None => Ok(None),
        }
    }

    async fn delete_category(&self, id: CategoryId) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, "category", id.to_string()))?;

        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "category",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn list_all_categories(&self) -> Result<Vec<String>> {
        let names = sqlx::query_scalar(
            r#"
            SELECT DISTINCT c.name
            FROM categories c
            JOIN products p ON p.category_id = c.id
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }
}

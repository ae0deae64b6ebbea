//! # Product Repository
//!
//! Catalogue CRUD and the filtered product list.
//!
//! ## List Query
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ProductFilter { search: "led", category_id, is_active }                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  products p                                                             │
//! │    JOIN categories c        → category_name                             │
//! │    LEFT JOIN stock_levels s → current_stock (NULL when no level yet)    │
//! │  WHERE (p.name LIKE %led% OR p.sku LIKE … OR p.description LIKE …)      │
//! │    AND p.category_id = ? AND p.is_active = ?                            │
//! │  ORDER BY p.name                                                        │
//! │  LIMIT per_page OFFSET (page − 1) × per_page                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use agency_core::filter::{like_pattern, ProductFilter};
use agency_core::{CoreError, PageRequest, Paged, Product, ProductInput, ProductView};

pub(crate) const PRODUCT_COLUMNS: &str = "id, name, description, sku, category_id, price_cents, \
     cost_price_cents, is_active, created_at, updated_at";

const VIEW_SELECT: &str = r#"
    SELECT
        p.id, p.name, p.description, p.sku, p.category_id, p.price_cents,
        p.cost_price_cents, p.is_active, p.created_at, p.updated_at,
        c.name AS category_name,
        s.current_stock AS current_stock
    FROM products p
    JOIN categories c ON c.id = p.category_id
    LEFT JOIN stock_levels s ON s.product_id = p.id
"#;

#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product. The category must exist.
    pub async fn create(&self, input: ProductInput) -> DbResult<Product> {
        let input = input.validated()?;
        let mut conn = self.pool.acquire().await?;

        ensure_category(&mut conn, &input.category_id).await?;
        let product = insert(&mut conn, &input).await?;

        info!(product_id = %product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Product with its category name and current stock.
    pub async fn get_view(&self, id: &str) -> DbResult<Option<ProductView>> {
        let view = sqlx::query_as::<_, ProductView>(&format!("{VIEW_SELECT} WHERE p.id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(view)
    }

    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        find_by_sku(&mut conn, sku.trim()).await
    }

    /// Replaces every editable field of a product.
    pub async fn update(&self, id: &str, input: ProductInput) -> DbResult<Product> {
        let input = input.validated()?;
        let mut conn = self.pool.acquire().await?;

        ensure_category(&mut conn, &input.category_id).await?;
        let product = update(&mut conn, id, &input)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        info!(product_id = %id, sku = %product.sku, "Product updated");
        Ok(product)
    }

    /// Deletes a product with its stock level, ledger rows and sale items.
    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(product_id = %id, "Product deleted");
        }
        Ok(deleted)
    }

    /// One page of products matching the filter, ordered by name.
    pub async fn list(&self, filter: &ProductFilter, page: PageRequest) -> DbResult<Paged<ProductView>> {
        debug!(?filter, ?page, "Listing products");

        let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM products p");
        push_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut query = QueryBuilder::<Sqlite>::new(VIEW_SELECT);
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY p.name, p.id LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = query
            .build_query_as::<ProductView>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Paged::new(items, page, total))
    }

    /// Every product matching the filter (export).
    pub async fn all(&self, filter: &ProductFilter) -> DbResult<Vec<ProductView>> {
        let mut query = QueryBuilder::<Sqlite>::new(VIEW_SELECT);
        push_filters(&mut query, filter);
        query.push(" ORDER BY p.name, p.id");

        let items = query
            .build_query_as::<ProductView>()
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &ProductFilter) {
    let mut clause = " WHERE ";

    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        query
            .push(clause)
            .push("(p.name LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR p.sku LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR p.description LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
        clause = " AND ";
    }

    if let Some(category_id) = &filter.category_id {
        query.push(clause).push("p.category_id = ").push_bind(category_id.clone());
        clause = " AND ";
    }

    if let Some(active) = filter.is_active {
        query.push(clause).push("p.is_active = ").push_bind(active);
    }
}

// =============================================================================
// Connection-level helpers (shared with imports and seeding)
// =============================================================================

async fn ensure_category(conn: &mut SqliteConnection, category_id: &str) -> DbResult<()> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM categories WHERE id = ?1")
        .bind(category_id)
        .fetch_optional(&mut *conn)
        .await?;

    match exists {
        Some(_) => Ok(()),
        None => Err(CoreError::CategoryNotFound(category_id.to_string()).into()),
    }
}

pub(crate) async fn find_by_sku(conn: &mut SqliteConnection, sku: &str) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1"
    ))
    .bind(sku)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(product)
}

pub(crate) async fn insert(conn: &mut SqliteConnection, input: &ProductInput) -> DbResult<Product> {
    let now = Utc::now();
    let product = sqlx::query_as::<_, Product>(&format!(
        r#"
        INSERT INTO products (
            id, name, description, sku, category_id, price_cents,
            cost_price_cents, is_active, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
        RETURNING {PRODUCT_COLUMNS}
        "#
    ))
    .bind(new_id())
    .bind(&input.name)
    .bind(&input.description)
    .bind(&input.sku)
    .bind(&input.category_id)
    .bind(input.price_cents)
    .bind(input.cost_price_cents)
    .bind(input.is_active)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| DbError::from(e).with_duplicate_value(&input.sku))?;

    Ok(product)
}

pub(crate) async fn update(
    conn: &mut SqliteConnection,
    id: &str,
    input: &ProductInput,
) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        r#"
        UPDATE products SET
            name = ?2,
            description = ?3,
            sku = ?4,
            category_id = ?5,
            price_cents = ?6,
            cost_price_cents = ?7,
            is_active = ?8,
            updated_at = ?9
        WHERE id = ?1
        RETURNING {PRODUCT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&input.name)
    .bind(&input.description)
    .bind(&input.sku)
    .bind(&input.category_id)
    .bind(input.price_cents)
    .bind(input.cost_price_cents)
    .bind(input.is_active)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| DbError::from(e).with_duplicate_value(&input.sku))?;

    Ok(product)
}

// =============================================================================
// Unit Tests
// =============================================================================

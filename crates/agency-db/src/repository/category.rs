//! # Category Repository

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use agency_core::validation::validate_category_name;
use agency_core::{Category, CategoryInput, CategoryView};

const CATEGORY_COLUMNS: &str = "id, name, description, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    pub async fn create(&self, input: CategoryInput) -> DbResult<Category> {
        let input = input.validated()?;
        let mut conn = self.pool.acquire().await?;
        let category = insert(&mut conn, &input.name, &input.description).await?;

        info!(category_id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    /// All categories by name, with their product counts.
    pub async fn list(&self) -> DbResult<Vec<CategoryView>> {
        let categories = sqlx::query_as::<_, CategoryView>(
            r#"
            SELECT
                c.id, c.name, c.description, c.created_at, c.updated_at,
                COUNT(p.id) AS product_count
            FROM categories c
            LEFT JOIN products p ON p.category_id = c.id
            GROUP BY c.id
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = categories.len(), "Listed categories");
        Ok(categories)
    }

    pub async fn update(&self, id: &str, input: CategoryInput) -> DbResult<Category> {
        let input = input.validated()?;

        let category = sqlx::query_as::<_, Category>(&format!(
            r#"
            UPDATE categories SET name = ?2, description = ?3, updated_at = ?4
            WHERE id = ?1
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(&input.name))?
        .ok_or_else(|| DbError::not_found("Category", id))?;

        info!(category_id = %id, "Category updated");
        Ok(category)
    }

    /// Deletes a category and, by cascade, its products.
    ///
    /// Returns `false` when nothing matched.
    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(category_id = %id, "Category deleted");
        }
        Ok(deleted)
    }
}

// =============================================================================
// Connection-level helpers (shared with imports and seeding)
// =============================================================================

pub(crate) async fn insert(
    conn: &mut SqliteConnection,
    name: &str,
    description: &str,
) -> DbResult<Category> {
    let now = Utc::now();
    let category = sqlx::query_as::<_, Category>(&format!(
        r#"
        INSERT INTO categories (id, name, description, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?4)
        RETURNING {CATEGORY_COLUMNS}
        "#
    ))
    .bind(new_id())
    .bind(name)
    .bind(description)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| DbError::from(e).with_duplicate_value(name))?;

    Ok(category)
}

/// Finds a category by exact name or creates it. Returns `(category, created)`.
pub(crate) async fn get_or_create(
    conn: &mut SqliteConnection,
    name: &str,
) -> DbResult<(Category, bool)> {
    validate_category_name(name)?;

    let existing = sqlx::query_as::<_, Category>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories WHERE name = ?1"
    ))
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;

    match existing {
        Some(category) => Ok((category, false)),
        None => Ok((insert(conn, name, "").await?, true)),
    }
}

//! # Stock Repository
//!
//! Stock levels and the append-only movement ledger.
//!
//! ## Recording a Movement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add_movement(OUT × 5, "marie")                                         │
//! │       │                                                                 │
//! │       ▼  BEGIN                                                          │
//! │  fetch_or_create_level(product)     balance 3                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  next_balance(3, OUT, 5) ──► InsufficientStock ──► ROLLBACK             │
//! │       │ ok                                                              │
//! │       ▼                                                                 │
//! │  UPDATE … SET current_stock = current_stock - 5                         │
//! │         WHERE current_stock >= 5 RETURNING …   (no row ⇒ rejected)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT INTO stock_movements …                                          │
//! │       │                                                                 │
//! │       ▼  COMMIT                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The connection-level helpers at the bottom of this file are the only
//! code that writes `stock_levels.current_stock` or `stock_movements`;
//! sales and imports call them inside their own transactions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use agency_core::filter::{like_pattern, MovementFilter, StockFilter, StockStatusFilter};
use agency_core::stock::next_balance;
use agency_core::{
    CoreError, MovementType, NewMovement, PageRequest, Paged, StockLevel, StockLevelView,
    StockMovement, StockMovementView, StockThresholds, DEFAULT_MAXIMUM_STOCK,
    DEFAULT_MINIMUM_STOCK,
};

const LEVEL_COLUMNS: &str =
    "id, product_id, current_stock, minimum_stock, maximum_stock, last_updated";

const MOVEMENT_COLUMNS: &str =
    "id, product_id, movement_type, quantity, reference, notes, created_by, created_at";

const LEVEL_VIEW_SELECT: &str = r#"
    SELECT
        s.id, s.product_id, s.current_stock, s.minimum_stock, s.maximum_stock,
        s.last_updated,
        p.name AS product_name, p.sku AS sku, p.price_cents AS price_cents
    FROM stock_levels s
    JOIN products p ON p.id = s.product_id
"#;

const MOVEMENT_VIEW_SELECT: &str = r#"
    SELECT
        m.id, m.product_id, m.movement_type, m.quantity, m.reference, m.notes,
        m.created_by, m.created_at,
        p.name AS product_name, p.sku AS sku
    FROM stock_movements m
    JOIN products p ON p.id = m.product_id
"#;

/// Movements shown on the stock overview.
const OVERVIEW_RECENT_MOVEMENTS: i64 = 10;

// =============================================================================
// Read Models
// =============================================================================

/// Result of [`StockRepository::add_movement`].
#[derive(Debug, Clone, Serialize)]
pub struct MovementOutcome {
    pub movement: StockMovement,
    pub level: StockLevel,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockOverview {
    pub total_products: i64,
    /// At or below the minimum, out of stock included.
    pub low_stock_count: i64,
    pub out_of_stock_count: i64,
    pub recent_movements: Vec<StockMovementView>,
    pub low_stock_items: Vec<StockLevelView>,
}

/// One row of the stock summary report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockSummaryEntry {
    pub product_name: String,
    pub sku: String,
    pub current_stock: i64,
    pub minimum_stock: i64,
    pub status: String,
}

impl From<&StockLevelView> for StockSummaryEntry {
    fn from(view: &StockLevelView) -> Self {
        StockSummaryEntry {
            product_name: view.product_name.clone(),
            sku: view.sku.clone(),
            current_stock: view.level.current_stock,
            minimum_stock: view.level.minimum_stock,
            status: view.level.status().label().to_string(),
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Records a manual movement and applies it to the balance atomically.
    ///
    /// ## Errors
    /// - `ProductNotFound` when the product doesn't exist
    /// - `InsufficientStock` when an OUT exceeds the balance
    /// - `UnsupportedMovement` for TRANSFER
    ///
    /// On any error neither the balance nor the ledger changes.
    pub async fn add_movement(&self, input: NewMovement, actor: &str) -> DbResult<MovementOutcome> {
        let input = input.validated()?;
        debug!(
            product_id = %input.product_id,
            movement_type = %input.movement_type,
            quantity = input.quantity,
            "Recording stock movement"
        );

        let mut tx = self.pool.begin().await?;

        let (name, sku) = product_identity(&mut tx, &input.product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(input.product_id.clone()))?;

        let now = Utc::now();
        let level = fetch_or_create_level(&mut tx, &input.product_id, now).await?;
        next_balance(level.current_stock, input.movement_type, input.quantity)
            .map_err(|e| e.into_core(&name, &sku))?;

        let level = apply_delta(&mut tx, &input.product_id, input.movement_type, input.quantity, now)
            .await?
            .ok_or_else(|| CoreError::InsufficientStock {
                product: name.clone(),
                sku: sku.clone(),
                available: level.current_stock,
                requested: input.quantity,
            })?;

        let movement = record_movement(
            &mut tx,
            &LedgerEntry {
                product_id: &input.product_id,
                movement_type: input.movement_type,
                quantity: input.quantity,
                reference: &input.reference,
                notes: &input.notes,
                actor,
            },
            now,
        )
        .await?;

        tx.commit().await?;

        info!(
            product_id = %input.product_id,
            movement_type = %movement.movement_type,
            quantity = movement.quantity,
            balance = level.current_stock,
            actor = %actor,
            "Stock movement recorded"
        );
        Ok(MovementOutcome { movement, level })
    }

    pub async fn get_level(&self, product_id: &str) -> DbResult<Option<StockLevelView>> {
        let level = sqlx::query_as::<_, StockLevelView>(&format!(
            "{LEVEL_VIEW_SELECT} WHERE s.product_id = ?1"
        ))
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(level)
    }

    /// Sets the minimum/maximum counters, creating the level if needed.
    pub async fn update_thresholds(
        &self,
        product_id: &str,
        thresholds: StockThresholds,
    ) -> DbResult<StockLevel> {
        let thresholds = thresholds.validated()?;
        let mut tx = self.pool.begin().await?;

        if product_identity(&mut tx, product_id).await?.is_none() {
            return Err(CoreError::ProductNotFound(product_id.to_string()).into());
        }

        let now = Utc::now();
        fetch_or_create_level(&mut tx, product_id, now).await?;
        let level = set_thresholds(&mut tx, product_id, thresholds, now).await?;

        tx.commit().await?;

        info!(
            product_id = %product_id,
            minimum = level.minimum_stock,
            maximum = level.maximum_stock,
            "Stock thresholds updated"
        );
        Ok(level)
    }

    /// One page of stock levels, ordered by product name.
    pub async fn list_levels(
        &self,
        filter: &StockFilter,
        page: PageRequest,
    ) -> DbResult<Paged<StockLevelView>> {
        debug!(?filter, ?page, "Listing stock levels");

        let mut count_query = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) FROM stock_levels s JOIN products p ON p.id = s.product_id",
        );
        push_level_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut query = QueryBuilder::<Sqlite>::new(LEVEL_VIEW_SELECT);
        push_level_filters(&mut query, filter);
        query
            .push(" ORDER BY p.name, p.id LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = query
            .build_query_as::<StockLevelView>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Paged::new(items, page, total))
    }

    /// Every stock level matching the filter (export, reports).
    pub async fn all_levels(&self, filter: &StockFilter) -> DbResult<Vec<StockLevelView>> {
        let mut query = QueryBuilder::<Sqlite>::new(LEVEL_VIEW_SELECT);
        push_level_filters(&mut query, filter);
        query.push(" ORDER BY p.name, p.id");

        let items = query
            .build_query_as::<StockLevelView>()
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// Levels at or below their minimum.
    pub async fn alerts(&self) -> DbResult<Vec<StockLevelView>> {
        self.all_levels(&StockFilter {
            search: None,
            status: Some(StockStatusFilter::Low),
        })
        .await
    }

    /// One page of the ledger, newest first.
    pub async fn list_movements(
        &self,
        filter: &MovementFilter,
        page: PageRequest,
    ) -> DbResult<Paged<StockMovementView>> {
        debug!(?filter, ?page, "Listing stock movements");

        let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM stock_movements m");
        push_movement_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut query = QueryBuilder::<Sqlite>::new(MOVEMENT_VIEW_SELECT);
        push_movement_filters(&mut query, filter);
        query
            .push(" ORDER BY m.created_at DESC, m.rowid DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = query
            .build_query_as::<StockMovementView>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Paged::new(items, page, total))
    }

    /// Every movement matching the filter, newest first (export).
    pub async fn all_movements(&self, filter: &MovementFilter) -> DbResult<Vec<StockMovementView>> {
        let mut query = QueryBuilder::<Sqlite>::new(MOVEMENT_VIEW_SELECT);
        push_movement_filters(&mut query, filter);
        query.push(" ORDER BY m.created_at DESC, m.rowid DESC");

        let items = query
            .build_query_as::<StockMovementView>()
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn recent_movements(&self, limit: i64) -> DbResult<Vec<StockMovementView>> {
        let items = sqlx::query_as::<_, StockMovementView>(&format!(
            "{MOVEMENT_VIEW_SELECT} ORDER BY m.created_at DESC, m.rowid DESC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    pub async fn count_movements(&self, product_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stock_movements WHERE product_id = ?1")
                .bind(product_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    pub async fn overview(&self) -> DbResult<StockOverview> {
        let (total_products, low_stock_count, out_of_stock_count): (i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM products),
                    (SELECT COUNT(*) FROM stock_levels WHERE current_stock <= minimum_stock),
                    (SELECT COUNT(*) FROM stock_levels WHERE current_stock = 0)
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

        Ok(StockOverview {
            total_products,
            low_stock_count,
            out_of_stock_count,
            recent_movements: self.recent_movements(OVERVIEW_RECENT_MOVEMENTS).await?,
            low_stock_items: self.alerts().await?,
        })
    }

    /// Every product's balance and status, ordered by product name.
    pub async fn summary(&self) -> DbResult<Vec<StockSummaryEntry>> {
        let levels = self.all_levels(&StockFilter::default()).await?;
        Ok(levels.iter().map(StockSummaryEntry::from).collect())
    }
}

fn push_level_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &StockFilter) {
    let mut clause = " WHERE ";

    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        query
            .push(clause)
            .push("(p.name LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR p.sku LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
        clause = " AND ";
    }

    match filter.status {
        Some(StockStatusFilter::Low) => {
            query.push(clause).push("s.current_stock <= s.minimum_stock");
        }
        Some(StockStatusFilter::Out) => {
            query.push(clause).push("s.current_stock = 0");
        }
        None => {}
    }
}

fn push_movement_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &MovementFilter) {
    let mut clause = " WHERE ";

    if let Some(product_id) = &filter.product_id {
        query.push(clause).push("m.product_id = ").push_bind(product_id.clone());
        clause = " AND ";
    }

    if let Some(movement_type) = filter.movement_type {
        query.push(clause).push("m.movement_type = ").push_bind(movement_type);
    }
}

// =============================================================================
// Ledger Helpers (connection level)
// =============================================================================

/// A ledger row about to be written.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LedgerEntry<'a> {
    pub product_id: &'a str,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub reference: &'a str,
    pub notes: &'a str,
    pub actor: &'a str,
}

/// `(name, sku)` of a product.
pub(crate) async fn product_identity(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<Option<(String, String)>> {
    let identity = sqlx::query_as::<_, (String, String)>(
        "SELECT name, sku FROM products WHERE id = ?1",
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(identity)
}

/// Returns the product's level, creating an empty one first if needed.
pub(crate) async fn fetch_or_create_level(
    conn: &mut SqliteConnection,
    product_id: &str,
    now: DateTime<Utc>,
) -> DbResult<StockLevel> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO stock_levels (
            id, product_id, current_stock, minimum_stock, maximum_stock, last_updated
        ) VALUES (?1, ?2, 0, ?3, ?4, ?5)
        ON CONFLICT(product_id) DO NOTHING
        "#,
    )
    .bind(new_id())
    .bind(product_id)
    .bind(DEFAULT_MINIMUM_STOCK)
    .bind(DEFAULT_MAXIMUM_STOCK)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if inserted > 0 {
        debug!(product_id = %product_id, "Stock level created");
    }

    let level = sqlx::query_as::<_, StockLevel>(&format!(
        "SELECT {LEVEL_COLUMNS} FROM stock_levels WHERE product_id = ?1"
    ))
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(level)
}

/// Applies a movement to the stored balance.
///
/// OUT only matches while `current_stock >= quantity`, so `None` means the
/// balance could not cover it (or the level doesn't exist).
pub(crate) async fn apply_delta(
    conn: &mut SqliteConnection,
    product_id: &str,
    movement_type: MovementType,
    quantity: i64,
    now: DateTime<Utc>,
) -> DbResult<Option<StockLevel>> {
    let update = match movement_type {
        MovementType::In => "current_stock = current_stock + ?2, last_updated = ?3 WHERE product_id = ?1",
        MovementType::Out => {
            "current_stock = current_stock - ?2, last_updated = ?3 \
             WHERE product_id = ?1 AND current_stock >= ?2"
        }
        MovementType::Adjustment => "current_stock = ?2, last_updated = ?3 WHERE product_id = ?1",
        MovementType::Transfer => {
            return Err(CoreError::UnsupportedMovement { movement_type }.into());
        }
    };

    let level = sqlx::query_as::<_, StockLevel>(&format!(
        "UPDATE stock_levels SET {update} RETURNING {LEVEL_COLUMNS}"
    ))
    .bind(product_id)
    .bind(quantity)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    if level.is_none() {
        warn!(product_id = %product_id, %movement_type, quantity, "Stock update matched no row");
    }
    Ok(level)
}

pub(crate) async fn set_thresholds(
    conn: &mut SqliteConnection,
    product_id: &str,
    thresholds: StockThresholds,
    now: DateTime<Utc>,
) -> DbResult<StockLevel> {
    let level = sqlx::query_as::<_, StockLevel>(&format!(
        r#"
        UPDATE stock_levels SET minimum_stock = ?2, maximum_stock = ?3, last_updated = ?4
        WHERE product_id = ?1
        RETURNING {LEVEL_COLUMNS}
        "#
    ))
    .bind(product_id)
    .bind(thresholds.minimum_stock)
    .bind(thresholds.maximum_stock)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("StockLevel", product_id))?;

    Ok(level)
}

/// Appends one row to the ledger.
pub(crate) async fn record_movement(
    conn: &mut SqliteConnection,
    entry: &LedgerEntry<'_>,
    now: DateTime<Utc>,
) -> DbResult<StockMovement> {
    let movement = sqlx::query_as::<_, StockMovement>(&format!(
        r#"
        INSERT INTO stock_movements (
            id, product_id, movement_type, quantity, reference, notes, created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        RETURNING {MOVEMENT_COLUMNS}
        "#
    ))
    .bind(new_id())
    .bind(entry.product_id)
    .bind(entry.movement_type)
    .bind(entry.quantity)
    .bind(entry.reference)
    .bind(entry.notes)
    .bind(entry.actor)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(movement)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing;

    fn movement(product_id: &str, movement_type: MovementType, quantity: i64) -> NewMovement {
        NewMovement {
            product_id: product_id.to_string(),
            movement_type,
            quantity,
            reference: "BL-2024-001".to_string(),
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn test_in_out_adjustment() {
        let db = testing::db().await;
        let cat = testing::category(&db, "LEDs").await;
        let product = testing::product(&db, &cat.id, "LED-R5", 50).await;

        let outcome = db
            .stock()
            .add_movement(movement(&product.id, MovementType::In, 20), "marie")
            .await
            .unwrap();
        assert_eq!(outcome.level.current_stock, 20);
        assert_eq!(outcome.movement.created_by, "marie");

        let outcome = db
            .stock()
            .add_movement(movement(&product.id, MovementType::Out, 8), "marie")
            .await
            .unwrap();
        assert_eq!(outcome.level.current_stock, 12);

        let outcome = db
            .stock()
            .add_movement(movement(&product.id, MovementType::Adjustment, 30), "marie")
            .await
            .unwrap();
        assert_eq!(outcome.level.current_stock, 30);
        assert_eq!(db.stock().count_movements(&product.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_out_beyond_balance_changes_nothing() {
        let db = testing::db().await;
        let cat = testing::category(&db, "LEDs").await;
        let product = testing::stocked_product(&db, &cat.id, "LED-R5", 50, 3).await;

        let err = db
            .stock()
            .add_movement(movement(&product.id, MovementType::Out, 5), "marie")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock {
                available: 3,
                requested: 5,
                ..
            })
        ));

        let level = db.stock().get_level(&product.id).await.unwrap().unwrap();
        assert_eq!(level.level.current_stock, 3);
        assert_eq!(db.stock().count_movements(&product.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_out_on_product_without_level_is_rejected() {
        let db = testing::db().await;
        let cat = testing::category(&db, "LEDs").await;
        let product = testing::product(&db, &cat.id, "LED-R5", 50).await;

        let err = db
            .stock()
            .add_movement(movement(&product.id, MovementType::Out, 1), "marie")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InsufficientStock { .. })));
        // The level created inside the transaction was rolled back
        assert!(db.stock().get_level(&product.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transfer_rejected_without_side_effects() {
        let db = testing::db().await;
        let cat = testing::category(&db, "LEDs").await;
        let product = testing::stocked_product(&db, &cat.id, "LED-R5", 50, 10).await;

        let err = db
            .stock()
            .add_movement(movement(&product.id, MovementType::Transfer, 4), "marie")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::UnsupportedMovement { .. })
        ));

        let level = db.stock().get_level(&product.id).await.unwrap().unwrap();
        assert_eq!(level.level.current_stock, 10);
        assert_eq!(db.stock().count_movements(&product.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let db = testing::db().await;
        let err = db
            .stock()
            .add_movement(movement("missing", MovementType::In, 1), "marie")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_thresholds_and_alerts() {
        let db = testing::db().await;
        let cat = testing::category(&db, "LEDs").await;
        let low = testing::stocked_product(&db, &cat.id, "LED-R5", 50, 10).await;
        let fine = testing::stocked_product(&db, &cat.id, "LED-V5", 50, 100).await;
        testing::stocked_product(&db, &cat.id, "LED-B5", 50, 0).await;

        let level = db
            .stock()
            .update_thresholds(
                &low.id,
                StockThresholds {
                    minimum_stock: 10,
                    maximum_stock: 500,
                },
            )
            .await
            .unwrap();
        assert!(level.is_low_stock());
        assert!(!level.is_out_of_stock());

        db.stock()
            .update_thresholds(
                &fine.id,
                StockThresholds {
                    minimum_stock: 10,
                    maximum_stock: 500,
                },
            )
            .await
            .unwrap();

        let alerts = db.stock().alerts().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].sku, "LED-R5");

        let overview = db.stock().overview().await.unwrap();
        assert_eq!(overview.total_products, 3);
        // LED-B5 has no level: it was never stocked
        assert_eq!(overview.low_stock_count, 1);
        assert_eq!(overview.out_of_stock_count, 0);
        assert_eq!(overview.recent_movements.len(), 2);

        let summary = db.stock().summary().await.unwrap();
        let led = summary.iter().find(|e| e.sku == "LED-R5").unwrap();
        assert_eq!(led.status, "Low stock");
    }

    #[tokio::test]
    async fn test_invalid_thresholds() {
        let db = testing::db().await;
        let cat = testing::category(&db, "LEDs").await;
        let product = testing::product(&db, &cat.id, "LED-R5", 50).await;

        let err = db
            .stock()
            .update_thresholds(
                &product.id,
                StockThresholds {
                    minimum_stock: -1,
                    maximum_stock: 500,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_level_list_filters() {
        let db = testing::db().await;
        let cat = testing::category(&db, "LEDs").await;
        testing::stocked_product(&db, &cat.id, "LED-R5", 50, 10).await;
        let empty = testing::stocked_product(&db, &cat.id, "LED-V5", 50, 4).await;
        db.stock()
            .add_movement(movement(&empty.id, MovementType::Out, 4), "marie")
            .await
            .unwrap();

        let out = db
            .stock()
            .list_levels(
                &StockFilter {
                    search: None,
                    status: Some(StockStatusFilter::Out),
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(out.total, 1);
        assert_eq!(out.items[0].sku, "LED-V5");

        let searched = db
            .stock()
            .list_levels(
                &StockFilter {
                    search: Some("r5".to_string()),
                    status: None,
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(searched.total, 1);
    }

    #[tokio::test]
    async fn test_movement_list_newest_first_and_filtered() {
        let db = testing::db().await;
        let cat = testing::category(&db, "LEDs").await;
        let a = testing::stocked_product(&db, &cat.id, "LED-R5", 50, 10).await;
        let b = testing::stocked_product(&db, &cat.id, "LED-V5", 50, 10).await;
        db.stock()
            .add_movement(movement(&a.id, MovementType::Out, 2), "marie")
            .await
            .unwrap();

        let all = db
            .stock()
            .list_movements(&MovementFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.items[0].movement.movement_type, MovementType::Out);

        let only_b = db
            .stock()
            .list_movements(
                &MovementFilter {
                    product_id: Some(b.id.clone()),
                    movement_type: None,
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(only_b.total, 1);

        let outs = db
            .stock()
            .all_movements(&MovementFilter {
                product_id: None,
                movement_type: Some(MovementType::Out),
            })
            .await
            .unwrap();
        assert_eq!(outs.len(), 1);
        assert_eq!(outs[0].sku, "LED-R5");
    }
}

//! # Sale Repository
//!
//! Sales, their line items, and the completion/cancellation lifecycle.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create ──► PENDING ──add_item/remove_item/recompute_total──┐           │
//! │               │  ▲                                          │           │
//! │               │  └──────────────────────────────────────────┘           │
//! │               │                                                         │
//! │     complete  │                     cancel                              │
//! │       ┌───────┴────────┐     ┌───────────────────┐                      │
//! │       ▼                │     │                   ▼                      │
//! │  COMPLETED ────────────┼─────┘              CANCELLED                   │
//! │   (OUT per item)       │  cancel                ▲                       │
//! │                        └──(IN per item)─────────┘                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `complete` and `cancel` each run in a single transaction: every stock
//! change, every ledger row and the status update commit together or not
//! at all.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use crate::repository::stock::{apply_delta, fetch_or_create_level, record_movement, LedgerEntry};
use agency_core::filter::{like_pattern, SaleFilter};
use agency_core::sale::{
    cancellation_action, cancellation_notes, cancellation_reference, completion_action,
    ensure_editable, plan_completion, sale_notes, sale_reference, CancellationAction,
    CompletionAction,
};
use agency_core::{
    CoreError, Money, MovementType, NewSale, NewSaleItem, PageRequest, Paged, Sale, SaleItem,
    SaleItemView, SaleStatus, SaleView,
};

const SALE_COLUMNS: &str =
    "id, customer_id, status, total_amount_cents, notes, created_by, sale_date, updated_at";

const ITEM_COLUMNS: &str = "id, sale_id, product_id, position, quantity, unit_price_cents";

const SALE_VIEW_SELECT: &str = r#"
    SELECT
        s.id, s.customer_id, s.status, s.total_amount_cents, s.notes, s.created_by,
        s.sale_date, s.updated_at,
        c.name AS customer_name
    FROM sales s
    JOIN customers c ON c.id = s.customer_id
"#;

const ITEM_VIEW_SELECT: &str = r#"
    SELECT
        i.id, i.sale_id, i.product_id, i.position, i.quantity, i.unit_price_cents,
        p.name AS product_name, p.sku AS sku
    FROM sale_items i
    JOIN products p ON p.id = i.product_id
"#;

#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Opens a PENDING sale with a zero total.
    pub async fn create(&self, input: NewSale, actor: &str) -> DbResult<Sale> {
        let notes = input.notes.trim().to_string();
        let mut conn = self.pool.acquire().await?;
        let sale = insert(&mut conn, input.customer_id.trim(), &notes, actor, Utc::now()).await?;

        info!(sale_id = %sale.id, customer_id = %sale.customer_id, actor = %actor, "Sale created");
        Ok(sale)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<SaleView>> {
        let mut conn = self.pool.acquire().await?;
        fetch_view(&mut conn, id).await
    }

    /// Line items in insertion order.
    pub async fn items(&self, sale_id: &str) -> DbResult<Vec<SaleItemView>> {
        let mut conn = self.pool.acquire().await?;
        fetch_items(&mut conn, sale_id).await
    }

    /// Adds a line item to a PENDING sale.
    ///
    /// Without an explicit unit price the product's current price is used.
    /// The cached total is not touched; call [`Self::recompute_total`] or use
    /// [`Self::add_item_and_recompute`].
    pub async fn add_item(&self, sale_id: &str, input: NewSaleItem) -> DbResult<SaleItemView> {
        let input = input.validated()?;
        let mut tx = self.pool.begin().await?;

        let view = insert_item(&mut tx, sale_id, &input, Utc::now()).await?;
        tx.commit().await?;

        debug!(sale_id = %sale_id, item_id = %view.item.id, sku = %view.sku, quantity = view.item.quantity, "Sale item added");
        Ok(view)
    }

    /// Adds a line item and stores the new total in the same transaction.
    ///
    /// If the total cannot be computed the item is not kept.
    pub async fn add_item_and_recompute(
        &self,
        sale_id: &str,
        input: NewSaleItem,
    ) -> DbResult<(SaleItemView, Money)> {
        let input = input.validated()?;
        let mut tx = self.pool.begin().await?;

        let now = Utc::now();
        let view = insert_item(&mut tx, sale_id, &input, now).await?;
        let total = store_total(&mut tx, sale_id, now).await?;
        tx.commit().await?;

        debug!(sale_id = %sale_id, item_id = %view.item.id, total = %total, "Sale item added");
        Ok((view, total))
    }

    /// Removes a line item from a PENDING sale.
    pub async fn remove_item(&self, sale_id: &str, item_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        delete_item(&mut tx, sale_id, item_id, Utc::now()).await?;
        tx.commit().await?;

        debug!(sale_id = %sale_id, item_id = %item_id, "Sale item removed");
        Ok(())
    }

    /// Removes a line item and stores the new total in the same transaction.
    pub async fn remove_item_and_recompute(&self, sale_id: &str, item_id: &str) -> DbResult<Money> {
        let mut tx = self.pool.begin().await?;

        let now = Utc::now();
        delete_item(&mut tx, sale_id, item_id, now).await?;
        let total = store_total(&mut tx, sale_id, now).await?;
        tx.commit().await?;

        debug!(sale_id = %sale_id, item_id = %item_id, total = %total, "Sale item removed");
        Ok(total)
    }

    /// Stores Σ quantity × unit price as the sale total and returns it.
    pub async fn recompute_total(&self, sale_id: &str) -> DbResult<Money> {
        let mut tx = self.pool.begin().await?;

        fetch_sale(&mut tx, sale_id).await?;
        let total = store_total(&mut tx, sale_id, Utc::now()).await?;
        tx.commit().await?;

        debug!(sale_id = %sale_id, total = %total, "Sale total recomputed");
        Ok(total)
    }

    /// Completes a PENDING sale: one OUT movement per item, all or nothing.
    ///
    /// ## Flow
    /// 1. Already COMPLETED → returned unchanged; CANCELLED → `InvalidSaleStatus`
    /// 2. Every item is checked against a running per-product balance
    /// 3. Guarded decrements + ledger rows + status update, then COMMIT
    ///
    /// Any failure rolls the whole transaction back.
    pub async fn complete(&self, sale_id: &str, actor: &str) -> DbResult<SaleView> {
        let mut tx = self.pool.begin().await?;

        let view = fetch_view(&mut tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        if completion_action(&view.sale)? == CompletionAction::AlreadyCompleted {
            debug!(sale_id = %sale_id, "Sale already completed");
            return Ok(view);
        }

        let items = fetch_items(&mut tx, sale_id).await?;
        let balances: HashMap<String, i64> = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT product_id, current_stock FROM stock_levels
            WHERE product_id IN (SELECT product_id FROM sale_items WHERE sale_id = ?1)
            "#,
        )
        .bind(sale_id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .collect();

        let plan = plan_completion(&items, |product_id| balances.get(product_id).copied())?;

        let now = Utc::now();
        let reference = sale_reference(sale_id);
        let notes = sale_notes(&view.customer_name);

        for (deduction, line) in plan.iter().zip(&items) {
            let level = apply_delta(
                &mut tx,
                &deduction.product_id,
                MovementType::Out,
                deduction.quantity,
                now,
            )
            .await?;
            if level.is_none() {
                return Err(CoreError::InsufficientStock {
                    product: line.product_name.clone(),
                    sku: line.sku.clone(),
                    available: balances.get(&deduction.product_id).copied().unwrap_or(0),
                    requested: deduction.quantity,
                }
                .into());
            }

            record_movement(
                &mut tx,
                &LedgerEntry {
                    product_id: &deduction.product_id,
                    movement_type: MovementType::Out,
                    quantity: deduction.quantity,
                    reference: &reference,
                    notes: &notes,
                    actor,
                },
                now,
            )
            .await?;
        }

        transition(&mut tx, &view.sale, SaleStatus::Pending, SaleStatus::Completed, now).await?;

        let completed = fetch_view(&mut tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;
        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            items = items.len(),
            total = %completed.sale.total_amount(),
            actor = %actor,
            "Sale completed"
        );
        Ok(completed)
    }

    /// Cancels a sale. A COMPLETED sale gets its stock back through one IN
    /// movement per item; a PENDING one only changes status.
    pub async fn cancel(&self, sale_id: &str, actor: &str) -> DbResult<SaleView> {
        let mut tx = self.pool.begin().await?;

        let view = fetch_view(&mut tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        let now = Utc::now();
        match cancellation_action(&view.sale) {
            CancellationAction::AlreadyCancelled => {
                debug!(sale_id = %sale_id, "Sale already cancelled");
                return Ok(view);
            }
            CancellationAction::MarkCancelled => {
                transition(&mut tx, &view.sale, SaleStatus::Pending, SaleStatus::Cancelled, now)
                    .await?;
            }
            CancellationAction::RestoreStock => {
                let items = fetch_items(&mut tx, sale_id).await?;
                let reference = cancellation_reference(sale_id);
                let notes = cancellation_notes(&view.customer_name);

                for line in &items {
                    fetch_or_create_level(&mut tx, &line.item.product_id, now).await?;
                    apply_delta(
                        &mut tx,
                        &line.item.product_id,
                        MovementType::In,
                        line.item.quantity,
                        now,
                    )
                    .await?
                    .ok_or_else(|| DbError::not_found("StockLevel", &line.item.product_id))?;

                    record_movement(
                        &mut tx,
                        &LedgerEntry {
                            product_id: &line.item.product_id,
                            movement_type: MovementType::In,
                            quantity: line.item.quantity,
                            reference: &reference,
                            notes: &notes,
                            actor,
                        },
                        now,
                    )
                    .await?;
                }

                transition(&mut tx, &view.sale, SaleStatus::Completed, SaleStatus::Cancelled, now)
                    .await?;
            }
        }

        let cancelled = fetch_view(&mut tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;
        tx.commit().await?;

        info!(sale_id = %sale_id, actor = %actor, "Sale cancelled");
        Ok(cancelled)
    }

    /// One page of sales, newest first.
    pub async fn list(&self, filter: &SaleFilter, page: PageRequest) -> DbResult<Paged<SaleView>> {
        debug!(?filter, ?page, "Listing sales");

        let mut count_query = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) FROM sales s JOIN customers c ON c.id = s.customer_id",
        );
        push_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut query = QueryBuilder::<Sqlite>::new(SALE_VIEW_SELECT);
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY s.sale_date DESC, s.rowid DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = query
            .build_query_as::<SaleView>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Paged::new(items, page, total))
    }

    /// Every sale matching the filter, newest first (export).
    pub async fn all(&self, filter: &SaleFilter) -> DbResult<Vec<SaleView>> {
        let mut query = QueryBuilder::<Sqlite>::new(SALE_VIEW_SELECT);
        push_filters(&mut query, filter);
        query.push(" ORDER BY s.sale_date DESC, s.rowid DESC");

        let items = query
            .build_query_as::<SaleView>()
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &SaleFilter) {
    let mut clause = " WHERE ";

    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        query
            .push(clause)
            .push("(c.name LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR s.notes LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
        clause = " AND ";
    }

    if let Some(status) = filter.status {
        query.push(clause).push("s.status = ").push_bind(status);
        clause = " AND ";
    }

    if let Some(customer_id) = &filter.customer_id {
        query.push(clause).push("s.customer_id = ").push_bind(customer_id.clone());
        clause = " AND ";
    }

    if let Some(from) = filter.date_from {
        query
            .push(clause)
            .push("substr(s.sale_date, 1, 10) >= ")
            .push_bind(from.format("%Y-%m-%d").to_string());
        clause = " AND ";
    }

    if let Some(to) = filter.date_to {
        query
            .push(clause)
            .push("substr(s.sale_date, 1, 10) <= ")
            .push_bind(to.format("%Y-%m-%d").to_string());
    }
}

// =============================================================================
// Connection-level helpers
// =============================================================================

/// Inserts a PENDING sale dated `sale_date`. The customer must exist.
pub(crate) async fn insert(
    conn: &mut SqliteConnection,
    customer_id: &str,
    notes: &str,
    actor: &str,
    sale_date: DateTime<Utc>,
) -> DbResult<Sale> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM customers WHERE id = ?1")
        .bind(customer_id)
        .fetch_optional(&mut *conn)
        .await?;
    if exists.is_none() {
        return Err(CoreError::CustomerNotFound(customer_id.to_string()).into());
    }

    let sale = sqlx::query_as::<_, Sale>(&format!(
        r#"
        INSERT INTO sales (
            id, customer_id, status, total_amount_cents, notes, created_by, sale_date, updated_at
        ) VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6, ?6)
        RETURNING {SALE_COLUMNS}
        "#
    ))
    .bind(new_id())
    .bind(customer_id)
    .bind(SaleStatus::Pending)
    .bind(notes)
    .bind(actor)
    .bind(sale_date)
    .fetch_one(&mut *conn)
    .await?;

    Ok(sale)
}

async fn fetch_view(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<SaleView>> {
    let view = sqlx::query_as::<_, SaleView>(&format!("{SALE_VIEW_SELECT} WHERE s.id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(view)
}

async fn fetch_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<Sale> {
    let sale = sqlx::query_as::<_, Sale>(&format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| CoreError::SaleNotFound(id.to_string()))?;

    Ok(sale)
}

async fn fetch_items(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItemView>> {
    let items = sqlx::query_as::<_, SaleItemView>(&format!(
        "{ITEM_VIEW_SELECT} WHERE i.sale_id = ?1 ORDER BY i.position"
    ))
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

/// Inserts a line item into a PENDING sale. `input` must be validated.
async fn insert_item(
    conn: &mut SqliteConnection,
    sale_id: &str,
    input: &NewSaleItem,
    now: DateTime<Utc>,
) -> DbResult<SaleItemView> {
    let sale = fetch_sale(&mut *conn, sale_id).await?;
    ensure_editable(&sale)?;

    let (product_name, sku, price_cents) = sqlx::query_as::<_, (String, String, i64)>(
        "SELECT name, sku, price_cents FROM products WHERE id = ?1",
    )
    .bind(&input.product_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| CoreError::ProductNotFound(input.product_id.clone()))?;

    let position: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(position), 0) + 1 FROM sale_items WHERE sale_id = ?1",
    )
    .bind(sale_id)
    .fetch_one(&mut *conn)
    .await?;

    let item = sqlx::query_as::<_, SaleItem>(&format!(
        r#"
        INSERT INTO sale_items (id, sale_id, product_id, position, quantity, unit_price_cents)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        RETURNING {ITEM_COLUMNS}
        "#
    ))
    .bind(new_id())
    .bind(sale_id)
    .bind(&input.product_id)
    .bind(position)
    .bind(input.quantity)
    .bind(input.unit_price_cents.unwrap_or(price_cents))
    .fetch_one(&mut *conn)
    .await?;

    touch(&mut *conn, sale_id, now).await?;

    Ok(SaleItemView {
        item,
        product_name,
        sku,
    })
}

async fn delete_item(
    conn: &mut SqliteConnection,
    sale_id: &str,
    item_id: &str,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let sale = fetch_sale(&mut *conn, sale_id).await?;
    ensure_editable(&sale)?;

    let removed = sqlx::query("DELETE FROM sale_items WHERE id = ?1 AND sale_id = ?2")
        .bind(item_id)
        .bind(sale_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    if removed == 0 {
        return Err(CoreError::SaleItemNotFound(item_id.to_string()).into());
    }

    touch(&mut *conn, sale_id, now).await
}

/// Recomputes the total from the stored items and writes it on the sale.
async fn store_total(conn: &mut SqliteConnection, sale_id: &str, now: DateTime<Utc>) -> DbResult<Money> {
    let items = sqlx::query_as::<_, SaleItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY position"
    ))
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    let total = agency_core::sale::recompute_total(&items)?;

    sqlx::query("UPDATE sales SET total_amount_cents = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(sale_id)
        .bind(total.cents())
        .bind(now)
        .execute(&mut *conn)
        .await?;

    Ok(total)
}

async fn touch(conn: &mut SqliteConnection, sale_id: &str, now: DateTime<Utc>) -> DbResult<()> {
    sqlx::query("UPDATE sales SET updated_at = ?2 WHERE id = ?1")
        .bind(sale_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Moves a sale from `from` to `to`; fails if another writer got there first.
async fn transition(
    conn: &mut SqliteConnection,
    sale: &Sale,
    from: SaleStatus,
    to: SaleStatus,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let updated = sqlx::query("UPDATE sales SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2")
        .bind(&sale.id)
        .bind(from)
        .bind(to)
        .bind(now)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(CoreError::InvalidSaleStatus {
            sale_id: sale.id.clone(),
            current_status: sale.status.to_string(),
        }
        .into());
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing;
    use crate::Database;
    use agency_core::filter::MovementFilter;
    use agency_core::{Customer, Product, MAX_PRICE_CENTS, MAX_QUANTITY};

    struct Shop {
        db: Database,
        customer: Customer,
        resistor: Product,
        led: Product,
    }

    /// Resistor: 10 in stock at 5.00. LED: 4 in stock at 1.50.
    async fn shop() -> Shop {
        let db = testing::db().await;
        let cat = testing::category(&db, "Composants").await;
        let resistor = testing::stocked_product(&db, &cat.id, "RES-220", 500, 10).await;
        let led = testing::stocked_product(&db, &cat.id, "LED-R5", 150, 4).await;
        let customer = testing::customer(&db, "Atelier Lumière").await;
        Shop {
            db,
            customer,
            resistor,
            led,
        }
    }

    async fn new_sale(shop: &Shop) -> Sale {
        shop.db
            .sales()
            .create(
                NewSale {
                    customer_id: shop.customer.id.clone(),
                    notes: "Commande atelier".to_string(),
                },
                "marie",
            )
            .await
            .unwrap()
    }

    async fn add(shop: &Shop, sale: &Sale, product: &Product, quantity: i64) -> SaleItemView {
        shop.db
            .sales()
            .add_item(
                &sale.id,
                NewSaleItem {
                    product_id: product.id.clone(),
                    quantity,
                    unit_price_cents: None,
                },
            )
            .await
            .unwrap()
    }

    async fn stock_of(shop: &Shop, product: &Product) -> i64 {
        shop.db
            .stock()
            .get_level(&product.id)
            .await
            .unwrap()
            .unwrap()
            .level
            .current_stock
    }

    #[tokio::test]
    async fn test_create_requires_customer() {
        let shop = shop().await;
        let err = shop
            .db
            .sales()
            .create(
                NewSale {
                    customer_id: "missing".to_string(),
                    notes: String::new(),
                },
                "marie",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::CustomerNotFound(_))));
    }

    #[tokio::test]
    async fn test_items_and_recompute_total() {
        let shop = shop().await;
        let sale = new_sale(&shop).await;
        assert_eq!(sale.status, SaleStatus::Pending);
        assert_eq!(sale.total_amount_cents, 0);

        let first = add(&shop, &sale, &shop.resistor, 2).await;
        let second = add(&shop, &sale, &shop.led, 3).await;
        assert_eq!(first.item.unit_price_cents, 500);
        assert!(second.item.position > first.item.position);

        let total = shop.db.sales().recompute_total(&sale.id).await.unwrap();
        assert_eq!(total.to_string(), "14.50");
        // Idempotent
        assert_eq!(shop.db.sales().recompute_total(&sale.id).await.unwrap(), total);

        let view = shop.db.sales().get(&sale.id).await.unwrap().unwrap();
        assert_eq!(view.sale.total_amount_cents, 1450);
        assert_eq!(view.customer_name, "Atelier Lumière");

        shop.db.sales().remove_item(&sale.id, &first.item.id).await.unwrap();
        let items = shop.db.sales().items(&sale.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].sku, "LED-R5");
        assert_eq!(shop.db.sales().recompute_total(&sale.id).await.unwrap().cents(), 450);
    }

    #[tokio::test]
    async fn test_explicit_unit_price() {
        let shop = shop().await;
        let sale = new_sale(&shop).await;
        let item = shop
            .db
            .sales()
            .add_item(
                &sale.id,
                NewSaleItem {
                    product_id: shop.resistor.id.clone(),
                    quantity: 1,
                    unit_price_cents: Some(450),
                },
            )
            .await
            .unwrap();
        assert_eq!(item.item.unit_price_cents, 450);
    }

    #[tokio::test]
    async fn test_unit_price_above_ceiling_rejected() {
        let shop = shop().await;
        let sale = new_sale(&shop).await;
        let err = shop
            .db
            .sales()
            .add_item(
                &sale.id,
                NewSaleItem {
                    product_id: shop.resistor.id.clone(),
                    quantity: 2,
                    unit_price_cents: Some(i64::MAX / 2 + 1),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        assert!(shop.db.sales().items(&sale.id).await.unwrap().is_empty());
        assert!(shop.db.sales().recompute_total(&sale.id).await.unwrap().is_zero());
    }

    #[tokio::test]
    async fn test_add_item_and_recompute_keeps_total_in_step() {
        let shop = shop().await;
        let sale = new_sale(&shop).await;

        let (first, total) = shop
            .db
            .sales()
            .add_item_and_recompute(
                &sale.id,
                NewSaleItem {
                    product_id: shop.resistor.id.clone(),
                    quantity: 2,
                    unit_price_cents: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(total.cents(), 1000);
        add(&shop, &sale, &shop.led, 3).await;

        let total = shop
            .db
            .sales()
            .remove_item_and_recompute(&sale.id, &first.item.id)
            .await
            .unwrap();
        assert_eq!(total.cents(), 450);
        let view = shop.db.sales().get(&sale.id).await.unwrap().unwrap();
        assert_eq!(view.sale.total_amount_cents, 450);
    }

    #[tokio::test]
    async fn test_total_overflow_keeps_sale_unchanged() {
        let shop = shop().await;
        let sale = new_sale(&shop).await;
        let line = |product: &Product| NewSaleItem {
            product_id: product.id.clone(),
            quantity: MAX_QUANTITY,
            unit_price_cents: Some(MAX_PRICE_CENTS),
        };

        // 922 maximal lines still fit in i64 cents, the 923rd does not.
        for _ in 0..922 {
            shop.db.sales().add_item(&sale.id, line(&shop.resistor)).await.unwrap();
        }
        let total = shop.db.sales().recompute_total(&sale.id).await.unwrap();
        assert_eq!(total.cents(), 922 * MAX_QUANTITY * MAX_PRICE_CENTS);

        let err = shop
            .db
            .sales()
            .add_item_and_recompute(&sale.id, line(&shop.led))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::AmountOverflow(_))));

        let items = shop.db.sales().items(&sale.id).await.unwrap();
        assert_eq!(items.len(), 922);
        assert!(items.iter().all(|i| i.sku == "RES-220"));
        let view = shop.db.sales().get(&sale.id).await.unwrap().unwrap();
        assert_eq!(view.sale.total_amount_cents, total.cents());
    }

    #[tokio::test]
    async fn test_complete_deducts_stock_and_writes_ledger() {
        let shop = shop().await;
        let sale = new_sale(&shop).await;
        add(&shop, &sale, &shop.resistor, 2).await;
        add(&shop, &sale, &shop.led, 3).await;

        let completed = shop.db.sales().complete(&sale.id, "marie").await.unwrap();
        assert_eq!(completed.sale.status, SaleStatus::Completed);
        assert_eq!(stock_of(&shop, &shop.resistor).await, 8);
        assert_eq!(stock_of(&shop, &shop.led).await, 1);

        let outs = shop
            .db
            .stock()
            .all_movements(&MovementFilter {
                product_id: None,
                movement_type: Some(MovementType::Out),
            })
            .await
            .unwrap();
        assert_eq!(outs.len(), 2);
        assert!(outs
            .iter()
            .all(|m| m.movement.reference == format!("Sale #{}", sale.id)));
        assert!(outs
            .iter()
            .all(|m| m.movement.notes == "Sale to Atelier Lumière"));

        // Completing twice is a no-op
        shop.db.sales().complete(&sale.id, "marie").await.unwrap();
        assert_eq!(stock_of(&shop, &shop.resistor).await, 8);
    }

    #[tokio::test]
    async fn test_complete_with_insufficient_stock_changes_nothing() {
        let shop = shop().await;
        let sale = new_sale(&shop).await;
        add(&shop, &sale, &shop.resistor, 2).await;
        add(&shop, &sale, &shop.led, 5).await;

        let err = shop.db.sales().complete(&sale.id, "marie").await.unwrap_err();
        match err {
            DbError::Domain(CoreError::InsufficientStock {
                sku,
                available,
                requested,
                ..
            }) => {
                assert_eq!(sku, "LED-R5");
                assert_eq!(available, 4);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(stock_of(&shop, &shop.resistor).await, 10);
        assert_eq!(stock_of(&shop, &shop.led).await, 4);
        let view = shop.db.sales().get(&sale.id).await.unwrap().unwrap();
        assert_eq!(view.sale.status, SaleStatus::Pending);
        assert_eq!(shop.db.stock().count_movements(&shop.resistor.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_same_product_on_two_lines_uses_running_balance() {
        let shop = shop().await;
        let sale = new_sale(&shop).await;
        add(&shop, &sale, &shop.led, 3).await;
        add(&shop, &sale, &shop.led, 3).await;

        let err = shop.db.sales().complete(&sale.id, "marie").await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 1, requested: 3, .. })
        ));
        assert_eq!(stock_of(&shop, &shop.led).await, 4);
    }

    #[tokio::test]
    async fn test_cancel_completed_restores_stock() {
        let shop = shop().await;
        let sale = new_sale(&shop).await;
        add(&shop, &sale, &shop.resistor, 2).await;
        add(&shop, &sale, &shop.led, 3).await;
        shop.db.sales().complete(&sale.id, "marie").await.unwrap();

        let cancelled = shop.db.sales().cancel(&sale.id, "paul").await.unwrap();
        assert_eq!(cancelled.sale.status, SaleStatus::Cancelled);
        assert_eq!(stock_of(&shop, &shop.resistor).await, 10);
        assert_eq!(stock_of(&shop, &shop.led).await, 4);

        let resistor_moves = shop
            .db
            .stock()
            .all_movements(&MovementFilter {
                product_id: Some(shop.resistor.id.clone()),
                movement_type: None,
            })
            .await
            .unwrap();
        // Opening IN, sale OUT, cancellation IN (newest first)
        assert_eq!(resistor_moves.len(), 3);
        assert_eq!(resistor_moves[0].movement.movement_type, MovementType::In);
        assert_eq!(
            resistor_moves[0].movement.reference,
            format!("Cancellation of sale #{}", sale.id)
        );
        assert_eq!(resistor_moves[0].movement.created_by, "paul");
        assert_eq!(resistor_moves[1].movement.movement_type, MovementType::Out);

        // Cancelling again is a no-op
        shop.db.sales().cancel(&sale.id, "paul").await.unwrap();
        assert_eq!(stock_of(&shop, &shop.resistor).await, 10);
    }

    #[tokio::test]
    async fn test_cancel_pending_has_no_stock_effect() {
        let shop = shop().await;
        let sale = new_sale(&shop).await;
        add(&shop, &sale, &shop.resistor, 2).await;

        shop.db.sales().cancel(&sale.id, "marie").await.unwrap();
        assert_eq!(stock_of(&shop, &shop.resistor).await, 10);
        assert_eq!(shop.db.stock().count_movements(&shop.resistor.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_sale_cannot_be_completed_or_edited() {
        let shop = shop().await;
        let sale = new_sale(&shop).await;
        let item = add(&shop, &sale, &shop.resistor, 2).await;
        shop.db.sales().cancel(&sale.id, "marie").await.unwrap();

        let err = shop.db.sales().complete(&sale.id, "marie").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidSaleStatus { .. })));

        let err = shop
            .db
            .sales()
            .remove_item(&sale.id, &item.item.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidSaleStatus { .. })));
    }

    #[tokio::test]
    async fn test_completed_sale_items_are_frozen() {
        let shop = shop().await;
        let sale = new_sale(&shop).await;
        add(&shop, &sale, &shop.resistor, 1).await;
        shop.db.sales().complete(&sale.id, "marie").await.unwrap();

        let err = shop
            .db
            .sales()
            .add_item(
                &sale.id,
                NewSaleItem {
                    product_id: shop.led.id.clone(),
                    quantity: 1,
                    unit_price_cents: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidSaleStatus { .. })));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let shop = shop().await;
        let first = new_sale(&shop).await;
        add(&shop, &first, &shop.resistor, 1).await;
        shop.db.sales().complete(&first.id, "marie").await.unwrap();
        let second = new_sale(&shop).await;

        let all = shop
            .db
            .sales()
            .list(&SaleFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.items[0].sale.id, second.id);

        let completed = shop
            .db
            .sales()
            .list(
                &SaleFilter {
                    status: Some(SaleStatus::Completed),
                    ..Default::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(completed.total, 1);
        assert_eq!(completed.items[0].sale.id, first.id);

        let by_name = shop
            .db
            .sales()
            .all(&SaleFilter {
                search: Some("lumière".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        // LIKE folds ASCII case only; the accented letter matches as typed
        assert_eq!(by_name.len(), 2);

        let today = Utc::now().date_naive();
        let dated = shop
            .db
            .sales()
            .all(&SaleFilter {
                date_from: Some(today),
                date_to: Some(today),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(dated.len(), 2);
    }
}

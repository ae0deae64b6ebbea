//! CSV imports: products (upsert by SKU) and customers (upsert by email).

use chrono::Utc;
use tracing::{debug, info, warn};

use super::{read_records, CsvExchange, IMPORT_REFERENCE};
use crate::error::{DbError, DbResult};
use crate::repository::stock::{
    apply_delta, fetch_or_create_level, record_movement, set_thresholds, LedgerEntry,
};
use crate::repository::{category, customer, product};
use agency_core::records::{CustomerRecord, ImportReport, ProductRecord, ProductRow};
use agency_core::{CustomerInput, MovementType, ProductInput, StockThresholds};

const PRODUCT_REQUIRED: &[&str] = &["Name", "SKU", "Category", "Price", "Cost_Price"];
const CUSTOMER_REQUIRED: &[&str] = &["name"];

/// Whether a row created a new entity or updated an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Upsert {
    Created,
    Updated,
}

fn tally(report: &mut ImportReport, outcome: Upsert) {
    match outcome {
        Upsert::Created => report.created += 1,
        Upsert::Updated => report.updated += 1,
    }
}

impl CsvExchange {
    /// Imports products from CSV text.
    ///
    /// Per row: the category is created by name if missing, the product is
    /// upserted by SKU, `Stock_Minimum` updates the threshold and a
    /// `Stock_Actuel` that differs from the balance is reconciled through the
    /// ledger.
    ///
    /// ## Errors
    /// Only file-level problems (unreadable CSV, missing columns) fail the
    /// call; row problems land in [`ImportReport::errors`].
    pub async fn import_products(&self, data: &str, actor: &str) -> DbResult<ImportReport> {
        let rows = read_records::<ProductRecord>(data, PRODUCT_REQUIRED)?;
        let mut report = ImportReport::default();

        for (line, record) in rows {
            let row = match record.and_then(|r| r.parse().map_err(|e| e.to_string())) {
                Ok(row) => row,
                Err(message) => {
                    debug!(line, %message, "Product row rejected");
                    report.reject(line, message);
                    continue;
                }
            };

            match self.import_product_row(&row, actor).await {
                Ok(outcome) => tally(&mut report, outcome),
                Err(e) => {
                    warn!(line, sku = %row.sku, error = %e, "Product row failed");
                    report.reject(line, e.to_string());
                }
            }
        }

        info!(
            created = report.created,
            updated = report.updated,
            rejected = report.errors.len(),
            "Products imported"
        );
        Ok(report)
    }

    /// Imports customers from CSV text. Rows with an email update the
    /// customer holding that address; the others are always created.
    pub async fn import_customers(&self, data: &str) -> DbResult<ImportReport> {
        let rows = read_records::<CustomerRecord>(data, CUSTOMER_REQUIRED)?;
        let mut report = ImportReport::default();

        for (line, record) in rows {
            let input = match record.and_then(|r| r.parse().map_err(|e| e.to_string())) {
                Ok(input) => input,
                Err(message) => {
                    debug!(line, %message, "Customer row rejected");
                    report.reject(line, message);
                    continue;
                }
            };

            match self.import_customer_row(&input).await {
                Ok(outcome) => tally(&mut report, outcome),
                Err(e) => {
                    warn!(line, error = %e, "Customer row failed");
                    report.reject(line, e.to_string());
                }
            }
        }

        info!(
            created = report.created,
            updated = report.updated,
            rejected = report.errors.len(),
            "Customers imported"
        );
        Ok(report)
    }

    async fn import_product_row(&self, row: &ProductRow, actor: &str) -> DbResult<Upsert> {
        let mut tx = self.db.pool().begin().await?;

        let (category, _) = category::get_or_create(&mut tx, &row.category).await?;
        let input = ProductInput {
            name: row.name.clone(),
            description: row.description.clone(),
            sku: row.sku.clone(),
            category_id: category.id,
            price_cents: row.price_cents,
            cost_price_cents: row.cost_price_cents,
            is_active: row.is_active,
        }
        .validated()?;

        let (product, outcome) = match product::find_by_sku(&mut tx, &row.sku).await? {
            Some(existing) => {
                let updated = product::update(&mut tx, &existing.id, &input)
                    .await?
                    .ok_or_else(|| DbError::not_found("Product", &existing.id))?;
                (updated, Upsert::Updated)
            }
            None => (product::insert(&mut tx, &input).await?, Upsert::Created),
        };

        if row.current_stock.is_some() || row.minimum_stock.is_some() {
            let now = Utc::now();
            let level = fetch_or_create_level(&mut tx, &product.id, now).await?;

            if let Some(minimum_stock) = row.minimum_stock {
                let thresholds = StockThresholds {
                    minimum_stock,
                    maximum_stock: level.maximum_stock,
                }
                .validated()?;
                set_thresholds(&mut tx, &product.id, thresholds, now).await?;
            }

            if let Some(target) = row.current_stock {
                // ADJUSTMENT needs a positive quantity; emptying is an OUT
                let (movement_type, quantity) = match target {
                    t if t == level.current_stock => (None, 0),
                    0 => (Some(MovementType::Out), level.current_stock),
                    t => (Some(MovementType::Adjustment), t),
                };

                if let Some(movement_type) = movement_type {
                    apply_delta(&mut tx, &product.id, movement_type, quantity, now)
                        .await?
                        .ok_or_else(|| DbError::not_found("StockLevel", &product.id))?;
                    record_movement(
                        &mut tx,
                        &LedgerEntry {
                            product_id: &product.id,
                            movement_type,
                            quantity,
                            reference: IMPORT_REFERENCE,
                            notes: "",
                            actor,
                        },
                        now,
                    )
                    .await?;
                }
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn import_customer_row(&self, input: &CustomerInput) -> DbResult<Upsert> {
        let mut tx = self.db.pool().begin().await?;

        let existing = if input.email.is_empty() {
            None
        } else {
            customer::find_by_email(&mut tx, &input.email).await?
        };

        let outcome = match existing {
            Some(found) => {
                customer::update(&mut tx, &found.id, input)
                    .await?
                    .ok_or_else(|| DbError::not_found("Customer", &found.id))?;
                Upsert::Updated
            }
            None => {
                customer::insert(&mut tx, input).await?;
                Upsert::Created
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # CSV Records
//!
//! Row shapes for every CSV file the agency exchanges. Field renames carry
//! the exact header text; the `csv` crate in agency-db does the reading
//! and writing.
//!
//! ```text
//! ┌──────────────┬────────────────────────────────────────────────────────────┐
//! │ File         │ Header                                                     │
//! ├──────────────┼────────────────────────────────────────────────────────────┤
//! │ products     │ Name,SKU,Category,Price,Cost_Price,Status,Description,     │
//! │              │ Stock_Actuel,Stock_Minimum                                 │
//! │ sales        │ id,customer,date,status,total,creator                      │
//! │ customers    │ name,email,phone,address,date                              │
//! │ movements    │ date,product,type,quantity,reference,creator,notes         │
//! │ stock levels │ product,sku,current_stock,minimum_stock,maximum_stock,     │
//! │              │ status                                                     │
//! └──────────────┴────────────────────────────────────────────────────────────┘
//! ```
//!
//! Money is written as a two-decimal string (`12.50`), never as cents.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::stock::StockStatus;
use crate::types::{Customer, CustomerInput, SaleView, StockLevelView, StockMovementView};
use crate::validation::{
    validate_category_name, validate_price_cents, validate_product_name, validate_sku,
    ValidationResult,
};
use crate::MAX_QUANTITY;

/// `date` column of sales and movements.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";
/// `date` column of customers.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// Product
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "SKU")]
    pub sku: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Price")]
    pub price: String,
    #[serde(rename = "Cost_Price")]
    pub cost_price: String,
    #[serde(rename = "Status", default)]
    pub status: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "Stock_Actuel", default)]
    pub stock_actuel: String,
    #[serde(rename = "Stock_Minimum", default)]
    pub stock_minimum: String,
}

/// A product row after parsing and validation, ready to upsert by SKU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRow {
    pub name: String,
    pub sku: String,
    pub category: String,
    pub price_cents: i64,
    pub cost_price_cents: i64,
    pub is_active: bool,
    pub description: String,
    /// `None` when the column is blank: leave the balance alone.
    pub current_stock: Option<i64>,
    pub minimum_stock: Option<i64>,
}

impl ProductRecord {
    pub fn parse(&self) -> ValidationResult<ProductRow> {
        let name = self.name.trim().to_string();
        let sku = self.sku.trim().to_string();
        let category = self.category.trim().to_string();

        validate_product_name(&name)?;
        validate_sku(&sku)?;
        validate_category_name(&category).map_err(|e| rename_field(e, "Category"))?;

        let price_cents = Money::parse_decimal(&self.price)
            .map_err(|e| rename_field(e, "Price"))?
            .cents();
        validate_price_cents("Price", price_cents)?;

        let cost_price_cents = Money::parse_decimal(&self.cost_price)
            .map_err(|e| rename_field(e, "Cost_Price"))?
            .cents();
        validate_price_cents("Cost_Price", cost_price_cents)?;

        Ok(ProductRow {
            name,
            sku,
            category,
            price_cents,
            cost_price_cents,
            is_active: parse_status(&self.status)?,
            description: self.description.trim().to_string(),
            current_stock: parse_count("Stock_Actuel", &self.stock_actuel)?,
            minimum_stock: parse_count("Stock_Minimum", &self.stock_minimum)?,
        })
    }
}

fn rename_field(err: ValidationError, field: &str) -> ValidationError {
    let field = field.to_string();
    match err {
        ValidationError::Required { .. } => ValidationError::Required { field },
        ValidationError::TooLong { max, .. } => ValidationError::TooLong { field, max },
        ValidationError::OutOfRange { min, max, .. } => ValidationError::OutOfRange { field, min, max },
        ValidationError::MustBePositive { .. } => ValidationError::MustBePositive { field },
        ValidationError::InvalidFormat { reason, .. } => ValidationError::InvalidFormat { field, reason },
        ValidationError::NotAllowed { allowed, .. } => ValidationError::NotAllowed { field, allowed },
    }
}

fn parse_status(status: &str) -> ValidationResult<bool> {
    match status.trim().to_ascii_lowercase().as_str() {
        "" | "active" => Ok(true),
        "inactive" => Ok(false),
        _ => Err(ValidationError::NotAllowed {
            field: "Status".to_string(),
            allowed: vec!["Active".to_string(), "Inactive".to_string()],
        }),
    }
}

fn parse_count(field: &str, value: &str) -> ValidationResult<Option<i64>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let count: i64 = value.parse().map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "expected a whole number".to_string(),
    })?;
    if !(0..=MAX_QUANTITY).contains(&count) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_QUANTITY,
        });
    }
    Ok(Some(count))
}

/// Status column for products.
pub fn product_status_label(is_active: bool) -> &'static str {
    if is_active {
        "Active"
    } else {
        "Inactive"
    }
}

// =============================================================================
// Sale
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub id: String,
    pub customer: String,
    pub date: String,
    pub status: String,
    pub total: String,
    pub creator: String,
}

impl From<&SaleView> for SaleRecord {
    fn from(view: &SaleView) -> Self {
        SaleRecord {
            id: view.sale.id.clone(),
            customer: view.customer_name.clone(),
            date: view.sale.sale_date.format(DATETIME_FORMAT).to_string(),
            status: view.sale.status.label().to_string(),
            total: view.sale.total_amount().to_string(),
            creator: view.sale.created_by.clone(),
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    /// Written on export; ignored on import.
    #[serde(default)]
    pub date: String,
}

impl From<&Customer> for CustomerRecord {
    fn from(customer: &Customer) -> Self {
        CustomerRecord {
            name: customer.name.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
            address: customer.address.clone(),
            date: customer.created_at.format(DATE_FORMAT).to_string(),
        }
    }
}

impl CustomerRecord {
    pub fn parse(&self) -> ValidationResult<CustomerInput> {
        CustomerInput {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
        }
        .validated()
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementRecord {
    pub date: String,
    pub product: String,
    #[serde(rename = "type")]
    pub movement_type: String,
    pub quantity: i64,
    pub reference: String,
    pub creator: String,
    pub notes: String,
}

impl From<&StockMovementView> for MovementRecord {
    fn from(view: &StockMovementView) -> Self {
        MovementRecord {
            date: view.movement.created_at.format(DATETIME_FORMAT).to_string(),
            product: view.product_name.clone(),
            movement_type: view.movement.movement_type.to_string(),
            quantity: view.movement.quantity,
            reference: view.movement.reference.clone(),
            creator: view.movement.created_by.clone(),
            notes: view.movement.notes.clone(),
        }
    }
}

// =============================================================================
// Stock Level
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLevelRecord {
    pub product: String,
    pub sku: String,
    pub current_stock: i64,
    pub minimum_stock: i64,
    pub maximum_stock: i64,
    pub status: String,
}

impl From<&StockLevelView> for StockLevelRecord {
    fn from(view: &StockLevelView) -> Self {
        StockLevelRecord {
            product: view.product_name.clone(),
            sku: view.sku.clone(),
            current_stock: view.level.current_stock,
            minimum_stock: view.level.minimum_stock,
            maximum_stock: view.level.maximum_stock,
            status: StockStatus::of(view.level.current_stock, view.level.minimum_stock)
                .label()
                .to_string(),
        }
    }
}

// =============================================================================
// Import Report
// =============================================================================

/// A rejected data row. `line` is 1-based with the header on line 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RowError {
    pub line: u64,
    pub message: String,
}

/// Outcome of an import: rows that failed do not stop the others.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ImportReport {
    pub created: u64,
    pub updated: u64,
    pub errors: Vec<RowError>,
}

impl ImportReport {
    pub fn reject(&mut self, line: u64, message: impl Into<String>) {
        self.errors.push(RowError {
            line,
            message: message.into(),
        });
    }

    pub fn processed(&self) -> u64 {
        self.created + self.updated
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

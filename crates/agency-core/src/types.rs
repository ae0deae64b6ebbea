//! # Domain Types
//!
//! Core domain types used throughout the agency back office.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────┐  1..*  ┌──────────────┐  0..1  ┌──────────────┐       │
//! │  │   Category   │───────►│   Product    │───────►│  StockLevel  │       │
//! │  └──────────────┘        └──────┬───────┘        └──────────────┘       │
//! │                                 │ 0..*                                  │
//! │                                 ▼                                       │
//! │                          ┌──────────────┐                               │
//! │                          │StockMovement │  append-only ledger           │
//! │                          └──────────────┘                               │
//! │                                                                         │
//! │  ┌──────────────┐  0..*  ┌──────────────┐  0..*  ┌──────────────┐       │
//! │  │   Customer   │───────►│     Sale     │───────►│   SaleItem   │       │
//! │  └──────────────┘        └──────────────┘        └──────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conventions
//! - `id`: UUID v4 string generated by the application
//! - Money columns end in `_cents` and are exposed as [`Money`] by accessors
//! - `*View` types are read models joined with display columns (names, SKUs)
//! - `*Input` types are what callers submit; they validate themselves

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::{
    validate_category_name, validate_customer_name, validate_email, validate_phone,
    validate_price_cents, validate_product_name, validate_quantity, validate_reference,
    validate_sku, validate_stock_thresholds, ValidationResult,
};

// =============================================================================
// Category
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Category listing row with the number of products it owns.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CategoryView {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub category: Category,
    pub product_count: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl CategoryInput {
    /// Trims text fields and checks every rule.
    pub fn validated(mut self) -> ValidationResult<Self> {
        self.name = self.name.trim().to_string();
        self.description = self.description.trim().to_string();
        validate_category_name(&self.name)?;
        Ok(self)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalogue product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Stock Keeping Unit - unique business identifier.
    pub sku: String,
    pub category_id: String,
    pub price_cents: i64,
    pub cost_price_cents: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    /// Profit margin in basis points: (price − cost) / price × 10000.
    ///
    /// ```rust
    /// use agency_core::types::margin_bps;
    ///
    /// // 25.00 sold, 15.00 cost → 40.00%
    /// assert_eq!(margin_bps(2500, 1500), 4000);
    /// ```
    pub fn profit_margin_bps(&self) -> i64 {
        margin_bps(self.price_cents, self.cost_price_cents)
    }
}

/// Margin in basis points, zero when the price is not positive.
pub fn margin_bps(price_cents: i64, cost_price_cents: i64) -> i64 {
    if price_cents <= 0 {
        return 0;
    }
    let margin = (price_cents - cost_price_cents) as i128 * 10_000 / price_cents as i128;
    margin as i64
}

/// Product listing row joined with its category and stock balance.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductView {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub product: Product,
    pub category_name: String,
    /// `None` when the product has no stock level yet.
    pub current_stock: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub sku: String,
    pub category_id: String,
    pub price_cents: i64,
    pub cost_price_cents: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl ProductInput {
    pub fn validated(mut self) -> ValidationResult<Self> {
        self.name = self.name.trim().to_string();
        self.description = self.description.trim().to_string();
        self.sku = self.sku.trim().to_string();
        self.category_id = self.category_id.trim().to_string();

        validate_product_name(&self.name)?;
        validate_sku(&self.sku)?;
        if self.category_id.is_empty() {
            return Err(ValidationError::Required {
                field: "category_id".to_string(),
            });
        }
        validate_price_cents("price", self.price_cents)?;
        validate_price_cents("cost_price", self.cost_price_cents)?;
        Ok(self)
    }
}

// =============================================================================
// Stock
// =============================================================================

/// Running stock balance of one product.
///
/// Behaviour (status, thresholds, balance arithmetic) lives in [`crate::stock`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockLevel {
    pub id: String,
    pub product_id: String,
    pub current_stock: i64,
    pub minimum_stock: i64,
    pub maximum_stock: i64,
    #[ts(as = "String")]
    pub last_updated: DateTime<Utc>,
}

/// Stock level joined with product display columns.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockLevelView {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub level: StockLevel,
    pub product_name: String,
    pub sku: String,
    pub price_cents: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockThresholds {
    pub minimum_stock: i64,
    pub maximum_stock: i64,
}

impl StockThresholds {
    pub fn validated(self) -> ValidationResult<Self> {
        validate_stock_thresholds(self.minimum_stock, self.maximum_stock)?;
        Ok(self)
    }
}

/// Kind of ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum MovementType {
    /// Goods received.
    In,
    /// Goods shipped (sales, losses).
    Out,
    /// Inventory count: balance set to the quantity.
    Adjustment,
    /// Move between locations. Rejected by the ledger for now.
    Transfer,
}

impl MovementType {
    pub const ALL: [MovementType; 4] = [
        MovementType::In,
        MovementType::Out,
        MovementType::Adjustment,
        MovementType::Transfer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
            MovementType::Adjustment => "ADJUSTMENT",
            MovementType::Transfer => "TRANSFER",
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MovementType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "movement_type".to_string(),
                allowed: MovementType::ALL.iter().map(|t| t.as_str().to_string()).collect(),
            })
    }
}

/// One immutable ledger row.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub reference: String,
    pub notes: String,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovementView {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub movement: StockMovement,
    pub product_name: String,
    pub sku: String,
}

/// A manually recorded movement (outside the sale flow).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewMovement {
    pub product_id: String,
    pub movement_type: MovementType,
    pub quantity: i64,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub notes: String,
}

impl NewMovement {
    pub fn validated(mut self) -> ValidationResult<Self> {
        self.reference = self.reference.trim().to_string();
        self.notes = self.notes.trim().to_string();
        validate_quantity(self.quantity)?;
        validate_reference(&self.reference)?;
        Ok(self)
    }
}

// =============================================================================
// Customer
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerInput {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

impl CustomerInput {
    pub fn validated(mut self) -> ValidationResult<Self> {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_string();
        self.phone = self.phone.trim().to_string();
        self.address = self.address.trim().to_string();

        validate_customer_name(&self.name)?;
        validate_email(&self.email)?;
        validate_phone(&self.phone)?;
        Ok(self)
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale. See [`crate::sale`] for the transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum SaleStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

impl SaleStatus {
    pub const ALL: [SaleStatus; 3] = [
        SaleStatus::Pending,
        SaleStatus::Completed,
        SaleStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "PENDING",
            SaleStatus::Completed => "COMPLETED",
            SaleStatus::Cancelled => "CANCELLED",
        }
    }

    /// Human label used in exports.
    pub fn label(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "Pending",
            SaleStatus::Completed => "Completed",
            SaleStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SaleStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SaleStatus::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: SaleStatus::ALL.iter().map(|st| st.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A customer order.
///
/// `total_amount_cents` is a cached derivation of the items; it is refreshed
/// by [`crate::sale::recompute_total`], not on every item change.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub customer_id: String,
    pub status: SaleStatus,
    pub total_amount_cents: i64,
    pub notes: String,
    pub created_by: String,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleView {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub sale: Sale,
    pub customer_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSale {
    pub customer_id: String,
    #[serde(default)]
    pub notes: String,
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item. Ordered within its sale by `position`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub position: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl SaleItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// quantity × unit price. Computed, never stored.
    #[inline]
    pub fn line_total(&self) -> CoreResult<Money> {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItemView {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub item: SaleItem,
    pub product_name: String,
    pub sku: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSaleItem {
    pub product_id: String,
    pub quantity: i64,
    /// Defaults to the product's current price.
    #[serde(default)]
    pub unit_price_cents: Option<i64>,
}

impl NewSaleItem {
    pub fn validated(self) -> ValidationResult<Self> {
        validate_quantity(self.quantity)?;
        if let Some(price) = self.unit_price_cents {
            validate_price_cents("unit_price", price)?;
        }
        Ok(self)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    fn item(quantity: i64, unit_price_cents: i64) -> SaleItem {
        SaleItem {
            id: "i".to_string(),
            sale_id: "s".to_string(),
            product_id: "p".to_string(),
            position: 0,
            quantity,
            unit_price_cents,
        }
    }

    #[test]
    fn test_line_total() {
        assert_eq!(item(3, 150).line_total().unwrap().cents(), 450);
        assert!(matches!(
            item(2, i64::MAX / 2 + 1).line_total(),
            Err(CoreError::AmountOverflow(_))
        ));
    }

    #[test]
    fn test_profit_margin() {
        assert_eq!(margin_bps(2500, 1500), 4000);
        assert_eq!(margin_bps(1000, 1000), 0);
        assert_eq!(margin_bps(0, 100), 0);
        // Sold below cost
        assert_eq!(margin_bps(1000, 1500), -5000);
    }

    #[test]
    fn test_movement_type_parsing() {
        assert_eq!("in".parse::<MovementType>().unwrap(), MovementType::In);
        assert_eq!(
            "ADJUSTMENT".parse::<MovementType>().unwrap(),
            MovementType::Adjustment
        );
        assert!("LOST".parse::<MovementType>().is_err());
    }

    #[test]
    fn test_sale_status_serde() {
        let json = serde_json::to_string(&SaleStatus::Completed).unwrap();
        assert_eq!(json, "\"COMPLETED\"");
        assert_eq!("pending".parse::<SaleStatus>().unwrap(), SaleStatus::Pending);
        assert_eq!(SaleStatus::default(), SaleStatus::Pending);
    }

    #[test]
    fn test_product_input_validation() {
        let input = ProductInput {
            name: "  Arduino Uno R3 ".to_string(),
            description: String::new(),
            sku: "ARD-UNO".to_string(),
            category_id: "cat".to_string(),
            price_cents: 2500,
            cost_price_cents: 1500,
            is_active: true,
        };
        let valid = input.clone().validated().unwrap();
        assert_eq!(valid.name, "Arduino Uno R3");

        let mut bad = input.clone();
        bad.price_cents = 0;
        assert!(matches!(
            bad.validated(),
            Err(ValidationError::MustBePositive { .. })
        ));

        let mut bad = input;
        bad.sku = "ARD UNO".to_string();
        assert!(matches!(
            bad.validated(),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_sale_item_price_ceiling() {
        let item = NewSaleItem {
            product_id: "p".to_string(),
            quantity: 2,
            unit_price_cents: Some(crate::MAX_PRICE_CENTS),
        };
        assert!(item.clone().validated().is_ok());

        let huge = NewSaleItem {
            unit_price_cents: Some(i64::MAX / 2 + 1),
            ..item
        };
        assert!(matches!(
            huge.validated(),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_customer_input_validation() {
        let ok = CustomerInput {
            name: "Jean Dupont".to_string(),
            email: "jean@example.com".to_string(),
            ..Default::default()
        };
        assert!(ok.validated().is_ok());

        let bad = CustomerInput {
            name: "Jean Dupont".to_string(),
            email: "not-an-email".to_string(),
            ..Default::default()
        };
        assert!(bad.validated().is_err());
    }
}

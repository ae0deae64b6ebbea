//! # Validation Module
//!
//! Input validation utilities.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractors / CSV deserialization                        │
//! │  └── Type validation (JSON shape, query strings, columns)              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  └── Business rule validation (lengths, formats, positivity)           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE constraints (sku, category name)                           │
//! │  ├── CHECK constraints (current_stock >= 0, quantity > 0)              │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use agency_core::validation::{validate_sku, validate_quantity};
//!
//! assert!(validate_sku("ARD-UNO").is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::{MAX_PRICE_CENTS, MAX_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn required_max(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    max_len(field, value, max)
}

fn max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only letters, digits, hyphens, underscores
///
/// ```rust
/// use agency_core::validation::validate_sku;
///
/// assert!(validate_sku("LED-R5").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(51).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    required_max("sku", sku, 50)?;

    if !sku
        .trim()
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Product names: required, at most 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    required_max("name", name, 200)
}

/// Category names: required, at most 100 characters.
pub fn validate_category_name(name: &str) -> ValidationResult<()> {
    required_max("name", name, 100)
}

/// Customer names: required, at most 200 characters.
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    required_max("name", name, 200)
}

/// Validates an optional email address.
///
/// Empty is allowed. Otherwise one `@` with a non-empty local part and a
/// dotted domain.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Ok(());
    }

    max_len("email", email, 254)?;

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must look like name@domain.tld".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || email.chars().any(char::is_whitespace)
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }

    Ok(())
}

/// Phone numbers: optional, at most 20 characters.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    max_len("phone", phone.trim(), 20)
}

/// Movement references: optional, at most 100 characters.
pub fn validate_reference(reference: &str) -> ValidationResult<()> {
    max_len("reference", reference.trim(), 100)
}

/// Validates a search query.
///
/// Empty is allowed (no filter). Returns the trimmed query.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();
    max_len("search", query, 100)?;
    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity (sale item or stock movement).
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_QUANTITY`]
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_QUANTITY,
        });
    }

    Ok(())
}

/// Prices must be strictly positive (the smallest accepted price is 0.01)
/// and at most [`MAX_PRICE_CENTS`] (99,999,999.99).
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    if cents > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_PRICE_CENTS,
        });
    }
    Ok(())
}

/// Minimum must be ≥ 0 and maximum ≥ 1.
pub fn validate_stock_thresholds(minimum: i64, maximum: i64) -> ValidationResult<()> {
    if !(0..=MAX_QUANTITY).contains(&minimum) {
        return Err(ValidationError::OutOfRange {
            field: "minimum_stock".to_string(),
            min: 0,
            max: MAX_QUANTITY,
        });
    }
    if !(1..=MAX_QUANTITY).contains(&maximum) {
        return Err(ValidationError::OutOfRange {
            field: "maximum_stock".to_string(),
            min: 1,
            max: MAX_QUANTITY,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

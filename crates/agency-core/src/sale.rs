//! # Sale Lifecycle
//!
//! The sale state machine and the pure parts of completion/cancellation.
//! The database layer runs the resulting plans inside one transaction.
//!
//! ## State Machine
//! ```text
//!                 complete()                  cancel()
//!   ┌─────────┐ ─────────────► ┌───────────┐ ───────────► ┌───────────┐
//!   │ PENDING │                │ COMPLETED │  (restock)   │ CANCELLED │
//!   └─────────┘ ─────────────────────────────────────────►└───────────┘
//!        │              cancel() (no stock effect)              ▲
//!        │                                                      │
//!        └── add_item / remove_item allowed only here           │
//!                                                               │
//!   complete() on COMPLETED → no-op                             │
//!   complete() on CANCELLED → InvalidSaleStatus                 │
//!   cancel()   on CANCELLED → no-op ────────────────────────────┘
//! ```

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::stock::{next_balance, BalanceError};
use crate::types::{MovementType, Sale, SaleItem, SaleItemView, SaleStatus};

// =============================================================================
// Transitions
// =============================================================================

/// What `complete` has to do for a sale in its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionAction {
    AlreadyCompleted,
    DeductStock,
}

/// What `cancel` has to do for a sale in its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationAction {
    AlreadyCancelled,
    /// PENDING: status change only.
    MarkCancelled,
    /// COMPLETED: give the stock back, then mark cancelled.
    RestoreStock,
}

pub fn completion_action(sale: &Sale) -> CoreResult<CompletionAction> {
    match sale.status {
        SaleStatus::Pending => Ok(CompletionAction::DeductStock),
        SaleStatus::Completed => Ok(CompletionAction::AlreadyCompleted),
        SaleStatus::Cancelled => Err(invalid_status(sale)),
    }
}

pub fn cancellation_action(sale: &Sale) -> CancellationAction {
    match sale.status {
        SaleStatus::Pending => CancellationAction::MarkCancelled,
        SaleStatus::Completed => CancellationAction::RestoreStock,
        SaleStatus::Cancelled => CancellationAction::AlreadyCancelled,
    }
}

/// Items can only change while the sale is PENDING.
pub fn ensure_editable(sale: &Sale) -> CoreResult<()> {
    if sale.status == SaleStatus::Pending {
        Ok(())
    } else {
        Err(invalid_status(sale))
    }
}

fn invalid_status(sale: &Sale) -> CoreError {
    CoreError::InvalidSaleStatus {
        sale_id: sale.id.clone(),
        current_status: sale.status.to_string(),
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Σ quantity × unit price over the items.
///
/// ```rust
/// use agency_core::sale::recompute_total;
/// # use agency_core::SaleItem;
/// # fn item(q: i64, p: i64) -> SaleItem {
/// #     SaleItem { id: String::new(), sale_id: String::new(), product_id: String::new(),
/// #                position: 0, quantity: q, unit_price_cents: p }
/// # }
/// let items = vec![item(2, 500), item(3, 150)];
/// assert_eq!(recompute_total(&items).unwrap().to_string(), "14.50");
/// ```
///
/// ## Errors
/// `AmountOverflow` when a line or the running total leaves the cents range.
pub fn recompute_total<'a, I>(items: I) -> CoreResult<Money>
where
    I: IntoIterator<Item = &'a SaleItem>,
{
    items
        .into_iter()
        .try_fold(Money::zero(), |total, item| total.checked_add(item.line_total()?))
}

// =============================================================================
// Completion Planning
// =============================================================================

/// One stock decrement the completion will apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDeduction {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
}

/// Checks every item against the available stock before anything is written.
///
/// Items for the same product draw from one running balance, so two lines
/// of 3 against a balance of 5 fail on the second line. A product without
/// a stock level counts as having none.
///
/// ## Returns
/// One [`StockDeduction`] per item, in item order, or the first
/// `InsufficientStock` encountered.
pub fn plan_completion<F>(items: &[SaleItemView], mut available: F) -> CoreResult<Vec<StockDeduction>>
where
    F: FnMut(&str) -> Option<i64>,
{
    let mut balances: HashMap<&str, i64> = HashMap::new();
    let mut plan = Vec::with_capacity(items.len());

    for view in items {
        let product_id = view.item.product_id.as_str();
        let balance = match balances.get(product_id) {
            Some(b) => *b,
            None => available(product_id).unwrap_or(0),
        };

        let remaining = next_balance(balance, MovementType::Out, view.item.quantity)
            .map_err(|e: BalanceError| e.into_core(&view.product_name, &view.sku))?;
        balances.insert(product_id, remaining);

        plan.push(StockDeduction {
            product_id: product_id.to_string(),
            product_name: view.product_name.clone(),
            quantity: view.item.quantity,
        });
    }

    Ok(plan)
}

// =============================================================================
// Ledger Wording
// =============================================================================

pub fn sale_reference(sale_id: &str) -> String {
    format!("Sale #{}", sale_id)
}

pub fn sale_notes(customer_name: &str) -> String {
    format!("Sale to {}", customer_name)
}

pub fn cancellation_reference(sale_id: &str) -> String {
    format!("Cancellation of sale #{}", sale_id)
}

pub fn cancellation_notes(customer_name: &str) -> String {
    format!("Cancelled sale to {}", customer_name)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sale(status: SaleStatus) -> Sale {
        Sale {
            id: "sale-1".to_string(),
            customer_id: "c".to_string(),
            status,
            total_amount_cents: 0,
            notes: String::new(),
            created_by: "admin".to_string(),
            sale_date: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(product: &str, quantity: i64, unit_price_cents: i64) -> SaleItemView {
        SaleItemView {
            item: SaleItem {
                id: format!("{}-{}", product, quantity),
                sale_id: "sale-1".to_string(),
                product_id: product.to_string(),
                position: 0,
                quantity,
                unit_price_cents,
            },
            product_name: format!("Product {}", product),
            sku: product.to_uppercase(),
        }
    }

    #[test]
    fn test_recompute_total() {
        let items = [item("a", 2, 500), item("b", 3, 150)];
        let total = recompute_total(items.iter().map(|v| &v.item)).unwrap();
        assert_eq!(total.cents(), 1450);

        let empty: Vec<SaleItem> = Vec::new();
        assert!(recompute_total(&empty).unwrap().is_zero());
    }

    #[test]
    fn test_recompute_total_overflow() {
        let huge_line = [item("a", 2, i64::MAX / 2 + 1)];
        assert!(matches!(
            recompute_total(huge_line.iter().map(|v| &v.item)),
            Err(CoreError::AmountOverflow(_))
        ));

        let big = i64::MAX / 3;
        let lines = [item("a", 1, big), item("b", 1, big), item("c", 1, big), item("d", 1, big)];
        assert!(recompute_total(lines.iter().map(|v| &v.item)).is_err());
    }

    #[test]
    fn test_completion_transitions() {
        assert_eq!(
            completion_action(&sale(SaleStatus::Pending)).unwrap(),
            CompletionAction::DeductStock
        );
        assert_eq!(
            completion_action(&sale(SaleStatus::Completed)).unwrap(),
            CompletionAction::AlreadyCompleted
        );
        assert!(matches!(
            completion_action(&sale(SaleStatus::Cancelled)),
            Err(CoreError::InvalidSaleStatus { .. })
        ));
    }

    #[test]
    fn test_cancellation_transitions() {
        assert_eq!(
            cancellation_action(&sale(SaleStatus::Pending)),
            CancellationAction::MarkCancelled
        );
        assert_eq!(
            cancellation_action(&sale(SaleStatus::Completed)),
            CancellationAction::RestoreStock
        );
        assert_eq!(
            cancellation_action(&sale(SaleStatus::Cancelled)),
            CancellationAction::AlreadyCancelled
        );
    }

    #[test]
    fn test_ensure_editable() {
        assert!(ensure_editable(&sale(SaleStatus::Pending)).is_ok());
        assert!(ensure_editable(&sale(SaleStatus::Completed)).is_err());
        assert!(ensure_editable(&sale(SaleStatus::Cancelled)).is_err());
    }

    #[test]
    fn test_plan_completion_ok() {
        let items = [item("a", 2, 500), item("b", 1, 100)];
        let plan = plan_completion(&items, |_| Some(10)).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].product_id, "a");
        assert_eq!(plan[0].quantity, 2);
    }

    #[test]
    fn test_plan_completion_uses_running_balance() {
        // Two lines of 3 for the same product against a balance of 5
        let items = [item("a", 3, 100), item("a", 3, 100)];
        let err = plan_completion(&items, |_| Some(5)).unwrap_err();
        match err {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 2);
                assert_eq!(requested, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_plan_completion_missing_level() {
        let items = [item("a", 1, 100)];
        let err = plan_completion(&items, |_| None).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 0, .. }
        ));
    }

    #[test]
    fn test_ledger_wording() {
        assert_eq!(sale_reference("42"), "Sale #42");
        assert_eq!(sale_notes("Jean"), "Sale to Jean");
        assert_eq!(cancellation_reference("42"), "Cancellation of sale #42");
        assert_eq!(cancellation_notes("Jean"), "Cancelled sale to Jean");
    }
}

//! # Filter Criteria
//!
//! Explicit, typed list criteria. Each list query accepts exactly one of
//! these structs; the database layer maps every field to a fixed SQL clause,
//! so no caller-controlled column names or operators ever reach SQL.
//!
//! ```text
//! GET /api/sales?search=dupont&status=COMPLETED&date_from=2024-05-01&page=2
//!        │
//!        ▼
//! SaleFilter { search: "dupont", status: Some(Completed), date_from, .. }
//! PageRequest { page: 2, per_page: 20 }
//!        │  .normalized()
//!        ▼
//! SaleRepository::list(&filter, page)
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{MovementType, SaleStatus};
use crate::validation::{validate_search_query, ValidationResult};
use crate::DEFAULT_PAGE_SIZE;

// =============================================================================
// Pagination
// =============================================================================

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn first_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        PageRequest { page, per_page }
    }

    /// Clamps to `page >= 1` and `1..=max_per_page`.
    pub fn normalized(self, max_per_page: u32) -> Self {
        PageRequest {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, max_per_page.max(1)),
        }
    }

    #[inline]
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    #[inline]
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }
}

/// One page of results plus the totals needed to render pagination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Paged<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: i64) -> Self {
        let per_page = i64::from(request.per_page.max(1));
        Paged {
            items,
            page: request.page,
            per_page: request.per_page,
            total,
            total_pages: (total + per_page - 1) / per_page,
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Paged<U> {
        Paged {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages,
        }
    }
}

// =============================================================================
// Criteria
// =============================================================================

fn normalize_search(search: Option<String>) -> ValidationResult<Option<String>> {
    match search {
        Some(s) => {
            let s = validate_search_query(&s)?;
            Ok(if s.is_empty() { None } else { Some(s) })
        }
        None => Ok(None),
    }
}

fn normalize_id(id: Option<String>) -> Option<String> {
    id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Products: text over name, SKU and description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category_id: Option<String>,
    pub is_active: Option<bool>,
}

impl ProductFilter {
    pub fn normalized(self) -> ValidationResult<Self> {
        Ok(ProductFilter {
            search: normalize_search(self.search)?,
            category_id: normalize_id(self.category_id),
            is_active: self.is_active,
        })
    }
}

/// Stock status buckets accepted by the stock list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatusFilter {
    /// current ≤ minimum (includes out of stock)
    Low,
    /// current == 0
    Out,
}

/// Stock levels: text over product name and SKU.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockFilter {
    pub search: Option<String>,
    pub status: Option<StockStatusFilter>,
}

impl StockFilter {
    pub fn normalized(self) -> ValidationResult<Self> {
        Ok(StockFilter {
            search: normalize_search(self.search)?,
            status: self.status,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovementFilter {
    pub product_id: Option<String>,
    pub movement_type: Option<MovementType>,
}

impl MovementFilter {
    pub fn normalized(self) -> Self {
        MovementFilter {
            product_id: normalize_id(self.product_id),
            movement_type: self.movement_type,
        }
    }
}

/// Sales: text over customer name and notes, inclusive date range on the
/// sale date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaleFilter {
    pub search: Option<String>,
    pub status: Option<SaleStatus>,
    pub customer_id: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl SaleFilter {
    pub fn normalized(self) -> ValidationResult<Self> {
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(ValidationError::InvalidFormat {
                    field: "date_from".to_string(),
                    reason: "must not be after date_to".to_string(),
                });
            }
        }
        Ok(SaleFilter {
            search: normalize_search(self.search)?,
            status: self.status,
            customer_id: normalize_id(self.customer_id),
            date_from: self.date_from,
            date_to: self.date_to,
        })
    }
}

/// Customers: text over name, email and phone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerFilter {
    pub search: Option<String>,
}

impl CustomerFilter {
    pub fn normalized(self) -> ValidationResult<Self> {
        Ok(CustomerFilter {
            search: normalize_search(self.search)?,
        })
    }
}

/// Wraps a search term for `LIKE ? ESCAPE '\'`.
pub fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_PAGE_SIZE;

    #[test]
    fn test_page_request_normalization() {
        let p = PageRequest::new(0, 0).normalized(MAX_PAGE_SIZE);
        assert_eq!(p, PageRequest::new(1, 1));

        let p = PageRequest::new(3, 500).normalized(MAX_PAGE_SIZE);
        assert_eq!(p.per_page, MAX_PAGE_SIZE);
        assert_eq!(p.offset(), 2 * i64::from(MAX_PAGE_SIZE));

        assert_eq!(PageRequest::default().per_page, 20);
    }

    #[test]
    fn test_paged_total_pages() {
        let paged = Paged::new(vec![1, 2], PageRequest::new(1, 20), 41);
        assert_eq!(paged.total_pages, 3);

        let empty: Paged<i32> = Paged::new(vec![], PageRequest::new(1, 20), 0);
        assert_eq!(empty.total_pages, 0);

        let doubled = paged.map(|x| x * 2);
        assert_eq!(doubled.items, vec![2, 4]);
    }

    #[test]
    fn test_blank_search_is_no_filter() {
        let f = CustomerFilter {
            search: Some("   ".to_string()),
        }
        .normalized()
        .unwrap();
        assert!(f.search.is_none());
    }

    #[test]
    fn test_sale_filter_date_order() {
        let f = SaleFilter {
            date_from: NaiveDate::from_ymd_opt(2024, 5, 2),
            date_to: NaiveDate::from_ymd_opt(2024, 5, 1),
            ..Default::default()
        };
        assert!(f.normalized().is_err());
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("led"), "%led%");
        assert_eq!(like_pattern("10%_off"), "%10\\%\\_off%");
    }

    #[test]
    fn test_stock_status_filter_serde() {
        let f: StockStatusFilter = serde_json::from_str("\"out\"").unwrap();
        assert_eq!(f, StockStatusFilter::Out);
    }
}

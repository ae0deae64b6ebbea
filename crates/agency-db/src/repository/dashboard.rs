//! # Dashboard Repository
//!
//! Read-only aggregates over products, stock and completed sales.
//!
//! Revenue only counts COMPLETED sales. Days and months are compared on the
//! leading characters of the stored RFC 3339 timestamps (`YYYY-MM-DD`,
//! `YYYY-MM`), so all periods are UTC.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::sale::SaleRepository;
use crate::repository::stock::StockRepository;
use agency_core::filter::{SaleFilter, StockFilter, StockStatusFilter};
use agency_core::{PageRequest, SaleStatus, SaleView, StockLevelView, StockMovementView};

const RECENT_ITEMS: i64 = 5;

/// Everything the home screen shows.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardOverview {
    pub total_products: i64,
    pub active_products: i64,
    /// Σ current stock × price, in cents.
    pub stock_value_cents: i64,
    /// Low but not out of stock.
    pub low_stock_count: i64,
    pub out_of_stock_count: i64,
    pub completed_sales: i64,
    pub total_revenue_cents: i64,
    pub today_sales: i64,
    pub today_revenue_cents: i64,
    pub month_sales: i64,
    pub month_revenue_cents: i64,
    pub recent_movements: Vec<StockMovementView>,
    pub recent_sales: Vec<SaleView>,
    pub top_products: Vec<TopProduct>,
    pub low_stock_items: Vec<StockLevelView>,
}

/// Best seller by quantity across completed sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct TopProduct {
    pub product_id: String,
    pub product_name: String,
    pub sku: String,
    pub quantity_sold: i64,
    pub revenue_cents: i64,
}

/// Completed sales of one day. `total_revenue` is in cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct DailySales {
    pub day: String,
    pub total_sales: i64,
    pub total_revenue: i64,
}

/// Completed sales of one month (`YYYY-MM`). `total_revenue` is in cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct MonthlySales {
    pub month: String,
    pub total_sales: i64,
    pub total_revenue: i64,
}

#[derive(Debug, Clone)]
pub struct DashboardRepository {
    pool: SqlitePool,
}

impl DashboardRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DashboardRepository { pool }
    }

    pub async fn overview(&self, today: NaiveDate) -> DbResult<DashboardOverview> {
        let day = today.format("%Y-%m-%d").to_string();
        let month = today.format("%Y-%m").to_string();
        debug!(%day, "Building dashboard overview");

        // TOTAL() sums in floating point and never raises; CAST saturates at i64::MAX.
        let (total_products, active_products, stock_value_cents): (i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM products),
                    (SELECT COUNT(*) FROM products WHERE is_active = 1),
                    (SELECT CAST(TOTAL(s.current_stock * p.price_cents) AS INTEGER)
                       FROM stock_levels s JOIN products p ON p.id = s.product_id)
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

        let (low_stock_count, out_of_stock_count): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM stock_levels
                  WHERE current_stock <= minimum_stock AND current_stock > 0),
                (SELECT COUNT(*) FROM stock_levels WHERE current_stock = 0)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let (completed_sales, total_revenue_cents, today_sales, today_revenue_cents, month_sales, month_revenue_cents): (i64, i64, i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    COUNT(*),
                    CAST(TOTAL(total_amount_cents) AS INTEGER),
                    COUNT(CASE WHEN substr(sale_date, 1, 10) = ?2 THEN 1 END),
                    CAST(TOTAL(CASE WHEN substr(sale_date, 1, 10) = ?2 THEN total_amount_cents END) AS INTEGER),
                    COUNT(CASE WHEN substr(sale_date, 1, 7) = ?3 THEN 1 END),
                    CAST(TOTAL(CASE WHEN substr(sale_date, 1, 7) = ?3 THEN total_amount_cents END) AS INTEGER)
                FROM sales
                WHERE status = ?1
                "#,
            )
            .bind(SaleStatus::Completed)
            .bind(&day)
            .bind(&month)
            .fetch_one(&self.pool)
            .await?;

        let top_products = sqlx::query_as::<_, TopProduct>(
            r#"
            SELECT
                p.id AS product_id,
                p.name AS product_name,
                p.sku AS sku,
                SUM(i.quantity) AS quantity_sold,
                CAST(TOTAL(i.quantity * i.unit_price_cents) AS INTEGER) AS revenue_cents
            FROM sale_items i
            JOIN sales s ON s.id = i.sale_id
            JOIN products p ON p.id = i.product_id
            WHERE s.status = ?1
            GROUP BY p.id
            ORDER BY quantity_sold DESC, p.name
            LIMIT ?2
            "#,
        )
        .bind(SaleStatus::Completed)
        .bind(RECENT_ITEMS)
        .fetch_all(&self.pool)
        .await?;

        let stock = StockRepository::new(self.pool.clone());
        let recent_movements = stock.recent_movements(RECENT_ITEMS).await?;
        let low_stock_items = stock
            .list_levels(
                &StockFilter {
                    search: None,
                    status: Some(StockStatusFilter::Low),
                },
                PageRequest::new(1, RECENT_ITEMS as u32),
            )
            .await?
            .items;

        let recent_sales = SaleRepository::new(self.pool.clone())
            .list(
                &SaleFilter {
                    status: Some(SaleStatus::Completed),
                    ..Default::default()
                },
                PageRequest::new(1, RECENT_ITEMS as u32),
            )
            .await?
            .items;

        Ok(DashboardOverview {
            total_products,
            active_products,
            stock_value_cents,
            low_stock_count,
            out_of_stock_count,
            completed_sales,
            total_revenue_cents,
            today_sales,
            today_revenue_cents,
            month_sales,
            month_revenue_cents,
            recent_movements,
            recent_sales,
            top_products,
            low_stock_items,
        })
    }

    /// Completed sales per day in `[from, to]`; days without sales are absent.
    pub async fn daily_sales(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<DailySales>> {
        let days = sqlx::query_as::<_, DailySales>(
            r#"
            SELECT
                substr(sale_date, 1, 10) AS day,
                COUNT(*) AS total_sales,
                CAST(TOTAL(total_amount_cents) AS INTEGER) AS total_revenue
            FROM sales
            WHERE status = ?1 AND substr(sale_date, 1, 10) BETWEEN ?2 AND ?3
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(SaleStatus::Completed)
        .bind(from.format("%Y-%m-%d").to_string())
        .bind(to.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(days)
    }

    /// The most recent `limit` months with completed sales, oldest first.
    pub async fn monthly_sales(&self, limit: u32) -> DbResult<Vec<MonthlySales>> {
        let mut months = sqlx::query_as::<_, MonthlySales>(
            r#"
            SELECT
                substr(sale_date, 1, 7) AS month,
                COUNT(*) AS total_sales,
                CAST(TOTAL(total_amount_cents) AS INTEGER) AS total_revenue
            FROM sales
            WHERE status = ?1
            GROUP BY month
            ORDER BY month DESC
            LIMIT ?2
            "#,
        )
        .bind(SaleStatus::Completed)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        months.reverse();
        Ok(months)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

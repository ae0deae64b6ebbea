//! CSV exports. Each returns the whole file as a `String`.

use std::collections::HashMap;
use tracing::info;

use super::{write_records, CsvExchange};
use crate::error::DbResult;
use agency_core::filter::{CustomerFilter, MovementFilter, ProductFilter, SaleFilter, StockFilter};
use agency_core::records::{
    product_status_label, CustomerRecord, MovementRecord, ProductRecord, SaleRecord,
    StockLevelRecord,
};
use agency_core::ProductView;

const PRODUCT_HEADERS: &[&str] = &[
    "Name",
    "SKU",
    "Category",
    "Price",
    "Cost_Price",
    "Status",
    "Description",
    "Stock_Actuel",
    "Stock_Minimum",
];
const STOCK_LEVEL_HEADERS: &[&str] = &[
    "product",
    "sku",
    "current_stock",
    "minimum_stock",
    "maximum_stock",
    "status",
];
const MOVEMENT_HEADERS: &[&str] = &["date", "product", "type", "quantity", "reference", "creator", "notes"];
const SALE_HEADERS: &[&str] = &["id", "customer", "date", "status", "total", "creator"];
const CUSTOMER_HEADERS: &[&str] = &["name", "email", "phone", "address", "date"];

impl CsvExchange {
    pub async fn export_products(&self, filter: &ProductFilter) -> DbResult<String> {
        let products = self.db.products().all(filter).await?;
        let minimums: HashMap<String, i64> = self
            .db
            .stock()
            .all_levels(&StockFilter::default())
            .await?
            .into_iter()
            .map(|view| (view.level.product_id, view.level.minimum_stock))
            .collect();

        let records = products.iter().map(|view| {
            let minimum = minimums.get(&view.product.id).copied().unwrap_or(0);
            product_record(view, minimum)
        });
        let csv = write_records(PRODUCT_HEADERS, records)?;

        info!(rows = products.len(), "Products exported");
        Ok(csv)
    }

    pub async fn export_stock_levels(&self, filter: &StockFilter) -> DbResult<String> {
        let levels = self.db.stock().all_levels(filter).await?;
        let csv = write_records(STOCK_LEVEL_HEADERS, levels.iter().map(StockLevelRecord::from))?;

        info!(rows = levels.len(), "Stock levels exported");
        Ok(csv)
    }

    /// Newest first.
    pub async fn export_movements(&self, filter: &MovementFilter) -> DbResult<String> {
        let movements = self.db.stock().all_movements(filter).await?;
        let csv = write_records(MOVEMENT_HEADERS, movements.iter().map(MovementRecord::from))?;

        info!(rows = movements.len(), "Stock movements exported");
        Ok(csv)
    }

    /// Newest first.
    pub async fn export_sales(&self, filter: &SaleFilter) -> DbResult<String> {
        let sales = self.db.sales().all(filter).await?;
        let csv = write_records(SALE_HEADERS, sales.iter().map(SaleRecord::from))?;

        info!(rows = sales.len(), "Sales exported");
        Ok(csv)
    }

    pub async fn export_customers(&self, filter: &CustomerFilter) -> DbResult<String> {
        let customers = self.db.customers().all(filter).await?;
        let csv = write_records(CUSTOMER_HEADERS, customers.iter().map(CustomerRecord::from))?;

        info!(rows = customers.len(), "Customers exported");
        Ok(csv)
    }
}

fn product_record(view: &ProductView, minimum_stock: i64) -> ProductRecord {
    let product = &view.product;
    ProductRecord {
        name: product.name.clone(),
        sku: product.sku.clone(),
        category: view.category_name.clone(),
        price: product.price().to_string(),
        cost_price: product.cost_price().to_string(),
        status: product_status_label(product.is_active).to_string(),
        description: product.description.clone(),
        stock_actuel: view.current_stock.unwrap_or(0).to_string(),
        stock_minimum: minimum_stock.to_string(),
    }
}

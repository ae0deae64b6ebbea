//! # Repository Module
//!
//! Database repository implementations.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HTTP handler                                                           │
//! │       │                                                                 │
//! │       │  db.sales().complete(&id, actor)                                │
//! │       ▼                                                                 │
//! │  SaleRepository                                                         │
//! │  ├── plan with agency-core (pure)                                       │
//! │  └── apply inside one transaction                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  stock::ledger helpers ── shared by sales, manual movements, imports    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CategoryRepository`](category::CategoryRepository) - Categories
//! - [`ProductRepository`](product::ProductRepository) - Catalogue
//! - [`StockRepository`](stock::StockRepository) - Levels and movement ledger
//! - [`CustomerRepository`](customer::CustomerRepository) - Customers
//! - [`SaleRepository`](sale::SaleRepository) - Sales, items, lifecycle
//! - [`DashboardRepository`](dashboard::DashboardRepository) - Aggregates

pub mod category;
pub mod customer;
pub mod dashboard;
pub mod product;
pub mod sale;
pub mod stock;

use uuid::Uuid;

/// Generates a new primary key.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by repository tests.

    use agency_core::{
        Category, CategoryInput, Customer, CustomerInput, MovementType, NewMovement, Product,
        ProductInput,
    };

    use crate::{Database, DbConfig};

    pub async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub async fn category(db: &Database, name: &str) -> Category {
        db.categories()
            .create(CategoryInput {
                name: name.to_string(),
                description: String::new(),
            })
            .await
            .unwrap()
    }

    pub async fn product(db: &Database, category_id: &str, sku: &str, price_cents: i64) -> Product {
        db.products()
            .create(ProductInput {
                name: format!("Product {}", sku),
                description: String::new(),
                sku: sku.to_string(),
                category_id: category_id.to_string(),
                price_cents,
                cost_price_cents: price_cents / 2 + 1,
                is_active: true,
            })
            .await
            .unwrap()
    }

    /// Product with an opening IN movement of `stock`.
    pub async fn stocked_product(db: &Database, category_id: &str, sku: &str, price_cents: i64, stock: i64) -> Product {
        let product = product(db, category_id, sku, price_cents).await;
        if stock > 0 {
            db.stock()
                .add_movement(
                    NewMovement {
                        product_id: product.id.clone(),
                        movement_type: MovementType::In,
                        quantity: stock,
                        reference: "Opening".to_string(),
                        notes: String::new(),
                    },
                    "tester",
                )
                .await
                .unwrap();
        }
        product
    }

    pub async fn customer(db: &Database, name: &str) -> Customer {
        db.customers()
            .create(CustomerInput {
                name: name.to_string(),
                ..Default::default()
            })
            .await
            .unwrap()
    }
}

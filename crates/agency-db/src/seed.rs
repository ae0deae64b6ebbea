//! # Sample Data
//!
//! Fills an empty database with the agency's sample catalogue and a
//! reproducible set of customers and sales.
//!
//! Everything random comes from [`SeedConfig::seed`]: the same seed against
//! an empty database always yields the same customers, the same sale lines
//! and the same outcomes. Sales are driven through the real repository
//! operations, so every balance is explained by the ledger.

use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::sale;
use agency_core::{
    CategoryInput, CoreError, CustomerInput, MovementType, NewMovement, NewSaleItem, Product,
    ProductInput, StockThresholds,
};

const CATEGORIES: &[(&str, &str)] = &[
    ("Résistances", "Composants résistifs pour circuits électroniques"),
    ("Condensateurs", "Condensateurs électrolytiques et céramiques"),
    ("LEDs", "Diodes électroluminescentes de différentes couleurs"),
    ("Microcontrôleurs", "Cartes de développement et microcontrôleurs"),
    ("Capteurs", "Capteurs de température, mouvement, etc."),
    ("Accessoires", "Breadboards, câbles et autres accessoires"),
];

/// A sample product. Prices in cents.
struct SampleProduct {
    name: &'static str,
    sku: &'static str,
    category: &'static str,
    price_cents: i64,
    cost_price_cents: i64,
    description: &'static str,
    stock: i64,
    minimum_stock: i64,
}

macro_rules! sample {
    ($name:expr, $sku:expr, $cat:expr, $price:expr, $cost:expr, $desc:expr, $stock:expr, $min:expr) => {
        SampleProduct {
            name: $name,
            sku: $sku,
            category: $cat,
            price_cents: $price,
            cost_price_cents: $cost,
            description: $desc,
            stock: $stock,
            minimum_stock: $min,
        }
    };
}

const PRODUCTS: &[SampleProduct] = &[
    sample!("Résistance 10K Ohm", "RES-10K", "Résistances", 50, 25, "Résistance 10K Ohm 1/4W 5%", 500, 100),
    sample!("Résistance 1K Ohm", "RES-1K", "Résistances", 50, 25, "Résistance 1K Ohm 1/4W 5%", 450, 100),
    sample!("Résistance 220 Ohm", "RES-220", "Résistances", 50, 25, "Résistance 220 Ohm 1/4W 5%", 600, 150),
    sample!("Condensateur 100uF 25V", "CAP-100UF", "Condensateurs", 120, 60, "Condensateur électrolytique 100uF 25V", 200, 50),
    sample!("Condensateur 10uF 16V", "CAP-10UF", "Condensateurs", 80, 40, "Condensateur électrolytique 10uF 16V", 250, 60),
    sample!("Condensateur 0.1uF", "CAP-100NF", "Condensateurs", 30, 15, "Condensateur céramique 0.1uF 50V", 400, 100),
    sample!("LED Rouge 5mm", "LED-RED-5MM", "LEDs", 30, 15, "LED rouge 5mm diffuse standard", 800, 200),
    sample!("LED Verte 5mm", "LED-GREEN-5MM", "LEDs", 30, 15, "LED verte 5mm diffuse standard", 750, 200),
    sample!("LED Bleue 5mm", "LED-BLUE-5MM", "LEDs", 40, 20, "LED bleue 5mm haute luminosité", 600, 150),
    sample!("LED RGB 5mm", "LED-RGB-5MM", "LEDs", 150, 75, "LED RGB 5mm cathode commune", 300, 75),
    sample!("Arduino Uno R3", "ARD-UNO", "Microcontrôleurs", 2500, 1500, "Carte Arduino Uno R3 ATmega328P", 50, 10),
    sample!("Arduino Nano", "ARD-NANO", "Microcontrôleurs", 1800, 1000, "Carte Arduino Nano compatible", 75, 15),
    sample!("ESP32 DevKit", "ESP32-DEV", "Microcontrôleurs", 1200, 700, "Module ESP32 WiFi + Bluetooth", 100, 20),
    sample!("Raspberry Pi Pico", "RPI-PICO", "Microcontrôleurs", 800, 500, "Raspberry Pi Pico RP2040", 80, 20),
    sample!("Capteur DHT11", "SENS-DHT11", "Capteurs", 350, 200, "Capteur température et humidité", 120, 30),
    sample!("Capteur Ultrason HC-SR04", "SENS-HCSR04", "Capteurs", 250, 150, "Capteur de distance ultrason", 150, 40),
    sample!("Capteur PIR", "SENS-PIR", "Capteurs", 200, 120, "Capteur de mouvement infrarouge", 100, 25),
    sample!("Breadboard 830 points", "BRD-830", "Accessoires", 550, 300, "Breadboard 830 points avec support", 75, 20),
    sample!("Câbles Jumper M/M x40", "CABLE-MM-40", "Accessoires", 250, 120, "Pack 40 câbles jumper mâle-mâle", 150, 30),
    sample!("Câbles Jumper M/F x40", "CABLE-MF-40", "Accessoires", 250, 120, "Pack 40 câbles jumper mâle-femelle", 140, 30),
];

/// (name, email, phone, address)
const CUSTOMERS: &[(&str, &str, &str, &str)] = &[
    ("TechSolutions SARL", "contact@techsolutions.com", "0612345678", "15 Avenue des Technologies, Paris 75001"),
    ("ElectroMart", "commandes@electromart.fr", "0623456789", "42 Rue de l'Innovation, Lyon 69002"),
    ("MakerSpace Lyon", "info@makerspace-lyon.fr", "0634567890", "8 Place des Makers, Lyon 69003"),
    ("Université Paris Tech", "lab@paristech.edu", "0145678901", "25 Boulevard de la Science, Paris 75005"),
    ("Innovation Lab", "contact@innovationlab.fr", "0656789012", "33 Rue du Progrès, Toulouse 31000"),
];

const CITIES: &[&str] = &["Paris", "Lyon", "Marseille", "Toulouse", "Nantes", "Lille", "Bordeaux"];
const TRADES: &[&str] = &["Atelier", "Électronique", "Robotique", "Domotique", "Labo", "FabLab"];

const OPENING_REFERENCE: &str = "INIT-001";
const OPENING_NOTES: &str = "Stock initial";

/// Days back over which sale dates are spread.
const SALE_WINDOW_DAYS: i64 = 60;

// =============================================================================
// Configuration
// =============================================================================

/// What to generate. Passed explicitly; nothing is read from globals.
#[derive(Debug, Clone)]
pub struct SeedConfig {
    /// Seed of the generator. Same seed, same data.
    pub seed: u64,
    pub customers: usize,
    pub sales: usize,
    /// Recorded as `created_by` on sales and ledger rows.
    pub actor: String,
}

impl Default for SeedConfig {
    fn default() -> Self {
        SeedConfig {
            seed: 42,
            customers: 5,
            sales: 12,
            actor: "admin".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub categories: usize,
    pub products: usize,
    pub customers: usize,
    pub sales: usize,
    pub completed: usize,
    pub cancelled: usize,
}

// =============================================================================
// Generator
// =============================================================================

/// Generator behind every random choice of a run.
fn generator(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// A customer beyond the fixed sample list.
fn generated_customer(rng: &mut StdRng, n: usize) -> CustomerInput {
    let trade = TRADES[rng.gen_range(0..TRADES.len())];
    let city = CITIES[rng.gen_range(0..CITIES.len())];
    CustomerInput {
        name: format!("{trade} {city} {n}"),
        email: format!("client{n}@example.com"),
        phone: format!("06{:08}", rng.gen_range(0..100_000_000u32)),
        address: format!("{} Rue Principale, {city}", rng.gen_range(1..=150)),
    }
}

// =============================================================================
// Entry Point
// =============================================================================

/// Seeds an empty database.
///
/// ## Errors
/// Refuses to run when products already exist (`ConstraintViolation`).
pub async fn run(db: &Database, config: &SeedConfig) -> DbResult<SeedReport> {
    let existing = db.products().count().await?;
    if existing > 0 {
        return Err(DbError::ConstraintViolation {
            message: format!("database already holds {existing} products"),
        });
    }

    info!(seed = config.seed, customers = config.customers, sales = config.sales, "Seeding database");

    let mut rng = generator(config.seed);
    let mut report = SeedReport::default();

    let products = seed_catalogue(db, config, &mut report).await?;
    let customer_ids = seed_customers(db, config, &mut rng, &mut report).await?;
    if !customer_ids.is_empty() && !products.is_empty() {
        seed_sales(db, config, &mut rng, &customer_ids, &products, &mut report).await?;
    }

    info!(?report, "Seed complete");
    Ok(report)
}

async fn seed_catalogue(
    db: &Database,
    config: &SeedConfig,
    report: &mut SeedReport,
) -> DbResult<Vec<Product>> {
    let mut category_ids = HashMap::new();
    for (name, description) in CATEGORIES {
        let category = db
            .categories()
            .create(CategoryInput {
                name: name.to_string(),
                description: description.to_string(),
            })
            .await?;
        category_ids.insert(*name, category.id);
        report.categories += 1;
    }

    let mut products = Vec::with_capacity(PRODUCTS.len());
    for sample in PRODUCTS {
        let category_id = category_ids
            .get(sample.category)
            .cloned()
            .ok_or_else(|| CoreError::CategoryNotFound(sample.category.to_string()))?;

        let product = db
            .products()
            .create(ProductInput {
                name: sample.name.to_string(),
                description: sample.description.to_string(),
                sku: sample.sku.to_string(),
                category_id,
                price_cents: sample.price_cents,
                cost_price_cents: sample.cost_price_cents,
                is_active: true,
            })
            .await?;

        db.stock()
            .add_movement(
                NewMovement {
                    product_id: product.id.clone(),
                    movement_type: MovementType::In,
                    quantity: sample.stock,
                    reference: OPENING_REFERENCE.to_string(),
                    notes: OPENING_NOTES.to_string(),
                },
                &config.actor,
            )
            .await?;
        db.stock()
            .update_thresholds(
                &product.id,
                StockThresholds {
                    minimum_stock: sample.minimum_stock,
                    maximum_stock: sample.stock * 3,
                },
            )
            .await?;

        debug!(sku = %product.sku, stock = sample.stock, "Sample product created");
        products.push(product);
        report.products += 1;
    }

    Ok(products)
}

async fn seed_customers(
    db: &Database,
    config: &SeedConfig,
    rng: &mut StdRng,
    report: &mut SeedReport,
) -> DbResult<Vec<String>> {
    let mut ids = Vec::with_capacity(config.customers);

    for n in 0..config.customers {
        let input = match CUSTOMERS.get(n) {
            Some((name, email, phone, address)) => CustomerInput {
                name: name.to_string(),
                email: email.to_string(),
                phone: phone.to_string(),
                address: address.to_string(),
            },
            None => generated_customer(rng, n),
        };

        let customer = db.customers().create(input).await?;
        ids.push(customer.id);
        report.customers += 1;
    }

    Ok(ids)
}

async fn seed_sales(
    db: &Database,
    config: &SeedConfig,
    rng: &mut StdRng,
    customer_ids: &[String],
    products: &[Product],
    report: &mut SeedReport,
) -> DbResult<()> {
    let now = Utc::now();

    for n in 0..config.sales {
        let Some(customer_id) = customer_ids.choose(rng) else {
            break;
        };
        let sale_date = now
            - Duration::days(rng.gen_range(0..SALE_WINDOW_DAYS))
            - Duration::minutes(rng.gen_range(0..600));

        let sale = {
            let mut conn = db.pool().acquire().await?;
            sale::insert(
                &mut conn,
                customer_id,
                &format!("Commande échantillon {}", n + 1),
                &config.actor,
                sale_date,
            )
            .await?
        };

        let lines = rng.gen_range(1..=3);
        for _ in 0..lines {
            let Some(product) = products.choose(rng) else {
                break;
            };
            db.sales()
                .add_item(
                    &sale.id,
                    NewSaleItem {
                        product_id: product.id.clone(),
                        quantity: rng.gen_range(1..=10),
                        unit_price_cents: None,
                    },
                )
                .await?;
        }
        db.sales().recompute_total(&sale.id).await?;
        report.sales += 1;

        // 6 in 10 completed, 2 left pending, 2 completed then cancelled
        let outcome: u32 = rng.gen_range(0..10);
        if (6..8).contains(&outcome) {
            continue;
        }

        match db.sales().complete(&sale.id, &config.actor).await {
            Ok(_) => report.completed += 1,
            Err(DbError::Domain(CoreError::InsufficientStock { sku, .. })) => {
                warn!(sale_id = %sale.id, %sku, "Sample sale left pending: not enough stock");
                continue;
            }
            Err(e) => return Err(e),
        }

        if outcome >= 8 {
            db.sales().cancel(&sale.id, &config.actor).await?;
            report.completed -= 1;
            report.cancelled += 1;
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

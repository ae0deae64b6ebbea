//! # Sample Data Seeder
//!
//! Populates a development database with the agency's sample catalogue,
//! customers and sales.
//!
//! ## Usage
//! ```bash
//! # Seed ./agency_dev.db with the defaults (seed 42, 5 customers, 12 sales)
//! cargo run -p agency-db --bin seed
//!
//! # Reproducible larger data set
//! cargo run -p agency-db --bin seed -- --seed 7 --customers 20 --sales 200
//!
//! # Wipe everything first
//! cargo run -p agency-db --bin seed -- --db ./data/agency.db --clear
//! ```
//!
//! The same `--seed` against an empty database always produces the same
//! data.

use anyhow::{bail, Context};
use std::env;
use std::time::Instant;

use agency_db::{seed, Database, DbConfig, SeedConfig};

fn print_help() {
    println!("Parts Agency Seed Data Generator");
    println!();
    println!("Usage: seed [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -d, --db <PATH>        Database file path (default: ./agency_dev.db)");
    println!("  -s, --seed <N>         Generator seed (default: 42)");
    println!("      --customers <N>    Number of customers (default: 5)");
    println!("      --sales <N>        Number of sales (default: 12)");
    println!("      --actor <NAME>     Recorded as creator (default: admin)");
    println!("      --clear            Delete all business data before seeding");
    println!("  -h, --help             Show this help message");
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> anyhow::Result<&'a str> {
    args.get(i + 1)
        .map(String::as_str)
        .with_context(|| format!("{flag} needs a value"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agency_db=warn".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut config = SeedConfig::default();
    let mut db_path = String::from("./agency_dev.db");
    let mut clear = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            flag @ ("--db" | "-d") => {
                db_path = value(&args, i, flag)?.to_string();
                i += 1;
            }
            flag @ ("--seed" | "-s") => {
                config.seed = value(&args, i, flag)?
                    .parse()
                    .with_context(|| format!("{flag} expects a number"))?;
                i += 1;
            }
            flag @ "--customers" => {
                config.customers = value(&args, i, flag)?
                    .parse()
                    .with_context(|| format!("{flag} expects a number"))?;
                i += 1;
            }
            flag @ "--sales" => {
                config.sales = value(&args, i, flag)?
                    .parse()
                    .with_context(|| format!("{flag} expects a number"))?;
                i += 1;
            }
            flag @ "--actor" => {
                config.actor = value(&args, i, flag)?.to_string();
                i += 1;
            }
            "--clear" => clear = true,
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => bail!("unknown argument: {other} (see --help)"),
        }
        i += 1;
    }

    println!("🌱 Parts Agency Seed Data Generator");
    println!("===================================");
    println!("Database:  {}", db_path);
    println!("Seed:      {}", config.seed);
    println!("Customers: {}", config.customers);
    println!("Sales:     {}", config.sales);
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {db_path}"))?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if clear {
        let cleared = db.clear_all().await?;
        println!(
            "✓ Cleared {} products, {} customers, {} sales",
            cleared.products, cleared.customers, cleared.sales
        );
    } else {
        let existing = db.products().count().await?;
        if existing > 0 {
            println!("⚠ Database already has {} products", existing);
            println!("  Skipping seed to avoid duplicates.");
            println!("  Run again with --clear to regenerate.");
            return Ok(());
        }
    }

    let start = Instant::now();
    let report = seed::run(&db, &config).await?;
    let elapsed = start.elapsed();

    println!();
    println!("✓ {} categories", report.categories);
    println!("✓ {} products (with opening stock)", report.products);
    println!("✓ {} customers", report.customers);
    println!(
        "✓ {} sales: {} completed, {} cancelled, {} pending",
        report.sales,
        report.completed,
        report.cancelled,
        report.sales - report.completed - report.cancelled
    );
    println!();
    println!("Done in {:.2?}", elapsed);

    db.close().await;
    Ok(())
}

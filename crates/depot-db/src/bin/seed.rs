//! # Seed Data Generator
//!
//! Populates the database with a small demo warehouse for development.
//!
//! ## Usage
//! ```bash
//! cargo run -p depot-db --bin seed
//! cargo run -p depot-db --bin seed -- --db ./data/depot.db --orders 20
//! ```
//!
//! ## Generated Data
//! - One product per entry in [`PRODUCTS`] (mixed quantity/weight basis)
//! - Two receipts per product, 20 and 50 days ago
//! - Loading orders `LO-1001`, `LO-1002`, ... with two lines each; every
//!   other line has a clearance with a manifested weight

use chrono::{Duration, Utc};
use std::env;

use depot_core::{FeeBasis, Money};
use depot_db::{
    Database, DbConfig, NewClearance, NewLoadingOrder, NewLoadingOrderItem, NewProduct, NewReceipt,
};

/// (name, basis, storage rate, loading rate)
const PRODUCTS: &[(&str, FeeBasis, i64, i64)] = &[
    ("Cement (bulk)", FeeBasis::Weight, 5, 2),
    ("Rebar 12mm", FeeBasis::Weight, 3, 1),
    ("Ceramic Tiles (pallet)", FeeBasis::Quantity, 1_200, 300),
    ("Sunflower Oil (carton)", FeeBasis::Quantity, 150, 40),
    ("Rice (sack)", FeeBasis::Quantity, 100, 25),
    ("Copper Wire (drum)", FeeBasis::Weight, 8, 3),
];

const DRIVERS: &[(&str, &str, &str)] = &[
    ("Sara Ahmadi", "0012345678", "12B345-67"),
    ("Reza Karimi", "0087654321", "45D678-12"),
    ("Mina Tehrani", "0011223344", "78J901-34"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let mut db_path = "./depot_dev.db".to_string();
    let mut orders = 6usize;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--orders" | "-o" => {
                if i + 1 < args.len() {
                    orders = args[i + 1].parse().unwrap_or(orders);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Depot Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -o, --orders <N>   Number of loading orders (default: 6)");
                println!("  -d, --db <PATH>    Database file path (default: ./depot_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Depot Seed Data Generator");
    println!("=========================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products; skipping seed.", existing);
        return Ok(());
    }

    let now = Utc::now();
    let mut product_ids = Vec::with_capacity(PRODUCTS.len());

    for (name, fee_basis, storage_rate, loading_rate) in PRODUCTS {
        let id = db
            .products()
            .insert(&NewProduct {
                name: name.to_string(),
                fee_basis: *fee_basis,
                storage_rate: Money::from_units(*storage_rate),
                loading_rate: Money::from_units(*loading_rate),
            })
            .await?;

        for days_ago in [50, 20] {
            db.receipts()
                .insert(&NewReceipt {
                    product_id: id,
                    qty: 100,
                    received_at: now - Duration::days(days_ago),
                })
                .await?;
        }

        product_ids.push(id);
    }
    println!("✓ {} products with receipts", product_ids.len());

    for n in 0..orders {
        let (driver, code, plate) = DRIVERS[n % DRIVERS.len()];
        let order_no = format!("LO-{}", 1001 + n);

        let order_id = db
            .loading_orders()
            .insert(&NewLoadingOrder {
                order_no: order_no.clone(),
                driver_name: Some(driver.to_string()),
                driver_national_code: Some(code.to_string()),
                plate: Some(plate.to_string()),
                issued_at: now - Duration::days(1),
            })
            .await?;

        for line in 0..2 {
            let product_id = product_ids[(n * 2 + line) % product_ids.len()];
            let clearance_id = if line == 0 {
                Some(
                    db.clearances()
                        .insert(&NewClearance {
                            cleared_weight_kg: 750 + (n as i64) * 50,
                            cleared_at: now - Duration::days(2),
                        })
                        .await?,
                )
            } else {
                None
            };

            db.loading_orders()
                .insert_item(&NewLoadingOrderItem {
                    loading_order_id: order_id,
                    product_id,
                    batch_no: format!("B-{}-{}", 1001 + n, line + 1),
                    qty: 10 * (line as i64 + 1),
                    clearance_id,
                })
                .await?;
        }

        println!("  {} ({})", order_no, driver);
    }

    println!();
    println!("✓ Seed complete!");
    Ok(())
}

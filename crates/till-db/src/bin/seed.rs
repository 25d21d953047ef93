//! # Demo Catalog
//!
//! Fills an empty till database with a small corner-shop catalog so the
//! terminal can be tried by hand.
//!
//! ```bash
//! cargo run -p till-db --bin seed                       # whole catalog into ./till_dev.db
//! cargo run -p till-db --bin seed -- --count 5 --db /tmp/till.db
//! TILL_DB_PATH=/tmp/till.db cargo run -p till-terminal
//! ```
//!
//! `BREAD-WHT` starts sold out and `MILK-1L` has a single unit left, which
//! makes the stock checks easy to see at the till.

use chrono::Utc;
use std::env;
use std::process::ExitCode;
use till_core::Product;
use till_db::{Database, DbConfig, DbResult};
use uuid::Uuid;

/// (sku, barcode, name, unit, price in cents, stock)
const CATALOG: &[(&str, Option<&str>, &str, &str, i64, i64)] = &[
    ("COKE-330", Some("5449000000996"), "Coca-Cola 330ml", "can", 150, 48),
    ("COKE-1L5", Some("5449000054227"), "Coca-Cola 1.5L", "bottle", 325, 12),
    ("WATER-500", Some("8964000123456"), "Mineral Water 500ml", "bottle", 80, 60),
    ("RICE-1KG", Some("8961000000011"), "Basmati Rice 1kg", "pack", 10_000, 10),
    ("RICE-5KG", Some("8961000000028"), "Basmati Rice 5kg", "bag", 45_000, 4),
    ("SUGAR-1KG", Some("8961000000035"), "White Sugar 1kg", "pack", 1_650, 20),
    ("FLOUR-5KG", None, "Chakki Atta 5kg", "bag", 9_900, 6),
    ("TEA-190G", Some("8961014000104"), "Black Tea 190g", "box", 2_250, 15),
    ("MILK-1L", Some("8961000000042"), "UHT Milk 1L", "pack", 2_700, 1),
    ("EGGS-12", None, "Eggs (dozen)", "tray", 3_600, 8),
    ("BREAD-WHT", None, "White Bread Large", "loaf", 1_800, 0),
    ("SOAP-BAR", Some("8961100200300"), "Soap Bar 100g", "pcs", 950, 30),
    ("BISC-CHOC", Some("8961200300400"), "Chocolate Biscuits", "pack", 400, 36),
    ("OIL-1L", Some("8961300400500"), "Cooking Oil 1L", "bottle", 5_750, 9),
    ("SALT-800G", Some("8961400500600"), "Iodized Salt 800g", "pack", 600, 25),
];

#[tokio::main]
async fn main() -> ExitCode {
    let mut count = CATALOG.len();
    let mut db_path = String::from("./till_dev.db");

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--count" | "-c" => match args.next().and_then(|n| n.parse().ok()) {
                Some(n) => count = n,
                None => return usage("--count needs a number"),
            },
            "--db" | "-d" => match args.next() {
                Some(path) => db_path = path,
                None => return usage("--db needs a path"),
            },
            "--help" | "-h" => {
                println!("Usage: seed [--count N] [--db PATH]");
                println!("  -c, --count <N>    Products to insert (default: {})", CATALOG.len());
                println!("  -d, --db <PATH>    Database file (default: ./till_dev.db)");
                return ExitCode::SUCCESS;
            }
            other => return usage(&format!("unknown argument '{}'", other)),
        }
    }

    match seed(&db_path, count).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("seed failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn usage(problem: &str) -> ExitCode {
    eprintln!("seed: {} (try --help)", problem);
    ExitCode::FAILURE
}

async fn seed(db_path: &str, count: usize) -> DbResult<()> {
    let db = Database::new(DbConfig::new(db_path)).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("{} already has {} products, nothing to do", db_path, existing);
        db.close().await;
        return Ok(());
    }

    let products = db.products();
    for product in demo_products().take(count) {
        products.insert(&product).await?;
        println!(
            "  {:<10} {:<24} {:>9}  stock {}",
            product.sku,
            product.name,
            product.price().to_string(),
            product.current_stock
        );
    }

    let found = products.find_by_code("5449000000996").await?;
    println!(
        "Seeded {} products into {} (barcode lookup {})",
        count.min(CATALOG.len()),
        db_path,
        if found.is_some() { "ok" } else { "skipped" }
    );

    db.close().await;
    Ok(())
}

fn demo_products() -> impl Iterator<Item = Product> {
    let now = Utc::now();
    CATALOG
        .iter()
        .map(move |&(sku, barcode, name, unit, price_cents, stock)| Product {
            id: Uuid::new_v4().to_string(),
            sku: sku.to_string(),
            barcode: barcode.map(str::to_string),
            name: name.to_string(),
            unit_label: unit.to_string(),
            price_cents,
            current_stock: stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
}

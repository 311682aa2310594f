//! # Seed Data Generator
//!
//! Populates the database with an admin account and a small mobile-shop
//! catalogue for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./tally.db with admin/admin123
//! cargo run -p tally-db --bin seed
//!
//! # Specify database path and admin credentials
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db --admin owner --password s3cret
//! ```
//!
//! ## Generated Data
//! - One admin user (staff + admin flags)
//! - Categories: Mobiles, Accessories, Audio, Wearables
//! - A handful of products per category with GST rates of 5%, 12% or 18%

use std::env;

use tally_db::{Database, DbConfig, NewProduct, NewUser};

/// (category, name, selling price in paise, tax rate in basis points, stock)
const CATALOGUE: &[(&str, &str, i64, u32, i64)] = &[
    ("Mobiles", "Redmi Note 13", 1_699_900, 1800, 12),
    ("Mobiles", "Galaxy M34", 1_549_900, 1800, 8),
    ("Mobiles", "Nokia 105", 129_900, 1800, 30),
    ("Accessories", "Tempered Glass", 19_900, 1800, 200),
    ("Accessories", "USB-C Cable 1m", 29_900, 1800, 150),
    ("Accessories", "20W Charger", 89_900, 1800, 60),
    ("Accessories", "Silicone Case", 24_900, 1200, 120),
    ("Audio", "Wired Earphones", 39_900, 1800, 80),
    ("Audio", "TWS Earbuds", 199_900, 1800, 40),
    ("Wearables", "Fitness Band", 249_900, 1800, 25),
    ("Wearables", "Smart Watch", 499_900, 1800, 15),
    ("Accessories", "Screen Cleaning Kit", 9_900, 500, 90),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./tally.db");
    let mut admin = String::from("admin");
    let mut password = String::from("admin123");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--admin" | "-a" => {
                if i + 1 < args.len() {
                    admin = args[i + 1].clone();
                    i += 1;
                }
            }
            "--password" | "-p" => {
                if i + 1 < args.len() {
                    password = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Billing Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>          Database file path (default: ./tally.db)");
                println!("  -a, --admin <NAME>       Admin username (default: admin)");
                println!("  -p, --password <PASS>    Admin password (default: admin123)");
                println!("  -h, --help               Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Tally Billing Seed Data Generator");
    println!("=================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if db.users().find_by_username(&admin).await?.is_none() {
        db.users()
            .create(&NewUser {
                username: admin.clone(),
                password,
                is_staff: true,
                is_admin: true,
            })
            .await?;
        println!("✓ Created admin user '{}'", admin);
    } else {
        println!("  Admin user '{}' already exists", admin);
    }

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping catalogue to avoid duplicates.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let mut generated = 0;
    for (category, name, price_cents, tax_rate_bps, stock) in CATALOGUE {
        let product = NewProduct {
            name: name.to_string(),
            imei: None,
            selling_price_cents: *price_cents,
            // 75-85% of selling price
            purchase_price_cents: price_cents * (75 + (generated % 3) * 5) / 100,
            tax_rate_bps: *tax_rate_bps,
            category: Some(category.to_string()),
            stock: *stock,
            agency_name: "Metro Distributors".to_string(),
        };

        if let Err(e) = db.products().create(product).await {
            eprintln!("Failed to insert {}: {}", name, e);
            continue;
        }
        generated += 1;
    }

    let categories = db.categories().list().await?;
    println!("✓ Generated {} products in {} categories", generated, categories.len());
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

//! # Seed Data Generator
//!
//! Populates the database with demo pet listings for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database (./pawmart.db)
//! cargo run -p pawmart-db --bin seed
//!
//! # Specify database path
//! cargo run -p pawmart-db --bin seed -- --db ./data/pawmart.db
//! ```

use std::env;

use pawmart_db::{Database, DbConfig, NewPet};
use tracing::info;

/// (species, breed, names) triples for realistic listings.
const LITTERS: &[(&str, &str, &[&str])] = &[
    (
        "dog",
        "Labrador Retriever",
        &["Biscuit", "Hazel", "Bruno", "Daisy", "Rocky"],
    ),
    (
        "dog",
        "German Shepherd",
        &["Shadow", "Rex", "Luna", "Storm"],
    ),
    ("cat", "Persian", &["Mochi", "Simba", "Cleo", "Misty"]),
    ("cat", "Siamese", &["Willow", "Jasper", "Nala"]),
    ("bird", "African Grey", &["Echo", "Pepper"]),
    ("rabbit", "Holland Lop", &["Clover", "Pumpkin", "Oreo"]),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let db_path = parse_db_path().unwrap_or_else(|| "pawmart.db".to_string());

    info!(path = %db_path, "Seeding database");
    let db = Database::new(DbConfig::new(&db_path)).await?;

    let pets = db.pets();
    let mut count = 0usize;
    for (species, breed, names) in LITTERS {
        for (i, name) in names.iter().enumerate() {
            pets.insert(NewPet {
                name: (*name).to_string(),
                species: (*species).to_string(),
                breed: Some((*breed).to_string()),
                age_months: Some(2 + (i as i64) * 3),
                // 80.00 to 400.00, varied per listing
                price_cents: 8_000 * (i as i64 + 1),
                description: Some(format!("{name} is a friendly {breed} looking for a home.")),
            })
            .await?;
            count += 1;
        }
    }

    info!(count, "Seed complete");
    db.close().await;
    Ok(())
}

/// Parses `--db <path>` from the command line.
fn parse_db_path() -> Option<String> {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--db" {
            return args.next();
        }
    }
    None
}

//! Database connection and schema bootstrap
//!
//! The pool is constructed once per process and injected into the stages
//! that need it; nothing in the pipeline reaches for ambient connection
//! state.

pub mod repository;

use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("Invalid database URL: {}", database_url))?
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to database: {}", database_url))
}

/// Create the bed_occupancy table and its identity index. Idempotent.
///
/// The unique index is partial: rows without an organisation code have no
/// natural identity and insert freely, by design.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS bed_occupancy (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            organisation_code TEXT,
            organisation_name TEXT NOT NULL,
            beds_available INTEGER NOT NULL CHECK (beds_available >= 0),
            beds_occupied INTEGER NOT NULL CHECK (beds_occupied >= 0),
            occupancy_rate REAL,
            quarter TEXT NOT NULL,
            year INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create bed_occupancy table")?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_bed_occupancy_identity
         ON bed_occupancy (organisation_code, quarter, year)
         WHERE organisation_code IS NOT NULL",
    )
    .execute(pool)
    .await
    .context("Failed to create bed_occupancy identity index")?;

    Ok(())
}

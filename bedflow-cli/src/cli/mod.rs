//! Command-line interface

pub mod run;
pub mod show;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "bedflow-cli",
    about = "ETL pipeline for NHS quarterly bed-occupancy statistics",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one ingestion: acquire, extract, normalize, persist
    Run(RunArgs),
    /// Create the database schema (idempotent)
    InitDb(DbArgs),
    /// Print stored occupancy records
    Show(ShowArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Source reference: object-store://<bucket>/<key> or an http(s) URL
    #[arg(long)]
    pub source: String,

    /// Reporting quarter (Q1..Q4); derived from the filename when omitted
    #[arg(long)]
    pub quarter: Option<String>,

    /// Four-digit reporting year; derived from the filename when omitted
    #[arg(long)]
    pub year: Option<i32>,

    /// Header synonym table overriding the embedded one
    #[arg(long)]
    pub synonyms: Option<PathBuf>,

    /// Attempts per I/O stage (1 = no retry; schedulers normally own retry)
    #[arg(long, default_value_t = 1)]
    pub attempts: u32,

    /// Write a JSON run summary to the results bucket afterwards
    #[arg(long)]
    pub artifact: bool,

    /// Database URL; falls back to $DATABASE_URL
    #[arg(long)]
    pub database_url: Option<String>,

    /// Object-store endpoint; falls back to $OBJECT_STORE_URL
    #[arg(long)]
    pub object_store_url: Option<String>,
}

#[derive(Args)]
pub struct DbArgs {
    /// Database URL; falls back to $DATABASE_URL
    #[arg(long)]
    pub database_url: Option<String>,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Limit to one reporting quarter (Q1..Q4, with --year)
    #[arg(long)]
    pub quarter: Option<String>,

    /// Limit to one reporting year (with --quarter)
    #[arg(long)]
    pub year: Option<i32>,

    /// Database URL; falls back to $DATABASE_URL
    #[arg(long)]
    pub database_url: Option<String>,
}

pub fn database_url(flag: Option<String>) -> String {
    flag.or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| "sqlite:bedflow.db".to_string())
}

pub fn object_store_url(flag: Option<String>) -> String {
    flag.or_else(|| std::env::var("OBJECT_STORE_URL").ok())
        .unwrap_or_else(|| "http://localhost:9000".to_string())
}

pub async fn handle_init_db_command(args: DbArgs) -> Result<()> {
    let url = database_url(args.database_url);
    let pool = crate::db::connect(&url).await?;
    crate::db::init_schema(&pool).await?;
    println!("Schema ready at {}", url);
    Ok(())
}

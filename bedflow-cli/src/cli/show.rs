//! Show command handler

use anyhow::{Result, bail};

use super::ShowArgs;
use crate::db::{self, repository};
use crate::normalize::ReportingPeriod;

pub async fn handle_show_command(args: ShowArgs) -> Result<()> {
    let period = match (&args.quarter, args.year) {
        (Some(quarter), Some(year)) => Some(ReportingPeriod {
            quarter: quarter.parse()?,
            year,
        }),
        (None, None) => None,
        _ => bail!("Provide both --quarter and --year, or neither to show everything"),
    };

    let pool = db::connect(&super::database_url(args.database_url)).await?;
    db::init_schema(&pool).await?;

    let rows = repository::fetch_occupancy(&pool, period).await?;
    if rows.is_empty() {
        println!("No records stored.");
        return Ok(());
    }

    println!(
        "{:<10} {:<60} {:>10} {:>10} {:>8}  {}",
        "code", "organisation", "available", "occupied", "rate", "period"
    );
    for row in &rows {
        println!(
            "{:<10} {:<60} {:>10} {:>10} {:>8}  {} {}",
            row.organisation_code.as_deref().unwrap_or("-"),
            row.organisation_name,
            row.beds_available,
            row.beds_occupied,
            row.occupancy_rate
                .map(|r| format!("{:.2}%", r))
                .unwrap_or_else(|| "-".to_string()),
            row.quarter,
            row.year
        );
    }
    println!("{} record(s)", rows.len());
    Ok(())
}

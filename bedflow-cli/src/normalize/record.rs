//! Canonical record types for bed-occupancy data

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// NHS reporting quarter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quarter::Q1 => "Q1",
            Quarter::Q2 => "Q2",
            Quarter::Q3 => "Q3",
            Quarter::Q4 => "Q4",
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quarter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "Q1" | "1" => Ok(Quarter::Q1),
            "Q2" | "2" => Ok(Quarter::Q2),
            "Q3" | "3" => Ok(Quarter::Q3),
            "Q4" | "4" => Ok(Quarter::Q4),
            other => bail!("Invalid quarter '{}'. Expected Q1..Q4", other),
        }
    }
}

/// The quarter/year a source file reports on. Supplied by the invocation
/// context, never read per-row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportingPeriod {
    pub quarter: Quarter,
    pub year: i32,
}

static QUARTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Q([1-4])([^0-9]|$)").unwrap());
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(20\d{2})").unwrap());

impl ReportingPeriod {
    /// Derive the reporting period from a source filename, e.g.
    /// `Beds-Open-Overnight-Q3-2023-24.xlsx` -> Q3 2023. NHS release names
    /// carry the quarter marker and the financial-year start year; for a
    /// spanned year like `2023-24` the first four-digit year wins.
    pub fn from_filename(name: &str) -> Option<Self> {
        let quarter = QUARTER_RE
            .captures(name)
            .and_then(|c| format!("Q{}", &c[1]).parse().ok())?;
        let year = YEAR_RE.captures(name).and_then(|c| c[1].parse().ok())?;
        Some(ReportingPeriod { quarter, year })
    }
}

impl fmt::Display for ReportingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.quarter, self.year)
    }
}

/// One normalized trust-level bed-occupancy record, the unit handed to the
/// persistence layer. Natural identity is `(organisation_code, quarter, year)`;
/// aggregate rows may carry no code and therefore no identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BedOccupancyRecord {
    pub organisation_code: Option<String>,
    pub organisation_name: String,
    pub beds_available: i64,
    pub beds_occupied: i64,
    pub occupancy_rate: Option<f64>,
    pub quarter: Quarter,
    pub year: i32,
}

impl BedOccupancyRecord {
    /// Human-readable identity used in warnings and logs
    pub fn identity(&self) -> String {
        format!(
            "{}/{}/{}",
            self.organisation_code.as_deref().unwrap_or("(no code)"),
            self.quarter,
            self.year
        )
    }
}

/// Occupancy percentage rounded to 2 decimal places. Undefined (None) when
/// no beds are available, rather than a division fault.
pub fn occupancy_rate(beds_occupied: i64, beds_available: i64) -> Option<f64> {
    if beds_available <= 0 {
        return None;
    }
    let rate = beds_occupied as f64 / beds_available as f64 * 100.0;
    Some((rate * 100.0).round() / 100.0)
}

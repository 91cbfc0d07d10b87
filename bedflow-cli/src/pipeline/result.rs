//! Per-invocation ingestion summary

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Why a row was rejected during normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Bed counts missing, non-numeric, or negative
    InvalidNumeric,
    /// Organisation name empty on a row that carries a code
    MissingName,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::InvalidNumeric => f.write_str("invalid numeric"),
            RejectReason::MissingName => f.write_str("missing organisation name"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// 1-based spreadsheet row number, for operators chasing the source file
    pub row_index: usize,
    pub reason: RejectReason,
}

/// Non-fatal data-quality anomaly attached to a record that was still
/// persisted, e.g. more beds occupied than available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityWarning {
    pub identity: String,
    pub message: String,
}

/// Summary of one completed invocation, reported upward and discarded.
#[derive(Debug, Default, Clone, Serialize)]
pub struct IngestionResult {
    pub inserted: u64,
    pub updated: u64,
    pub rejected: Vec<Rejection>,
    pub warnings: Vec<QualityWarning>,
}

/// JSON artifact describing a finished run, written to the results bucket
/// when `run --artifact` is set.
#[derive(Debug, Serialize)]
pub struct RunArtifact<'a> {
    pub status: &'static str,
    pub source_location: &'a str,
    pub inserted: u64,
    pub updated: u64,
    pub rejected: usize,
    pub warnings: usize,
    pub finished_at: DateTime<Utc>,
}

impl<'a> RunArtifact<'a> {
    pub fn success(source_location: &'a str, result: &IngestionResult) -> Self {
        RunArtifact {
            status: "success",
            source_location,
            inserted: result.inserted,
            updated: result.updated,
            rejected: result.rejected.len(),
            warnings: result.warnings.len(),
            finished_at: Utc::now(),
        }
    }
}

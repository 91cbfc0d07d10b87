//! Bed-occupancy repository
//!
//! One transaction per batch: either every record lands or none do, which is
//! what keeps re-invocation safe. Writes are chunked multi-row upserts keyed
//! on `(organisation_code, quarter, year)`.

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::normalize::record::{BedOccupancyRecord, Quarter, ReportingPeriod};
use crate::pipeline::error::PipelineError;

/// Records per INSERT statement
const CHUNK_SIZE: usize = 500;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PersistOutcome {
    pub inserted: u64,
    pub updated: u64,
}

/// Write a batch inside a single transaction.
///
/// The multi-row upsert cannot report which rows conflicted, so existing
/// identities for the batch's periods are snapshotted first (inside the
/// transaction) to split the counts. Any statement failure rolls the whole
/// batch back and surfaces as `PersistenceFailure`.
pub async fn persist_batch(
    pool: &SqlitePool,
    records: &[BedOccupancyRecord],
) -> Result<PersistOutcome, PipelineError> {
    if records.is_empty() {
        return Ok(PersistOutcome::default());
    }

    let mut tx = pool.begin().await?;

    let mut existing: HashSet<(String, Quarter, i32)> = HashSet::new();
    let periods: HashSet<(Quarter, i32)> = records.iter().map(|r| (r.quarter, r.year)).collect();
    for (quarter, year) in periods {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT organisation_code FROM bed_occupancy
             WHERE quarter = ? AND year = ? AND organisation_code IS NOT NULL",
        )
        .bind(quarter.as_str())
        .bind(year)
        .fetch_all(&mut *tx)
        .await?;
        for (code,) in rows {
            existing.insert((code, quarter, year));
        }
    }

    let mut inserted = 0u64;
    let mut updated = 0u64;
    let mut seen: HashSet<(String, Quarter, i32)> = HashSet::new();
    for record in records {
        match &record.organisation_code {
            Some(code) => {
                let key = (code.clone(), record.quarter, record.year);
                if existing.contains(&key) || !seen.insert(key) {
                    updated += 1;
                } else {
                    inserted += 1;
                }
            }
            // No identity, no dedup: always a fresh row
            None => inserted += 1,
        }
    }

    let now = Utc::now();
    for chunk in records.chunks(CHUNK_SIZE) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO bed_occupancy (organisation_code, organisation_name, beds_available, \
             beds_occupied, occupancy_rate, quarter, year, created_at, updated_at) ",
        );
        qb.push_values(chunk, |mut b, record| {
            b.push_bind(record.organisation_code.as_deref())
                .push_bind(record.organisation_name.as_str())
                .push_bind(record.beds_available)
                .push_bind(record.beds_occupied)
                .push_bind(record.occupancy_rate)
                .push_bind(record.quarter.as_str())
                .push_bind(record.year)
                .push_bind(now)
                .push_bind(now);
        });
        qb.push(
            " ON CONFLICT(organisation_code, quarter, year) WHERE organisation_code IS NOT NULL \
             DO UPDATE SET organisation_name = excluded.organisation_name, \
             beds_available = excluded.beds_available, \
             beds_occupied = excluded.beds_occupied, \
             occupancy_rate = excluded.occupancy_rate, \
             updated_at = excluded.updated_at",
        );
        qb.build().execute(&mut *tx).await?;
    }

    tx.commit().await?;
    Ok(PersistOutcome { inserted, updated })
}

/// A stored row as read back for reporting
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredOccupancy {
    pub organisation_code: Option<String>,
    pub organisation_name: String,
    pub beds_available: i64,
    pub beds_occupied: i64,
    pub occupancy_rate: Option<f64>,
    pub quarter: String,
    pub year: i64,
}

/// Fetch stored records, optionally limited to one reporting period
pub async fn fetch_occupancy(
    pool: &SqlitePool,
    period: Option<ReportingPeriod>,
) -> Result<Vec<StoredOccupancy>> {
    let rows = match period {
        Some(period) => {
            sqlx::query_as(
                "SELECT organisation_code, organisation_name, beds_available, beds_occupied, \
                 occupancy_rate, quarter, year FROM bed_occupancy
                 WHERE quarter = ? AND year = ?
                 ORDER BY organisation_name",
            )
            .bind(period.quarter.as_str())
            .bind(period.year)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as(
                "SELECT organisation_code, organisation_name, beds_available, beds_occupied, \
                 occupancy_rate, quarter, year FROM bed_occupancy
                 ORDER BY year, quarter, organisation_name",
            )
            .fetch_all(pool)
            .await
        }
    };
    rows.context("Failed to fetch bed occupancy records")
}

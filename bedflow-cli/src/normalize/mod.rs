//! Record normalization
//!
//! Converts raw extracted rows into canonical `BedOccupancyRecord`s. Rules
//! apply in order and the first failing rule names the rejection reason;
//! subtotal rows are silently dropped and never counted as rejections.

pub mod record;

pub use record::{BedOccupancyRecord, Quarter, ReportingPeriod, occupancy_rate};

use crate::extract::{CanonicalField, CellValue, RawSheetRow};
use crate::pipeline::result::{QualityWarning, RejectReason, Rejection};

/// Outcome of normalizing one raw row
#[derive(Debug, Clone)]
pub enum RowOutcome {
    /// A persistable record, possibly carrying a data-quality warning
    Record {
        record: BedOccupancyRecord,
        warning: Option<QualityWarning>,
    },
    /// Subtotal or footnote row, dropped without trace in the result
    Skipped,
    Rejected(Rejection),
}

/// Aggregate rows the source mixes in with trust rows
fn is_aggregate_name(name: &str) -> bool {
    let name = name.trim().to_lowercase();
    name == "england" || name.contains("total")
}

pub fn normalize_row(row: &RawSheetRow, period: ReportingPeriod) -> RowOutcome {
    let organisation_code = row.get(CanonicalField::OrganisationCode).as_text();
    let organisation_name = row.get(CanonicalField::OrganisationName).as_text();

    let organisation_name = match organisation_name {
        Some(name) if is_aggregate_name(&name) => return RowOutcome::Skipped,
        None if organisation_code.is_none() => return RowOutcome::Skipped,
        None => {
            return RowOutcome::Rejected(Rejection {
                row_index: row.row_index,
                reason: RejectReason::MissingName,
            });
        }
        Some(name) => name,
    };

    let Some(beds_available) = coerce_count(row.get(CanonicalField::BedsAvailable)) else {
        return rejected_numeric(row);
    };
    let Some(beds_occupied) = coerce_count(row.get(CanonicalField::BedsOccupied)) else {
        return rejected_numeric(row);
    };

    let record = BedOccupancyRecord {
        occupancy_rate: occupancy_rate(beds_occupied, beds_available),
        organisation_code,
        organisation_name,
        beds_available,
        beds_occupied,
        quarter: period.quarter,
        year: period.year,
    };

    // Occupancy above capacity shows up in real releases; keep the record
    // but surface the anomaly instead of dropping it silently.
    let warning = (beds_occupied > beds_available).then(|| QualityWarning {
        identity: record.identity(),
        message: format!(
            "beds_occupied {} exceeds beds_available {}",
            beds_occupied, beds_available
        ),
    });

    RowOutcome::Record { record, warning }
}

fn rejected_numeric(row: &RawSheetRow) -> RowOutcome {
    RowOutcome::Rejected(Rejection {
        row_index: row.row_index,
        reason: RejectReason::InvalidNumeric,
    })
}

/// Coerce a bed count. Accepts numeric cells and numeric text (with
/// thousands separators); missing, non-numeric and negative values are all
/// `None`, which the caller reports as `InvalidNumeric`.
fn coerce_count(cell: &CellValue) -> Option<i64> {
    let value = match cell {
        CellValue::Number(f) => *f,
        CellValue::Text(s) => s.trim().replace(',', "").parse::<f64>().ok()?,
        CellValue::Empty => return None,
    };
    (value.is_finite() && value >= 0.0).then(|| value.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn period() -> ReportingPeriod {
        ReportingPeriod {
            quarter: Quarter::Q3,
            year: 2023,
        }
    }

    fn raw_row(code: &str, name: &str, available: CellValue, occupied: CellValue) -> RawSheetRow {
        let mut cells = HashMap::new();
        if !code.is_empty() {
            cells.insert(CanonicalField::OrganisationCode, CellValue::Text(code.into()));
        }
        if !name.is_empty() {
            cells.insert(CanonicalField::OrganisationName, CellValue::Text(name.into()));
        }
        cells.insert(CanonicalField::BedsAvailable, available);
        cells.insert(CanonicalField::BedsOccupied, occupied);
        RawSheetRow::new(15, cells)
    }

    #[test]
    fn test_valid_row_with_computed_rate() {
        let row = raw_row(
            "R1H",
            "Worcestershire Acute Hospitals NHS Foundation Trust",
            CellValue::Number(850.0),
            CellValue::Number(765.0),
        );
        let RowOutcome::Record { record, warning } = normalize_row(&row, period()) else {
            panic!("expected a record");
        };
        assert_eq!(record.organisation_code.as_deref(), Some("R1H"));
        assert_eq!(record.beds_available, 850);
        assert_eq!(record.beds_occupied, 765);
        assert_eq!(record.occupancy_rate, Some(90.0));
        assert_eq!(record.quarter, Quarter::Q3);
        assert_eq!(record.year, 2023);
        assert!(warning.is_none());
    }

    #[test]
    fn test_aggregate_rows_are_skipped() {
        let england = raw_row("", "England", CellValue::Number(100.0), CellValue::Number(90.0));
        assert!(matches!(normalize_row(&england, period()), RowOutcome::Skipped));

        let total = raw_row("", "Acute Total", CellValue::Number(100.0), CellValue::Number(90.0));
        assert!(matches!(normalize_row(&total, period()), RowOutcome::Skipped));

        let blank = raw_row("", "", CellValue::Empty, CellValue::Empty);
        assert!(matches!(normalize_row(&blank, period()), RowOutcome::Skipped));
    }

    #[test]
    fn test_missing_name_with_code_is_rejected() {
        let row = raw_row("R1H", "", CellValue::Number(100.0), CellValue::Number(90.0));
        let RowOutcome::Rejected(rejection) = normalize_row(&row, period()) else {
            panic!("expected rejection");
        };
        assert_eq!(rejection.reason, RejectReason::MissingName);
        assert_eq!(rejection.row_index, 15);
    }

    #[test]
    fn test_non_numeric_and_negative_counts_are_rejected() {
        for (available, occupied) in [
            (CellValue::Text("n/a".into()), CellValue::Number(90.0)),
            (CellValue::Number(100.0), CellValue::Empty),
            (CellValue::Number(-1.0), CellValue::Number(90.0)),
            (CellValue::Number(100.0), CellValue::Number(-5.0)),
        ] {
            let row = raw_row("R1H", "Some Trust", available, occupied);
            let RowOutcome::Rejected(rejection) = normalize_row(&row, period()) else {
                panic!("expected rejection");
            };
            assert_eq!(rejection.reason, RejectReason::InvalidNumeric);
        }
    }

    #[test]
    fn test_numeric_text_with_separators_is_coerced() {
        let row = raw_row(
            "R1H",
            "Some Trust",
            CellValue::Text("1,700".into()),
            CellValue::Text("1500".into()),
        );
        let RowOutcome::Record { record, .. } = normalize_row(&row, period()) else {
            panic!("expected a record");
        };
        assert_eq!(record.beds_available, 1700);
        assert_eq!(record.beds_occupied, 1500);
    }

    #[test]
    fn test_over_occupancy_warns_but_persists() {
        let row = raw_row("R1H", "Some Trust", CellValue::Number(100.0), CellValue::Number(110.0));
        let RowOutcome::Record { record, warning } = normalize_row(&row, period()) else {
            panic!("expected a record");
        };
        assert_eq!(record.beds_occupied, 110);
        let warning = warning.expect("over-occupancy must warn");
        assert_eq!(warning.identity, "R1H/Q3/2023");
        assert!(warning.message.contains("110"));
    }

    #[test]
    fn test_zero_available_leaves_rate_undefined() {
        let row = raw_row("R1H", "Some Trust", CellValue::Number(0.0), CellValue::Number(0.0));
        let RowOutcome::Record { record, .. } = normalize_row(&row, period()) else {
            panic!("expected a record");
        };
        assert_eq!(record.occupancy_rate, None);
    }
}

//! Spreadsheet extraction
//!
//! Turns an NHS bed-occupancy workbook into a sequence of raw rows keyed by
//! canonical field. Handles the irregular layout: a preamble of title and
//! metadata rows, a dynamically located one- or two-row header band, and a
//! trailing footnote region separated from the data by blank rows.

pub mod header;
pub mod synonyms;

use std::collections::HashMap;
use std::path::Path;

use calamine::{Data, Reader, Xlsx, open_workbook};

use crate::pipeline::error::PipelineError;
use header::{cell_to_string, is_blank, locate_header_band};
pub use header::HeaderBand;
pub use synonyms::{CanonicalField, SynonymTable};

/// Rows scanned for the header band before giving up
pub const HEADER_SCAN_LIMIT: usize = 20;

/// Consecutive fully blank rows that end the data region
const BLANK_RUN_END: usize = 2;

/// Sheet name the source has used historically; falls back to the first sheet
const PREFERRED_SHEET: &str = "nhs trust by sector";

/// A raw cell as extracted, before numeric coercion
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Empty,
}

impl CellValue {
    fn from_cell(cell: &Data) -> CellValue {
        match cell {
            Data::Empty | Data::Error(_) => CellValue::Empty,
            Data::String(s) => {
                if s.trim().is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(s.clone())
                }
            }
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
            Data::Bool(b) => CellValue::Text(b.to_string()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        }
    }

    /// Cell text for display and name fields
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Text(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            CellValue::Number(f) => Some(cell_to_string(&Data::Float(*f))),
            CellValue::Empty => None,
        }
    }
}

/// One extracted data row, keyed by canonical field. Transient: discarded as
/// soon as the normalizer has mapped it.
#[derive(Debug, Clone)]
pub struct RawSheetRow {
    /// 1-based spreadsheet row number, kept for rejection reporting
    pub row_index: usize,
    cells: HashMap<CanonicalField, CellValue>,
}

impl RawSheetRow {
    pub fn new(row_index: usize, cells: HashMap<CanonicalField, CellValue>) -> Self {
        RawSheetRow { row_index, cells }
    }

    pub fn get(&self, field: CanonicalField) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cells.get(&field).unwrap_or(&EMPTY)
    }
}

/// Extract all data rows from the workbook at `path`.
///
/// Fails with `HeaderNotFound` when no header band maps within the scan
/// bound, and `SourceUnavailable` when the file is not a readable workbook
/// (the payload, not the template, is the problem then).
pub fn extract_rows(path: &Path, synonyms: &SynonymTable) -> Result<Vec<RawSheetRow>, PipelineError> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e| PipelineError::source_unavailable(path.display().to_string(), e))?;

    let sheet_name = pick_sheet(&workbook.sheet_names()).ok_or_else(|| {
        PipelineError::source_unavailable(path.display().to_string(), "workbook has no sheets")
    })?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| PipelineError::source_unavailable(path.display().to_string(), e))?;

    let band = locate_header_band(&range, synonyms, HEADER_SCAN_LIMIT).ok_or_else(|| {
        PipelineError::HeaderNotFound {
            sheet: sheet_name.clone(),
            scanned: HEADER_SCAN_LIMIT.min(range.height()),
        }
    })?;
    log::debug!(
        "Header band at rows {}-{} of sheet '{}', {} columns mapped",
        band.first_row + 1,
        band.first_row + band.height,
        sheet_name,
        band.columns.len()
    );

    // Calamine ranges start at the first populated cell, not cell A1, so
    // sheet-relative row numbers need the range origin added back.
    let origin = range.start().map_or(0, |(r, _)| r as usize);

    let mut out = Vec::new();
    let mut blank_run = 0;
    for (idx, row) in range.rows().enumerate().skip(band.data_start()) {
        if row.iter().all(is_blank) {
            blank_run += 1;
            if blank_run >= BLANK_RUN_END {
                break;
            }
            continue;
        }
        blank_run = 0;

        let mut cells = HashMap::with_capacity(band.columns.len());
        for (col, field) in &band.columns {
            cells.insert(
                *field,
                CellValue::from_cell(row.get(*col).unwrap_or(&Data::Empty)),
            );
        }
        // Row numbers are 1-based to match what operators see in the sheet
        out.push(RawSheetRow::new(origin + idx + 1, cells));
    }

    log::debug!("Extracted {} raw rows from '{}'", out.len(), sheet_name);
    Ok(out)
}

fn pick_sheet(names: &[String]) -> Option<String> {
    names
        .iter()
        .find(|n| n.trim().to_lowercase() == PREFERRED_SHEET)
        .or_else(|| names.first())
        .cloned()
}

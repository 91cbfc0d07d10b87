//! Header-band location
//!
//! NHS workbooks open with a dozen-odd rows of title and metadata before the
//! real column headers, and those headers span two rows (category label above,
//! sub-metric label below). Nothing here hard-codes row offsets: the band is
//! found by a bounded scan and the columns are mapped through the synonym
//! table.

use calamine::{Data, Range};

use super::synonyms::{CanonicalField, SynonymTable};

/// A header row must have more textual cells than this to be a candidate.
/// Title and footnote rows carry one or two strings; the real band carries one
/// per data column.
const HEADER_CELL_THRESHOLD: usize = 3;

/// The located header band and its column mapping
#[derive(Debug, Clone)]
pub struct HeaderBand {
    /// 0-based index of the first header row
    pub first_row: usize,
    /// 1 or 2 rows
    pub height: usize,
    /// (column index, canonical field), one entry per mapped column
    pub columns: Vec<(usize, CanonicalField)>,
}

impl HeaderBand {
    /// 0-based index of the first data row
    pub fn data_start(&self) -> usize {
        self.first_row + self.height
    }
}

pub(crate) fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        _ => String::new(),
    }
}

pub(crate) fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        Data::Error(_) => true,
        _ => false,
    }
}

/// Non-empty text that is not just a number. Header cells are words; data
/// cells are mostly counts.
fn is_textual(cell: &Data) -> bool {
    match cell {
        Data::String(s) => {
            let s = s.trim();
            !s.is_empty() && s.parse::<f64>().is_err()
        }
        _ => false,
    }
}

/// Scan the first `scan_limit` rows for the header band. A candidate row
/// needs more than `HEADER_CELL_THRESHOLD` textual cells; the following row
/// joins the band when a majority of its populated cells look like header
/// text. A candidate only counts as the band when its merged labels map all
/// of organisation name, beds available and beds occupied through the
/// synonym table -- otherwise the scan continues.
pub fn locate_header_band(
    range: &Range<Data>,
    synonyms: &SynonymTable,
    scan_limit: usize,
) -> Option<HeaderBand> {
    let rows: Vec<&[Data]> = range.rows().take(scan_limit).collect();

    for (idx, row) in rows.iter().enumerate() {
        let textual = row.iter().filter(|c| is_textual(c)).count();
        if textual <= HEADER_CELL_THRESHOLD {
            continue;
        }
        let populated = row.iter().filter(|c| !is_blank(c)).count();

        // A continuation row carries sub-metric labels: comparably populated
        // and strictly mostly textual, which a data row (codes plus counts)
        // never is.
        let continuation = rows.get(idx + 1).copied().filter(|next| {
            let next_populated = next.iter().filter(|c| !is_blank(c)).count();
            let next_textual = next.iter().filter(|c| is_textual(c)).count();
            next_populated * 2 >= populated && next_textual * 2 > next_populated
        });

        let height = if continuation.is_some() { 2 } else { 1 };
        let columns = map_columns(row, continuation, synonyms);
        if has_required(&columns) {
            return Some(HeaderBand {
                first_row: idx,
                height,
                columns,
            });
        }
    }
    None
}

/// Merge the one or two header rows into a label per column and map each
/// label through the synonym table. Unmapped columns are simply absent; a
/// field already claimed by an earlier column is not claimed again.
fn map_columns(
    row1: &[Data],
    row2: Option<&[Data]>,
    synonyms: &SynonymTable,
) -> Vec<(usize, CanonicalField)> {
    let width = row1.len().max(row2.map_or(0, <[Data]>::len));
    let mut columns = Vec::new();
    let mut claimed = Vec::new();

    for col in 0..width {
        let mut label = row1.get(col).map(cell_to_string).unwrap_or_default();
        if let Some(sub) = row2.and_then(|r| r.get(col)) {
            label.push(' ');
            label.push_str(&cell_to_string(sub));
        }
        if let Some(field) = synonyms.match_label(&label) {
            if !claimed.contains(&field) {
                claimed.push(field);
                columns.push((col, field));
            }
        }
    }
    columns
}

fn has_required(columns: &[(usize, CanonicalField)]) -> bool {
    [
        CanonicalField::OrganisationName,
        CanonicalField::BedsAvailable,
        CanonicalField::BedsOccupied,
    ]
    .iter()
    .all(|required| columns.iter().any(|(_, f)| f == required))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(rows: &[&[&str]]) -> Range<Data> {
        let height = rows.len() as u32;
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0) as u32;
        let mut range = Range::new((0, 0), (height - 1, width - 1));
        for (r, row) in rows.iter().enumerate() {
            for (c, text) in row.iter().enumerate() {
                if !text.is_empty() {
                    range.set_value((r as u32, c as u32), Data::String((*text).to_string()));
                }
            }
        }
        range
    }

    #[test]
    fn test_locates_two_row_band_after_preamble() {
        let range = sheet(&[
            &["Beds Open Overnight"],
            &[""],
            &["Period: Q3 2023-24"],
            &["Org Code", "Org Name", "Beds", "Beds"],
            &["", "", "Available Total", "Occupied Total"],
            &["R1H", "Barts Health NHS Trust", "1700", "1500"],
        ]);
        let band = locate_header_band(&range, SynonymTable::embedded(), 20).unwrap();
        assert_eq!(band.first_row, 3);
        assert_eq!(band.height, 2);
        assert_eq!(band.data_start(), 5);
        assert!(band.columns.contains(&(0, CanonicalField::OrganisationCode)));
        assert!(band.columns.contains(&(2, CanonicalField::BedsAvailable)));
        assert!(band.columns.contains(&(3, CanonicalField::BedsOccupied)));
    }

    #[test]
    fn test_single_row_band() {
        let range = sheet(&[
            &["Quarterly bed availability"],
            &["Org Code", "Org Name", "Available Total", "Occupied Total"],
            &["R1H", "Barts Health NHS Trust", "1700", "1500"],
        ]);
        let band = locate_header_band(&range, SynonymTable::embedded(), 20).unwrap();
        assert_eq!(band.first_row, 1);
        assert_eq!(band.height, 1);
    }

    #[test]
    fn test_unmappable_sheet_yields_none() {
        let range = sheet(&[
            &["Alpha", "Beta", "Gamma", "Delta", "Epsilon"],
            &["1", "2", "3", "4", "5"],
        ]);
        assert!(locate_header_band(&range, SynonymTable::embedded(), 20).is_none());
    }

    #[test]
    fn test_scan_bound_is_respected() {
        let mut rows: Vec<Vec<&str>> = (0..25).map(|_| vec!["note"]).collect();
        rows.push(vec!["Org Code", "Org Name", "Available Total", "Occupied Total"]);
        let refs: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
        let range = sheet(&refs);
        assert!(locate_header_band(&range, SynonymTable::embedded(), 20).is_none());
    }
}

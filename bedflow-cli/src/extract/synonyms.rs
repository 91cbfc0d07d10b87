//! Header-phrasing synonym table
//!
//! Maps the header text found in a workbook to canonical field names. The
//! accepted phrasings live in a TOML data file (embedded default, overridable
//! at runtime) because the NHS template rewords headers between releases.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use once_cell::sync::Lazy;
use serde::Deserialize;

/// Canonical fields the extractor can produce. Anything else in the sheet is
/// ignored, not rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    OrganisationCode,
    OrganisationName,
    BedsAvailable,
    BedsOccupied,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 4] = [
        CanonicalField::OrganisationCode,
        CanonicalField::OrganisationName,
        CanonicalField::BedsAvailable,
        CanonicalField::BedsOccupied,
    ];

    /// Key used in the synonym TOML file
    pub fn key(&self) -> &'static str {
        match self {
            CanonicalField::OrganisationCode => "organisation_code",
            CanonicalField::OrganisationName => "organisation_name",
            CanonicalField::BedsAvailable => "beds_available",
            CanonicalField::BedsOccupied => "beds_occupied",
        }
    }
}

#[derive(Debug, Deserialize)]
struct SynonymFile {
    fields: HashMap<String, Vec<String>>,
}

/// Lowercase, strip punctuation to spaces, collapse whitespace. Applied to
/// both synonyms and sheet labels so `Available_Total` == `available total`.
pub fn normalize_label(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_space = true;
    for c in raw.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Accepted header phrasings, normalized, in canonical-field order
#[derive(Debug, Clone)]
pub struct SynonymTable {
    phrases: Vec<(CanonicalField, Vec<String>)>,
}

static EMBEDDED: Lazy<SynonymTable> = Lazy::new(|| {
    SynonymTable::from_toml_str(include_str!("header_synonyms.toml"))
        .expect("embedded header_synonyms.toml is valid")
});

impl SynonymTable {
    /// The synonym set shipped with the binary
    pub fn embedded() -> &'static SynonymTable {
        &EMBEDDED
    }

    pub fn from_file(path: &Path) -> Result<SynonymTable> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read synonym table: {}", path.display()))?;
        SynonymTable::from_toml_str(&content)
            .with_context(|| format!("Invalid synonym table: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<SynonymTable> {
        let file: SynonymFile =
            toml::from_str(content).context("Failed to parse synonym table TOML")?;

        let mut phrases = Vec::with_capacity(CanonicalField::ALL.len());
        for field in CanonicalField::ALL {
            let raw = file
                .fields
                .get(field.key())
                .with_context(|| format!("Synonym table missing field '{}'", field.key()))?;
            let normalized: Vec<String> = raw
                .iter()
                .map(|s| normalize_label(s))
                .filter(|s| !s.is_empty())
                .collect();
            if normalized.is_empty() {
                bail!("Synonym table has no phrasings for '{}'", field.key());
            }
            phrases.push((field, normalized));
        }

        for key in file.fields.keys() {
            if !CanonicalField::ALL.iter().any(|f| f.key() == key) {
                bail!("Synonym table has unknown field '{}'", key);
            }
        }

        Ok(SynonymTable { phrases })
    }

    /// Map a merged header label to a canonical field, if any phrase for a
    /// field is contained in the label. First field in canonical order wins.
    pub fn match_label(&self, label: &str) -> Option<CanonicalField> {
        let normalized = normalize_label(label);
        if normalized.is_empty() {
            return None;
        }
        for (field, phrases) in &self.phrases {
            if phrases.iter().any(|p| normalized.contains(p.as_str())) {
                return Some(*field);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("  Org   Code "), "org code");
        assert_eq!(normalize_label("Available_Total"), "available total");
        assert_eq!(normalize_label("Beds (Occupied) - Total"), "beds occupied total");
        assert_eq!(normalize_label("---"), "");
    }

    #[test]
    fn test_embedded_table_matches_known_phrasings() {
        let table = SynonymTable::embedded();
        assert_eq!(table.match_label("Org Code"), Some(CanonicalField::OrganisationCode));
        assert_eq!(table.match_label("Org Name"), Some(CanonicalField::OrganisationName));
        assert_eq!(
            table.match_label("Beds Available Total"),
            Some(CanonicalField::BedsAvailable)
        );
        assert_eq!(
            table.match_label("Occupied_Total"),
            Some(CanonicalField::BedsOccupied)
        );
        assert_eq!(table.match_label("Region"), None);
    }

    #[test]
    fn test_synonym_variants_map_to_same_field() {
        let table = SynonymTable::embedded();
        assert_eq!(
            table.match_label("Total Beds Available (overnight)"),
            table.match_label("Available Total"),
        );
    }

    #[test]
    fn test_from_toml_rejects_unknown_and_missing_fields() {
        let missing = r#"
            [fields]
            organisation_code = ["org code"]
        "#;
        assert!(SynonymTable::from_toml_str(missing).is_err());

        let unknown = r#"
            [fields]
            organisation_code = ["org code"]
            organisation_name = ["org name"]
            beds_available = ["available total"]
            beds_occupied = ["occupied total"]
            region_code = ["region"]
        "#;
        assert!(SynonymTable::from_toml_str(unknown).is_err());
    }
}

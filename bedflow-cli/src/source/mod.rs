//! Source acquisition
//!
//! A source reference names where a quarterly workbook lives: an object in
//! the upload store (`object-store://bucket/key`) or a direct http(s)
//! download. The resolver turns either into a scoped local file.

pub mod object_store;
pub mod resolver;

pub use object_store::{HttpObjectStore, ObjectStore};
pub use resolver::{ResolvedSource, SourceResolver};

use std::fmt;

use anyhow::{Result, bail};

/// Where a source workbook comes from. Constructed once per invocation and
/// immutable after that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceReference {
    ObjectStore { bucket: String, key: String },
    RemoteUrl { url: String },
}

impl SourceReference {
    pub fn parse(raw: &str) -> Result<SourceReference> {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix("object-store://") {
            let Some((bucket, key)) = rest.split_once('/') else {
                bail!(
                    "Invalid object-store reference '{}'. Expected object-store://<bucket>/<key>",
                    raw
                );
            };
            if bucket.is_empty() || key.is_empty() {
                bail!(
                    "Invalid object-store reference '{}'. Expected object-store://<bucket>/<key>",
                    raw
                );
            }
            Ok(SourceReference::ObjectStore {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
        } else if raw.starts_with("http://") || raw.starts_with("https://") {
            Ok(SourceReference::RemoteUrl {
                url: raw.to_string(),
            })
        } else {
            bail!(
                "Unrecognized source reference '{}'. Expected object-store://<bucket>/<key> or an absolute http(s) URL",
                raw
            )
        }
    }

    /// Final path component, used to derive the reporting period when the
    /// caller gives no explicit quarter/year
    pub fn file_name(&self) -> &str {
        let path = match self {
            SourceReference::ObjectStore { key, .. } => key.as_str(),
            SourceReference::RemoteUrl { url } => url
                .split(['?', '#'])
                .next()
                .unwrap_or(url.as_str()),
        };
        path.rsplit('/').next().unwrap_or(path)
    }
}

impl fmt::Display for SourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceReference::ObjectStore { bucket, key } => {
                write!(f, "object-store://{}/{}", bucket, key)
            }
            SourceReference::RemoteUrl { url } => f.write_str(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_store_reference() {
        let parsed =
            SourceReference::parse("object-store://uploaded-files/nhs_uploads/2025-07-13_file.xlsx")
                .unwrap();
        assert_eq!(
            parsed,
            SourceReference::ObjectStore {
                bucket: "uploaded-files".into(),
                key: "nhs_uploads/2025-07-13_file.xlsx".into(),
            }
        );
        assert_eq!(parsed.file_name(), "2025-07-13_file.xlsx");
    }

    #[test]
    fn test_parse_remote_url() {
        let parsed =
            SourceReference::parse("https://www.england.nhs.uk/stats/Beds-Q3-2023-24.xlsx?v=2")
                .unwrap();
        assert!(matches!(parsed, SourceReference::RemoteUrl { .. }));
        assert_eq!(parsed.file_name(), "Beds-Q3-2023-24.xlsx");
    }

    #[test]
    fn test_parse_rejects_malformed_references() {
        assert!(SourceReference::parse("object-store://bucket-only").is_err());
        assert!(SourceReference::parse("object-store:///key").is_err());
        assert!(SourceReference::parse("ftp://host/file.xlsx").is_err());
        assert!(SourceReference::parse("just-a-file.xlsx").is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for raw in [
            "object-store://uploads/beds.xlsx",
            "https://example.org/beds.xlsx",
        ] {
            assert_eq!(SourceReference::parse(raw).unwrap().to_string(), raw);
        }
    }
}

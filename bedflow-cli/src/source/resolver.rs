//! Source resolution
//!
//! Fetches the referenced workbook into a scoped temporary file. The
//! spreadsheet reader needs random access to a seekable file, not a stream,
//! and the temp file is removed on drop on every exit path.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tempfile::NamedTempFile;

use super::{ObjectStore, SourceReference};
use crate::pipeline::error::PipelineError;

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Cap on a remote download; a malformed or hostile URL must not be able to
/// exhaust memory or disk.
pub const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// A locally materialized source. Dropping it deletes the file.
#[derive(Debug)]
pub struct ResolvedSource {
    file: NamedTempFile,
    file_name: String,
}

impl ResolvedSource {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Original filename of the source, for period derivation and logs
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

pub struct SourceResolver<S> {
    store: S,
    http: reqwest::Client,
    max_download_bytes: u64,
}

impl<S: ObjectStore> SourceResolver<S> {
    pub fn new(store: S) -> anyhow::Result<SourceResolver<S>> {
        SourceResolver::with_limits(store, DEFAULT_HTTP_TIMEOUT, DEFAULT_MAX_DOWNLOAD_BYTES)
    }

    pub fn with_limits(
        store: S,
        http_timeout: Duration,
        max_download_bytes: u64,
    ) -> anyhow::Result<SourceResolver<S>> {
        use anyhow::Context;
        // Default redirect policy follows up to 10 hops
        let http = reqwest::Client::builder()
            .timeout(http_timeout)
            .build()
            .context("Failed to build download HTTP client")?;
        Ok(SourceResolver {
            store,
            http,
            max_download_bytes,
        })
    }

    /// Fetch the referenced workbook to a local temp file. Every acquisition
    /// problem -- missing object, HTTP error, timeout, oversize body --
    /// surfaces as `SourceUnavailable`.
    pub async fn resolve(
        &self,
        reference: &SourceReference,
    ) -> Result<ResolvedSource, PipelineError> {
        let mut file = tempfile::Builder::new()
            .prefix("bedflow-")
            .suffix(".xlsx")
            .tempfile()
            .map_err(|e| PipelineError::source_unavailable(reference.to_string(), e))?;

        match reference {
            SourceReference::ObjectStore { bucket, key } => {
                let bytes = self
                    .store
                    .get_object(bucket, key)
                    .await
                    .map_err(|e| PipelineError::source_unavailable(reference.to_string(), e))?;
                if bytes.len() as u64 > self.max_download_bytes {
                    return Err(self.oversize(reference, bytes.len() as u64));
                }
                file.as_file_mut()
                    .write_all(&bytes)
                    .map_err(|e| PipelineError::source_unavailable(reference.to_string(), e))?;
            }
            SourceReference::RemoteUrl { url } => {
                self.download(url, &mut file, reference).await?;
            }
        }

        log::debug!("Resolved {} to {}", reference, file.path().display());
        Ok(ResolvedSource {
            file,
            file_name: reference.file_name().to_string(),
        })
    }

    async fn download(
        &self,
        url: &str,
        file: &mut NamedTempFile,
        reference: &SourceReference,
    ) -> Result<(), PipelineError> {
        let unavailable = |e: &dyn std::fmt::Display| {
            PipelineError::source_unavailable(reference.to_string(), e)
        };

        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| unavailable(&e))?;
        if !response.status().is_success() {
            return Err(unavailable(&format!("HTTP status {}", response.status())));
        }
        if let Some(len) = response.content_length() {
            if len > self.max_download_bytes {
                return Err(self.oversize(reference, len));
            }
        }

        // Stream with a running byte count; Content-Length is advisory
        let mut total: u64 = 0;
        while let Some(chunk) = response.chunk().await.map_err(|e| unavailable(&e))? {
            total += chunk.len() as u64;
            if total > self.max_download_bytes {
                return Err(self.oversize(reference, total));
            }
            file.as_file_mut()
                .write_all(&chunk)
                .map_err(|e| unavailable(&e))?;
        }
        file.as_file_mut().flush().map_err(|e| unavailable(&e))?;
        Ok(())
    }

    fn oversize(&self, reference: &SourceReference, size: u64) -> PipelineError {
        PipelineError::source_unavailable(
            reference.to_string(),
            format!(
                "response exceeds maximum of {} bytes ({} read)",
                self.max_download_bytes, size
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::object_store::fake::MemoryObjectStore;
    use std::path::PathBuf;

    fn reference() -> SourceReference {
        SourceReference::ObjectStore {
            bucket: "uploaded-files".into(),
            key: "nhs_uploads/2025-07-13_file.xlsx".into(),
        }
    }

    #[tokio::test]
    async fn test_resolves_object_to_local_file() {
        let store =
            MemoryObjectStore::with_object("uploaded-files", "nhs_uploads/2025-07-13_file.xlsx", b"workbook bytes".to_vec());
        let resolver = SourceResolver::new(store).unwrap();

        let resolved = resolver.resolve(&reference()).await.unwrap();
        assert_eq!(resolved.file_name(), "2025-07-13_file.xlsx");
        assert_eq!(std::fs::read(resolved.path()).unwrap(), b"workbook bytes");
    }

    #[tokio::test]
    async fn test_temp_file_removed_on_drop() {
        let store =
            MemoryObjectStore::with_object("uploaded-files", "nhs_uploads/2025-07-13_file.xlsx", vec![1, 2, 3]);
        let resolver = SourceResolver::new(store).unwrap();

        let resolved = resolver.resolve(&reference()).await.unwrap();
        let path: PathBuf = resolved.path().to_path_buf();
        assert!(path.exists());
        drop(resolved);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_missing_object_is_source_unavailable() {
        let resolver = SourceResolver::new(MemoryObjectStore::default()).unwrap();
        let err = resolver.resolve(&reference()).await.unwrap_err();
        assert!(matches!(err, PipelineError::SourceUnavailable { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_oversize_object_is_rejected() {
        let store =
            MemoryObjectStore::with_object("uploaded-files", "nhs_uploads/2025-07-13_file.xlsx", vec![0u8; 64]);
        let resolver =
            SourceResolver::with_limits(store, DEFAULT_HTTP_TIMEOUT, 16).unwrap();
        let err = resolver.resolve(&reference()).await.unwrap_err();
        assert!(matches!(err, PipelineError::SourceUnavailable { .. }));
    }
}

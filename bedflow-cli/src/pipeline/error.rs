//! Fatal failure taxonomy for one pipeline invocation
//!
//! Row-level problems never appear here; they accumulate in the
//! `IngestionResult`. These variants are the whole-invocation failures the
//! coordinator reports upward, and logs must keep them distinguishable so
//! operators know whether to check connectivity (`SourceUnavailable`) or the
//! header template table (`HeaderNotFound`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Acquisition failed: missing object, network/HTTP error, timeout or
    /// oversize response.
    #[error("source unavailable ({reference}): {message}")]
    SourceUnavailable { reference: String, message: String },

    /// No usable header band within the scan bound. Signals source-format
    /// drift needing a synonym-table update, not a transient condition.
    #[error("no header band found within the first {scanned} rows of sheet '{sheet}'")]
    HeaderNotFound { sheet: String, scanned: usize },

    /// The batch transaction could not commit; everything rolled back.
    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl PipelineError {
    pub fn source_unavailable(reference: impl Into<String>, err: impl std::fmt::Display) -> Self {
        PipelineError::SourceUnavailable {
            reference: reference.into(),
            message: err.to_string(),
        }
    }

    /// Whether re-invoking the failed stage could plausibly succeed.
    /// Template drift is deterministic; I/O failures may be transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, PipelineError::HeaderNotFound { .. })
    }
}

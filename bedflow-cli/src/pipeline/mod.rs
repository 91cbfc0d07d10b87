//! Pipeline coordinator
//!
//! Sequences the four stages of one invocation: resolve the source locally,
//! extract raw rows, normalize them, persist the batch. Stages have a linear
//! data dependency, so there is no internal parallelism; concurrent
//! invocations are the scheduler's business and are safe because the only
//! shared mutable resource is the database behind its unique-constraint
//! upsert.

pub mod error;
pub mod result;
pub mod retry;

pub use error::PipelineError;
pub use result::{IngestionResult, QualityWarning, RejectReason, Rejection, RunArtifact};
pub use retry::RetryPolicy;

use std::fmt;

use sqlx::SqlitePool;

use crate::db::repository;
use crate::extract::{SynonymTable, extract_rows};
use crate::normalize::{ReportingPeriod, RowOutcome, normalize_row};
use crate::source::{ObjectStore, SourceReference, SourceResolver};

/// Invocation states. `Failed` is reachable from any non-terminal state;
/// per-row problems during `Normalizing` never reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Resolving,
    Extracting,
    Normalizing,
    Persisting,
    Completed,
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Resolving => "resolving",
            PipelineStage::Extracting => "extracting",
            PipelineStage::Normalizing => "normalizing",
            PipelineStage::Persisting => "persisting",
            PipelineStage::Completed => "completed",
            PipelineStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Coordinates one invocation end to end. Holds no state across invocations;
/// all dependencies are injected.
pub struct PipelineCoordinator<'a, S> {
    resolver: &'a SourceResolver<S>,
    pool: &'a SqlitePool,
    synonyms: &'a SynonymTable,
    retry: RetryPolicy,
}

impl<'a, S: ObjectStore> PipelineCoordinator<'a, S> {
    pub fn new(
        resolver: &'a SourceResolver<S>,
        pool: &'a SqlitePool,
        synonyms: &'a SynonymTable,
    ) -> Self {
        PipelineCoordinator {
            resolver,
            pool,
            synonyms,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// One invocation: a source reference in, an `IngestionResult` out.
    /// Returns the specific fatal reason otherwise; there is no partial
    /// success. Cancelling before the persistence commit leaves the store
    /// unchanged.
    pub async fn run(
        &self,
        reference: &SourceReference,
        period: ReportingPeriod,
    ) -> Result<IngestionResult, PipelineError> {
        let mut stage = PipelineStage::Idle;

        self.transition(&mut stage, PipelineStage::Resolving, reference);
        let resolved = self
            .retry
            .run("resolving", || self.resolver.resolve(reference))
            .await
            .map_err(|e| self.fail(&mut stage, e))?;

        self.transition(&mut stage, PipelineStage::Extracting, reference);
        let raw_rows = extract_rows(resolved.path(), self.synonyms)
            .map_err(|e| self.fail(&mut stage, e))?;

        self.transition(&mut stage, PipelineStage::Normalizing, reference);
        let mut records = Vec::with_capacity(raw_rows.len());
        let mut result = IngestionResult::default();
        for row in &raw_rows {
            match normalize_row(row, period) {
                RowOutcome::Record { record, warning } => {
                    if let Some(warning) = warning {
                        log::warn!("Data quality: {}: {}", warning.identity, warning.message);
                        result.warnings.push(warning);
                    }
                    records.push(record);
                }
                RowOutcome::Skipped => {}
                RowOutcome::Rejected(rejection) => {
                    log::debug!("Row {} rejected: {}", rejection.row_index, rejection.reason);
                    result.rejected.push(rejection);
                }
            }
        }
        log::info!(
            "Normalized {} records from {} raw rows ({} rejected)",
            records.len(),
            raw_rows.len(),
            result.rejected.len()
        );

        self.transition(&mut stage, PipelineStage::Persisting, reference);
        let outcome = self
            .retry
            .run("persisting", || repository::persist_batch(self.pool, &records))
            .await
            .map_err(|e| self.fail(&mut stage, e))?;
        result.inserted = outcome.inserted;
        result.updated = outcome.updated;

        stage = PipelineStage::Completed;
        log::info!(
            "{}: {} for {}: {} inserted, {} updated, {} rejected, {} warnings",
            stage,
            reference,
            period,
            result.inserted,
            result.updated,
            result.rejected.len(),
            result.warnings.len()
        );
        Ok(result)
    }

    fn transition(&self, stage: &mut PipelineStage, next: PipelineStage, reference: &SourceReference) {
        log::info!("{} -> {}: {}", stage, next, reference);
        *stage = next;
    }

    /// Terminal failure: the error passes through unmodified so the caller
    /// (and the logs) see the exact taxonomy variant.
    fn fail(&self, stage: &mut PipelineStage, err: PipelineError) -> PipelineError {
        log::error!("Invocation failed during {}: {}", stage, err);
        *stage = PipelineStage::Failed;
        err
    }
}

//! Run command handler

use anyhow::{Context, Result, bail};

use super::RunArgs;
use crate::db;
use crate::extract::SynonymTable;
use crate::normalize::ReportingPeriod;
use crate::pipeline::{PipelineCoordinator, RetryPolicy, RunArtifact};
use crate::source::resolver::DEFAULT_HTTP_TIMEOUT;
use crate::source::{HttpObjectStore, ObjectStore, SourceReference, SourceResolver};

/// Bucket run-summary artifacts land in
const RESULTS_BUCKET: &str = "pipeline-results";

pub async fn handle_run_command(args: RunArgs) -> Result<()> {
    let reference = SourceReference::parse(&args.source)?;

    let period = match (&args.quarter, args.year) {
        (Some(quarter), Some(year)) => {
            if !(1000..=9999).contains(&year) {
                bail!("Year must be four digits, got {}", year);
            }
            ReportingPeriod {
                quarter: quarter.parse()?,
                year,
            }
        }
        (None, None) => ReportingPeriod::from_filename(reference.file_name()).with_context(|| {
            format!(
                "Could not derive quarter/year from filename '{}'; pass --quarter and --year",
                reference.file_name()
            )
        })?,
        _ => bail!("Provide both --quarter and --year, or neither to derive them from the filename"),
    };

    let synonyms = match &args.synonyms {
        Some(path) => SynonymTable::from_file(path)?,
        None => SynonymTable::embedded().clone(),
    };

    let database_url = super::database_url(args.database_url);
    let pool = db::connect(&database_url).await?;
    db::init_schema(&pool).await?;

    let store_endpoint = super::object_store_url(args.object_store_url);
    let store = HttpObjectStore::new(&store_endpoint, DEFAULT_HTTP_TIMEOUT)?;
    let resolver = SourceResolver::new(store)?;

    let coordinator = PipelineCoordinator::new(&resolver, &pool, &synonyms)
        .with_retry_policy(RetryPolicy::attempts(args.attempts));
    let result = coordinator.run(&reference, period).await?;

    println!("Ingested {} for {}", reference, period);
    println!(
        "  inserted: {}  updated: {}  rejected: {}  warnings: {}",
        result.inserted,
        result.updated,
        result.rejected.len(),
        result.warnings.len()
    );
    for rejection in &result.rejected {
        println!("  rejected row {}: {}", rejection.row_index, rejection.reason);
    }
    for warning in &result.warnings {
        println!("  warning {}: {}", warning.identity, warning.message);
    }

    if args.artifact {
        let artifact = RunArtifact::success(&args.source, &result);
        let key = format!(
            "pipeline_run_{}.json",
            artifact.finished_at.format("%Y-%m-%dT%H-%M-%S")
        );
        let body = serde_json::to_vec_pretty(&artifact).context("Failed to encode run artifact")?;
        let artifact_store = HttpObjectStore::new(&store_endpoint, DEFAULT_HTTP_TIMEOUT)?;
        artifact_store
            .put_object(RESULTS_BUCKET, &key, body)
            .await
            .context("Failed to upload run artifact")?;
        println!("Run artifact written to {}/{}", RESULTS_BUCKET, key);
    }

    Ok(())
}

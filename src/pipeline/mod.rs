//! Pipeline orchestration shim.
//!
//! A pipeline is a configured sequence of named transform steps over a
//! run context. Step kinds form a closed set validated when the
//! configuration is loaded; an unknown step tag never reaches execution.
//! Each step reads one slot's blob as input and either binds a new blob
//! to an output slot or records derived metadata on the context.

mod blob;
mod context;

pub use blob::{BlobStore, FsBlobStore, StoredBlob};
pub use context::{RunContext, SlotKey};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, info_span};

use crate::directions;
use crate::errors::{Error, Result};
use crate::validity;

/// One configured transform step. The `type` tag selects the kind; serde
/// rejects unknown tags at configuration-load time.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepConfig {
    /// Rewrite `direction_id` in the input archive's trips table using a
    /// route reference file, binding the new archive to `output`.
    ComputeDirections {
        input: SlotKey,
        output: SlotKey,
        reference: PathBuf,
    },
    /// Compute the calendar-based validity period of the input archive.
    CalendarValidity { input: SlotKey },
    /// Compute the versioned-calendar validity period of the input archive.
    VersionedValidity {
        input: SlotKey,
        #[serde(default = "default_versioned_member")]
        member: String,
    },
}

fn default_versioned_member() -> String {
    validity::versioned::DEFAULT_MEMBER.to_string()
}

impl StepConfig {
    fn kind(&self) -> &'static str {
        match self {
            StepConfig::ComputeDirections { .. } => "compute_directions",
            StepConfig::CalendarValidity { .. } => "calendar_validity",
            StepConfig::VersionedValidity { .. } => "versioned_validity",
        }
    }
}

/// A full pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub steps: Vec<StepConfig>,
}

/// Loads and validates a pipeline configuration file. Unknown step tags
/// or malformed step options fail here, before any step runs.
pub fn load_pipeline(path: &Path) -> Result<PipelineConfig> {
    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| Error::Parameter(format!("bad pipeline configuration '{}': {}", path.display(), e)))
}

/// Runs every step strictly in configured order. Each step consumes the
/// context and produces a new one; the first failing step aborts the run
/// and leaves all previously stored blobs untouched.
pub fn run_pipeline(
    store: &dyn BlobStore,
    config: &PipelineConfig,
    mut ctx: RunContext,
) -> Result<RunContext> {
    for (index, step) in config.steps.iter().enumerate() {
        let span = info_span!("pipeline_step", index, kind = step.kind());
        let _guard = span.enter();
        ctx = run_step(store, step, ctx)?;
        info!("Step finished");
    }
    Ok(ctx)
}

fn run_step(store: &dyn BlobStore, step: &StepConfig, ctx: RunContext) -> Result<RunContext> {
    match step {
        StepConfig::ComputeDirections {
            input,
            output,
            reference,
        } => {
            let archive = fetch_to_scratch(store, &ctx, input)?;
            let rewritten = directions::rewrite_trip_directions(archive.path(), reference)?;
            let bytes = fs::read(&rewritten)?;
            fs::remove_file(&rewritten)?;
            let blob = store.store(&bytes, "gtfs_directions.zip")?;
            info!(blob_id = %blob.id, len = blob.len, "Rewritten archive stored");
            Ok(ctx.with_slot(output.clone(), blob.id))
        }
        StepConfig::CalendarValidity { input } => {
            let archive = fetch_to_scratch(store, &ctx, input)?;
            let period = validity::calendar::compute(archive.path())?;
            info!(start = %period.start_date, end = %period.end_date, "Validity period computed");
            Ok(ctx.with_validity(period))
        }
        StepConfig::VersionedValidity { input, member } => {
            let archive = fetch_to_scratch(store, &ctx, input)?;
            let period = validity::versioned::compute(archive.path(), member)?;
            info!(start = %period.start_date, end = %period.end_date, "Validity period computed");
            Ok(ctx.with_validity(period))
        }
    }
}

/// Materializes a slot's blob as a scratch file for the archive readers.
/// The file disappears with the returned handle.
fn fetch_to_scratch(
    store: &dyn BlobStore,
    ctx: &RunContext,
    slot: &SlotKey,
) -> Result<tempfile::NamedTempFile> {
    let blob_id = ctx.blob_id(slot)?;
    let bytes = store.fetch(blob_id)?;
    let mut scratch = tempfile::Builder::new()
        .prefix("gtfs_feed_prep_in_")
        .suffix(".zip")
        .tempfile()?;
    scratch.write_all(&bytes)?;
    scratch.flush()?;
    Ok(scratch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(contents.as_bytes()).unwrap();
        tmp
    }

    #[test]
    fn test_known_step_tags_parse() {
        let tmp = write_config(
            r#"{
                "steps": [
                    {"type": "calendar_validity",
                     "input": {"contributor": "c1", "data_source": "gtfs"}},
                    {"type": "versioned_validity",
                     "input": {"contributor": "c1", "data_source": "export"},
                     "member": "versions.txt"}
                ]
            }"#,
        );
        let config = load_pipeline(tmp.path()).unwrap();
        assert_eq!(config.steps.len(), 2);
        assert_eq!(config.steps[0].kind(), "calendar_validity");
    }

    #[test]
    fn test_unknown_step_tag_fails_at_load_time() {
        let tmp = write_config(
            r#"{"steps": [{"type": "frobnicate", "input": {"contributor": "c", "data_source": "d"}}]}"#,
        );
        let err = load_pipeline(tmp.path()).unwrap_err();
        assert!(matches!(err, Error::Parameter(_)));
    }

    #[test]
    fn test_missing_step_option_fails_at_load_time() {
        // compute_directions without its reference file option
        let tmp = write_config(
            r#"{"steps": [{"type": "compute_directions",
                           "input": {"contributor": "c", "data_source": "d"},
                           "output": {"contributor": "c", "data_source": "d2"}}]}"#,
        );
        assert!(load_pipeline(tmp.path()).is_err());
    }

    #[test]
    fn test_step_with_unbound_slot_fails_with_parameter_error() {
        let store_dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(store_dir.path()).unwrap();
        let config = PipelineConfig {
            steps: vec![StepConfig::CalendarValidity {
                input: SlotKey {
                    contributor: "c1".to_string(),
                    data_source: "gtfs".to_string(),
                },
            }],
        };
        let err = run_pipeline(&store, &config, RunContext::new()).unwrap_err();
        assert!(matches!(err, Error::Parameter(_)));
    }
}

//! CLI entry point for the GTFS feed preparation tool.
//!
//! Provides subcommands for rewriting trip directions inside a feed
//! archive, computing a feed's validity period, inspecting one table of an
//! archive, and running a configured pipeline over a local blob store.

use anyhow::Result;
use clap::{Parser, Subcommand};
use gtfs_feed_prep::dataset::{Dataset, LoadOptions};
use gtfs_feed_prep::pipeline::{self, BlobStore, FsBlobStore, RunContext, SlotKey};
use gtfs_feed_prep::{directions, validity};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "gtfs_feed_prep")]
#[command(about = "A tool to transform GTFS feeds and summarize their calendars", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite trip direction flags in a feed archive
    Directions {
        /// Path to the feed archive (zip)
        archive: PathBuf,

        /// Route reference file: JSON array of {route_id, stops}
        #[arg(short, long)]
        reference: PathBuf,

        /// Where to write the rewritten archive
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Compute a feed's validity period and log it as JSON
    Validity {
        /// Path to the feed archive (zip)
        archive: PathBuf,

        /// Read a versioned calendar table instead of the GTFS calendars
        #[arg(long, default_value_t = false)]
        versioned: bool,

        /// Member name of the versioned calendar table
        #[arg(long, default_value = validity::versioned::DEFAULT_MEMBER)]
        member: String,
    },
    /// Print row count and column statistics for one table of an archive
    Stats {
        /// Path to the feed archive (zip)
        archive: PathBuf,

        /// Member name of the table to inspect
        member: String,

        /// Field delimiter of the table
        #[arg(short, long, default_value_t = ',')]
        delimiter: char,

        /// Columns to report min/max for
        #[arg(long)]
        min_max: Vec<String>,

        /// Columns to group by (repeatable); requires --count
        #[arg(long)]
        group_by: Vec<String>,

        /// Column whose non-missing values are counted per group
        #[arg(long)]
        count: Option<String>,
    },
    /// Run a configured pipeline over a local blob store
    Run {
        /// Pipeline configuration file (JSON)
        pipeline: PathBuf,

        /// Directory backing the blob store
        #[arg(short, long, default_value = "blobs")]
        store: PathBuf,

        /// Contributor owning the seeded data-source slot
        #[arg(long)]
        contributor: String,

        /// Data source name of the seeded slot
        #[arg(long)]
        data_source: String,

        /// Archive to seed the input slot with
        #[arg(long)]
        archive: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/gtfs_feed_prep.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gtfs_feed_prep.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Directions {
            archive,
            reference,
            output,
        } => {
            let rewritten = directions::rewrite_trip_directions(&archive, &reference)?;
            std::fs::copy(&rewritten, &output)?;
            std::fs::remove_file(&rewritten)?;
            info!(output = %output.display(), "Archive written");
        }
        Commands::Validity {
            archive,
            versioned,
            member,
        } => {
            let period = if versioned {
                validity::versioned::compute(&archive, &member)?
            } else {
                validity::calendar::compute(&archive)?
            };
            info!("{}", serde_json::to_string_pretty(&period)?);
        }
        Commands::Stats {
            archive,
            member,
            delimiter,
            min_max,
            group_by,
            count,
        } => {
            table_stats(
                &archive,
                &member,
                delimiter,
                &min_max,
                &group_by,
                count.as_deref(),
            )?;
        }
        Commands::Run {
            pipeline,
            store,
            contributor,
            data_source,
            archive,
        } => {
            run(&pipeline, &store, contributor, data_source, &archive)?;
        }
    }

    Ok(())
}

/// Loads one table from the archive and logs basic statistics about it.
fn table_stats(
    archive: &Path,
    member: &str,
    delimiter: char,
    min_max: &[String],
    group_by: &[String],
    count: Option<&str>,
) -> Result<()> {
    let table = Dataset::load_zip_member(archive, member, &LoadOptions::csv(delimiter as u8))?;
    info!(
        table = member,
        rows = table.row_count(),
        columns = table.headers().len(),
        "Table loaded"
    );

    for column in min_max {
        let min = table.min(column)?.render("%Y%m%d");
        let max = table.max(column)?.render("%Y%m%d");
        info!(column = %column, min = %min, max = %max, "Column range");
    }

    if let Some(count_column) = count {
        let group_columns: Vec<&str> = group_by.iter().map(String::as_str).collect();
        let counts = table.group_count_by(&group_columns, count_column)?;
        for (key, n) in &counts {
            info!(group = %key.join("/"), count = *n, "Group");
        }
        info!(groups = counts.len(), "Group count finished");
    }

    Ok(())
}

/// Seeds the blob store with `archive`, binds it to the given slot, and
/// runs the configured pipeline.
fn run(
    pipeline_path: &Path,
    store_dir: &Path,
    contributor: String,
    data_source: String,
    archive: &Path,
) -> Result<()> {
    let config = pipeline::load_pipeline(pipeline_path)?;
    let store = FsBlobStore::open(store_dir)?;

    let bytes = std::fs::read(archive)?;
    let name = archive
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("feed.zip");
    let seeded = store.store(&bytes, name)?;
    info!(blob_id = %seeded.id, len = seeded.len, "Input archive stored");

    let slot = SlotKey {
        contributor,
        data_source,
    };
    let ctx = RunContext::new().with_slot(slot, seeded.id);
    let ctx = pipeline::run_pipeline(&store, &config, ctx)?;

    for (slot, blob_id) in ctx.slots() {
        info!(slot = %slot, blob_id = %blob_id, "Slot");
    }
    if let Some(period) = ctx.validity {
        info!("{}", serde_json::to_string_pretty(&period)?);
    }

    Ok(())
}

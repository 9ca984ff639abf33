//! Libros Ingest - replay storage events through the ingestion pipeline
//!
//! Runs the same pipeline and delivery policy as the server, against the configured
//! database and object store, without going through HTTP. Useful for local runs and
//! for backfilling spreadsheets that were uploaded while no hook was registered.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use libros_common::{
    logging::{init_logging, LogConfig, LogLevel},
    types::ObjectFinalizedEvent,
};
use libros_server::{
    config::{Config, SPREADSHEET_CONTENT_TYPE},
    ingest::{DeliveryReport, EventHost, IngestionPipeline, Trigger},
    storage::{BlobStore, S3BlobStore},
    store::PgDocumentStore,
};
use std::{collections::VecDeque, path::PathBuf, sync::Arc};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "libros-ingest")]
#[command(author, version, about = "Replay storage events through the Libros ingestion pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deliver an object-finalized event for an object already in storage
    Event {
        #[command(flatten)]
        target: Target,

        /// Content type reported by the event
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Upload a local spreadsheet, then deliver its event
    Upload {
        /// Spreadsheet to upload
        file: PathBuf,

        #[command(flatten)]
        target: Target,
    },
}

#[derive(clap::Args, Debug)]
struct Target {
    /// Bucket holding the object
    #[arg(short, long, env = "LIBROS_BUCKET")]
    bucket: String,

    /// Object key
    #[arg(short, long)]
    name: String,

    /// Trigger(s) to deliver to
    #[arg(short, long, value_enum, default_value_t = TriggerArg::All)]
    trigger: TriggerArg,

    /// Deliver the artifacts emitted by the spreadsheet trigger as well
    #[arg(short, long)]
    follow: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TriggerArg {
    Spreadsheet,
    Artifact,
    All,
}

impl TriggerArg {
    fn triggers(self) -> &'static [Trigger] {
        match self {
            TriggerArg::Spreadsheet => &[Trigger::Spreadsheet],
            TriggerArg::Artifact => &[Trigger::Artifact],
            TriggerArg::All => &Trigger::ALL,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("libros-ingest")
        .build()
        .merge_env()?;

    init_logging(&log_config)?;

    let config = Config::load()?;

    let store = PgDocumentStore::connect(&config.database, config.pipeline.max_batch_ops).await?;
    store.migrate().await?;
    let blobs = Arc::new(S3BlobStore::connect(config.storage.clone()).await);

    let (target, content_type) = match cli.command {
        Command::Event {
            target,
            content_type,
        } => (target, content_type),
        Command::Upload { file, target } => {
            blobs
                .upload(&target.bucket, &file, &target.name, SPREADSHEET_CONTENT_TYPE)
                .await?;
            info!(file = %file.display(), bucket = %target.bucket, key = %target.name, "Spreadsheet uploaded");
            (target, Some(SPREADSHEET_CONTENT_TYPE.to_string()))
        },
    };

    let pipeline = Arc::new(IngestionPipeline::new(
        blobs,
        Arc::new(store),
        config.pipeline.clone(),
    ));
    let host = EventHost::new(pipeline, &config.host);

    let event = ObjectFinalizedEvent::new(&target.bucket, &target.name, content_type.as_deref());
    let reports = replay(&host, event, target.trigger.triggers(), target.follow).await;

    let failures = reports.iter().filter(|r| !r.is_success()).count();
    for report in &reports {
        println!(
            "{:<12} {:<40} attempts={} {:?}",
            report.trigger.as_str(),
            report.event.name,
            report.attempts,
            report.outcome
        );
    }

    if failures > 0 {
        bail!("{} of {} deliveries failed", failures, reports.len());
    }

    Ok(())
}

/// Deliver `event` to each trigger in turn; with `follow`, every artifact a
/// spreadsheet delivery emits is queued for the artifact trigger.
async fn replay(
    host: &EventHost,
    event: ObjectFinalizedEvent,
    triggers: &[Trigger],
    follow: bool,
) -> Vec<DeliveryReport> {
    let mut pending: VecDeque<(Trigger, ObjectFinalizedEvent)> =
        triggers.iter().map(|t| (*t, event.clone())).collect();
    let mut reports = Vec::new();

    while let Some((trigger, event)) = pending.pop_front() {
        let report = host.deliver(trigger, event).await;
        if follow {
            pending.extend(
                report
                    .emitted_artifacts()
                    .iter()
                    .map(|artifact| (Trigger::Artifact, artifact.clone())),
            );
        }
        reports.push(report);
    }

    reports
}

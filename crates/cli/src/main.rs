use crate::commands::Commands;
use crate::error::CliError;
use clap::Parser;
use connectors::object::{SourceObject, fs::FsObject, http::HttpObject};
use connectors::reader::{ChunkedLineReader, DEFAULT_CHUNK_SIZE};
use connectors::upstream::{TrackApi, UpstreamConfig};
use engine_core::metrics::Metrics;
use engine_processing::normalize::CastSpec;
use engine_runtime::budget::RunBudget;
use engine_runtime::controller::{ImportController, RunParams};
use model::run::TriggerPayload;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, info};

mod commands;
mod error;
mod handoff;

#[derive(Parser)]
#[command(
    name = "attrsync",
    version = "0.1.0",
    about = "Resumable bulk attribute importer"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // Initialize logger
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            payload,
            bucket,
            key,
            offset,
            headers,
            type_cast,
            store,
            max_threads,
            chunk_size_mb,
            time_budget_secs,
            time_reserve_secs,
        } => {
            let mut trigger = load_trigger_payload(payload.as_deref()).await?;
            if let Some(bucket) = bucket {
                trigger.source_bucket = bucket;
            }
            if let Some(key) = key {
                trigger.source_key = key;
            }
            if let Some(offset) = offset {
                trigger.offset = offset;
            }
            if let Some(headers) = headers {
                trigger.headers = Some(headers.split(',').map(str::to_string).collect());
            }
            if let Some(type_cast) = type_cast {
                trigger.type_cast_spec = Some(type_cast);
            }
            if trigger.source_bucket.is_empty() {
                return Err(CliError::MissingArgument("bucket"));
            }
            if trigger.source_key.is_empty() {
                return Err(CliError::MissingArgument("key"));
            }

            let budget = if time_budget_secs == 0 {
                RunBudget::unbounded()
            } else {
                RunBudget::bounded(
                    Duration::from_secs(time_budget_secs),
                    Duration::from_secs(time_reserve_secs),
                )
            };

            run(&trigger, &store, max_threads, chunk_size_mb, budget).await?;
        }
        Commands::Inspect { store, bucket, key } => {
            let object = open_object(&store, &bucket, &key);
            let content_length = object.content_length().await?;

            let mut reader = ChunkedLineReader::new(object, 0, DEFAULT_CHUNK_SIZE);
            let columns = reader.read_header_row().await?.unwrap_or_default();

            let metadata = serde_json::json!({
                "contentLength": content_length,
                "columns": columns,
            });
            let metadata_json =
                serde_json::to_string_pretty(&metadata).map_err(CliError::JsonSerialize)?;
            println!("{metadata_json}");
        }
    }

    Ok(())
}

async fn run(
    trigger: &TriggerPayload,
    store: &str,
    max_threads: usize,
    chunk_size_mb: usize,
    budget: RunBudget,
) -> Result<(), CliError> {
    info!(
        bucket = %trigger.source_bucket,
        key = %trigger.source_key,
        offset = trigger.offset,
        "New import run started"
    );

    let object = open_object(store, &trigger.source_bucket, &trigger.source_key);
    let api = Arc::new(TrackApi::new(UpstreamConfig::from_env()?));
    let metrics = Metrics::new();

    let mut params = RunParams::new(object, api);
    params.offset = trigger.offset;
    params.headers = trigger.headers.clone();
    params.casts = trigger
        .type_cast_spec
        .as_deref()
        .map(CastSpec::parse)
        .unwrap_or_default();
    params.max_threads = max_threads.max(1);
    params.chunk_size = chunk_size_mb.max(1) * 1024 * 1024;
    params.budget = budget;
    params.metrics = metrics.clone();

    let mut controller = ImportController::new(params);
    let outcome = controller.run().await;

    let snapshot = metrics.snapshot();
    info!(
        records_delivered = snapshot.records_delivered,
        record_failures = snapshot.record_failures,
        batches_delivered = snapshot.batches_delivered,
        retries = snapshot.retry_count,
        "Run metrics"
    );

    match outcome {
        Ok(report) => {
            if !report.is_finished {
                let next = trigger.with_continuation(&controller.continuation());
                handoff::start_next_run(&next).await?;
            }
            let report_json =
                serde_json::to_string_pretty(&report).map_err(CliError::JsonSerialize)?;
            println!("{report_json}");
            Ok(())
        }
        Err(err) => {
            let resume = trigger.with_continuation(&controller.continuation());
            handoff::notify_failure(
                &err.to_string(),
                controller.state().processed_count,
                &resume,
            );
            Err(CliError::Import(err))
        }
    }
}

async fn load_trigger_payload(path: Option<&str>) -> Result<TriggerPayload, CliError> {
    match path {
        Some(path) => {
            let source = tokio::fs::read_to_string(path).await?;
            let payload = serde_json::from_str(&source)?;
            Ok(payload)
        }
        None => Ok(TriggerPayload {
            source_bucket: String::new(),
            source_key: String::new(),
            offset: 0,
            headers: None,
            type_cast_spec: None,
        }),
    }
}

fn open_object(store: &str, bucket: &str, key: &str) -> Arc<dyn SourceObject> {
    if store.starts_with("http://") || store.starts_with("https://") {
        let base = store.trim_end_matches('/');
        Arc::new(HttpObject::new(format!("{base}/{bucket}/{key}")))
    } else {
        Arc::new(FsObject::new(Path::new(store).join(bucket).join(key)))
    }
}

//! `opik-bulk` command-line entrypoint.
//!
//! Reads an experiment batch (the JSON request body) from a file and
//! validates, splits or submits it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use opik_bulk::experiment::{BatchSplitter, ExperimentBatch, MAX_BATCH_BYTES};
use opik_bulk::transport::{BulkTransport, MemoryTransport};
use opik_bulk::{ApiErrorBody, ClientConfig, Error, ExperimentItemsClient, RetryPolicy};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "opik-bulk",
    about = "Bulk-log experiment items to an Opik server",
    version,
    after_help = "Connection settings come from OPIK_URL_OVERRIDE, OPIK_API_KEY and OPIK_WORKSPACE."
)]
struct Cli {
    /// Log level filter when RUST_LOG is unset (e.g. "debug", "opik_bulk=trace")
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a batch file without sending it
    Validate {
        /// Batch JSON file
        file: PathBuf,
    },
    /// Split a batch file into request-sized chunk files
    Split {
        /// Batch JSON file
        file: PathBuf,
        /// Directory for chunk-NNNN.json files
        #[arg(long)]
        out_dir: PathBuf,
        /// Maximum encoded bytes per chunk
        #[arg(long, default_value_t = MAX_BATCH_BYTES)]
        max_bytes: usize,
        /// Maximum items per chunk
        #[arg(long)]
        max_items: Option<usize>,
    },
    /// Send a batch file to the bulk endpoint
    Submit {
        /// Batch JSON file
        file: PathBuf,
        /// Split into several requests when over the size limit
        #[arg(long)]
        chunked: bool,
        /// Run against an in-memory endpoint instead of the network
        #[arg(long)]
        dry_run: bool,
        /// Base API URL (overrides OPIK_URL_OVERRIDE)
        #[arg(long)]
        url: Option<String>,
        /// Workspace (overrides OPIK_WORKSPACE)
        #[arg(long)]
        workspace: Option<String>,
        /// Retries on 429/5xx/transport errors
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Validate { file } => validate(&file),
        Commands::Split {
            file,
            out_dir,
            max_bytes,
            max_items,
        } => {
            let batch = read_batch(&file)?;
            let written = split(&batch, &out_dir, max_bytes, max_items)?;
            println!(
                "{} items -> {} chunks in {}",
                batch.len(),
                written.len(),
                out_dir.display()
            );
            Ok(())
        }
        Commands::Submit {
            file,
            chunked,
            dry_run,
            url,
            workspace,
            retries,
        } => {
            let batch = read_batch(&file)?;
            let retry = RetryPolicy::with_retries(retries);
            if dry_run {
                let client = ExperimentItemsClient::new(MemoryTransport::new()).with_retry(retry);
                submit(&client, &batch, chunked).await
            } else {
                let config = resolve_config(|key| std::env::var(key).ok(), url, workspace, retry)?;
                let endpoint = config.endpoint()?;
                info!(%endpoint, "submitting");
                let client = ExperimentItemsClient::from_config(&config)?;
                submit(&client, &batch, chunked).await
            }
        }
    }
}

fn read_batch(path: &Path) -> Result<ExperimentBatch> {
    ExperimentBatch::read_from(path).with_context(|| format!("loading {}", path.display()))
}

fn validate(path: &Path) -> Result<()> {
    let batch = read_batch(path)?;
    batch.validate()?;
    let size = batch.encoded_len()?;
    println!(
        "{}: {} items, {} bytes{}",
        path.display(),
        batch.len(),
        size,
        if size > MAX_BATCH_BYTES {
            " (over the 4 MiB limit, submit with --chunked)"
        } else {
            ""
        }
    );
    Ok(())
}

/// Validate `batch` and write its chunks; `max_bytes` is clamped to 4 MiB.
fn split(
    batch: &ExperimentBatch,
    out_dir: &Path,
    max_bytes: usize,
    max_items: Option<usize>,
) -> Result<Vec<PathBuf>> {
    batch.validate()?;

    let mut splitter = BatchSplitter::new(max_bytes).capped(MAX_BATCH_BYTES);
    if let Some(n) = max_items {
        splitter = splitter.max_items(n);
    }
    splitter
        .write_chunks(batch, out_dir)
        .with_context(|| format!("writing chunks to {}", out_dir.display()))
}

/// Environment settings with `--url` / `--workspace` applied on top, validated once.
fn resolve_config<F>(
    lookup: F,
    url: Option<String>,
    workspace: Option<String>,
    retry: RetryPolicy,
) -> Result<ClientConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut builder = ClientConfig::builder_from_lookup(lookup).retry(retry);
    if let Some(url) = url {
        builder = builder.base_url(url);
    }
    if let Some(workspace) = workspace {
        builder = builder.workspace(workspace);
    }
    Ok(builder.build()?)
}

async fn submit<T: BulkTransport>(
    client: &ExperimentItemsClient<T>,
    batch: &ExperimentBatch,
    chunked: bool,
) -> Result<()> {
    let outcome = if chunked {
        client.log_batch_chunked(batch).await.map(|report| {
            println!(
                "logged {} items in {} requests ({} bytes)",
                report.items_sent, report.chunks_sent, report.bytes_sent
            );
        })
    } else {
        client.log_batch(batch).await.map(|()| {
            println!("logged {} items", batch.len());
        })
    };

    outcome.map_err(|e| {
        if let Error::Api { status, body } = &e {
            return anyhow::anyhow!(
                "endpoint rejected batch (HTTP {status}): {}",
                ApiErrorBody::summarize(body)
            );
        }
        anyhow::Error::new(e)
    })
}

//! Reranking adapter: reads query/content pairs from stdin as JSON, scores
//! them with a cross-encoder, writes the scores to stdout as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, info_span, Instrument};

use docforge::adapters::{RerankAdapter, RerankRecord};
use docforge::backend::CrossEncoderScorer;
use docforge::batch::{run_batched, DEFAULT_BATCH_SIZE};
use docforge::{io, logging};

#[derive(Parser)]
#[command(name = "rerank")]
#[command(about = "Rerank code chunks against their queries", long_about = None)]
struct Args {
    /// Model directory (config.json, tokenizer.json, model.safetensors)
    #[arg(long)]
    model: PathBuf,

    /// Pairs per model invocation
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,
}

#[tokio::main]
async fn main() {
    logging::init();
    let args = Args::parse();

    if let Err(err) = run(args).instrument(info_span!("rerank")).await {
        eprintln!("[rerank] ERROR: {err:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    info!("loading model: {}", args.model.display());
    let scorer = CrossEncoderScorer::load(&args.model).context("failed to load model")?;
    let adapter = RerankAdapter::new(Arc::new(scorer));

    let items: Vec<RerankRecord> = io::read_stdin_json()
        .await
        .context("failed to read input")?;
    info!("processing {} items", items.len());

    let results = run_batched(&adapter, &items, args.batch_size).await;

    let ok = results.iter().filter(|r| r.error.is_none()).count();
    info!("reranked {ok}/{} items", results.len());

    io::write_stdout_json(&results).context("failed to serialize output")?;
    Ok(())
}

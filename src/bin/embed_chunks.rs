//! Embedding adapter: reads chunks from stdin as JSON, generates embeddings,
//! writes them to stdout as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, info_span, Instrument};

use docforge::adapters::{ChunkRecord, EmbedAdapter};
use docforge::backend::BertEmbedder;
use docforge::batch::{run_batched, DEFAULT_BATCH_SIZE};
use docforge::{io, logging};

#[derive(Parser)]
#[command(name = "embed-chunks")]
#[command(about = "Generate embeddings for code chunks", long_about = None)]
struct Args {
    /// Model directory (config.json, tokenizer.json, model.safetensors)
    #[arg(long)]
    model: PathBuf,

    /// Chunks per model invocation
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,
}

#[tokio::main]
async fn main() {
    logging::init();
    let args = Args::parse();

    if let Err(err) = run(args).instrument(info_span!("embed")).await {
        eprintln!("[embed] ERROR: {err:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    info!("loading model: {}", args.model.display());
    let embedder = BertEmbedder::load(&args.model).context("failed to load model")?;
    let adapter = EmbedAdapter::new(Arc::new(embedder));
    info!("model loaded (dimension {})", adapter.dimension());

    let chunks: Vec<ChunkRecord> = io::read_stdin_json()
        .await
        .context("failed to read input")?;
    info!("processing {} chunks", chunks.len());

    let results = run_batched(&adapter, &chunks, args.batch_size).await;

    let ok = results.iter().filter(|r| r.error.is_none()).count();
    info!("generated {ok}/{} embeddings", results.len());

    io::write_stdout_json(&results).context("failed to serialize output")?;
    Ok(())
}

//! Generation adapter: reads a preprocessed corpus (chunks, symbols, files)
//! from stdin as JSON and writes a structured documentation report to stdout
//! as JSON, using a registry-configured local model.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, info_span, Instrument};

use docforge::adapters::{CorpusInput, GenerateAdapter};
use docforge::backend::GgufGenerator;
use docforge::config::SamplingOptions;
use docforge::{io, logging, registry};

#[derive(Parser)]
#[command(name = "generate")]
#[command(about = "Generate structured documentation with a local model", long_about = None)]
struct Args {
    /// Registered model name (see the model registry)
    #[arg(long)]
    model: String,

    /// GGUF weights path, overriding the registry default
    #[arg(long)]
    weights: Option<PathBuf>,

    /// tokenizer.json path; defaults to a sibling of the weights
    #[arg(long)]
    tokenizer: Option<PathBuf>,

    /// Maximum tokens to generate
    #[arg(long, default_value_t = 4096)]
    max_tokens: usize,

    /// Temperature for generation
    #[arg(long, default_value_t = 0.3)]
    temperature: f64,

    /// Context window size
    #[arg(long, default_value_t = 8192)]
    ctx_size: usize,
}

#[tokio::main]
async fn main() {
    logging::init();
    let args = Args::parse();

    if let Err(err) = run(args).instrument(info_span!("generate")).await {
        eprintln!("[generate] ERROR: {err:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = registry::get_model_config(&args.model)?;
    info!(
        "loading model: {} (ctx {}, max tokens {})",
        args.model, args.ctx_size, args.max_tokens
    );

    let weights = args
        .weights
        .unwrap_or_else(|| PathBuf::from(&config.model_id));
    let tokenizer = args.tokenizer.unwrap_or_else(|| {
        weights
            .parent()
            .unwrap_or_else(|| std::path::Path::new("."))
            .join("tokenizer.json")
    });

    let generator = GgufGenerator::load(&weights, &tokenizer, args.ctx_size, config.eos_token_id)
        .context("failed to load model")?;

    // CLI flags override the registry's token budget and temperature; the
    // remaining decoding parameters come from the resolved config.
    let mut options = SamplingOptions::from_config(&config);
    options.max_tokens = args.max_tokens;
    options.temperature = args.temperature;

    let adapter = GenerateAdapter::new(Arc::new(generator), config);

    let corpus: CorpusInput = io::read_stdin_json()
        .await
        .context("failed to read input")?;
    info!(
        "processing {} chunks, {} symbols, {} files",
        corpus.chunks.len(),
        corpus.symbols.len(),
        corpus.files.len()
    );

    let report = adapter
        .document(&corpus, &options)
        .await
        .context("generation failed")?;

    info!(
        "generated documentation: {} subsystems, {} enriched symbols, {} insights",
        report.subsystems.len(),
        report.enriched_symbols.len(),
        report.architecture_insights.len()
    );

    io::write_stdout_json(&report).context("failed to serialize output")?;
    Ok(())
}

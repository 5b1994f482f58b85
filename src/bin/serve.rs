//! Long-lived HTTP wrappers around the embedding and summarization models.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info_span, Instrument};

use docforge::logging;
use docforge::server::{run_embed_server, run_summarize_server};

#[derive(Parser)]
#[command(name = "serve")]
#[command(about = "Serve local models over HTTP", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the embedding model
    Embed {
        /// Embedding model directory
        #[arg(long, env = "DOCFORGE_EMBED_MODEL")]
        model: PathBuf,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(long, env = "DOCFORGE_EMBED_PORT", default_value_t = 18115)]
        port: u16,
    },

    /// Serve the summarization model
    Summarize {
        /// Registered model name
        #[arg(long, env = "DOCFORGE_MODEL", default_value = "qwen2.5-1.5b")]
        model: String,

        /// GGUF weights path, overriding the registry default
        #[arg(long)]
        weights: Option<PathBuf>,

        /// tokenizer.json path; defaults to a sibling of the weights
        #[arg(long)]
        tokenizer: Option<PathBuf>,

        /// Context window size
        #[arg(long, default_value_t = 8192)]
        ctx_size: usize,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(long, env = "DOCFORGE_PORT", default_value_t = 18116)]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    logging::init();
    let cli = Cli::parse();

    if let Err(err) = run(cli).instrument(info_span!("serve")).await {
        eprintln!("[serve] ERROR: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Embed { model, host, port } => {
            let addr: SocketAddr = format!("{host}:{port}")
                .parse()
                .context("invalid listen address")?;
            run_embed_server(addr, &model).await?;
        }
        Command::Summarize {
            model,
            weights,
            tokenizer,
            ctx_size,
            host,
            port,
        } => {
            let addr: SocketAddr = format!("{host}:{port}")
                .parse()
                .context("invalid listen address")?;
            run_summarize_server(
                addr,
                &model,
                weights.as_deref(),
                tokenizer.as_deref(),
                ctx_size,
            )
            .await?;
        }
    }
    Ok(())
}

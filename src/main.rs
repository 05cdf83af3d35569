//! # MedAssist CLI (`medassist`)
//!
//! ## Usage
//!
//! ```bash
//! medassist --config ./config/medassist.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `medassist ingest` | Extract, chunk, embed and index documents |
//! | `medassist search "<q>"` | Show ranked passages and the built context |
//! | `medassist ask "<q>"` | Answer a question with citations |
//! | `medassist serve` | Start the HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! # Index everything under the configured ingest directories
//! medassist ingest
//!
//! # Index one PDF
//! medassist ingest --file data/raw/anemia_guide.pdf
//!
//! # Inspect retrieval without calling the LLM
//! medassist search "symptoms of iron deficiency" --top-k 3
//!
//! # Ingest then serve
//! medassist serve --ingest
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use medassist::config::{self, Config};
use medassist::embedding::create_embedder;
use medassist::ingest;
use medassist::pipeline::RagPipeline;
use medassist::search;
use medassist::server;
use medassist::sqlite_index::create_index;

const DEFAULT_CONFIG: &str = "./config/medassist.toml";

/// MedAssist: retrieval-augmented answers over medical documents.
#[derive(Parser)]
#[command(
    name = "medassist",
    about = "MedAssist: retrieval-augmented answers over medical documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/medassist.toml`. When the default file is
    /// absent, built-in defaults are used.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, chunk, embed and upsert documents into the index.
    ///
    /// Without `--file` or `--dir`, every directory in `[ingest] dirs`
    /// is scanned for `.pdf` and `.txt` files.
    Ingest {
        /// A single `.pdf` or `.txt` file.
        #[arg(long, conflicts_with = "dir")]
        file: Option<PathBuf>,

        /// A directory of `.pdf` / `.txt` files.
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Retrieve passages for a query and print the context block.
    Search {
        query: String,

        /// Number of passages (defaults to `[retrieval] top_k`).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Answer a question from the indexed documents.
    Ask { question: String },

    /// Start the HTTP API on `[server] bind`.
    Serve {
        /// Run ingestion before serving.
        #[arg(long)]
        ingest: bool,
    },
}

fn load(path: &Path) -> Result<Config> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG) {
        tracing::warn!(path = %path.display(), "config file not found, using defaults");
        let cfg = Config::minimal();
        cfg.validate()?;
        return Ok(cfg);
    }
    config::load_config(path)
}

async fn serve(cfg: &Config, ingest_first: bool) -> Result<()> {
    let embedder = create_embedder(&cfg.embedding)?;
    let index = create_index(cfg).await?;

    if ingest_first {
        let pages = ingest::collect_pages(cfg, None, None)?;
        let summary = ingest::ingest_pages(cfg, &pages, &embedder, &index).await?;
        ingest::print_summary(cfg, &summary);
    }

    match index.count().await {
        Ok(0) => tracing::warn!("index is empty; run `medassist ingest` first"),
        Ok(n) => tracing::info!(vectors = n, "index ready"),
        Err(e) => tracing::warn!(error = %e, "index not reachable; run `medassist ingest` first"),
    }

    let pipeline = Arc::new(RagPipeline::with_components(cfg, embedder, index)?);
    server::run_server(cfg, pipeline).await
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load(&cli.config)?;

    match cli.command {
        Commands::Ingest { file, dir } => {
            ingest::run_ingest(&cfg, file, dir).await?;
        }
        Commands::Search { query, top_k } => {
            search::run_search(&cfg, &query, top_k).await?;
        }
        Commands::Ask { question } => {
            search::run_ask(&cfg, &question).await?;
        }
        Commands::Serve { ingest } => {
            serve(&cfg, ingest).await?;
        }
    }

    Ok(())
}

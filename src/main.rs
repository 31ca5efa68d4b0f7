//! # chunkvec CLI
//!
//! The `chunkvec` binary ingests text into a vector store and answers
//! nearest-neighbor queries against it, either directly or over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! chunkvec --config ./config/chunkvec.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `chunkvec init` | Create the store and record its dimensionality |
//! | `chunkvec ingest <path>` | Chunk, embed and store a file or directory |
//! | `chunkvec embed "<text>"` | Store one text without chunking |
//! | `chunkvec search "<query>"` | Print the k nearest stored chunks |
//! | `chunkvec list` | Print every record, newest first |
//! | `chunkvec stats` | Backend, dimensionality and record count |
//! | `chunkvec serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! chunkvec ingest ./notes --chunk-size 500 --overlap 50
//! chunkvec search "vector databases" -k 3
//! chunkvec serve --config ./config/chunkvec.toml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use chunkvec::config;
use chunkvec::engine::Engine;
use chunkvec::{ingest, search, server, stats};

/// chunkvec: chunked text ingestion and vector retrieval.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file.
#[derive(Parser)]
#[command(
    name = "chunkvec",
    about = "Chunked text ingestion and nearest-neighbor retrieval over embedding vectors",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/chunkvec.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the configured store.
    ///
    /// Creates the SQLite database and tables when needed and records the
    /// embedding dimensionality. Safe to run repeatedly.
    Init,

    /// Ingest a file or every matching file under a directory.
    ///
    /// Exits non-zero unless every file stored at least one chunk.
    Ingest {
        /// File or directory to ingest.
        path: PathBuf,

        /// Characters per chunk (defaults to `[chunking].chunk_size`).
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Characters shared by consecutive chunks (defaults to `[chunking].overlap`).
        #[arg(long)]
        overlap: Option<usize>,
    },

    /// Embed and store a single text.
    Embed {
        text: String,
    },

    /// Search stored chunks by similarity to a query.
    Search {
        query: String,

        /// Number of results (defaults to `[retrieval].default_k`).
        #[arg(short, long)]
        k: Option<i64>,
    },

    /// List every stored record, newest first.
    List,

    /// Show store statistics.
    Stats,

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let engine = Engine::open(&cfg).await?;
            println!(
                "Store initialized ({} backend, {} dims).",
                engine.store.backend_name(),
                engine.store.dims().unwrap_or_default()
            );
        }
        Commands::Ingest {
            path,
            chunk_size,
            overlap,
        } => {
            ingest::run_ingest(&cfg, &path, chunk_size, overlap).await?;
        }
        Commands::Embed { text } => {
            ingest::run_embed(&cfg, &text).await?;
        }
        Commands::Search { query, k } => {
            search::run_search(&cfg, &query, k).await?;
        }
        Commands::List => {
            search::run_list(&cfg).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

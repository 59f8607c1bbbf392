//! # askdoc CLI
//!
//! ## Usage
//!
//! ```bash
//! askdoc --config ./config/askdoc.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `askdoc init` | Create the account database schema |
//! | `askdoc ingest` | Build (or rebuild) the vector index from the source document |
//! | `askdoc ask "<question>"` | Answer a single question from the command line |
//! | `askdoc serve` | Start the HTTP server (`--rebuild` forces a fresh index) |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use askdoc::answer::AnswerEngine;
use askdoc::embedding::{EmbeddingProvider, OpenAiEmbeddings};
use askdoc::index::prepare_index;
use askdoc::llm::{ChatModel, OpenAiChat};
use askdoc::{config, db, migrate, server};

/// askdoc: a retrieval-augmented chat service grounded in a single
/// source document.
#[derive(Parser)]
#[command(
    name = "askdoc",
    about = "Answer questions grounded in a single source document",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/askdoc.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the account database schema.
    ///
    /// Creates the SQLite database file and the users table. Idempotent.
    Init,

    /// Build (or rebuild) the vector index.
    ///
    /// Extracts the source document, splits it into chunks, embeds every
    /// chunk, and overwrites the on-disk index artifact.
    Ingest,

    /// Answer a single question from the command line.
    ///
    /// Loads the persisted index (building it first if absent) and runs
    /// the question through the full retrieval + synthesis pipeline.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Start the HTTP server.
    Serve {
        /// Rebuild the vector index before serving, even if an artifact
        /// already exists.
        #[arg(long)]
        rebuild: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "askdoc=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.accounts.db_path).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Account database initialized successfully.");
        }
        Commands::Ingest => {
            let embedder = OpenAiEmbeddings::new(&cfg.provider)?;
            let index = prepare_index(&cfg, &embedder, true).await?;
            println!("Indexed {} chunks into {}", index.len(), cfg.index.path.display());
        }
        Commands::Ask { question } => {
            let embedder: Arc<dyn EmbeddingProvider> = Arc::new(OpenAiEmbeddings::new(&cfg.provider)?);
            let chat: Arc<dyn ChatModel> = Arc::new(OpenAiChat::new(&cfg.provider)?);
            let index = prepare_index(&cfg, embedder.as_ref(), false).await?;

            let engine = AnswerEngine::new(
                Arc::new(index),
                embedder,
                chat,
                cfg.retrieval.clone(),
                cfg.answer.clone(),
            );
            let answer = engine.answer(&question).await?;
            println!("{}", answer);
        }
        Commands::Serve { rebuild } => {
            server::run_server(cfg, rebuild).await?;
        }
    }

    Ok(())
}

//! # Libran-GPT CLI (`libran`)
//!
//! ## Usage
//!
//! ```bash
//! libran --config ./config/libran.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `libran pages <pdf>` | Show how a PDF is extracted and chunked (no network) |
//! | `libran ask <pdf> "<question>"` | Answer one question about a PDF |
//! | `libran chat <pdf>` | Interactive chat with conversation memory |
//! | `libran scrape` | Download every PDF linked from a listing page |
//! | `libran serve` | Start the HTTP API |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use libran_gpt::progress::ProgressMode;
use libran_gpt::{chat, config, pages, scrape, server};

/// Libran-GPT: chat with your PDF.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults. See
/// `config/libran.example.toml` for every setting.
#[derive(Parser)]
#[command(
    name = "libran",
    about = "Libran-GPT: ask questions about a PDF and get answers grounded in its text",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/libran.toml")]
    config: PathBuf,

    /// Ingest progress on stderr.
    #[arg(long, global = true, value_enum, default_value = "auto")]
    progress: ProgressMode,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Show extracted pages and chunk counts for a PDF.
    ///
    /// Runs extraction, normalization, and chunking only. No embedding or
    /// model calls are made.
    Pages {
        /// Path to the PDF.
        pdf: PathBuf,

        /// Print the text and chunks of this page (1-based).
        #[arg(long)]
        page: Option<usize>,
    },

    /// Answer a single question about a PDF.
    Ask {
        /// Path to the PDF.
        pdf: PathBuf,

        /// The question.
        question: String,
    },

    /// Chat about a PDF interactively.
    ///
    /// Reads one question per line from stdin. `:history` prints the
    /// conversation, `:clear` forgets it, `:quit` (or end of input) exits.
    Chat {
        /// Path to the PDF.
        pdf: PathBuf,
    },

    /// Download every PDF linked from a web page.
    Scrape {
        /// Listing page URL. Defaults to `[scrape].url`.
        #[arg(long)]
        url: Option<String>,

        /// Output directory. Defaults to `[scrape].out_dir`.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Maximum number of files to download.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Start the HTTP API.
    ///
    /// Binds to the address configured in `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,libran_gpt=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Pages { pdf, page } => {
            pages::run_pages(&cfg, &pdf, page)?;
        }
        Commands::Ask { pdf, question } => {
            chat::run_ask(&cfg, &pdf, &question, cli.progress).await?;
        }
        Commands::Chat { pdf } => {
            chat::run_chat(&cfg, &pdf, cli.progress).await?;
        }
        Commands::Scrape { url, out, limit } => {
            scrape::run_scrape(&cfg, url, out, limit).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

//! kbchat CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: Initialize config directory
//! - `auth` / `login`: Connect Google Drive
//! - `files`: List Drive files
//! - `ingest`: Fetch Drive files into the knowledge base
//! - `add`: Add local files
//! - `ask`: Ask a question, or chat interactively
//! - `docs` / `remove` / `clear`: Manage stored documents
//! - `status`: Show configuration and repository state

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod setup;

#[derive(Parser)]
#[command(
    name = "kbchat",
    about = "kbchat — ask questions about your documents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// Print the Google Drive authorization URL
    Auth,

    /// Complete Google Drive login with the code from the authorization page
    Login {
        #[arg(short, long)]
        code: String,
    },

    /// List files available on Google Drive
    Files {
        /// Drive search query (defaults to PDF, CSV and XLSX files)
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Fetch Drive files by id and add them to the knowledge base
    Ingest {
        /// File ids, space- or comma-separated
        #[arg(required = true, value_delimiter = ',')]
        ids: Vec<String>,
    },

    /// Add local files to the knowledge base
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Ask a question; starts an interactive session when none is given
    Ask { question: Option<String> },

    /// List stored documents
    Docs,

    /// Remove one document by id
    Remove { id: String },

    /// Remove every stored document
    Clear {
        /// Required to actually clear
        #[arg(long)]
        confirm: bool,
    },

    /// Show configuration and repository status
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Auth => commands::drive::auth().await?,
        Commands::Login { code } => commands::drive::login(&code).await?,
        Commands::Files { query } => commands::drive::files(query.as_deref()).await?,
        Commands::Ingest { ids } => commands::ingest::from_drive(ids).await?,
        Commands::Add { paths } => commands::ingest::local(paths).await?,
        Commands::Ask { question } => commands::ask::run(question).await?,
        Commands::Docs => commands::docs::list().await?,
        Commands::Remove { id } => commands::docs::remove(&id).await?,
        Commands::Clear { confirm } => commands::docs::clear(confirm).await?,
        Commands::Status => commands::status::run().await?,
    }

    Ok(())
}

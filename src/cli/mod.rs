//! CLI module for the Corrective RAG service
//!
//! Provides subcommands for running the HTTP server and for driving the
//! pipeline directly from a terminal.

pub mod commands;
pub mod interactive;
pub mod serve;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;

/// Corrective RAG - retrieval with relevance grading and web fallback
#[derive(Parser)]
#[command(name = "crag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve(serve::ServeArgs),

    /// Show collection status and the correction policy
    Status,

    /// Ingest every matching file under a directory
    AddDirectory(commands::AddDirectoryArgs),

    /// Ingest individual text files
    AddFiles(commands::AddFilesArgs),

    /// Ask a question
    Query(commands::QueryArgs),

    /// Similarity search without grading
    Search(commands::SearchArgs),

    /// Delete the persisted collection
    Reset(commands::ResetArgs),

    /// Show how files would be chunked and embedded
    AnalyzeChunks(commands::AnalyzeArgs),

    /// Read questions from stdin until `quit`
    Interactive,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Serve(args) => serve::run(args).await,
            Command::Status => commands::status().await,
            Command::AddDirectory(args) => commands::add_directory(args).await,
            Command::AddFiles(args) => commands::add_files(args).await,
            Command::Query(args) => commands::query(args).await,
            Command::Search(args) => commands::search(args).await,
            Command::Reset(args) => commands::reset(args).await,
            Command::AnalyzeChunks(args) => commands::analyze_chunks(args).await,
            Command::Interactive => interactive::run().await,
        }
    }
}

/// Load `.env` and the layered configuration, falling back to defaults
pub(crate) fn load_config() -> AppConfig {
    dotenvy::dotenv().ok();

    match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration, using defaults: {}", e);
            AppConfig::default()
        }
    }
}

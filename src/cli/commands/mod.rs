//! One-shot commands against the configured collection

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::domain::crag::QueryResult;
use crate::domain::ingestion::FileChunkAnalysis;
use crate::infrastructure::ingestion::DEFAULT_GLOB;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::services::{AnalyzeOptions, CollectionInfo, CorrectiveRagService, IngestionSummary};

#[derive(Args, Clone)]
pub struct AddDirectoryArgs {
    /// Directory to walk
    pub directory: PathBuf,

    /// Glob matched against paths relative to the directory
    #[arg(long, default_value = DEFAULT_GLOB)]
    pub pattern: String,
}

#[derive(Args, Clone)]
pub struct AddFilesArgs {
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Args, Clone)]
pub struct QueryArgs {
    pub question: String,

    /// Passages to retrieve (configured default when omitted)
    #[arg(long)]
    pub k: Option<usize>,

    /// Print grading diagnostics after the answer
    #[arg(long)]
    pub diagnostics: bool,
}

#[derive(Args, Clone)]
pub struct SearchArgs {
    pub query: String,

    #[arg(long)]
    pub k: Option<usize>,
}

#[derive(Args, Clone)]
pub struct ResetArgs {
    /// Skip the confirmation prompt
    #[arg(long, short)]
    pub yes: bool,
}

#[derive(Args, Clone)]
pub struct AnalyzeArgs {
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Include the first embedding components of each chunk
    #[arg(long)]
    pub show_vectors: bool,

    /// Chunks shown per file
    #[arg(long, default_value_t = 5)]
    pub max_chunks: usize,
}

/// Build the service the way the server does, with logs on stderr
pub(crate) async fn build_service() -> anyhow::Result<CorrectiveRagService> {
    let config = super::load_config();
    init_logging(&config.logging);

    Ok(CorrectiveRagService::from_config(&config).await?)
}

pub async fn status() -> anyhow::Result<()> {
    let service = build_service().await?;
    print_status(&service.status().await?);
    Ok(())
}

pub async fn add_directory(args: AddDirectoryArgs) -> anyhow::Result<()> {
    let service = build_service().await?;
    let summary = service
        .add_directory(&args.directory, Some(&args.pattern))
        .await?;

    print_summary(&summary);
    Ok(())
}

pub async fn add_files(args: AddFilesArgs) -> anyhow::Result<()> {
    let service = build_service().await?;
    let summary = service.add_files(&args.files).await?;

    print_summary(&summary);
    Ok(())
}

pub async fn query(args: QueryArgs) -> anyhow::Result<()> {
    let service = build_service().await?;
    let result = service.query(&args.question, args.k, args.diagnostics).await?;

    print_answer(&result)?;
    Ok(())
}

pub async fn search(args: SearchArgs) -> anyhow::Result<()> {
    let service = build_service().await?;
    let passages = service.similarity_search(&args.query, args.k).await?;

    if passages.is_empty() {
        println!("No passages found");
    }

    for (i, passage) in passages.iter().enumerate() {
        println!("[{}] {}", i + 1, passage.source_label());
        println!("{}\n", passage.text());
    }

    Ok(())
}

pub async fn reset(args: ResetArgs) -> anyhow::Result<()> {
    let service = build_service().await?;

    if !args.yes && !confirm("Delete the whole collection? [y/N] ").await? {
        println!("Aborted");
        return Ok(());
    }

    service.reset().await?;
    println!("Collection reset successfully");
    Ok(())
}

pub async fn analyze_chunks(args: AnalyzeArgs) -> anyhow::Result<()> {
    let service = build_service().await?;
    let options = AnalyzeOptions {
        max_chunks: args.max_chunks,
        show_vectors: args.show_vectors,
    };

    for analysis in service.analyze_chunks(&args.files, options).await? {
        print_analysis(&analysis);
    }

    Ok(())
}

pub(crate) fn print_answer(result: &QueryResult) -> anyhow::Result<()> {
    println!("{}", result.answer);

    let sources = result.sources();
    if !sources.is_empty() {
        println!("\nSources:");
        for source in sources {
            println!("  - {}", source);
        }
    }

    if let Some(diagnostics) = &result.diagnostics {
        println!("\nDiagnostics:\n{}", serde_json::to_string_pretty(diagnostics)?);
    }

    Ok(())
}

fn print_status(info: &CollectionInfo) {
    println!("System:           {}", info.system_type);
    println!("Status:           {:?}", info.status);
    println!("Passages:         {}", info.document_count);
    if let Some(dir) = &info.persist_directory {
        println!("Persist dir:      {}", dir);
    }
    println!("Embedding model:  {}", info.embedding_model);
    println!("Threshold mode:   {:?}", info.threshold_mode);
    println!("Threshold:        {:.2}", info.relevance_threshold);
    if let Some(min) = info.min_relevant_docs {
        println!("Min relevant:     {}", min);
    }
    println!("Web search:       {}", if info.web_search_enabled { "enabled" } else { "disabled" });
}

fn print_summary(summary: &IngestionSummary) {
    println!(
        "Processed {} files: {} chunks added, {} already stored",
        summary.files_processed, summary.chunks_added, summary.chunks_skipped
    );
}

fn print_analysis(analysis: &FileChunkAnalysis) {
    println!("== {} ==", analysis.source);
    println!(
        "{} chars, {} words -> {} chunks (size {}, overlap {}, model {})",
        analysis.original_length,
        analysis.original_word_count,
        analysis.total_chunks,
        analysis.chunk_size,
        analysis.chunk_overlap,
        analysis.embedding_model
    );

    for chunk in &analysis.chunks {
        println!(
            "\n  #{} ({} chars, {} words, dim {}, norm {:.4})",
            chunk.chunk_id, chunk.length, chunk.word_count, chunk.embedding_dimension, chunk.vector_norm
        );
        println!("  {}", chunk.content);
        if let Some(preview) = &chunk.vector_preview {
            println!("  vector: {:?}", preview);
        }
    }
    println!();
}

async fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{}", prompt);
    std::io::stdout().flush()?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;

    Ok(is_yes(&line))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("no"));
    }
}

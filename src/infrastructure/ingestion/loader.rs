//! Loading text documents from the filesystem

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::domain::ingestion::SourceDocument;
use crate::domain::DomainError;

pub const DEFAULT_GLOB: &str = "**/*.txt";

/// Reads UTF-8 text files into source documents
#[derive(Debug, Clone, Default)]
pub struct DocumentLoader;

impl DocumentLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load the given files; every path must exist and be readable as text
    pub async fn load_files(&self, paths: &[PathBuf]) -> Result<Vec<SourceDocument>, DomainError> {
        let mut documents = Vec::with_capacity(paths.len());

        for path in paths {
            documents.push(read_document(path).await?);
        }

        Ok(documents)
    }

    /// Load every file under `dir` whose relative path matches `glob`
    pub async fn load_directory(
        &self,
        dir: &Path,
        glob: &str,
    ) -> Result<Vec<SourceDocument>, DomainError> {
        if !dir.is_dir() {
            return Err(DomainError::not_found(format!(
                "Directory not found: {}",
                dir.display()
            )));
        }

        let matcher = build_globset(&[glob])?;
        let root = dir.to_path_buf();

        let mut paths = tokio::task::spawn_blocking(move || collect_matching(&root, &matcher))
            .await
            .map_err(|e| DomainError::internal(format!("Directory scan failed: {}", e)))??;
        paths.sort();

        debug!("Found {} files in {} matching '{}'", paths.len(), dir.display(), glob);

        let mut documents = Vec::with_capacity(paths.len());
        for path in &paths {
            match read_document(path).await {
                Ok(doc) => documents.push(doc),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }

        Ok(documents)
    }
}

async fn read_document(path: &Path) -> Result<SourceDocument, DomainError> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            DomainError::not_found(format!("File not found: {}", path.display()))
        }
        std::io::ErrorKind::InvalidData => {
            DomainError::validation(format!("{} is not valid UTF-8 text", path.display()))
        }
        _ => DomainError::storage(format!("Failed to read {}: {}", path.display(), e)),
    })?;

    Ok(SourceDocument::new(path.display().to_string(), content))
}

fn collect_matching(root: &Path, matcher: &GlobSet) -> Result<Vec<PathBuf>, DomainError> {
    let mut paths = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| DomainError::storage(format!("Directory walk failed: {}", e)))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);

        if matcher.is_match(relative) {
            paths.push(path.to_path_buf());
        }
    }

    Ok(paths)
}

fn build_globset(patterns: &[&str]) -> Result<GlobSet, DomainError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| DomainError::validation(format!("Invalid glob '{}': {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| DomainError::validation(format!("Invalid glob set: {}", e)))
}

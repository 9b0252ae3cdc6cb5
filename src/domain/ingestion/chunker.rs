//! Chunking strategy trait and types

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::DomainError;

/// Configuration for chunking, in characters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Overlap carried between consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Trailing chunks smaller than this are merged into their predecessor
    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_min_chunk_size() -> usize {
    50
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            min_chunk_size: default_min_chunk_size().min(chunk_size),
        }
    }

    pub fn with_min_chunk_size(mut self, min_size: usize) -> Self {
        self.min_chunk_size = min_size;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.chunk_size == 0 {
            return Err(DomainError::validation("chunk_size must be greater than 0"));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(DomainError::validation(
                "chunk_overlap must be less than chunk_size",
            ));
        }

        if self.min_chunk_size > self.chunk_size {
            return Err(DomainError::validation(
                "min_chunk_size must be less than or equal to chunk_size",
            ));
        }

        Ok(())
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            min_chunk_size: default_min_chunk_size(),
        }
    }
}

/// A chunk of text and its position in the source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
    pub index: usize,
}

impl Chunk {
    pub fn new(content: impl Into<String>, index: usize) -> Self {
        Self {
            content: content.into(),
            index,
        }
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

/// Trait for chunking strategies
pub trait ChunkingStrategy: Send + Sync + Debug {
    /// Split content into chunks
    fn chunk(&self, content: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>, DomainError>;

    /// Get the strategy name
    fn name(&self) -> &'static str;
}

//! Chunk inspection reports

use serde::{Deserialize, Serialize};

/// One analysed chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkAnalysis {
    pub chunk_id: usize,
    pub content: String,
    pub length: usize,
    pub word_count: usize,
    pub embedding_dimension: usize,
    /// First components of the embedding, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_preview: Option<Vec<f32>>,
    pub vector_norm: f32,
}

/// Chunking and embedding report for one file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChunkAnalysis {
    pub source: String,
    pub original_length: usize,
    pub original_word_count: usize,
    pub total_chunks: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding_model: String,
    pub chunks: Vec<ChunkAnalysis>,
}

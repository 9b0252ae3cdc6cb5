//! Document ingestion domain types and traits
//!
//! Source documents are split into overlapping chunks, and each chunk becomes a
//! passage tagged with its source path and position.

pub mod analysis;
pub mod chunker;
pub mod document;

pub use analysis::{ChunkAnalysis, FileChunkAnalysis};
pub use chunker::{Chunk, ChunkingConfig, ChunkingStrategy};
pub use document::SourceDocument;

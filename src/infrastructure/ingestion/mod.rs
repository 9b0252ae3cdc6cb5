//! Document ingestion infrastructure
//!
//! Loading files from disk and splitting them into overlapping chunks.

pub mod chunkers;
pub mod loader;

pub use chunkers::RecursiveChunker;
pub use loader::{DocumentLoader, DEFAULT_GLOB};

//! Loaded source documents

use std::collections::HashMap;

use crate::domain::passage::{Passage, METADATA_CHUNK_INDEX, METADATA_SOURCE};

use super::Chunk;

/// Text loaded from one file or upload, before chunking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub source: String,
    pub content: String,
}

impl SourceDocument {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
        }
    }

    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }

    /// Turn chunks of this document into passages tagged with source and position
    pub fn to_passages(&self, chunks: &[Chunk]) -> Vec<Passage> {
        chunks
            .iter()
            .map(|chunk| {
                let metadata = HashMap::from([
                    (METADATA_SOURCE.to_string(), self.source.clone()),
                    (METADATA_CHUNK_INDEX.to_string(), chunk.index.to_string()),
                ]);
                Passage::with_metadata(chunk.content.clone(), metadata)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_passages_tags_metadata() {
        let doc = SourceDocument::new("docs/a.txt", "one two");
        let passages = doc.to_passages(&[Chunk::new("one", 0), Chunk::new("two", 1)]);

        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].source(), Some("docs/a.txt"));
        assert_eq!(passages[1].metadata().get("chunk_index").map(String::as_str), Some("1"));
        assert_ne!(passages[0].id(), passages[1].id());
    }

    #[test]
    fn test_counts() {
        let doc = SourceDocument::new("a", "alpha beta  gamma");
        assert_eq!(doc.word_count(), 3);
        assert_eq!(doc.char_len(), 17);
    }
}

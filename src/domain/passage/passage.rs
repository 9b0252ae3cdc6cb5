use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

pub const METADATA_SOURCE: &str = "source";
pub const METADATA_PAGE: &str = "page";
pub const METADATA_CHUNK_INDEX: &str = "chunk_index";

/// A retrievable unit of text with its source metadata.
///
/// Passages are immutable once built; the id is derived from the source and the
/// text so re-ingesting the same file does not duplicate entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    id: String,
    text: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl Passage {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_metadata(text, HashMap::new())
    }

    pub fn with_metadata(text: impl Into<String>, metadata: HashMap<String, String>) -> Self {
        let text = text.into();
        let source = metadata.get(METADATA_SOURCE).map(String::as_str).unwrap_or("");
        let chunk = metadata.get(METADATA_CHUNK_INDEX).map(String::as_str).unwrap_or("");
        let id = passage_id(source, chunk, &text);

        Self { id, text, metadata }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    pub fn source(&self) -> Option<&str> {
        self.metadata.get(METADATA_SOURCE).map(String::as_str)
    }

    pub fn page(&self) -> Option<&str> {
        self.metadata.get(METADATA_PAGE).map(String::as_str)
    }

    /// Human-readable source reference, e.g. `Source: notes.txt, Page: N/A`
    pub fn source_label(&self) -> String {
        format!(
            "Source: {}, Page: {}",
            self.source().unwrap_or("Unknown"),
            self.page().unwrap_or("N/A")
        )
    }

    /// First `max_chars` characters, suffixed with `...`
    pub fn preview(&self, max_chars: usize) -> String {
        let preview: String = self.text.chars().take(max_chars).collect();
        format!("{}...", preview)
    }
}

fn passage_id(source: &str, chunk: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(chunk.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(source: &str) -> HashMap<String, String> {
        HashMap::from([(METADATA_SOURCE.to_string(), source.to_string())])
    }

    #[test]
    fn test_id_is_stable() {
        let a = Passage::with_metadata("same text", metadata("a.txt"));
        let b = Passage::with_metadata("same text", metadata("a.txt"));
        let c = Passage::with_metadata("same text", metadata("b.txt"));

        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
        assert_eq!(a.id().len(), 64);
    }

    #[test]
    fn test_source_label() {
        let passage = Passage::with_metadata("text", metadata("docs/guide.txt"));
        assert_eq!(passage.source_label(), "Source: docs/guide.txt, Page: N/A");

        let bare = Passage::new("text");
        assert_eq!(bare.source_label(), "Source: Unknown, Page: N/A");
    }

    #[test]
    fn test_preview_truncates_on_chars() {
        let passage = Passage::new("é".repeat(150));
        let preview = passage.preview(100);

        assert_eq!(preview.chars().count(), 103);
        assert!(preview.ends_with("..."));
    }
}

//! Recursive chunking strategy with overlap

use std::collections::VecDeque;

use unicode_segmentation::UnicodeSegmentation;

use crate::domain::ingestion::{Chunk, ChunkingConfig, ChunkingStrategy};
use crate::domain::DomainError;

/// Chunking strategy that recursively splits text hierarchically and merges the
/// pieces back into chunks of at most `chunk_size` characters, carrying up to
/// `chunk_overlap` characters of trailing context into the next chunk.
///
/// Splitting order: paragraphs -> lines -> sentences -> words -> characters
#[derive(Debug, Clone, Default)]
pub struct RecursiveChunker;

fn char_len(text: &str) -> usize {
    text.chars().count()
}

impl RecursiveChunker {
    /// Create a new recursive chunker
    pub fn new() -> Self {
        Self
    }

    fn split_by_paragraphs(text: &str) -> Vec<&str> {
        text.split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    }

    fn split_by_lines(text: &str) -> Vec<&str> {
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect()
    }

    fn split_by_sentences(text: &str) -> Vec<&str> {
        text.unicode_sentences()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn split_by_chars(text: &str, config: &ChunkingConfig) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let step = config.chunk_size - config.chunk_overlap;
        let mut result = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + config.chunk_size).min(chars.len());
            result.push(chars[start..end].iter().collect());

            if end == chars.len() {
                break;
            }
            start += step;
        }

        result
    }

    fn recursive_chunk(text: &str, config: &ChunkingConfig, level: usize) -> Vec<String> {
        if char_len(text) <= config.chunk_size {
            return vec![text.trim().to_string()];
        }

        let (parts, separator) = match level {
            0 => (Self::split_by_paragraphs(text), "\n\n"),
            1 => (Self::split_by_lines(text), "\n"),
            2 => (Self::split_by_sentences(text), " "),
            3 => (text.split_whitespace().collect(), " "),
            _ => return Self::split_by_chars(text, config),
        };

        if parts.len() <= 1 {
            return Self::recursive_chunk(text, config, level + 1);
        }

        let mut pieces = Vec::with_capacity(parts.len());
        for part in parts {
            if char_len(part) > config.chunk_size {
                pieces.extend(Self::recursive_chunk(part, config, level + 1));
            } else {
                pieces.push(part.to_string());
            }
        }

        Self::merge(pieces, separator, config)
    }

    /// Greedily pack pieces into chunks, seeding each new chunk with the tail of
    /// the previous one up to the overlap budget
    fn merge(pieces: Vec<String>, separator: &str, config: &ChunkingConfig) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut result = Vec::new();
        let mut window: VecDeque<(String, usize)> = VecDeque::new();
        let mut window_len = 0;

        let join = |window: &VecDeque<(String, usize)>| {
            window
                .iter()
                .map(|(piece, _)| piece.as_str())
                .collect::<Vec<_>>()
                .join(separator)
        };

        for piece in pieces {
            let piece_len = char_len(&piece);

            if !window.is_empty() && window_len + sep_len + piece_len > config.chunk_size {
                result.push(join(&window));

                while window_len > config.chunk_overlap
                    || window_len + sep_len + piece_len > config.chunk_size
                {
                    let Some((_, front_len)) = window.pop_front() else {
                        break;
                    };
                    window_len -= front_len + if window.is_empty() { 0 } else { sep_len };
                }
            }

            window_len += piece_len + if window.is_empty() { 0 } else { sep_len };
            window.push_back((piece, piece_len));
        }

        if !window.is_empty() {
            result.push(join(&window));
        }

        result
    }

    /// Fold a short trailing chunk into its predecessor
    fn merge_small_tail(mut chunks: Vec<String>, config: &ChunkingConfig) -> Vec<String> {
        if chunks.len() < 2 {
            return chunks;
        }

        let tail_is_small = chunks
            .last()
            .is_some_and(|tail| char_len(tail) < config.min_chunk_size);

        if tail_is_small {
            if let Some(tail) = chunks.pop() {
                if let Some(prev) = chunks.last_mut() {
                    if !prev.ends_with(tail.as_str()) {
                        prev.push(' ');
                        prev.push_str(&tail);
                    }
                }
            }
        }

        chunks
    }
}

impl ChunkingStrategy for RecursiveChunker {
    fn chunk(&self, content: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>, DomainError> {
        config.validate()?;

        let content = content.trim();

        if content.is_empty() {
            return Ok(vec![]);
        }

        let texts = Self::recursive_chunk(content, config, 0);
        let texts = Self::merge_small_tail(texts, config);

        Ok(texts
            .into_iter()
            .filter(|t| !t.is_empty())
            .enumerate()
            .map(|(i, text)| Chunk::new(text, i))
            .collect())
    }

    fn name(&self) -> &'static str {
        "recursive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_content() {
        let chunker = RecursiveChunker::new();
        let config = ChunkingConfig::default();

        assert!(chunker.chunk("", &config).unwrap().is_empty());
        assert!(chunker.chunk("  \n\n ", &config).unwrap().is_empty());
    }

    #[test]
    fn test_small_content() {
        let chunker = RecursiveChunker::new();
        let config = ChunkingConfig::new(1000, 0);

        let chunks = chunker.chunk("Small content", &config).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Small content");
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn test_split_by_paragraphs() {
        let chunker = RecursiveChunker::new();
        let config = ChunkingConfig::new(30, 0).with_min_chunk_size(5);

        let content = "First paragraph here.\n\nSecond paragraph here.\n\nThird paragraph here.";
        let chunks = chunker.chunk(content, &config).unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].content, "Second paragraph here.");
    }

    #[test]
    fn test_split_by_sentences() {
        let chunker = RecursiveChunker::new();
        let config = ChunkingConfig::new(25, 0).with_min_chunk_size(5);

        let content = "First sentence here. Second sentence here. Third sentence here.";
        let chunks = chunker.chunk(content, &config).unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, "First sentence here.");
    }

    #[test]
    fn test_chunks_respect_size() {
        let chunker = RecursiveChunker::new();
        let config = ChunkingConfig::new(50, 10).with_min_chunk_size(1);

        let content = "This is a very long paragraph that should be split into multiple chunks because it exceeds the maximum chunk size limit.";
        let chunks = chunker.chunk(content, &config).unwrap();

        assert!(chunks.len() >= 3);
        for chunk in &chunks {
            assert!(chunk.char_len() <= config.chunk_size, "{:?}", chunk.content);
        }
    }

    #[test]
    fn test_overlap_carries_context() {
        let chunker = RecursiveChunker::new();
        let config = ChunkingConfig::new(20, 8).with_min_chunk_size(1);

        let content = "alpha beta gamma delta epsilon zeta eta theta";
        let chunks = chunker.chunk(content, &config).unwrap();

        assert_eq!(chunks[0].content, "alpha beta gamma");
        assert_eq!(chunks[1].content, "gamma delta epsilon");
        for pair in chunks.windows(2) {
            let last_word = pair[0].content.split_whitespace().last().unwrap();
            assert!(
                pair[1].content.split_whitespace().any(|w| w == last_word),
                "{:?} should repeat {:?}",
                pair[1].content,
                last_word
            );
        }
    }

    #[test]
    fn test_unbroken_text_falls_back_to_characters() {
        let chunker = RecursiveChunker::new();
        let config = ChunkingConfig::new(10, 2).with_min_chunk_size(1);

        let content = "é".repeat(25);
        let chunks = chunker.chunk(&content, &config).unwrap();

        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.char_len() <= 10));
    }

    #[test]
    fn test_indices_are_sequential() {
        let chunker = RecursiveChunker::new();
        let config = ChunkingConfig::new(40, 5).with_min_chunk_size(5);

        let content = "Line one is here.\nLine two is here.\nLine three is here.\nLine four is here.";
        let chunks = chunker.chunk(content, &config).unwrap();

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let chunker = RecursiveChunker::new();
        assert!(chunker.chunk("text", &ChunkingConfig::new(10, 10)).is_err());
    }

    #[test]
    fn test_name() {
        assert_eq!(RecursiveChunker::new().name(), "recursive");
    }
}

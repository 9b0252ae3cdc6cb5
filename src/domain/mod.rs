//! Domain layer - Core decision logic and entities

pub mod crag;
pub mod embedding;
pub mod error;
pub mod ingestion;
pub mod llm;
pub mod passage;
pub mod prompt;
pub mod web_search;

pub use crag::{
    AnswerSynthesizer, CragConfig, Diagnostics, GradeResult, GradeSummary, QueryResult, Relevance,
    RelevanceGrader, ThresholdMode, ThresholdSpec,
};
pub use embedding::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};
pub use error::DomainError;
pub use ingestion::{Chunk, ChunkingConfig, ChunkingStrategy, SourceDocument};
pub use llm::{LlmProvider, LlmRequest, LlmRequestBuilder, LlmResponse, Message, MessageRole};
pub use passage::{AddPassagesResult, Passage, PassageStore};
pub use prompt::{PromptTemplate, TemplateError};
pub use web_search::{WebSearchOutcome, WebSearchProvider};

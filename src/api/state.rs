//! Application state for shared services

use std::path::Path;
use std::sync::Arc;

use crate::api::types::ApiError;
use crate::domain::crag::QueryResult;
use crate::domain::ingestion::SourceDocument;
use crate::domain::passage::Passage;
use crate::domain::DomainError;
use crate::infrastructure::services::{CollectionInfo, CorrectiveRagService, IngestionSummary};

/// Application state shared by the handlers.
///
/// `rag` is `None` when the service could not be initialized at startup (for
/// example when no API key is configured); endpoints that need it answer 503.
#[derive(Clone)]
pub struct AppState {
    pub rag: Option<Arc<dyn RagServiceTrait>>,
    pub startup_error: Option<String>,
}

impl AppState {
    pub fn new(rag: Arc<dyn RagServiceTrait>) -> Self {
        Self {
            rag: Some(rag),
            startup_error: None,
        }
    }

    /// State for a server whose service failed to initialize
    pub fn uninitialized(reason: impl Into<String>) -> Self {
        Self {
            rag: None,
            startup_error: Some(reason.into()),
        }
    }

    pub fn rag(&self) -> Result<&Arc<dyn RagServiceTrait>, ApiError> {
        self.rag.as_ref().ok_or_else(|| {
            ApiError::unavailable(format!(
                "RAG system not initialized: {}",
                self.startup_error.as_deref().unwrap_or("unknown error")
            ))
        })
    }
}

/// Trait for Corrective RAG service operations
#[async_trait::async_trait]
pub trait RagServiceTrait: Send + Sync {
    async fn query(
        &self,
        question: &str,
        k: Option<usize>,
        diagnostics: bool,
    ) -> Result<QueryResult, DomainError>;
    async fn similarity_search(&self, query: &str, k: Option<usize>) -> Result<Vec<Passage>, DomainError>;
    async fn add_texts(&self, documents: Vec<SourceDocument>) -> Result<IngestionSummary, DomainError>;
    async fn add_directory(&self, dir: &Path, pattern: Option<&str>) -> Result<IngestionSummary, DomainError>;
    async fn status(&self) -> Result<CollectionInfo, DomainError>;
    async fn reset(&self) -> Result<(), DomainError>;
}

#[async_trait::async_trait]
impl RagServiceTrait for CorrectiveRagService {
    async fn query(
        &self,
        question: &str,
        k: Option<usize>,
        diagnostics: bool,
    ) -> Result<QueryResult, DomainError> {
        CorrectiveRagService::query(self, question, k, diagnostics).await
    }

    async fn similarity_search(&self, query: &str, k: Option<usize>) -> Result<Vec<Passage>, DomainError> {
        CorrectiveRagService::similarity_search(self, query, k).await
    }

    async fn add_texts(&self, documents: Vec<SourceDocument>) -> Result<IngestionSummary, DomainError> {
        CorrectiveRagService::add_texts(self, documents).await
    }

    async fn add_directory(&self, dir: &Path, pattern: Option<&str>) -> Result<IngestionSummary, DomainError> {
        CorrectiveRagService::add_directory(self, dir, pattern).await
    }

    async fn status(&self) -> Result<CollectionInfo, DomainError> {
        CorrectiveRagService::status(self).await
    }

    async fn reset(&self) -> Result<(), DomainError> {
        CorrectiveRagService::reset(self).await
    }
}

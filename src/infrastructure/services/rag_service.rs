//! Corrective RAG service
//!
//! Facade over the passage store, document ingestion and the correction pipeline,
//! shared by the HTTP API and the CLI.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::AppConfig;
use crate::domain::crag::{QueryResult, ThresholdMode};
use crate::domain::embedding::{l2_norm, EmbeddingProvider, EmbeddingRequest};
use crate::domain::ingestion::{
    ChunkAnalysis, ChunkingConfig, ChunkingStrategy, FileChunkAnalysis, SourceDocument,
};
use crate::domain::llm::LlmProvider;
use crate::domain::passage::{Passage, PassageStore};
use crate::domain::DomainError;
use crate::infrastructure::crag::{CorrectiveRagPipeline, LlmAnswerSynthesizer, LlmRelevanceGrader};
use crate::infrastructure::embedding::OpenAiEmbeddingProvider;
use crate::infrastructure::http_client::HttpClient;
use crate::infrastructure::ingestion::{DocumentLoader, RecursiveChunker, DEFAULT_GLOB};
use crate::infrastructure::llm::{OpenAiProvider, DEFAULT_OPENAI_BASE_URL};
use crate::infrastructure::passage_store::InMemoryPassageStore;
use crate::infrastructure::web_search::DuckDuckGoSearch;

pub const SYSTEM_TYPE: &str = "Corrective RAG";

/// Components of the embedding shown by chunk analysis
const VECTOR_PREVIEW_LEN: usize = 10;

/// Outcome of an ingestion request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionSummary {
    pub files_processed: usize,
    pub chunks_added: usize,
    pub chunks_skipped: usize,
}

/// Snapshot of the collection and the correction policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub status: CollectionStatus,
    pub document_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_directory: Option<String>,
    pub system_type: String,
    pub relevance_threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_relevant_docs: Option<usize>,
    pub threshold_mode: ThresholdMode,
    pub web_search_enabled: bool,
    pub embedding_model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    Ready,
    NotReady,
}

/// Options for `analyze_chunks`
#[derive(Debug, Clone, Copy)]
pub struct AnalyzeOptions {
    pub max_chunks: usize,
    pub show_vectors: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            max_chunks: 5,
            show_vectors: false,
        }
    }
}

/// Corrective RAG service
#[derive(Debug)]
pub struct CorrectiveRagService {
    pipeline: CorrectiveRagPipeline,
    embedder: Arc<dyn EmbeddingProvider>,
    chunker: Arc<dyn ChunkingStrategy>,
    loader: DocumentLoader,
    chunking: ChunkingConfig,
}

impl CorrectiveRagService {
    pub fn new(
        pipeline: CorrectiveRagPipeline,
        embedder: Arc<dyn EmbeddingProvider>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            pipeline,
            embedder,
            chunker: Arc::new(RecursiveChunker::new()),
            loader: DocumentLoader::new(),
            chunking,
        }
    }

    /// Wire OpenAI, DuckDuckGo and the persistent store from configuration.
    ///
    /// Fails with `NotReady` when no API key is available.
    pub async fn from_config(config: &AppConfig) -> Result<Self, DomainError> {
        config.validate()?;

        let api_key = config.llm.resolved_api_key().ok_or_else(|| {
            DomainError::not_ready(format!(
                "No API key configured; set {} or llm.api_key",
                crate::config::API_KEY_ENV
            ))
        })?;

        let llm_client = HttpClient::with_timeout(Duration::from_secs(config.llm.timeout_secs))?;
        let llm_base = config
            .llm
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
        let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::with_base_url(
            llm_client.clone(),
            api_key.clone(),
            llm_base.clone(),
        ));

        let embedding_base = config.embedding.base_url.clone().unwrap_or(llm_base);
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(OpenAiEmbeddingProvider::with_base_url(
            llm_client,
            api_key,
            config.embedding.model.clone(),
            embedding_base,
        ));

        let store = InMemoryPassageStore::open(embedder.clone(), &config.store.persist_directory).await?;

        let crag = &config.crag;
        let grader = LlmRelevanceGrader::new(llm.clone(), config.llm.model.clone())
            .with_template(crag.grader_template())
            .with_temperature(config.llm.temperature)
            .with_fail_open(crag.fail_open);
        let synthesizer = LlmAnswerSynthesizer::new(llm, config.llm.model.clone())
            .with_template(crag.answer_template())
            .with_language(crag.answer_language.clone())
            .with_temperature(config.llm.temperature)
            .with_max_tokens(config.llm.max_tokens);

        let mut pipeline = CorrectiveRagPipeline::new(
            Arc::new(store),
            Arc::new(grader),
            Arc::new(synthesizer),
            crag.clone(),
        );

        if crag.web_search_enabled {
            let web_client =
                HttpClient::with_timeout(Duration::from_secs(config.web_search.timeout_secs))?;
            let mut search =
                DuckDuckGoSearch::new(web_client).with_max_results(config.web_search.max_results);
            if let Some(base_url) = &config.web_search.base_url {
                search = search.with_base_url(base_url.clone());
            }
            pipeline = pipeline.with_web_search(Arc::new(search));
        }

        info!(
            "Corrective RAG initialized: model={}, embedding={}, threshold={:?}",
            config.llm.model, config.embedding.model, crag.threshold
        );

        Ok(Self::new(pipeline, embedder, config.chunking.clone()))
    }

    fn store(&self) -> &Arc<dyn PassageStore> {
        self.pipeline.store()
    }

    /// Answer a question; diagnostics are kept only when requested
    #[instrument(skip(self, question))]
    pub async fn query(
        &self,
        question: &str,
        k: Option<usize>,
        diagnostics: bool,
    ) -> Result<QueryResult, DomainError> {
        let result = self.pipeline.query(question, k).await?;

        Ok(if diagnostics {
            result
        } else {
            result.without_diagnostics()
        })
    }

    /// Raw nearest-neighbour search without grading
    pub async fn similarity_search(&self, query: &str, k: Option<usize>) -> Result<Vec<Passage>, DomainError> {
        if query.trim().is_empty() {
            return Err(DomainError::validation("Query must not be empty"));
        }

        self.store()
            .nearest_k(query, k.unwrap_or(self.pipeline.config().default_k))
            .await
    }

    pub async fn add_files(&self, paths: &[PathBuf]) -> Result<IngestionSummary, DomainError> {
        if paths.is_empty() {
            return Err(DomainError::validation("No files given"));
        }

        let documents = self.loader.load_files(paths).await?;
        self.add_texts(documents).await
    }

    /// Ingest every file under `dir` matching `pattern` (default `**/*.txt`)
    pub async fn add_directory(
        &self,
        dir: &Path,
        pattern: Option<&str>,
    ) -> Result<IngestionSummary, DomainError> {
        let pattern = pattern.unwrap_or(DEFAULT_GLOB);
        let documents = self.loader.load_directory(dir, pattern).await?;

        if documents.is_empty() {
            return Err(DomainError::validation(format!(
                "No documents matching '{}' found in {}",
                pattern,
                dir.display()
            )));
        }

        self.add_texts(documents).await
    }

    /// Chunk, embed and store already loaded documents
    #[instrument(skip(self, documents), fields(documents = documents.len()))]
    pub async fn add_texts(&self, documents: Vec<SourceDocument>) -> Result<IngestionSummary, DomainError> {
        let mut passages = Vec::new();
        let mut files_processed = 0;

        for document in &documents {
            let chunks = self.chunker.chunk(&document.content, &self.chunking)?;
            if chunks.is_empty() {
                warn!("Skipping empty document {}", document.source);
                continue;
            }
            passages.extend(document.to_passages(&chunks));
            files_processed += 1;
        }

        if passages.is_empty() {
            return Err(DomainError::validation("No text content to ingest"));
        }

        let result = self.store().add_passages(passages).await?;

        info!(
            "Ingested {} files: {} chunks added, {} skipped",
            files_processed, result.added, result.skipped
        );

        Ok(IngestionSummary {
            files_processed,
            chunks_added: result.added,
            chunks_skipped: result.skipped,
        })
    }

    pub async fn status(&self) -> Result<CollectionInfo, DomainError> {
        let store = self.store();
        let config = self.pipeline.config();
        let ready = store.is_ready().await;

        Ok(CollectionInfo {
            status: if ready {
                CollectionStatus::Ready
            } else {
                CollectionStatus::NotReady
            },
            document_count: store.count().await?,
            persist_directory: store.location(),
            system_type: SYSTEM_TYPE.to_string(),
            relevance_threshold: config.threshold.resolve(config.default_k),
            min_relevant_docs: config.threshold.min_relevant(),
            threshold_mode: config.threshold.mode(),
            web_search_enabled: config.web_search_enabled,
            embedding_model: self.embedder.model().to_string(),
        })
    }

    pub async fn reset(&self) -> Result<(), DomainError> {
        self.store().reset().await?;
        info!("Passage store reset");
        Ok(())
    }

    /// Show how files would be chunked and embedded, without storing anything
    pub async fn analyze_chunks(
        &self,
        paths: &[PathBuf],
        options: AnalyzeOptions,
    ) -> Result<Vec<FileChunkAnalysis>, DomainError> {
        let documents = self.loader.load_files(paths).await?;
        let mut reports = Vec::with_capacity(documents.len());

        for document in documents {
            let chunks = self.chunker.chunk(&document.content, &self.chunking)?;
            let shown: Vec<_> = chunks.iter().take(options.max_chunks).collect();

            let vectors = if shown.is_empty() {
                Vec::new()
            } else {
                let request = EmbeddingRequest::batch(
                    self.embedder.model(),
                    shown.iter().map(|c| c.content.clone()).collect(),
                );
                self.embedder.embed(request).await?.into_vectors()
            };

            let analyses = shown
                .iter()
                .zip(vectors)
                .map(|(chunk, vector)| ChunkAnalysis {
                    chunk_id: chunk.index,
                    content: chunk.content.clone(),
                    length: chunk.char_len(),
                    word_count: chunk.word_count(),
                    embedding_dimension: vector.len(),
                    vector_norm: l2_norm(&vector),
                    vector_preview: options
                        .show_vectors
                        .then(|| vector.iter().take(VECTOR_PREVIEW_LEN).copied().collect()),
                })
                .collect();

            reports.push(FileChunkAnalysis {
                original_length: document.char_len(),
                original_word_count: document.word_count(),
                source: document.source,
                total_chunks: chunks.len(),
                chunk_size: self.chunking.chunk_size,
                chunk_overlap: self.chunking.chunk_overlap,
                embedding_model: self.embedder.model().to_string(),
                chunks: analyses,
            });
        }

        Ok(reports)
    }
}

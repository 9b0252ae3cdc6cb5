//! Request and response bodies for the Corrective RAG endpoints

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::crag::{Diagnostics, QueryResult};
use crate::domain::passage::Passage;
use crate::infrastructure::ingestion::DEFAULT_GLOB;

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    /// `crag.default_k` applies when omitted
    #[serde(default)]
    pub k: Option<usize>,
    #[serde(default)]
    pub return_diagnostics: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
}

impl From<QueryResult> for QueryResponse {
    fn from(result: QueryResult) -> Self {
        Self {
            sources: result.sources(),
            answer: result.answer,
            diagnostics: result.diagnostics,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub k: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchDocument {
    pub content: String,
    pub metadata: HashMap<String, String>,
}

impl From<Passage> for SearchDocument {
    fn from(passage: Passage) -> Self {
        Self {
            content: passage.text().to_string(),
            metadata: passage.metadata().clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub documents: Vec<SearchDocument>,
}

fn default_glob() -> String {
    DEFAULT_GLOB.to_string()
}

/// Form body for directory ingestion
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryForm {
    pub directory_path: String,
    #[serde(default = "default_glob")]
    pub glob_pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub files_processed: usize,
    pub chunks_added: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Body of `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub system_type: String,
    pub endpoints: Vec<String>,
}

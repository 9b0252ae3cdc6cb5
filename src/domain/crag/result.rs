//! Query result and diagnostics

use serde::{Deserialize, Serialize};

use super::{GradeResult, ThresholdMode};
use crate::domain::passage::Passage;

/// Characters of passage text kept in a grade summary
pub const GRADE_PREVIEW_CHARS: usize = 100;

/// Compact view of one grade for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeSummary {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub is_relevant: bool,
    pub raw_response: String,
}

impl From<&GradeResult> for GradeSummary {
    fn from(grade: &GradeResult) -> Self {
        Self {
            content: grade.passage.preview(GRADE_PREVIEW_CHARS),
            source: grade.passage.source().map(str::to_string),
            is_relevant: grade.is_relevant(),
            raw_response: grade.raw_response.clone(),
        }
    }
}

/// What happened during one query, built fresh per query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub total_retrieved: usize,
    pub relevant_count: usize,
    pub irrelevant_count: usize,
    pub relevance_ratio: f64,
    pub threshold_used: f64,
    pub threshold_mode: ThresholdMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_relevant_docs: Option<usize>,
    pub used_web_search: bool,
    /// Web text on success, or the failure reason when the fallback failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_search_result: Option<String>,
    pub grades: Vec<GradeSummary>,
}

/// Final answer plus the passages it was grounded on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub answer: String,
    /// Relevant passages only, in retrieval order
    pub used_passages: Vec<Passage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
}

impl QueryResult {
    pub fn without_diagnostics(mut self) -> Self {
        self.diagnostics = None;
        self
    }

    /// `Source: X, Page: Y` for each used passage
    pub fn sources(&self) -> Vec<String> {
        self.used_passages.iter().map(Passage::source_label).collect()
    }
}

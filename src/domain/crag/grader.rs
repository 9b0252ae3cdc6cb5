//! Relevance grading trait and result types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::passage::Passage;

/// Binary relevance judgment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relevance {
    Relevant,
    NotRelevant,
}

impl Relevance {
    pub fn from_bool(relevant: bool) -> Self {
        if relevant {
            Self::Relevant
        } else {
            Self::NotRelevant
        }
    }

    pub fn is_relevant(&self) -> bool {
        matches!(self, Self::Relevant)
    }
}

/// Grade for one passage.
///
/// `raw_response` is always populated: the model output on success, or
/// `error: <reason>` when the grading call failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeResult {
    pub passage: Passage,
    pub relevance: Relevance,
    pub raw_response: String,
    /// The grading call failed and `relevance` is the configured default
    #[serde(default)]
    pub failed: bool,
}

impl GradeResult {
    pub fn graded(passage: Passage, relevance: Relevance, raw_response: impl Into<String>) -> Self {
        Self {
            passage,
            relevance,
            raw_response: raw_response.into(),
            failed: false,
        }
    }

    /// A grade produced without a usable judgment
    pub fn failed(passage: Passage, fallback: Relevance, reason: impl std::fmt::Display) -> Self {
        Self {
            passage,
            relevance: fallback,
            raw_response: format!("error: {}", reason),
            failed: true,
        }
    }

    pub fn is_relevant(&self) -> bool {
        self.relevance.is_relevant()
    }
}

/// Judges whether a passage addresses a question.
///
/// Grading never fails outward: errors are folded into the returned grade.
#[async_trait]
pub trait RelevanceGrader: Send + Sync + Debug {
    async fn grade(&self, passage: &Passage, question: &str) -> GradeResult;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Grades a passage relevant when its text contains any configured marker
    #[derive(Debug, Default)]
    pub struct MockRelevanceGrader {
        relevant_markers: Vec<String>,
        failing_markers: Vec<String>,
        calls: AtomicUsize,
    }

    impl MockRelevanceGrader {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn relevant_when(mut self, marker: impl Into<String>) -> Self {
            self.relevant_markers.push(marker.into());
            self
        }

        /// Simulate a failed grading call (graded relevant, fail-open)
        pub fn failing_when(mut self, marker: impl Into<String>) -> Self {
            self.failing_markers.push(marker.into());
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RelevanceGrader for MockRelevanceGrader {
        async fn grade(&self, passage: &Passage, _question: &str) -> GradeResult {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if self.failing_markers.iter().any(|m| passage.text().contains(m.as_str())) {
                return GradeResult::failed(passage.clone(), Relevance::Relevant, "mock grading failure");
            }

            let relevant = self.relevant_markers.iter().any(|m| passage.text().contains(m.as_str()));
            let raw = if relevant { r#"{"score": "yes"}"# } else { r#"{"score": "no"}"# };

            GradeResult::graded(passage.clone(), Relevance::from_bool(relevant), raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_grade_keeps_reason() {
        let grade = GradeResult::failed(Passage::new("text"), Relevance::Relevant, "timeout");

        assert!(grade.is_relevant());
        assert!(grade.failed);
        assert_eq!(grade.raw_response, "error: timeout");
    }

    #[test]
    fn test_relevance_from_bool() {
        assert!(Relevance::from_bool(true).is_relevant());
        assert!(!Relevance::from_bool(false).is_relevant());
    }
}

//! Corrective RAG configuration

use serde::{Deserialize, Serialize};

use super::prompts::{default_answer_template, default_grader_template};
use super::ThresholdSpec;
use crate::domain::prompt::PromptTemplate;
use crate::domain::DomainError;

/// Configuration for the correction pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CragConfig {
    /// Threshold policy deciding when local evidence is insufficient
    #[serde(default)]
    pub threshold: ThresholdSpec,
    /// Whether the web fallback may be used at all
    #[serde(default = "default_true")]
    pub web_search_enabled: bool,
    /// Maximum number of grading calls in flight for one query
    #[serde(default = "default_grading_concurrency")]
    pub grading_concurrency: usize,
    /// Grade a passage relevant when the grading call fails
    #[serde(default = "default_true")]
    pub fail_open: bool,
    /// Retrieval width used when a caller does not pass `k`
    #[serde(default = "default_k")]
    pub default_k: usize,
    /// Language the answer is written in
    #[serde(default = "default_answer_language")]
    pub answer_language: String,
    /// Grader instruction override.
    /// Available variables: ${var:document}, ${var:question}
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grader_prompt: Option<PromptTemplate>,
    /// Answer instruction override.
    /// Available variables: ${var:question}, ${var:context}, ${var:language}
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_prompt: Option<PromptTemplate>,
}

fn default_true() -> bool {
    true
}

fn default_grading_concurrency() -> usize {
    4
}

fn default_k() -> usize {
    4
}

fn default_answer_language() -> String {
    "English".to_string()
}

impl Default for CragConfig {
    fn default() -> Self {
        Self {
            threshold: ThresholdSpec::default(),
            web_search_enabled: default_true(),
            grading_concurrency: default_grading_concurrency(),
            fail_open: default_true(),
            default_k: default_k(),
            answer_language: default_answer_language(),
            grader_prompt: None,
            answer_prompt: None,
        }
    }
}

impl CragConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: ThresholdSpec) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search_enabled = enabled;
        self
    }

    pub fn with_grading_concurrency(mut self, limit: usize) -> Self {
        self.grading_concurrency = limit.max(1);
        self
    }

    pub fn with_fail_open(mut self, fail_open: bool) -> Self {
        self.fail_open = fail_open;
        self
    }

    pub fn with_default_k(mut self, k: usize) -> Self {
        self.default_k = k;
        self
    }

    pub fn with_answer_language(mut self, language: impl Into<String>) -> Self {
        self.answer_language = language.into();
        self
    }

    pub fn with_grader_prompt(mut self, template: PromptTemplate) -> Self {
        self.grader_prompt = Some(template);
        self
    }

    pub fn with_answer_prompt(mut self, template: PromptTemplate) -> Self {
        self.answer_prompt = Some(template);
        self
    }

    /// The grader template in effect
    pub fn grader_template(&self) -> PromptTemplate {
        self.grader_prompt.clone().unwrap_or_else(default_grader_template)
    }

    /// The answer template in effect
    pub fn answer_template(&self) -> PromptTemplate {
        self.answer_prompt.clone().unwrap_or_else(default_answer_template)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        self.threshold.validate().map_err(DomainError::configuration)?;

        if self.grading_concurrency == 0 {
            return Err(DomainError::configuration(
                "grading_concurrency must be at least 1",
            ));
        }

        if self.default_k == 0 {
            return Err(DomainError::configuration("default_k must be at least 1"));
        }

        check_template(&self.grader_template(), &["document", "question"], &["document", "question"])?;
        check_template(
            &self.answer_template(),
            &["question", "context", "language"],
            &["question", "context"],
        )?;

        Ok(())
    }
}

/// A template may only require `provided` variables and must reference every `required` one
fn check_template(
    template: &PromptTemplate,
    provided: &[&str],
    required: &[&str],
) -> Result<(), DomainError> {
    template
        .validate_variables(provided)
        .map_err(|e| DomainError::configuration(e.to_string()))?;

    match required.iter().find(|name| !template.uses(name)) {
        Some(name) => Err(DomainError::configuration(format!(
            "template '{}' must reference ${{var:{}}}",
            template.id(),
            name
        ))),
        None => Ok(()),
    }
}

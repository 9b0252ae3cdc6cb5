//! LLM-based relevance grader
//!
//! Asks the model for a binary `{"score": "yes" | "no"}` judgment. Responses
//! that are not valid JSON fall back to a lexical check for the word "yes".

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::crag::{default_grader_template, GradeResult, Relevance, RelevanceGrader};
use crate::domain::llm::{LlmProvider, LlmRequest};
use crate::domain::passage::Passage;
use crate::domain::prompt::PromptTemplate;

static YES_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\byes\b").expect("valid regex"));

const GRADER_MAX_TOKENS: u32 = 50;

/// Relevance grader that uses an LLM for evaluation
#[derive(Debug)]
pub struct LlmRelevanceGrader<P>
where
    P: LlmProvider + ?Sized,
{
    provider: Arc<P>,
    model: String,
    template: PromptTemplate,
    temperature: f32,
    fail_open: bool,
}

impl<P: LlmProvider + ?Sized> LlmRelevanceGrader<P> {
    pub fn new(provider: Arc<P>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            template: default_grader_template(),
            temperature: 0.0,
            fail_open: true,
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Relevance assigned when the grading call fails
    pub fn with_fail_open(mut self, fail_open: bool) -> Self {
        self.fail_open = fail_open;
        self
    }

    /// JSON mode is only requested when the prompt asks for JSON, since
    /// providers reject `json_object` requests whose prompt never mentions it
    fn json_mode(&self) -> bool {
        self.template.content().to_lowercase().contains("json")
    }

    fn fallback(&self) -> Relevance {
        Relevance::from_bool(self.fail_open)
    }
}

#[derive(Debug, Deserialize)]
struct GradeResponse {
    score: serde_json::Value,
}

/// Extract JSON object from a string (handles markdown code blocks)
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;

    (start < end).then(|| &text[start..=end])
}

/// Interpret a grader response as a binary relevance judgment
pub(crate) fn parse_relevance(response: &str) -> Relevance {
    let parsed = extract_json(response)
        .and_then(|json| serde_json::from_str::<GradeResponse>(json).ok())
        .and_then(|grade| match grade.score {
            serde_json::Value::String(s) => Some(s.trim().eq_ignore_ascii_case("yes")),
            serde_json::Value::Bool(b) => Some(b),
            _ => None,
        });

    match parsed {
        Some(relevant) => Relevance::from_bool(relevant),
        None => Relevance::from_bool(YES_WORD.is_match(response)),
    }
}

#[async_trait]
impl<P: LlmProvider + ?Sized> RelevanceGrader for LlmRelevanceGrader<P> {
    async fn grade(&self, passage: &Passage, question: &str) -> GradeResult {
        let values = HashMap::from([("document", passage.text()), ("question", question)]);

        let prompt = match self.template.render(&values) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!("Failed to render grader prompt: {}", e);
                return GradeResult::failed(passage.clone(), self.fallback(), e);
            }
        };

        let request = LlmRequest::builder()
            .user(prompt)
            .temperature(self.temperature)
            .max_tokens(GRADER_MAX_TOKENS)
            .json_mode(self.json_mode())
            .build();

        match self.provider.chat(&self.model, request).await {
            Ok(response) => {
                let raw = response.content().trim().to_string();
                let relevance = parse_relevance(&raw);

                debug!(
                    "Graded passage {} as {:?} (model: {})",
                    passage.id(),
                    relevance,
                    self.model
                );

                GradeResult::graded(passage.clone(), relevance, raw)
            }
            Err(e) => {
                warn!("Grading passage {} failed: {}", passage.id(), e);
                GradeResult::failed(passage.clone(), self.fallback(), e)
            }
        }
    }
}

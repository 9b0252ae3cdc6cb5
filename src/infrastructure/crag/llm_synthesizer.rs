//! LLM-based answer synthesizer

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::domain::crag::{default_answer_template, AnswerSynthesizer};
use crate::domain::llm::{FinishReason, LlmProvider, LlmRequest};
use crate::domain::prompt::PromptTemplate;
use crate::domain::DomainError;

/// Answers from the assembled context with a single chat call
#[derive(Debug)]
pub struct LlmAnswerSynthesizer<P>
where
    P: LlmProvider + ?Sized,
{
    provider: Arc<P>,
    model: String,
    template: PromptTemplate,
    language: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl<P: LlmProvider + ?Sized> LlmAnswerSynthesizer<P> {
    pub fn new(provider: Arc<P>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            template: default_answer_template(),
            language: "English".to_string(),
            temperature: 0.0,
            max_tokens: None,
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl<P: LlmProvider + ?Sized> AnswerSynthesizer for LlmAnswerSynthesizer<P> {
    #[instrument(skip(self, question, context), fields(model = %self.model, context_len = context.len()))]
    async fn synthesize(&self, question: &str, context: &str) -> Result<String, DomainError> {
        let values = HashMap::from([
            ("question", question),
            ("context", context),
            ("language", self.language.as_str()),
        ]);

        let prompt = self
            .template
            .render(&values)
            .map_err(|e| DomainError::generation(format!("Failed to render answer prompt: {}", e)))?;

        let request = LlmRequest::builder()
            .user(prompt)
            .temperature(self.temperature)
            .max_tokens_opt(self.max_tokens)
            .build();

        let response = self
            .provider
            .chat(&self.model, request)
            .await
            .map_err(|e| DomainError::generation(format!("Answer generation failed: {}", e)))?;

        if response.finish_reason == Some(FinishReason::Length) {
            warn!("Answer truncated by the max_tokens limit");
        }
        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Answer generated"
            );
        }

        let answer = response.content().trim();
        if answer.is_empty() {
            return Err(DomainError::generation("Model returned an empty answer"));
        }

        debug!("Synthesized answer of {} chars", answer.len());

        Ok(answer.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::MockLlmProvider;

    #[tokio::test]
    async fn test_synthesize_renders_question_context_and_language() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_response("  The answer.  "));
        let synthesizer =
            LlmAnswerSynthesizer::new(provider.clone(), "gpt-3.5-turbo").with_language("Spanish");

        let answer = synthesizer
            .synthesize("What is X?", "X is a letter.")
            .await
            .unwrap();

        assert_eq!(answer, "The answer.");

        let prompt = provider.requests()[0].user_text();
        assert!(prompt.contains("Question: What is X?"));
        assert!(prompt.contains("Context: X is a letter."));
        assert!(prompt.contains("Answer in Spanish"));
    }

    #[tokio::test]
    async fn test_provider_error_is_generation_error() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_error("service unavailable"));
        let synthesizer = LlmAnswerSynthesizer::new(provider, "gpt-3.5-turbo");

        let err = synthesizer.synthesize("Q", "C").await.unwrap_err();

        assert!(matches!(err, DomainError::Generation { .. }));
        assert!(err.to_string().contains("service unavailable"));
    }

    #[tokio::test]
    async fn test_empty_answer_is_generation_error() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_response("   "));
        let synthesizer = LlmAnswerSynthesizer::new(provider, "gpt-3.5-turbo");

        let err = synthesizer.synthesize("Q", "C").await.unwrap_err();
        assert!(matches!(err, DomainError::Generation { .. }));
    }
}

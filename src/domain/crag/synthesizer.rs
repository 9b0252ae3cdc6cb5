//! Answer synthesis trait

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::DomainError;

/// Produces the final answer from a question and its assembled context.
///
/// Failures surface as `DomainError::Generation`; no substitute answer is produced.
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync + Debug {
    async fn synthesize(&self, question: &str, context: &str) -> Result<String, DomainError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Records every context it receives and answers with a fixed text
    #[derive(Debug)]
    pub struct MockAnswerSynthesizer {
        answer: String,
        error: Option<String>,
        calls: AtomicUsize,
        contexts: Mutex<Vec<String>>,
    }

    impl MockAnswerSynthesizer {
        pub fn new(answer: impl Into<String>) -> Self {
            Self {
                answer: answer.into(),
                error: None,
                calls: AtomicUsize::new(0),
                contexts: Mutex::new(Vec::new()),
            }
        }

        pub fn with_error(mut self, error: impl Into<String>) -> Self {
            self.error = Some(error.into());
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn contexts(&self) -> Vec<String> {
            self.contexts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AnswerSynthesizer for MockAnswerSynthesizer {
        async fn synthesize(&self, _question: &str, context: &str) -> Result<String, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.contexts.lock().unwrap().push(context.to_string());

            match &self.error {
                Some(error) => Err(DomainError::generation(error.clone())),
                None => Ok(self.answer.clone()),
            }
        }
    }
}

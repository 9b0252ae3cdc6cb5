//! Web search provider trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

#[cfg(test)]
use mockall::automock;

/// Result of a web search call.
///
/// Providers report soft failures (no results, rate limiting) as `Failed`
/// and transport errors as `Err`; callers treat both the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum WebSearchOutcome {
    Results(String),
    Failed(String),
}

impl WebSearchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Results(_))
    }
}

/// Searches the web for supplementary text
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    /// Search for `query`; the text block summarizes the top results
    async fn search(&self, query: &str) -> Result<WebSearchOutcome, DomainError>;

    /// Provider name for logs and status output
    fn provider_name(&self) -> &'static str;
}

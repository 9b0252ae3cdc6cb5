//! External web search used as a corrective fallback

mod provider;

pub use provider::{WebSearchOutcome, WebSearchProvider};

#[cfg(test)]
pub use provider::MockWebSearchProvider;

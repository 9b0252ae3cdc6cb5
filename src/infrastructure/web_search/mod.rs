//! Web search provider implementations

mod duckduckgo;

pub use duckduckgo::{DuckDuckGoSearch, DEFAULT_DUCKDUCKGO_URL};

//! Corrective RAG
//!
//! Retrieval-augmented question answering that grades every retrieved passage
//! for relevance, falls back to web search when too few passages are relevant,
//! and answers only from the relevant context.

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

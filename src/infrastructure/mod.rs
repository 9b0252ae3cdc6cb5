//! Infrastructure layer - External service implementations

pub mod crag;
pub mod embedding;
pub mod http_client;
pub mod ingestion;
pub mod llm;
pub mod logging;
pub mod observability;
pub mod passage_store;
pub mod services;
pub mod web_search;

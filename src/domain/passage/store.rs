//! Passage store trait

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Passage;
use crate::domain::error::DomainError;

/// Outcome of adding passages to a store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddPassagesResult {
    pub added: usize,
    pub skipped: usize,
}

impl AddPassagesResult {
    pub fn new(added: usize, skipped: usize) -> Self {
        Self { added, skipped }
    }
}

/// Vector-backed store of passages
#[async_trait]
pub trait PassageStore: Send + Sync + Debug {
    /// Up to `k` passages ordered by decreasing similarity to `query`.
    ///
    /// Fails with `DomainError::NotReady` when the store has no collection yet.
    async fn nearest_k(&self, query: &str, k: usize) -> Result<Vec<Passage>, DomainError>;

    /// Embed and add passages; passages whose id is already stored are skipped
    async fn add_passages(&self, passages: Vec<Passage>) -> Result<AddPassagesResult, DomainError>;

    /// Number of stored passages
    async fn count(&self) -> Result<usize, DomainError>;

    /// Drop the collection and any persisted data
    async fn reset(&self) -> Result<(), DomainError>;

    /// Whether a collection exists and can be queried
    async fn is_ready(&self) -> bool;

    /// Where the store keeps its data, if anywhere
    fn location(&self) -> Option<String> {
        None
    }
}

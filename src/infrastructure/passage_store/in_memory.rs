//! Embedding-backed passage store with JSON persistence
//!
//! Passages are embedded on insert and searched by cosine similarity. The whole
//! collection is written to `{persist_directory}/store.json` after every change
//! and restored when the store is opened.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::domain::embedding::{cosine_similarity, EmbeddingProvider, EmbeddingRequest};
use crate::domain::passage::{AddPassagesResult, Passage, PassageStore};
use crate::domain::DomainError;

pub const STORE_FILE_NAME: &str = "store.json";

/// Texts sent to the embedding service per request
const EMBED_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Collection {
    embedding_model: String,
    entries: Vec<StoredPassage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredPassage {
    passage: Passage,
    vector: Vec<f32>,
}

/// Vector store over an embedding provider
#[derive(Debug)]
pub struct InMemoryPassageStore {
    embedder: Arc<dyn EmbeddingProvider>,
    persist_directory: Option<PathBuf>,
    collection: RwLock<Option<Collection>>,
    persist_lock: Mutex<()>,
}

impl InMemoryPassageStore {
    /// A store that lives only in memory
    pub fn in_memory(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            persist_directory: None,
            collection: RwLock::new(None),
            persist_lock: Mutex::new(()),
        }
    }

    /// Open a persistent store, loading an existing collection if one was saved
    pub async fn open(
        embedder: Arc<dyn EmbeddingProvider>,
        persist_directory: impl Into<PathBuf>,
    ) -> Result<Self, DomainError> {
        let persist_directory = persist_directory.into();
        let collection = load_collection(&persist_directory.join(STORE_FILE_NAME)).await?;

        match &collection {
            Some(c) => {
                info!(
                    "Loaded {} passages from {}",
                    c.entries.len(),
                    persist_directory.display()
                );
                if c.embedding_model != embedder.model() {
                    warn!(
                        "Store was built with embedding model '{}' but '{}' is configured",
                        c.embedding_model,
                        embedder.model()
                    );
                }
            }
            None => debug!("No existing store at {}", persist_directory.display()),
        }

        Ok(Self {
            embedder,
            persist_directory: Some(persist_directory),
            collection: RwLock::new(collection),
            persist_lock: Mutex::new(()),
        })
    }

    fn store_file(&self) -> Option<PathBuf> {
        self.persist_directory.as_ref().map(|d| d.join(STORE_FILE_NAME))
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, DomainError> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            let request = EmbeddingRequest::batch(self.embedder.model(), batch.to_vec());
            let response = self.embedder.embed(request).await?;

            if response.vectors().len() != batch.len() {
                return Err(DomainError::provider(
                    self.embedder.provider_name(),
                    format!("Expected {} embeddings, got {}", batch.len(), response.vectors().len()),
                ));
            }

            vectors.extend(response.into_vectors());
        }

        Ok(vectors)
    }

    /// Write `collection` to disk; the caller holds `persist_lock`
    async fn persist(&self, collection: &Collection) -> Result<(), DomainError> {
        let Some(path) = self.store_file() else {
            return Ok(());
        };

        let snapshot = serde_json::to_vec(collection)
            .map_err(|e| DomainError::storage(format!("Failed to serialize store: {}", e)))?;

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                DomainError::storage(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, snapshot)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to replace {}: {}", path.display(), e)))?;

        Ok(())
    }
}

async fn load_collection(path: &Path) -> Result<Option<Collection>, DomainError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            DomainError::storage(format!("Corrupt store file {}: {}", path.display(), e))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DomainError::storage(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

#[async_trait]
impl PassageStore for InMemoryPassageStore {
    #[instrument(skip(self, query))]
    async fn nearest_k(&self, query: &str, k: usize) -> Result<Vec<Passage>, DomainError> {
        if !self.is_ready().await {
            return Err(DomainError::not_ready(
                "Passage store not initialized. Add documents first.",
            ));
        }

        if k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embed(vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::provider(self.embedder.provider_name(), "No query embedding"))?;

        let guard = self.collection.read().await;
        let collection = guard
            .as_ref()
            .ok_or_else(|| DomainError::not_ready("Passage store was reset during the query"))?;

        let mut scored: Vec<(f32, usize)> = collection
            .entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (cosine_similarity(&query_vector, &entry.vector), idx))
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

        let passages: Vec<Passage> = scored
            .into_iter()
            .take(k)
            .map(|(_, idx)| collection.entries[idx].passage.clone())
            .collect();

        debug!("Retrieved {} of {} passages", passages.len(), collection.entries.len());

        Ok(passages)
    }

    #[instrument(skip(self, passages), fields(count = passages.len()))]
    async fn add_passages(&self, passages: Vec<Passage>) -> Result<AddPassagesResult, DomainError> {
        let total = passages.len();

        let existing: HashSet<String> = match &*self.collection.read().await {
            Some(c) => c.entries.iter().map(|e| e.passage.id().to_string()).collect(),
            None => HashSet::new(),
        };

        let mut seen = HashSet::new();
        let new_passages: Vec<Passage> = passages
            .into_iter()
            .filter(|p| !existing.contains(p.id()) && seen.insert(p.id().to_string()))
            .collect();

        let vectors = self
            .embed(new_passages.iter().map(|p| p.text().to_string()).collect())
            .await?;

        // The new collection is only published once its snapshot is on disk
        let _persist = self.persist_lock.lock().await;

        let mut next = self.collection.read().await.clone().unwrap_or_else(|| Collection {
            embedding_model: self.embedder.model().to_string(),
            entries: Vec::new(),
        });

        let stored: HashSet<String> = next.entries.iter().map(|e| e.passage.id().to_string()).collect();
        let before = next.entries.len();

        next.entries.extend(
            new_passages
                .into_iter()
                .zip(vectors)
                .filter(|(p, _)| !stored.contains(p.id()))
                .map(|(passage, vector)| StoredPassage { passage, vector }),
        );

        let added = next.entries.len() - before;

        self.persist(&next).await?;
        *self.collection.write().await = Some(next);

        info!("Added {} passages ({} skipped)", added, total - added);

        Ok(AddPassagesResult::new(added, total - added))
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self
            .collection
            .read()
            .await
            .as_ref()
            .map_or(0, |c| c.entries.len()))
    }

    async fn reset(&self) -> Result<(), DomainError> {
        let _guard = self.persist_lock.lock().await;
        *self.collection.write().await = None;

        if let Some(path) = self.store_file() {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => info!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(DomainError::storage(format!(
                        "Failed to remove {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }

        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.collection.read().await.is_some()
    }

    fn location(&self) -> Option<String> {
        self.persist_directory
            .as_ref()
            .map(|d| d.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::passage::METADATA_SOURCE;
    use std::collections::HashMap;

    fn embedder() -> Arc<dyn EmbeddingProvider> {
        Arc::new(MockEmbeddingProvider::new(256))
    }

    fn passage(text: &str, source: &str) -> Passage {
        Passage::with_metadata(
            text,
            HashMap::from([(METADATA_SOURCE.to_string(), source.to_string())]),
        )
    }

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("crag-store-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_uninitialized_store_is_not_ready() {
        let store = InMemoryPassageStore::in_memory(embedder());

        assert!(!store.is_ready().await);
        let err = store.nearest_k("anything", 4).await.unwrap_err();
        assert!(matches!(err, DomainError::NotReady { .. }));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_nearest_k_orders_by_similarity() {
        let store = InMemoryPassageStore::in_memory(embedder());
        store
            .add_passages(vec![
                passage("bananas are yellow fruit", "fruit.txt"),
                passage("the action button replaces the mute switch", "phone.txt"),
                passage("press the action button to open the camera", "phone.txt"),
            ])
            .await
            .unwrap();

        let results = store.nearest_k("what does the action button do", 2).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|p| p.source() == Some("phone.txt")));
    }

    #[tokio::test]
    async fn test_nearest_k_may_return_fewer() {
        let store = InMemoryPassageStore::in_memory(embedder());
        store.add_passages(vec![passage("only one", "a.txt")]).await.unwrap();

        assert_eq!(store.nearest_k("one", 4).await.unwrap().len(), 1);
        assert!(store.nearest_k("one", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicates_are_skipped() {
        let store = InMemoryPassageStore::in_memory(embedder());

        let first = store
            .add_passages(vec![passage("same", "a.txt"), passage("same", "a.txt")])
            .await
            .unwrap();
        let second = store.add_passages(vec![passage("same", "a.txt")]).await.unwrap();

        assert_eq!(first, AddPassagesResult::new(1, 1));
        assert_eq!(second, AddPassagesResult::new(0, 1));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_persistence_round_trip_and_reset() {
        let dir = temp_dir();

        {
            let store = InMemoryPassageStore::open(embedder(), &dir).await.unwrap();
            assert!(!store.is_ready().await);
            store
                .add_passages(vec![passage("persisted text", "p.txt")])
                .await
                .unwrap();
        }

        let reopened = InMemoryPassageStore::open(embedder(), &dir).await.unwrap();
        assert!(reopened.is_ready().await);
        assert_eq!(reopened.count().await.unwrap(), 1);
        assert_eq!(reopened.location(), Some(dir.display().to_string()));

        reopened.reset().await.unwrap();
        assert!(!reopened.is_ready().await);
        assert!(!dir.join(STORE_FILE_NAME).exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_embedding_failure_leaves_store_unchanged() {
        let store = InMemoryPassageStore::in_memory(Arc::new(
            MockEmbeddingProvider::new(8).with_error("quota exceeded"),
        ));

        assert!(store.add_passages(vec![passage("x", "a.txt")]).await.is_err());
        assert!(!store.is_ready().await);
    }

    #[tokio::test]
    async fn test_failed_write_does_not_commit_passages() {
        let dir = temp_dir();
        let store = InMemoryPassageStore::open(embedder(), &dir).await.unwrap();
        store
            .add_passages(vec![passage("already stored", "a.txt")])
            .await
            .unwrap();

        // A directory where the temporary snapshot goes makes the write fail
        std::fs::create_dir_all(dir.join(STORE_FILE_NAME).with_extension("json.tmp")).unwrap();

        let err = store
            .add_passages(vec![passage("never committed", "b.txt")])
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Storage { .. }));
        assert_eq!(store.count().await.unwrap(), 1);
        let results = store.nearest_k("never committed", 4).await.unwrap();
        assert!(results.iter().all(|p| p.source() == Some("a.txt")));

        let reopened = InMemoryPassageStore::open(embedder(), &dir).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }
}

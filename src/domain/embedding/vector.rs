//! Embedding request/response types and vector math

use serde::{Deserialize, Serialize};

/// Request to embed one or more texts with a given model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    model: String,
    inputs: Vec<String>,
}

impl EmbeddingRequest {
    pub fn single(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            inputs: vec![text.into()],
        }
    }

    pub fn batch(model: impl Into<String>, texts: Vec<String>) -> Self {
        Self {
            model: model.into(),
            inputs: texts,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

/// Vectors returned for an embedding request, in input order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    model: String,
    vectors: Vec<Vec<f32>>,
    total_tokens: u32,
}

impl EmbeddingResponse {
    pub fn new(model: impl Into<String>, vectors: Vec<Vec<f32>>, total_tokens: u32) -> Self {
        Self {
            model: model.into(),
            vectors,
            total_tokens,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    pub fn total_tokens(&self) -> u32 {
        self.total_tokens
    }

    pub fn into_vectors(self) -> Vec<Vec<f32>> {
        self.vectors
    }

    /// First vector, for single-input requests
    pub fn into_first(self) -> Option<Vec<f32>> {
        self.vectors.into_iter().next()
    }
}

/// Cosine similarity between two vectors; 0.0 when lengths differ or either is zero
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Euclidean norm of a vector
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

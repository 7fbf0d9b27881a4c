//! Vector store abstraction.
//!
//! Only query-time operations are exposed; the index is populated elsewhere.

mod memory;
mod pinecone;

pub use memory::MemoryVectorStore;
pub use pinecone::PineconeVectorStore;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A passage of the corpus stored in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Vector id in the index.
    pub id: String,
    /// Passage text.
    pub text: String,
    /// Remaining metadata stored with the vector.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Passage {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: serde_json::Map::new(),
        }
    }

    /// A metadata value rendered as text, if present.
    pub fn metadata_str(&self, key: &str) -> Option<String> {
        self.metadata.get(key).map(|v| match v {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// A search result with score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The matched passage.
    pub passage: Passage,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Size information about the index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Vector dimension, when reported.
    pub dimension: Option<usize>,
    /// Vectors across all namespaces.
    pub total_vectors: u64,
    /// Vectors in the configured namespace.
    pub namespace_vectors: u64,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Search for the `limit` nearest passages.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>>;

    /// Report index size.
    async fn stats(&self) -> Result<IndexStats>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

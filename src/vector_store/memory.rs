//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{cosine_similarity, IndexStats, Passage, SearchResult, VectorStore};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::RwLock;

/// In-memory vector store.
pub struct MemoryVectorStore {
    entries: RwLock<Vec<(Passage, Vec<f32>)>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Add or replace a passage by id.
    pub fn insert(&self, passage: Passage, embedding: Vec<f32>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.retain(|(p, _)| p.id != passage.id);
        entries.push((passage, embedding));
    }

    /// Number of stored passages.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());

        let mut results: Vec<SearchResult> = entries
            .iter()
            .map(|(passage, embedding)| SearchResult {
                passage: passage.clone(),
                score: cosine_similarity(query_embedding, embedding),
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        Ok(results)
    }

    async fn stats(&self) -> Result<IndexStats> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(IndexStats {
            dimension: entries.first().map(|(_, e)| e.len()),
            total_vectors: entries.len() as u64,
            namespace_vectors: entries.len() as u64,
        })
    }
}

//! Query-time passage retrieval.

use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{SearchResult, VectorStore};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Default number of passages fetched per query.
pub const DEFAULT_TOP_K: usize = 4;

/// Embeds a query and fetches its nearest passages.
pub struct Retriever {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl Retriever {
    /// Create a new retriever.
    pub fn new(vector_store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            vector_store,
            embedder,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Set the number of passages to fetch.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieve passages for a query.
    #[instrument(skip(self), fields(top_k = self.top_k))]
    pub async fn retrieve(&self, query: &str) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embedder.embed(query).await?;
        let results = self.vector_store.search(&query_embedding, self.top_k).await?;
        debug!("Retrieved {} passages", results.len());
        Ok(results)
    }
}

/// Join passage texts the way they are stuffed into the prompt.
pub fn stuff_passages(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| r.passage.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

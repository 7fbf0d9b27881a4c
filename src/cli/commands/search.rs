//! Search command implementation.

use crate::chain::Retriever;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::embedding::HuggingFaceEmbedder;
use crate::vector_store::PineconeVectorStore;
use anyhow::Result;
use std::sync::Arc;

/// Run the search command.
pub async fn run_search(query: &str, limit: Option<usize>, settings: Settings) -> Result<()> {
    let secrets = match preflight::check(Operation::Search, &settings) {
        Ok(secrets) => secrets,
        Err(e) => {
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    };

    let embedder = Arc::new(HuggingFaceEmbedder::new(
        &settings.embedding,
        secrets.hf_token.clone(),
    )?);
    let store = Arc::new(PineconeVectorStore::new(
        &settings.vector_store,
        &secrets.pinecone_api_key,
    )?);
    let retriever = Retriever::new(store, embedder)
        .with_top_k(limit.unwrap_or(settings.vector_store.top_k));

    let spinner = Output::spinner("Searching...");
    let results = retriever.retrieve(query).await;
    spinner.finish_and_clear();

    match results {
        Ok(results) => {
            if results.is_empty() {
                Output::warning("No passages found for your query.");
            } else {
                Output::success(&format!("Found {} passages", results.len()));
                for (i, result) in results.iter().enumerate() {
                    Output::passage(i + 1, result);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(anyhow::anyhow!("{}", e));
        }
    }

    Ok(())
}

//! Question processing: refinement, retrieval and answer caching.

use crate::cache::{CacheStats, ResponseCache};
use crate::chain::{RefinementChain, RetrievalChain, Retriever, RESULT_KEY};
use crate::config::{Prompts, Secrets, Settings};
use crate::embedding::HuggingFaceEmbedder;
use crate::error::{AssistantError, Result};
use crate::llm::{CachedChatModel, ChatModel, MistralChat};
use crate::vector_store::{PineconeVectorStore, SearchResult, VectorStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Reply shown when a question could not be answered.
pub const APOLOGY: &str =
    "I apologize, but I encountered an error processing your question. Please try again.";

/// An answered question.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// The question as asked.
    pub question: String,
    /// The search query the question was refined into.
    pub refined_query: String,
    /// The model's answer.
    pub text: String,
    /// Passages the answer was grounded in.
    pub sources: Vec<SearchResult>,
}

/// Outcome of a question from the user's point of view.
#[derive(Debug, Clone)]
pub enum Reply {
    Answered(Answer),
    Apology { error: String },
}

impl Reply {
    /// Text to show as the assistant's message.
    pub fn text(&self) -> &str {
        match self {
            Reply::Answered(answer) => &answer.text,
            Reply::Apology { .. } => APOLOGY,
        }
    }
}

/// Refines a question, answers it from retrieved passages, and memoises answers.
pub struct QueryPipeline {
    refinement: RefinementChain,
    retrieval: RetrievalChain,
    answers: Option<ResponseCache<String, Answer>>,
}

impl QueryPipeline {
    /// Compose a pipeline from its chains, without answer caching.
    pub fn new(refinement: RefinementChain, retrieval: RetrievalChain) -> Self {
        Self {
            refinement,
            retrieval,
            answers: None,
        }
    }

    /// Cache up to `max_entries` answers keyed by question.
    pub fn with_answer_cache(mut self, max_entries: usize) -> Self {
        self.answers = Some(ResponseCache::new(max_entries));
        self
    }

    /// Build the production pipeline: Mistral, Hugging Face embeddings and Pinecone.
    pub fn from_settings(settings: &Settings, secrets: &Secrets) -> Result<Self> {
        let system_prompt = settings.load_system_prompt()?;
        let prompts = Arc::new(Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?);

        let mistral: Arc<dyn ChatModel> = Arc::new(MistralChat::new(
            &settings.llm,
            &secrets.mistral_api_key,
            system_prompt,
        )?);
        let model: Arc<dyn ChatModel> = if settings.cache.enabled {
            Arc::new(CachedChatModel::new(mistral, settings.cache.max_entries))
        } else {
            mistral
        };

        let embedder = Arc::new(HuggingFaceEmbedder::new(
            &settings.embedding,
            secrets.hf_token.clone(),
        )?);
        let store: Arc<dyn VectorStore> = Arc::new(PineconeVectorStore::new(
            &settings.vector_store,
            &secrets.pinecone_api_key,
        )?);
        let retriever = Retriever::new(store, embedder).with_top_k(settings.vector_store.top_k);

        let pipeline = Self::new(
            RefinementChain::new(model.clone(), prompts.clone()),
            RetrievalChain::new(model, retriever, prompts),
        );

        info!(
            "Pipeline ready (model {}, index {}/{}, k={})",
            settings.llm.model,
            settings.vector_store.index_name,
            settings.vector_store.namespace,
            settings.vector_store.top_k
        );

        Ok(if settings.cache.enabled {
            pipeline.with_answer_cache(settings.cache.max_entries)
        } else {
            pipeline
        })
    }

    /// Answer a question. Identical questions are served from the cache.
    #[instrument(skip(self))]
    pub async fn process_query(&self, query: &str) -> Result<Answer> {
        if query.trim().is_empty() {
            return Err(AssistantError::InvalidInput("Question is empty".to_string()));
        }

        if let Some(hit) = self.answers.as_ref().and_then(|c| c.get(&query.to_string())) {
            info!("Answer cache hit");
            return Ok(hit);
        }

        let mut refined_query = self.refinement.refine(query).await?;
        if refined_query.is_empty() {
            warn!("Refinement returned an empty query, searching with the question");
            refined_query = query.trim().to_string();
        }

        let retrieved = self.retrieval.invoke(&refined_query).await?;
        let answer = Answer {
            question: query.to_string(),
            refined_query,
            text: retrieved.output.text(RESULT_KEY),
            sources: retrieved.passages,
        };

        if let Some(cache) = &self.answers {
            cache.insert(query.to_string(), answer.clone());
        }
        Ok(answer)
    }

    /// Answer a question, turning failures into the apology reply.
    pub async fn answer_or_apologize(&self, query: &str) -> Reply {
        match self.process_query(query).await {
            Ok(answer) => Reply::Answered(answer),
            Err(e) => {
                error!("Error processing query: {}", e);
                Reply::Apology {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Retrieve passages for a query without refinement or answering.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.retrieval.retriever().retrieve(query).await
    }

    /// Answer cache counters, when caching is on.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.answers.as_ref().map(|c| c.stats())
    }
}

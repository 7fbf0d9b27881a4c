//! Retrieval-grounded answering.

use super::retriever::{stuff_passages, Retriever};
use super::ChainOutput;
use crate::config::Prompts;
use crate::error::Result;
use crate::llm::{ChatModel, Message};
use crate::vector_store::SearchResult;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// Output key holding the answer.
pub const RESULT_KEY: &str = "result";

/// Output of one retrieval chain run.
#[derive(Debug, Clone)]
pub struct RetrievalOutput {
    /// `{"query": ..., "result": ...}`.
    pub output: ChainOutput,
    /// Passages stuffed into the prompt.
    pub passages: Vec<SearchResult>,
}

/// Retrieves passages for a query and answers from them.
pub struct RetrievalChain {
    model: Arc<dyn ChatModel>,
    retriever: Retriever,
    prompts: Arc<Prompts>,
}

impl RetrievalChain {
    pub fn new(model: Arc<dyn ChatModel>, retriever: Retriever, prompts: Arc<Prompts>) -> Self {
        Self {
            model,
            retriever,
            prompts,
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Messages sent for a question and its stuffed context.
    pub fn messages(&self, question: &str, context: &str) -> Vec<Message> {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), context.to_string());
        vars.insert("question".to_string(), question.to_string());

        vec![
            Message::system(
                self.prompts
                    .render_with_custom(&self.prompts.retrieval.system, &vars),
            ),
            Message::user(self.prompts.render_with_custom(&self.prompts.retrieval.user, &vars)),
        ]
    }

    /// Retrieve, stuff and answer.
    #[instrument(skip(self))]
    pub async fn invoke(&self, query: &str) -> Result<RetrievalOutput> {
        let passages = self.retriever.retrieve(query).await?;
        info!("Answering from {} passages", passages.len());

        let context = stuff_passages(&passages);
        let reply = self.model.complete(&self.messages(query, &context)).await?;

        let mut output = Map::new();
        output.insert("query".to_string(), Value::String(query.to_string()));
        output.insert(RESULT_KEY.to_string(), Value::String(reply.content));

        Ok(RetrievalOutput {
            output: ChainOutput::Mapping(output),
            passages,
        })
    }
}

//! Scripted fakes shared by unit tests.

use crate::chain::{RefinementChain, RetrievalChain, Retriever};
use crate::config::Prompts;
use crate::embedding::Embedder;
use crate::error::{AssistantError, Result};
use crate::llm::{AssistantMessage, ChatModel, Message, Role};
use crate::pipeline::QueryPipeline;
use crate::vector_store::{MemoryVectorStore, Passage};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

type Responder = Box<dyn Fn(&[Message]) -> Result<String> + Send + Sync>;

/// Chat model answering through a closure and recording every request.
pub struct ScriptedChatModel {
    responder: Responder,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedChatModel {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&[Message]) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replies with `echo: <last user message>`.
    pub fn echo() -> Self {
        Self::new(|messages| {
            let last = messages
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(format!("echo: {}", last))
        })
    }

    /// Fails every call with an LLM error.
    pub fn failing(reason: &str) -> Self {
        let reason = reason.to_string();
        Self::new(move |_| Err(AssistantError::Llm(reason.clone())))
    }

    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn complete(&self, messages: &[Message]) -> Result<AssistantMessage> {
        self.calls.lock().unwrap().push(messages.to_vec());
        (self.responder)(messages).map(AssistantMessage::new)
    }

    fn identity(&self) -> String {
        "scripted".to_string()
    }
}

/// Vocabulary used by [`KeywordEmbedder`].
pub const VOCABULARY: [&str; 6] = ["moses", "egypt", "love", "world", "creation", "prayer"];

/// Embeds text as keyword presence over [`VOCABULARY`].
pub struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let lower = text.to_lowercase();
        Ok(VOCABULARY
            .iter()
            .map(|word| if lower.contains(word) { 1.0 } else { 0.0 })
            .collect())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        VOCABULARY.len()
    }
}

/// A small store of passages embedded with [`KeywordEmbedder`].
pub async fn sample_store() -> MemoryVectorStore {
    let texts = [
        ("exodus-3", "Moses led the people out of Egypt."),
        ("john-3-16", "For God so loved the world."),
        ("genesis-1", "In the beginning God created the heaven and the earth: creation."),
        ("matthew-6", "After this manner therefore pray ye: the Lord's prayer."),
        ("exodus-14", "Moses stretched out his hand over the sea of Egypt."),
    ];

    let store = MemoryVectorStore::new();
    for (id, text) in texts {
        let embedding = KeywordEmbedder.embed(text).await.unwrap();
        store.insert(Passage::new(id, text), embedding);
    }
    store
}

/// Refinement calls get `refined`; answering calls echo the question line.
pub fn scripted_model(refined: &'static str) -> Arc<ScriptedChatModel> {
    Arc::new(ScriptedChatModel::new(move |messages: &[Message]| {
        if messages.iter().any(|m| m.role == Role::System) {
            let question = messages[1].content.lines().last().unwrap_or_default();
            Ok(format!("Answer about {}", question))
        } else {
            Ok(refined.to_string())
        }
    }))
}

/// A pipeline over [`sample_store`] driven by `model`.
pub async fn pipeline_with(model: Arc<dyn ChatModel>) -> QueryPipeline {
    let prompts = Arc::new(Prompts::default());
    let retriever = Retriever::new(Arc::new(sample_store().await), Arc::new(KeywordEmbedder));
    QueryPipeline::new(
        RefinementChain::new(model.clone(), prompts.clone()),
        RetrievalChain::new(model, retriever, prompts),
    )
}

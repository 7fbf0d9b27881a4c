//! Completion cache wrapped around any [`ChatModel`].

use super::{AssistantMessage, ChatModel, Message};
use crate::cache::{CacheStats, ResponseCache};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Chat model that memoises completions by model identity and messages.
pub struct CachedChatModel {
    inner: Arc<dyn ChatModel>,
    cache: ResponseCache<String, AssistantMessage>,
}

impl CachedChatModel {
    pub fn new(inner: Arc<dyn ChatModel>, max_entries: usize) -> Self {
        Self {
            inner,
            cache: ResponseCache::new(max_entries),
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn key(&self, messages: &[Message]) -> Result<String> {
        Ok(format!(
            "{}\u{1f}{}",
            self.inner.identity(),
            serde_json::to_string(messages)?
        ))
    }
}

#[async_trait]
impl ChatModel for CachedChatModel {
    async fn complete(&self, messages: &[Message]) -> Result<AssistantMessage> {
        let key = self.key(messages)?;
        if let Some(hit) = self.cache.get(&key) {
            debug!("Model cache hit");
            return Ok(hit);
        }

        let reply = self.inner.complete(messages).await?;
        self.cache.insert(key, reply.clone());
        Ok(reply)
    }

    fn identity(&self) -> String {
        self.inner.identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedChatModel;

    #[tokio::test]
    async fn test_identical_calls_hit_cache() {
        let model = Arc::new(ScriptedChatModel::echo());
        let cached = CachedChatModel::new(model.clone(), 16);

        let messages = vec![Message::user("Who was Moses?")];
        let first = cached.complete(&messages).await.unwrap();
        let second = cached.complete(&messages).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(model.calls().len(), 1);
        assert_eq!(cached.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_different_messages_miss() {
        let model = Arc::new(ScriptedChatModel::echo());
        let cached = CachedChatModel::new(model.clone(), 16);

        cached.complete(&[Message::user("a")]).await.unwrap();
        cached.complete(&[Message::user("b")]).await.unwrap();

        assert_eq!(model.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let model = Arc::new(ScriptedChatModel::failing("upstream unavailable"));
        let cached = CachedChatModel::new(model.clone(), 16);

        assert!(cached.complete(&[Message::user("a")]).await.is_err());
        assert!(cached.complete(&[Message::user("a")]).await.is_err());
        assert_eq!(model.calls().len(), 2);
    }
}

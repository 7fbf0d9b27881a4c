//! Query refinement: turns a free-text question into a search query.

use super::ChainOutput;
use crate::config::Prompts;
use crate::error::Result;
use crate::llm::{ChatModel, Message};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Output key holding the refined query.
pub const REFINED_KEY: &str = "text";

/// Single-call chain: prompt template piped into the chat model.
pub struct RefinementChain {
    model: Arc<dyn ChatModel>,
    prompts: Arc<Prompts>,
}

impl RefinementChain {
    pub fn new(model: Arc<dyn ChatModel>, prompts: Arc<Prompts>) -> Self {
        Self { model, prompts }
    }

    /// Messages sent for a question.
    pub fn messages(&self, original_question: &str) -> Vec<Message> {
        let mut vars = HashMap::new();
        vars.insert("original_question".to_string(), original_question.to_string());
        vec![Message::user(
            self.prompts
                .render_with_custom(&self.prompts.refinement.user, &vars),
        )]
    }

    /// Run the chain and return its raw output.
    #[instrument(skip(self))]
    pub async fn invoke(&self, original_question: &str) -> Result<ChainOutput> {
        let reply = self.model.complete(&self.messages(original_question)).await?;
        Ok(ChainOutput::from(reply))
    }

    /// Run the chain and return the trimmed refined query.
    pub async fn refine(&self, original_question: &str) -> Result<String> {
        let refined = self.invoke(original_question).await?.text(REFINED_KEY).trim().to_string();
        debug!("Refined query: {}", refined);
        Ok(refined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;
    use crate::testing::ScriptedChatModel;

    #[tokio::test]
    async fn test_prompt_and_trim() {
        let model = Arc::new(ScriptedChatModel::new(|_| Ok("  Moses Exodus leader  \n".to_string())));
        let chain = RefinementChain::new(model.clone(), Arc::new(Prompts::default()));

        let refined = chain.refine("Who was Moses?").await.unwrap();
        assert_eq!(refined, "Moses Exodus leader");

        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 1);
        assert_eq!(calls[0][0].role, Role::User);
        assert_eq!(
            calls[0][0].content,
            "Create a focused Bible search query based on: Who was Moses?"
        );
    }

    #[tokio::test]
    async fn test_model_error_propagates() {
        let chain = RefinementChain::new(
            Arc::new(ScriptedChatModel::failing("rate limited")),
            Arc::new(Prompts::default()),
        );
        assert!(chain.refine("Who was Moses?").await.is_err());
    }
}

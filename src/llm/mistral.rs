//! Mistral chat model over its OpenAI-compatible API.

use super::{with_system_prompt, AssistantMessage, ChatModel, Message, Role};
use crate::config::LlmSettings;
use crate::error::{AssistantError, Result};
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use tracing::{debug, instrument};

/// Create an OpenAI-compatible client for the given API base with a request timeout.
pub fn create_client(api_base: &str, api_key: &str, timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    let config = OpenAIConfig::new()
        .with_api_base(api_base.trim_end_matches('/'))
        .with_api_key(api_key);

    Ok(Client::with_config(config).with_http_client(http_client))
}

/// Mistral chat model carrying a fixed system prompt.
pub struct MistralChat {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    system_prompt: String,
}

impl MistralChat {
    /// Create a chat model from settings.
    pub fn new(settings: &LlmSettings, api_key: &str, system_prompt: impl Into<String>) -> Result<Self> {
        let client = create_client(
            &settings.api_base,
            api_key,
            Duration::from_secs(settings.timeout_secs),
        )?;

        Ok(Self {
            client,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            system_prompt: system_prompt.into(),
        })
    }

    fn to_request_message(message: &Message) -> Result<ChatCompletionRequestMessage> {
        let built: ChatCompletionRequestMessage = match message.role {
            Role::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(message.content.clone())
                .build()
                .map_err(|e| AssistantError::Llm(e.to_string()))?
                .into(),
            Role::User => ChatCompletionRequestUserMessageArgs::default()
                .content(message.content.clone())
                .build()
                .map_err(|e| AssistantError::Llm(e.to_string()))?
                .into(),
            Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                .content(message.content.clone())
                .build()
                .map_err(|e| AssistantError::Llm(e.to_string()))?
                .into(),
        };
        Ok(built)
    }
}

#[async_trait]
impl ChatModel for MistralChat {
    #[instrument(skip(self, messages), fields(model = %self.model, count = messages.len()))]
    async fn complete(&self, messages: &[Message]) -> Result<AssistantMessage> {
        let request_messages = with_system_prompt(&self.system_prompt, messages)
            .iter()
            .map(Self::to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(request_messages)
            .temperature(self.temperature);
        if let Some(max_tokens) = self.max_tokens {
            #[allow(deprecated)]
            args.max_tokens(max_tokens);
        }
        let request = args.build().map_err(|e| AssistantError::Llm(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AssistantError::Llm(format!("Failed to generate response: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| AssistantError::Llm("Empty response from model".to_string()))?;

        debug!("Received {} characters from {}", content.len(), response.model);

        Ok(AssistantMessage {
            content,
            model: Some(response.model),
        })
    }

    fn identity(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.system_prompt.hash(&mut hasher);
        format!(
            "{}|temperature={}|max_tokens={:?}|system={:016x}",
            self.model,
            self.temperature,
            self.max_tokens,
            hasher.finish()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings_for(server: &MockServer) -> LlmSettings {
        LlmSettings {
            api_base: format!("{}/v1", server.uri()),
            ..LlmSettings::default()
        }
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "cmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "mistral-large-latest",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 9, "total_tokens": 21 }
        })
    }

    #[tokio::test]
    async fn test_complete_sends_merged_system_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "mistral-large-latest",
                "messages": [{
                    "role": "system",
                    "content": "Answer from scripture.\n\nYou are a helpful Bible assistant."
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                "Moses led the Israelites out of Egypt.",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let chat = MistralChat::new(&settings_for(&server), "test-key", "Answer from scripture.").unwrap();
        let reply = chat
            .complete(&[
                Message::system("You are a helpful Bible assistant."),
                Message::user("Who was Moses?"),
            ])
            .await
            .unwrap();

        assert_eq!(reply.content, "Moses led the Israelites out of Egypt.");
        assert_eq!(reply.model.as_deref(), Some("mistral-large-latest"));
    }

    #[tokio::test]
    async fn test_empty_choices_is_an_error() {
        let server = MockServer::start().await;
        let mut body = completion("unused");
        body["choices"] = serde_json::json!([]);
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let chat = MistralChat::new(&settings_for(&server), "test-key", "").unwrap();
        let err = chat.complete(&[Message::user("Hello")]).await.unwrap_err();
        assert!(matches!(err, AssistantError::Llm(_)));
    }

    #[test]
    fn test_identity_depends_on_system_prompt() {
        let settings = LlmSettings::default();
        let a = MistralChat::new(&settings, "k", "first").unwrap();
        let b = MistralChat::new(&settings, "k", "second").unwrap();
        assert_ne!(a.identity(), b.identity());
        assert!(a.identity().starts_with("mistral-large-latest|"));
    }
}

//! Hugging Face feature-extraction embeddings.
//!
//! Works against the hosted inference router and against a local
//! text-embeddings-inference server, both of which accept `{"inputs": [...]}`.

use super::{l2_normalize, Embedder};
use crate::config::EmbeddingSettings;
use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Inputs sent per request.
const BATCH_SIZE: usize = 32;

/// Embedder backed by a feature-extraction HTTP endpoint.
pub struct HuggingFaceEmbedder {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    dimensions: usize,
    normalize: bool,
}

#[derive(Serialize)]
struct FeatureRequest<'a> {
    inputs: &'a [String],
}

/// Pooled models return one vector per input; raw models return one per token.
#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureResponse {
    Pooled(Vec<Vec<f32>>),
    Tokens(Vec<Vec<Vec<f32>>>),
}

impl HuggingFaceEmbedder {
    /// Create a new embedder from settings and an optional bearer token.
    pub fn new(settings: &EmbeddingSettings, token: Option<String>) -> Result<Self> {
        let endpoint = settings.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(AssistantError::Config(format!(
                "Invalid embedding endpoint: {}",
                settings.endpoint
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            token,
            dimensions: settings.dimensions as usize,
            normalize: settings.normalize,
        })
    }

    async fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .json(&FeatureRequest { inputs });
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Embedding(format!(
                "{} returned {}: {}",
                self.endpoint,
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: FeatureResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Embedding(format!("Failed to decode embeddings: {}", e)))?;

        let vectors = match parsed {
            FeatureResponse::Pooled(vectors) => vectors,
            // CLS pooling, as used by the BGE family.
            FeatureResponse::Tokens(per_input) => per_input
                .into_iter()
                .map(|tokens| tokens.into_iter().next().unwrap_or_default())
                .collect(),
        };

        if vectors.len() != inputs.len() {
            return Err(AssistantError::Embedding(format!(
                "Expected {} embeddings, got {}",
                inputs.len(),
                vectors.len()
            )));
        }

        vectors
            .into_iter()
            .map(|v| {
                if v.len() != self.dimensions {
                    return Err(AssistantError::Embedding(format!(
                        "Expected {} dimensions, got {}",
                        self.dimensions,
                        v.len()
                    )));
                }
                Ok(if self.normalize { l2_normalize(v) } else { v })
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| AssistantError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            all_embeddings.extend(self.request(chunk).await?);
        }

        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings_for(server: &MockServer, dimensions: u32) -> EmbeddingSettings {
        EmbeddingSettings {
            endpoint: format!("{}/embed", server.uri()),
            dimensions,
            ..EmbeddingSettings::default()
        }
    }

    #[tokio::test]
    async fn test_pooled_response_is_normalized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .and(header("authorization", "Bearer hf_test"))
            .and(body_json(serde_json::json!({ "inputs": ["Who was Moses?"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([[3.0, 4.0]])))
            .mount(&server)
            .await;

        let embedder =
            HuggingFaceEmbedder::new(&settings_for(&server, 2), Some("hf_test".to_string())).unwrap();
        let v = embedder.embed("Who was Moses?").await.unwrap();
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_token_response_uses_first_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                [[1.0, 0.0], [0.0, 1.0]]
            ])))
            .mount(&server)
            .await;

        let mut settings = settings_for(&server, 2);
        settings.normalize = false;
        let embedder = HuggingFaceEmbedder::new(&settings, None).unwrap();
        assert_eq!(embedder.embed("text").await.unwrap(), vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_dimension_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([[1.0, 2.0, 3.0]])))
            .mount(&server)
            .await;

        let embedder = HuggingFaceEmbedder::new(&settings_for(&server, 384), None).unwrap();
        let err = embedder.embed("text").await.unwrap_err();
        assert!(err.to_string().contains("Expected 384 dimensions"));
    }

    #[tokio::test]
    async fn test_upstream_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("model is loading"))
            .mount(&server)
            .await;

        let embedder = HuggingFaceEmbedder::new(&settings_for(&server, 2), None).unwrap();
        let err = embedder.embed("text").await.unwrap_err();
        assert!(matches!(err, AssistantError::Embedding(msg) if msg.contains("model is loading")));
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let settings = EmbeddingSettings {
            endpoint: "localhost:8080".to_string(),
            ..EmbeddingSettings::default()
        };
        assert!(HuggingFaceEmbedder::new(&settings, None).is_err());
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let embedder = HuggingFaceEmbedder::new(&EmbeddingSettings::default(), None).unwrap();
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
    }
}

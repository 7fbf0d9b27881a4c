//! Pinecone vector store over its REST API.
//!
//! The data-plane host is either configured or looked up once from the
//! control plane by index name.

use super::{IndexStats, Passage, SearchResult, VectorStore};
use crate::config::VectorStoreSettings;
use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};
use url::Url;

/// Pinecone index client bound to one namespace.
pub struct PineconeVectorStore {
    client: reqwest::Client,
    api_key: String,
    api_version: String,
    controller_url: String,
    index_name: String,
    namespace: String,
    text_key: String,
    host: OnceCell<Url>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    namespaces: HashMap<String, NamespaceStats>,
    #[serde(default)]
    dimension: Option<usize>,
    #[serde(default)]
    total_vector_count: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceStats {
    #[serde(default)]
    vector_count: u64,
}

impl PineconeVectorStore {
    /// Create a store from settings and an API key.
    pub fn new(settings: &VectorStoreSettings, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        let host = OnceCell::new();
        if let Some(configured) = settings.index_host.as_deref().filter(|h| !h.trim().is_empty()) {
            host.set(host_url(configured)?)
                .map_err(|_| AssistantError::VectorStore("Index host already set".to_string()))?;
        }

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            api_version: settings.api_version.clone(),
            controller_url: settings.controller_url.trim_end_matches('/').to_string(),
            index_name: settings.index_name.clone(),
            namespace: settings.namespace.clone(),
            text_key: settings.text_key.clone(),
            host,
        })
    }

    /// Namespace queried by this store.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Data-plane host, resolving it on first use.
    pub async fn host(&self) -> Result<&Url> {
        self.host.get_or_try_init(|| self.describe_index_host()).await
    }

    #[instrument(skip(self), fields(index = %self.index_name))]
    async fn describe_index_host(&self) -> Result<Url> {
        let url = format!("{}/indexes/{}", self.controller_url, self.index_name);
        debug!("Resolving index host from {}", url);

        let response = self
            .client
            .get(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", &self.api_version)
            .send()
            .await?;
        let described: DescribeIndexResponse = Self::decode(response).await?;

        host_url(&described.host)
    }

    async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let url = self.host().await?.join(endpoint)?;
        let response = self
            .client
            .post(url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", &self.api_version)
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let url = response.url().to_string();
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::VectorStore(format!(
                "{} returned {}: {}",
                url,
                status,
                body.chars().take(200).collect::<String>()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| AssistantError::VectorStore(format!("Failed to decode response: {}", e)))
    }
}

/// Accept a bare host (as returned by the control plane) or a full URL.
///
/// The path always ends in `/` so endpoints join below it.
fn host_url(host: &str) -> Result<Url> {
    let host = host.trim();
    let mut url = if host.starts_with("http://") || host.starts_with("https://") {
        Url::parse(host)?
    } else {
        Url::parse(&format!("https://{}", host))?
    };

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[async_trait]
impl VectorStore for PineconeVectorStore {
    #[instrument(skip(self, query_embedding), fields(namespace = %self.namespace))]
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let request = QueryRequest {
            namespace: &self.namespace,
            vector: query_embedding,
            top_k: limit,
            include_metadata: true,
            include_values: false,
        };
        let response: QueryResponse = self.post("query", &request).await?;

        let mut results = Vec::with_capacity(response.matches.len());
        for m in response.matches {
            let mut metadata = m.metadata.unwrap_or_default();
            let text = match metadata.remove(&self.text_key) {
                Some(serde_json::Value::String(text)) => text,
                _ => {
                    warn!("Match {} has no '{}' metadata, skipping", m.id, self.text_key);
                    continue;
                }
            };
            results.push(SearchResult {
                passage: Passage {
                    id: m.id,
                    text,
                    metadata,
                },
                score: m.score,
            });
        }

        debug!("Retrieved {} passages", results.len());
        Ok(results)
    }

    async fn stats(&self) -> Result<IndexStats> {
        let response: StatsResponse = self
            .post("describe_index_stats", &serde_json::json!({}))
            .await?;

        Ok(IndexStats {
            dimension: response.dimension,
            total_vectors: response.total_vector_count,
            namespace_vectors: response
                .namespaces
                .get(&self.namespace)
                .map(|n| n.vector_count)
                .unwrap_or(0),
        })
    }
}

//! HTTP-based embedder using an external inference service

use super::Embedder;
use crate::config::EmbeddingServiceConfig;
use crate::error::{ConceptRagError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Embedder backed by an OpenAI-compatible /v1/embeddings endpoint
pub struct HttpEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingServiceConfig, dimensions: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/v1/embeddings", config.url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            dimensions,
        })
    }

    async fn request(&self, input: serde_json::Value) -> Result<EmbeddingResponse> {
        let mut request = self.client.post(&self.url).json(&serde_json::json!({
            "model": self.model,
            "input": input,
        }));
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ConceptRagError::transient(
                "embedding.http",
                format!("service returned {}", response.status()),
            ));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut response = self.request(serde_json::json!(text)).await?;
        let data = response
            .data
            .pop()
            .ok_or_else(|| ConceptRagError::Embedding("empty embedding response".into()))?;
        if data.embedding.len() != self.dimensions {
            return Err(ConceptRagError::Embedding(format!(
                "service returned {} dimensions, expected {}",
                data.embedding.len(),
                self.dimensions
            )));
        }
        Ok(data.embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let response = self.request(serde_json::json!(texts)).await?;
        if response.data.len() != texts.len() {
            return Err(ConceptRagError::Embedding(format!(
                "service returned {} embeddings for {} inputs",
                response.data.len(),
                texts.len()
            )));
        }
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

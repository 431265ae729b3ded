use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use ragchat_core::error::{Error, Result};
use ragchat_core::traits::Embedder;

/// Embeddings from a local Ollama server (`POST /api/embed`).
pub struct OllamaEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    id: String,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Initialization(format!("failed to build Ollama HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/embed", base_url.trim_end_matches('/')),
            model: model.to_string(),
            id: format!("ollama:{model}"),
        })
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_id(&self) -> &str { &self.id }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let body = EmbedRequest { model: &self.model, input: texts };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("failed to call Ollama at {}: {e}", self.endpoint)))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(Error::Embedding(format!("Ollama returned {status}: {text}")));
        }
        let parsed: EmbedResponse = resp
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("failed to parse Ollama embed response: {e}")))?;
        if parsed.embeddings.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "Ollama returned {} embeddings for {} inputs",
                parsed.embeddings.len(),
                texts.len()
            )));
        }
        tracing::debug!(model = %self.model, count = texts.len(), "embedded batch");
        Ok(parsed.embeddings)
    }
}

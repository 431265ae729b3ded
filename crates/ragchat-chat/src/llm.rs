use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use ragchat_core::config::Settings;
use ragchat_core::error::{Error, Result};
use ragchat_core::traits::LanguageModel;

/// Non-streaming completions from a local Ollama server (`POST /api/generate`).
pub struct OllamaLlm {
    client: Client,
    endpoint: String,
    model: String,
    temperature: Option<f32>,
    id: String,
}

impl OllamaLlm {
    pub fn new(base_url: &str, model: &str, temperature: Option<f32>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Initialization(format!("failed to build Ollama HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
            model: model.to_string(),
            temperature,
            id: format!("ollama:{model}"),
        })
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait]
impl LanguageModel for OllamaLlm {
    fn model_id(&self) -> &str { &self.id }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: self.temperature.map(|temperature| GenerateOptions { temperature }),
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Model(format!("failed to call Ollama at {}: {e}", self.endpoint)))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(Error::Model(format!("Ollama returned {status}: {text}")));
        }
        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| Error::Model(format!("failed to parse Ollama generate response: {e}")))?;
        tracing::debug!(model = %self.model, chars = parsed.response.chars().count(), "completion received");
        Ok(parsed.response)
    }
}

pub fn llm_from_settings(settings: &Settings) -> Result<Arc<dyn LanguageModel>> {
    let ollama = &settings.ollama;
    let llm = OllamaLlm::new(
        &ollama.base_url,
        &ollama.chat_model,
        ollama.temperature,
        Duration::from_secs(ollama.timeout_secs),
    )?;
    tracing::info!(model = %ollama.chat_model, base_url = %ollama.base_url, "using Ollama language model");
    Ok(Arc::new(llm))
}

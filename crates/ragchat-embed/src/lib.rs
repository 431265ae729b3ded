use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use twox_hash::XxHash64;

use ragchat_core::config::{EmbeddingBackend, Settings};
use ragchat_core::traits::Embedder;
use ragchat_core::Result;

mod ollama;

pub use ollama::OllamaEmbedder;

/// Deterministic bag-of-hashes embedder.
///
/// Whitespace tokens and individual characters are hashed into buckets and the
/// result is L2-normalised, so identical texts always map to identical vectors
/// and texts sharing characters (including CJK text without spaces) score
/// above zero. Used offline and in tests.
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1), id: format!("hash:d{}", dim.max(1)) }
    }

    pub fn dim(&self) -> usize { self.dim }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let text = text.to_lowercase();
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let (idx, val) = self.bucket(token);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        for ch in text.chars().filter(|c| !c.is_whitespace()) {
            let (idx, val) = self.bucket(&ch);
            v[idx] += 0.5 * val;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }

    fn bucket<T: Hash + ?Sized>(&self, item: &T) -> (usize, f32) {
        let mut hasher = XxHash64::with_seed(0);
        item.hash(&mut hasher);
        let h = hasher.finish();
        let idx = (h as usize) % self.dim;
        let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
        (idx, val)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_id(&self) -> &str { &self.id }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Build the embedder selected by `embedding.backend`.
///
/// `APP_USE_FAKE_EMBEDDINGS=1` forces the hash embedder regardless of config.
pub fn embedder_from_settings(settings: &Settings) -> Result<Arc<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake || settings.embedding.backend == EmbeddingBackend::Hash {
        tracing::info!(dim = settings.embedding.dim, "using hash embedder");
        return Ok(Arc::new(HashEmbedder::new(settings.embedding.dim)));
    }
    let ollama = &settings.ollama;
    let embedder = OllamaEmbedder::new(
        &ollama.base_url,
        &ollama.embed_model,
        Duration::from_secs(ollama.timeout_secs),
    )?;
    tracing::info!(model = %ollama.embed_model, base_url = %ollama.base_url, "using Ollama embedder");
    Ok(Arc::new(embedder))
}

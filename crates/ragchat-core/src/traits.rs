use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::Fragment;

/// Turns text into fixed-dimensionality vectors.
///
/// Implementations must be deterministic for a given model configuration.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `ollama:mxbai-embed-large`).
    fn model_id(&self) -> &str;

    /// Embed a batch of corpus texts, one vector per input, in input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_documents(&[text.to_string()]).await?;
        if vectors.len() != 1 {
            return Err(Error::Embedding(format!(
                "embedder returned {} vectors for a single query",
                vectors.len()
            )));
        }
        Ok(vectors.remove(0))
    }
}

/// Completes a rendered prompt into answer text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_id(&self) -> &str;
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Supplies the already-chunked corpus at startup.
pub trait DocumentSource: Send + Sync {
    fn load(&self) -> Result<Vec<Fragment>>;
}

use indicatif::{ProgressBar, ProgressStyle};

use ragchat_core::error::{Error, Result};
use ragchat_core::traits::Embedder;
use ragchat_core::types::Fragment;

use crate::index::VectorIndex;

/// Embed `fragments` in batches and append them to `index` in corpus order.
///
/// Returns the number of fragments inserted.
pub async fn ingest(
    index: &mut VectorIndex,
    fragments: Vec<Fragment>,
    embedder: &dyn Embedder,
    batch_size: usize,
    show_progress: bool,
) -> Result<usize> {
    if fragments.is_empty() {
        tracing::warn!("no fragments to index");
        return Ok(0);
    }
    let batch_size = batch_size.max(1);
    tracing::info!(fragments = fragments.len(), model = embedder.model_id(), "indexing fragments");

    let pb = if show_progress { ProgressBar::new(fragments.len() as u64) } else { ProgressBar::hidden() };
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} fragments ({percent}%) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let mut processed = 0usize;
    let mut pending = fragments.into_iter().peekable();
    while pending.peek().is_some() {
        let batch: Vec<Fragment> = pending.by_ref().take(batch_size).collect();
        let texts: Vec<String> = batch.iter().map(|f| f.content.clone()).collect();
        let vectors = embedder.embed_documents(&texts).await?;
        if vectors.len() != batch.len() {
            return Err(Error::Embedding(format!(
                "embedder returned {} vectors for {} fragments",
                vectors.len(),
                batch.len()
            )));
        }
        for (fragment, vector) in batch.into_iter().zip(vectors) {
            index.insert(fragment, vector)?;
            processed += 1;
        }
        pb.set_position(processed as u64);
        pb.set_message(format!("batch of {}", texts.len()));
    }
    pb.finish_with_message("✅ indexing completed");
    tracing::info!(indexed = processed, dim = ?index.dim(), "vector index ready");
    Ok(processed)
}

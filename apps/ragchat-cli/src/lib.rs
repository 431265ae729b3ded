//! Flags and startup helpers shared by the `ragchat` binaries.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, ValueEnum};
use tracing_subscriber::EnvFilter;

use ragchat_core::config::{ChatVariant, Config, EmbeddingBackend, SearchType, Settings};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SearchArg {
    Similarity,
    Mmr,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum VariantArg {
    Enhanced,
    Baseline,
}

/// Overrides applied on top of `config.toml` and `APP_*` variables.
#[derive(Debug, Args)]
pub struct CommonArgs {
    /// Extra TOML file merged after config.toml
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Corpus file or directory of .txt files
    #[arg(long)]
    pub data: Option<String>,

    /// Number of fragments to retrieve
    #[arg(long, short = 'k')]
    pub k: Option<usize>,

    /// Retrieval strategy
    #[arg(long, value_enum)]
    pub search_type: Option<SearchArg>,

    /// MMR candidate pool size
    #[arg(long)]
    pub fetch_k: Option<usize>,

    /// MMR relevance/diversity balance in [0, 1]
    #[arg(long)]
    pub lambda: Option<f32>,

    /// Drop fragments scoring below this cosine similarity
    #[arg(long)]
    pub score_threshold: Option<f32>,

    /// Prompt variant
    #[arg(long, value_enum)]
    pub variant: Option<VariantArg>,

    /// Ollama base URL
    #[arg(long)]
    pub ollama_url: Option<String>,

    /// Ollama model used for answers
    #[arg(long)]
    pub chat_model: Option<String>,

    /// Ollama model used for embeddings
    #[arg(long)]
    pub embed_model: Option<String>,

    /// Use the offline hash embedder instead of Ollama
    #[arg(long, default_value_t = false)]
    pub hash_embeddings: bool,

    /// Hide the indexing progress bar
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

impl CommonArgs {
    /// Layered configuration with these flags applied on top.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let config = Config::load_with(self.config.as_deref()).context("failed to load configuration")?;
        self.apply(config.settings()?)
    }

    /// Apply the flags that were given to `settings`, then validate the result.
    pub fn apply(&self, mut settings: Settings) -> anyhow::Result<Settings> {
        if let Some(data) = &self.data {
            settings.data.source = data.clone();
        }
        let retriever = &mut settings.retriever;
        if let Some(k) = self.k {
            retriever.k = k;
        }
        if let Some(search) = self.search_type {
            retriever.search_type = match search {
                SearchArg::Similarity => SearchType::Similarity,
                SearchArg::Mmr => SearchType::Mmr,
            };
        }
        if let Some(fetch_k) = self.fetch_k {
            retriever.fetch_k = fetch_k;
        }
        if let Some(lambda) = self.lambda {
            retriever.lambda = lambda;
        }
        if self.score_threshold.is_some() {
            retriever.score_threshold = self.score_threshold;
        }
        if let Some(variant) = self.variant {
            settings.chat.variant = match variant {
                VariantArg::Enhanced => ChatVariant::Enhanced,
                VariantArg::Baseline => ChatVariant::Baseline,
            };
        }
        if let Some(url) = &self.ollama_url {
            settings.ollama.base_url = url.clone();
        }
        if let Some(model) = &self.chat_model {
            settings.ollama.chat_model = model.clone();
        }
        if let Some(model) = &self.embed_model {
            settings.ollama.embed_model = model.clone();
        }
        if self.hash_embeddings {
            settings.embedding.backend = EmbeddingBackend::Hash;
        }
        settings.validate()?;
        Ok(settings)
    }
}

/// Log to stderr; `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

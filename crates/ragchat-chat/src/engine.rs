use std::path::Path;
use std::sync::Arc;

use ragchat_core::config::{resolve_with_base, ChatVariant, Settings};
use ragchat_core::error::{Error, Result};
use ragchat_core::source::TextSource;
use ragchat_core::splitter::CharacterSplitter;
use ragchat_core::traits::{DocumentSource, Embedder, LanguageModel};
use ragchat_embed::embedder_from_settings;
use ragchat_vector::{ingest, Retriever, RetrieverConfig, VectorIndex};

use crate::llm::llm_from_settings;
use crate::pipeline::AnswerPipeline;
use crate::prompt::PromptTemplate;

/// Facts about the loaded engine shown by `/status`.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStatus {
    pub fragments: usize,
    pub dim: Option<usize>,
    pub embed_model: String,
    pub chat_model: String,
    pub variant: ChatVariant,
}

/// The initialized corpus index plus the answer pipeline built over it.
pub struct Engine {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
    pipeline: AnswerPipeline,
    status: EngineStatus,
}

impl Engine {
    /// Load the configured corpus, embed it and wire up the Ollama collaborators.
    ///
    /// Relative `data.source` paths resolve against `base_dir`.
    pub async fn bootstrap(settings: &Settings, base_dir: &Path, show_progress: bool) -> Result<Self> {
        let data = &settings.data;
        let splitter = CharacterSplitter::new(data.chunk_size, data.chunk_overlap, data.separator.clone())?;
        let source = TextSource::new(resolve_with_base(base_dir, &data.source), splitter);
        let embedder = embedder_from_settings(settings).map_err(|e| init_failure("embedder setup", e))?;
        let llm = llm_from_settings(settings).map_err(|e| init_failure("language model setup", e))?;
        Self::build(&source, embedder, llm, settings, show_progress).await
    }

    /// Build from explicit collaborators.
    pub async fn build(
        source: &dyn DocumentSource,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LanguageModel>,
        settings: &Settings,
        show_progress: bool,
    ) -> Result<Self> {
        let retriever_config = RetrieverConfig::try_from(&settings.retriever)?;

        let fragments = source.load().map_err(|e| init_failure("document loading", e))?;
        if fragments.is_empty() {
            return Err(Error::Initialization("the document source produced no fragments".into()));
        }
        tracing::info!(fragments = fragments.len(), "documents loaded");

        let mut index = VectorIndex::new();
        ingest(&mut index, fragments, embedder.as_ref(), settings.embedding.batch_size, show_progress)
            .await
            .map_err(|e| init_failure("corpus ingestion", e))?;
        let index = Arc::new(index);

        let status = EngineStatus {
            fragments: index.len(),
            dim: index.dim(),
            embed_model: embedder.model_id().to_string(),
            chat_model: llm.model_id().to_string(),
            variant: settings.chat.variant,
        };
        let retriever = Retriever::new(index.clone(), embedder.clone(), retriever_config)?;
        let pipeline = AnswerPipeline::new(
            retriever,
            llm,
            PromptTemplate::from_settings(&settings.chat),
            settings.chat.history_turns(),
        );
        Ok(Self { index, embedder, pipeline, status })
    }

    pub fn pipeline(&self) -> &AnswerPipeline { &self.pipeline }
    pub fn status(&self) -> &EngineStatus { &self.status }
    pub fn index(&self) -> &VectorIndex { &self.index }

    /// Another retriever over the same index and embedder.
    pub fn retriever_with(&self, config: RetrieverConfig) -> Result<Retriever> {
        Retriever::new(self.index.clone(), self.embedder.clone(), config)
    }
}

fn init_failure(stage: &str, err: Error) -> Error {
    match err {
        Error::Initialization(_) | Error::InvalidConfig(_) => err,
        other => Error::Initialization(format!("{stage}: {other}")),
    }
}

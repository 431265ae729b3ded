//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nesting, e.g. `APP_OLLAMA__CHAT_MODEL`). Provides helpers to
//! expand `~` and `${VAR}` and to resolve relative paths against a known base
//! directory.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    /// Load `config.toml`, the `RUST_ENV`-specific overlay and `APP_*` env vars
    /// from the current directory.
    pub fn load() -> Result<Self> {
        Self::load_with(None)
    }

    /// Like [`Config::load`], with an extra TOML file merged after the env overlay
    /// and before environment variables.
    pub fn load_with(extra: Option<&Path>) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        if let Some(path) = extra {
            if !path.exists() {
                return Err(Error::NotFound(format!("config file {}", path.display())));
            }
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?.validate()?;
        Ok(config)
    }

    /// Build a config from an inline TOML document (no files, no env).
    pub fn from_toml_str(toml: &str) -> Self {
        Self { figment: Figment::new().merge(Toml::string(toml)) }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    /// The full typed settings tree, with defaults for anything not configured.
    pub fn settings(&self) -> Result<Settings> {
        self.figment
            .extract::<Settings>()
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ollama: OllamaSettings,
    pub embedding: EmbeddingSettings,
    pub data: DataSettings,
    pub retriever: RetrieverSettings,
    pub chat: ChatSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.data.chunk_size == 0 {
            return Err(Error::InvalidConfig("data.chunk_size must be positive".into()));
        }
        if self.data.chunk_overlap > self.data.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "data.chunk_overlap ({}) is larger than data.chunk_size ({})",
                self.data.chunk_overlap, self.data.chunk_size
            )));
        }
        if self.embedding.dim == 0 || self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig(
                "embedding.dim and embedding.batch_size must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaSettings {
    pub base_url: String,
    pub embed_model: String,
    pub chat_model: String,
    pub temperature: Option<f32>,
    pub timeout_secs: u64,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            embed_model: "mxbai-embed-large".to_string(),
            chat_model: "llama3".to_string(),
            temperature: None,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    Ollama,
    /// Deterministic hashing embedder; offline, for tests and demos.
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    pub dim: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { backend: EmbeddingBackend::Ollama, dim: 1024, batch_size: 32 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub source: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub separator: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            source: "data/txt".to_string(),
            chunk_size: 500,
            chunk_overlap: 50,
            separator: "\n\n".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Similarity,
    Mmr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverSettings {
    pub k: usize,
    pub search_type: SearchType,
    pub fetch_k: usize,
    pub lambda: f32,
    pub score_threshold: Option<f32>,
    /// Exact-match metadata filter; every pair must match.
    pub filter: Option<BTreeMap<String, String>>,
}

impl Default for RetrieverSettings {
    fn default() -> Self {
        Self {
            k: 3,
            search_type: SearchType::Similarity,
            fetch_k: 20,
            lambda: 0.5,
            score_threshold: None,
            filter: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatVariant {
    Baseline,
    Enhanced,
}

impl ChatVariant {
    pub fn default_history_turns(self) -> usize {
        match self {
            ChatVariant::Baseline => 5,
            ChatVariant::Enhanced => 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub variant: ChatVariant,
    pub history_turns: Option<usize>,
    pub language: String,
    pub signature: String,
}

impl ChatSettings {
    pub fn history_turns(&self) -> usize {
        self.history_turns.unwrap_or_else(|| self.variant.default_history_turns())
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            variant: ChatVariant::Enhanced,
            history_turns: None,
            language: "Chinese".to_string(),
            signature: "--- 喵".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "warn".to_string() }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

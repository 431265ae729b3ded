use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Corpus ingestion or collaborator setup failed before the session started.
    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Language model failed: {0}")]
    Model(String),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Collaborator failures that end a single turn but not the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Embedding(_) | Error::Model(_) | Error::DimensionMismatch { .. })
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

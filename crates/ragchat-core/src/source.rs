use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;

use crate::error::{Error, Result};
use crate::splitter::CharacterSplitter;
use crate::traits::DocumentSource;
use crate::types::{Fragment, Metadata};

/// Loads `.txt` files (a single file or a directory tree) and splits them
/// into fragments.
pub struct TextSource {
    root: PathBuf,
    splitter: CharacterSplitter,
}

impl TextSource {
    pub fn new(root: impl Into<PathBuf>, splitter: CharacterSplitter) -> Self {
        Self { root: root.into(), splitter }
    }

    fn split_file(&self, file_path: &Path) -> Result<Vec<Fragment>> {
        let content = read_file_content(file_path)?;
        let chunks = self.splitter.split(&content);
        let total = chunks.len();
        let fragments = chunks
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| {
                let mut metadata = Metadata::new();
                metadata.insert("source".into(), json!(file_path.to_string_lossy()));
                metadata.insert("chunk".into(), json!(index));
                metadata.insert("chunks".into(), json!(total));
                Fragment::with_metadata(chunk, metadata)
            })
            .collect();
        Ok(fragments)
    }
}

impl DocumentSource for TextSource {
    fn load(&self) -> Result<Vec<Fragment>> {
        if !self.root.exists() {
            return Err(Error::NotFound(format!("document source {}", self.root.display())));
        }
        let files = if self.root.is_file() { vec![self.root.clone()] } else { list_txt_files(&self.root) };
        if files.is_empty() {
            tracing::warn!(root = %self.root.display(), "no .txt files found");
            return Ok(vec![]);
        }
        let mut fragments = Vec::new();
        for (file_index, file_path) in files.iter().enumerate() {
            tracing::debug!(file = %file_path.display(), "processing file {}/{}", file_index + 1, files.len());
            fragments.extend(self.split_file(file_path)?);
        }
        tracing::info!(files = files.len(), fragments = fragments.len(), "loaded document fragments");
        Ok(fragments)
    }
}

/// A fixed, already-chunked list of texts sharing one metadata map.
pub struct InlineSource {
    texts: Vec<String>,
    metadata: Metadata,
}

impl InlineSource {
    pub fn new<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { texts: texts.into_iter().map(Into::into).collect(), metadata: Metadata::new() }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl DocumentSource for InlineSource {
    fn load(&self) -> Result<Vec<Fragment>> {
        Ok(self
            .texts
            .iter()
            .map(|t| Fragment::with_metadata(t.clone(), self.metadata.clone()))
            .collect())
    }
}

fn read_file_content(file_path: &Path) -> Result<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => Ok(content),
        Err(_) => {
            let bytes = fs::read(file_path).map_err(|e| Error::io(file_path, e))?;
            Ok(String::from_utf8_lossy(&bytes).to_string())
        }
    }
}

fn list_txt_files(root: &Path) -> Vec<PathBuf> {
    let mut txt_files = Vec::new();
    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("txt") { txt_files.push(path.to_path_buf()); }
    }
    txt_files.sort();
    txt_files
}

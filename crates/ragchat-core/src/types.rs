//! Domain types shared by the index, the retriever and the conversation layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Free-form fragment metadata (`source`, `chunk`, ...).
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// An atomic unit of source text, the unit over which retrieval operates.
///
/// Fragments are immutable once created; the index owns them and hands
/// out clones to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Fragment {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), metadata: Metadata::new() }
    }

    pub fn with_metadata(content: impl Into<String>, metadata: Metadata) -> Self {
        Self { content: content.into(), metadata }
    }

    /// Metadata value rendered as plain text; strings are returned unquoted.
    pub fn meta_str(&self, key: &str) -> Option<String> {
        self.metadata.get(key).map(value_to_text)
    }
}

pub(crate) fn value_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// True when every `(key, value)` pair of `filter` is present in `metadata`.
///
/// Values are compared by their text form so `chunk = "2"` in a config file
/// matches a numeric `2` stored on the fragment.
pub fn metadata_matches(metadata: &Metadata, filter: &BTreeMap<String, String>) -> bool {
    filter.iter().all(|(key, expected)| {
        metadata.get(key).map(|v| value_to_text(v) == *expected).unwrap_or(false)
    })
}

/// One question/answer exchange. Created only after the answer pipeline
/// succeeded; never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationTurn {
    pub turn_number: u64,
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(turn_number: u64, question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            turn_number,
            question: question.into(),
            answer: answer.into(),
            timestamp: Utc::now(),
        }
    }
}

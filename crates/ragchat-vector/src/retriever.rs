//! Configured view over a [`VectorIndex`]: query text in, ordered fragments out.
//!
//! Two strategies are supported:
//! - `Similarity`: top-`k` by cosine score, then the optional score threshold
//!   and metadata filter are applied, keeping relative order.
//! - `Mmr`: a pool of `fetch_k` candidates is pruned by the same threshold and
//!   filter, then `k` items are picked greedily by maximal marginal relevance.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ragchat_core::config::{RetrieverSettings, SearchType};
use ragchat_core::error::{Error, Result};
use ragchat_core::traits::Embedder;
use ragchat_core::types::{metadata_matches, Fragment, Metadata};

use crate::index::{ScoredEntry, VectorIndex};

pub type MetadataPredicate = Arc<dyn Fn(&Metadata) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchStrategy {
    Similarity,
    Mmr { fetch_k: usize, lambda: f32 },
}

#[derive(Clone)]
pub struct RetrieverConfig {
    pub k: usize,
    pub strategy: SearchStrategy,
    pub score_threshold: Option<f32>,
    pub filter: Option<MetadataPredicate>,
}

impl fmt::Debug for RetrieverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrieverConfig")
            .field("k", &self.k)
            .field("strategy", &self.strategy)
            .field("score_threshold", &self.score_threshold)
            .field("filter", &self.filter.as_ref().map(|_| "<predicate>"))
            .finish()
    }
}

impl RetrieverConfig {
    pub fn similarity(k: usize) -> Self {
        Self { k, strategy: SearchStrategy::Similarity, score_threshold: None, filter: None }
    }

    pub fn mmr(k: usize, fetch_k: usize, lambda: f32) -> Self {
        Self { k, strategy: SearchStrategy::Mmr { fetch_k, lambda }, score_threshold: None, filter: None }
    }

    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = Some(threshold);
        self
    }

    pub fn with_filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Metadata) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(predicate));
        self
    }

    /// Keep only fragments whose metadata matches every `(key, value)` pair.
    pub fn with_metadata_filter(self, filter: BTreeMap<String, String>) -> Self {
        self.with_filter(move |meta| metadata_matches(meta, &filter))
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(Error::InvalidConfig("retriever k must be positive".into()));
        }
        if let SearchStrategy::Mmr { fetch_k, lambda } = self.strategy {
            if fetch_k < self.k {
                return Err(Error::InvalidConfig(format!(
                    "retriever fetch_k ({fetch_k}) must be at least k ({})",
                    self.k
                )));
            }
            if !(0.0..=1.0).contains(&lambda) {
                return Err(Error::InvalidConfig(format!("retriever lambda {lambda} is outside [0, 1]")));
            }
        }
        if let Some(threshold) = self.score_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(Error::InvalidConfig(format!(
                    "retriever score_threshold {threshold} is outside [0, 1]"
                )));
            }
        }
        Ok(())
    }

    fn admits(&self, scored: &ScoredEntry<'_>) -> bool {
        if let Some(threshold) = self.score_threshold {
            if scored.score < threshold {
                return false;
            }
        }
        match &self.filter {
            Some(predicate) => predicate(&scored.entry.fragment().metadata),
            None => true,
        }
    }
}

impl TryFrom<&RetrieverSettings> for RetrieverConfig {
    type Error = Error;

    fn try_from(settings: &RetrieverSettings) -> Result<Self> {
        let mut config = match settings.search_type {
            SearchType::Similarity => Self::similarity(settings.k),
            SearchType::Mmr => Self::mmr(settings.k, settings.fetch_k, settings.lambda),
        };
        config.score_threshold = settings.score_threshold;
        if let Some(filter) = settings.filter.clone() {
            config = config.with_metadata_filter(filter);
        }
        config.validate()?;
        Ok(config)
    }
}

/// A retrieved fragment with its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedFragment {
    pub fragment: Fragment,
    pub score: f32,
}

pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
    config: RetrieverConfig,
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<dyn Embedder>, config: RetrieverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { index, embedder, config })
    }

    pub fn config(&self) -> &RetrieverConfig { &self.config }
    pub fn index(&self) -> &VectorIndex { &self.index }

    /// Fragments for `query`, most relevant (or most diverse-relevant) first.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Fragment>> {
        Ok(self.retrieve_scored(query).await?.into_iter().map(|r| r.fragment).collect())
    }

    pub async fn retrieve_scored(&self, query: &str) -> Result<Vec<RetrievedFragment>> {
        let query_vector = self.embedder.embed_query(query).await?;
        let selected = self.select(&query_vector)?;
        tracing::debug!(
            strategy = ?self.config.strategy,
            k = self.config.k,
            returned = selected.len(),
            "retrieved fragments"
        );
        Ok(selected)
    }

    /// The selection step on an already-embedded query.
    pub fn select(&self, query_vector: &[f32]) -> Result<Vec<RetrievedFragment>> {
        let picked: Vec<ScoredEntry<'_>> = match self.config.strategy {
            SearchStrategy::Similarity => self
                .index
                .search(query_vector, self.config.k)?
                .into_iter()
                .filter(|s| self.config.admits(s))
                .collect(),
            SearchStrategy::Mmr { fetch_k, lambda } => {
                let pool: Vec<ScoredEntry<'_>> = self
                    .index
                    .search(query_vector, fetch_k)?
                    .into_iter()
                    .filter(|s| self.config.admits(s))
                    .collect();
                mmr_select(&pool, self.config.k, lambda).into_iter().map(|i| pool[i]).collect()
            }
        };
        Ok(picked
            .into_iter()
            .map(|s| RetrievedFragment { fragment: s.entry.fragment().clone(), score: s.score })
            .collect())
    }
}

/// Greedy maximal-marginal-relevance selection over a similarity-ranked pool.
///
/// Returns indices into `candidates` in selection order. Each step picks the
/// unselected candidate maximising
/// `lambda * sim(c, query) - (1 - lambda) * max(sim(c, s) for s in selected)`,
/// with the redundancy term 0 before anything is selected. Ties go to the
/// earlier (higher-ranked) candidate.
pub fn mmr_select(candidates: &[ScoredEntry<'_>], k: usize, lambda: f32) -> Vec<usize> {
    let mut selected: Vec<usize> = Vec::with_capacity(k.min(candidates.len()));
    let mut remaining: Vec<usize> = (0..candidates.len()).collect();
    // Highest similarity of each candidate to anything selected so far.
    let mut redundancy = vec![f32::NEG_INFINITY; candidates.len()];

    while selected.len() < k && !remaining.is_empty() {
        let mut best: Option<(usize, f32)> = None;
        for (pos, &i) in remaining.iter().enumerate() {
            let penalty = if selected.is_empty() { 0.0 } else { redundancy[i] };
            let score = lambda * candidates[i].score - (1.0 - lambda) * penalty;
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((pos, score));
            }
        }
        let Some((pos, _)) = best else { break };
        let chosen = remaining.remove(pos);
        selected.push(chosen);
        for &i in &remaining {
            let sim = candidates[i].entry.similarity(candidates[chosen].entry);
            if sim > redundancy[i] {
                redundancy[i] = sim;
            }
        }
    }
    selected
}

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use ragchat_core::config::{RetrieverSettings, SearchType};
use ragchat_core::error::Error;
use ragchat_core::traits::Embedder;
use ragchat_core::types::{Fragment, Metadata};
use ragchat_vector::{mmr_select, Retriever, RetrieverConfig, VectorIndex};

/// Maps known texts to fixed vectors so scores are predictable.
struct TableEmbedder {
    table: HashMap<String, Vec<f32>>,
}

impl TableEmbedder {
    fn new(rows: &[(&str, Vec<f32>)]) -> Self {
        Self { table: rows.iter().map(|(k, v)| (k.to_string(), v.clone())).collect() }
    }
}

#[async_trait]
impl Embedder for TableEmbedder {
    fn model_id(&self) -> &str { "table" }

    async fn embed_documents(&self, texts: &[String]) -> ragchat_core::Result<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|t| {
                self.table
                    .get(t)
                    .cloned()
                    .ok_or_else(|| Error::Embedding(format!("no vector for {t}")))
            })
            .collect()
    }
}

struct DownEmbedder;

#[async_trait]
impl Embedder for DownEmbedder {
    fn model_id(&self) -> &str { "down" }

    async fn embed_documents(&self, _texts: &[String]) -> ragchat_core::Result<Vec<Vec<f32>>> {
        Err(Error::Embedding("connection refused".into()))
    }
}

fn sourced(content: &str, source: &str) -> Fragment {
    let mut meta = Metadata::new();
    meta.insert("source".into(), serde_json::json!(source));
    Fragment::with_metadata(content, meta)
}

fn index_of(rows: &[(Fragment, Vec<f32>)]) -> Arc<VectorIndex> {
    let mut index = VectorIndex::new();
    for (fragment, vector) in rows {
        index.insert(fragment.clone(), vector.clone()).unwrap();
    }
    Arc::new(index)
}

fn contents(fragments: &[Fragment]) -> Vec<&str> {
    fragments.iter().map(|f| f.content.as_str()).collect()
}

#[test]
fn equal_scores_keep_insertion_order() {
    let index = index_of(&[
        (Fragment::new("first"), vec![1.0, 0.0]),
        (Fragment::new("orthogonal"), vec![0.0, 1.0]),
        (Fragment::new("second"), vec![1.0, 0.0]),
        (Fragment::new("third"), vec![1.0, 0.0]),
    ]);
    let hits = index.search(&[1.0, 0.0], 3).unwrap();
    let names: Vec<&str> = hits.iter().map(|h| h.entry.fragment().content.as_str()).collect();
    assert_eq!(names, vec!["first", "second", "third"]);
}

#[test]
fn signed_zero_scores_are_still_ties() {
    let index = index_of(&[
        (Fragment::new("inserted first"), vec![0.0, -1.0]),
        (Fragment::new("inserted second"), vec![0.0, 1.0]),
    ]);
    let hits = index.search(&[-1.0, 0.0], 2).unwrap();
    let names: Vec<&str> = hits.iter().map(|h| h.entry.fragment().content.as_str()).collect();
    assert_eq!(names, vec!["inserted first", "inserted second"]);
    assert!(hits.iter().all(|h| h.score == 0.0 && h.score.is_sign_positive()));
}

#[test]
fn asking_for_more_than_stored_returns_everything() {
    let index = index_of(&[
        (Fragment::new("a"), vec![1.0, 0.0]),
        (Fragment::new("b"), vec![0.0, 1.0]),
    ]);
    let hits = index.search(&[0.0, 1.0], 10).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].entry.fragment().content, "b");
    assert!(hits[0].score >= hits[1].score);
}

#[test]
fn dimension_mismatch_is_rejected() {
    let mut index = VectorIndex::new();
    index.insert(Fragment::new("a"), vec![1.0, 0.0]).unwrap();
    let err = index.insert(Fragment::new("b"), vec![1.0, 0.0, 0.0]).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 3 }));
    let err = index.search(&[1.0], 1).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 1 }));
    assert_eq!(index.len(), 1);
}

#[tokio::test]
async fn similarity_returns_top_k_by_score() -> anyhow::Result<()> {
    let index = index_of(&[
        (Fragment::new("far"), vec![0.0, 1.0]),
        (Fragment::new("near"), vec![0.6, 0.8]),
        (Fragment::new("exact"), vec![1.0, 0.0]),
    ]);
    let embedder = Arc::new(TableEmbedder::new(&[("q", vec![1.0, 0.0])]));
    let retriever = Retriever::new(index, embedder, RetrieverConfig::similarity(2))?;
    let got = retriever.retrieve("q").await?;
    assert_eq!(contents(&got), vec!["exact", "near"]);
    Ok(())
}

#[tokio::test]
async fn threshold_never_returns_weaker_fragments() -> anyhow::Result<()> {
    let index = index_of(&[
        (Fragment::new("exact"), vec![1.0, 0.0]),
        (Fragment::new("near"), vec![0.6, 0.8]),
        (Fragment::new("far"), vec![0.0, 1.0]),
    ]);
    let embedder = Arc::new(TableEmbedder::new(&[("q", vec![1.0, 0.0])]));
    let config = RetrieverConfig::similarity(3).with_score_threshold(0.7);
    let retriever = Retriever::new(index, embedder, config)?;
    let scored = retriever.retrieve_scored("q").await?;
    assert_eq!(scored.len(), 1);
    assert_eq!(scored[0].fragment.content, "exact");
    assert!(scored.iter().all(|r| r.score >= 0.7));
    Ok(())
}

#[tokio::test]
async fn threshold_above_every_score_yields_nothing() -> anyhow::Result<()> {
    let index = index_of(&[(Fragment::new("far"), vec![0.0, 1.0])]);
    let embedder = Arc::new(TableEmbedder::new(&[("q", vec![1.0, 0.0])]));
    let config = RetrieverConfig::similarity(3).with_score_threshold(0.5);
    let retriever = Retriever::new(index, embedder, config)?;
    assert!(retriever.retrieve("q").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn metadata_filter_drops_non_matching_fragments() -> anyhow::Result<()> {
    let index = index_of(&[
        (sourced("blog post", "blog.txt"), vec![1.0, 0.0]),
        (sourced("profile", "profile.txt"), vec![0.9, 0.1]),
        (sourced("travel", "profile.txt"), vec![0.5, 0.5]),
    ]);
    let embedder = Arc::new(TableEmbedder::new(&[("q", vec![1.0, 0.0])]));
    let mut filter = BTreeMap::new();
    filter.insert("source".to_string(), "profile.txt".to_string());
    let config = RetrieverConfig::similarity(3).with_metadata_filter(filter);
    let retriever = Retriever::new(index, embedder, config)?;
    let got = retriever.retrieve("q").await?;
    assert_eq!(contents(&got), vec!["profile", "travel"]);
    Ok(())
}

#[tokio::test]
async fn mmr_with_lambda_one_matches_similarity() -> anyhow::Result<()> {
    let rows = vec![
        (Fragment::new("a"), vec![1.0, 0.0, 0.0]),
        (Fragment::new("b"), vec![0.9, 0.1, 0.0]),
        (Fragment::new("c"), vec![0.0, 1.0, 0.0]),
        (Fragment::new("d"), vec![0.7, 0.0, 0.7]),
        (Fragment::new("e"), vec![0.0, 0.0, 1.0]),
    ];
    let embedder: Arc<dyn Embedder> = Arc::new(TableEmbedder::new(&[("q", vec![1.0, 0.0, 0.0])]));
    let mmr = Retriever::new(index_of(&rows), embedder.clone(), RetrieverConfig::mmr(2, 4, 1.0))?;
    let sim = Retriever::new(index_of(&rows), embedder, RetrieverConfig::similarity(2))?;
    assert_eq!(mmr.retrieve("q").await?, sim.retrieve("q").await?);
    Ok(())
}

#[tokio::test]
async fn mmr_prefers_diverse_fragment_at_low_lambda() -> anyhow::Result<()> {
    let index = index_of(&[
        (Fragment::new("original"), vec![1.0, 0.0, 0.0]),
        (Fragment::new("near duplicate"), vec![0.99, 0.1, 0.0]),
        (Fragment::new("different angle"), vec![0.7, 0.0, 0.714]),
    ]);
    let embedder = Arc::new(TableEmbedder::new(&[("q", vec![1.0, 0.0, 0.0])]));
    let retriever = Retriever::new(index, embedder, RetrieverConfig::mmr(2, 3, 0.3))?;
    let got = retriever.retrieve("q").await?;
    assert_eq!(contents(&got), vec!["original", "different angle"]);
    Ok(())
}

#[tokio::test]
async fn mmr_returns_at_most_k_distinct_fragments() -> anyhow::Result<()> {
    let index = index_of(&[
        (Fragment::new("a"), vec![1.0, 0.0]),
        (Fragment::new("b"), vec![1.0, 0.0]),
        (Fragment::new("c"), vec![0.0, 1.0]),
    ]);
    let embedder = Arc::new(TableEmbedder::new(&[("q", vec![1.0, 0.0])]));
    let retriever = Retriever::new(index, embedder, RetrieverConfig::mmr(5, 5, 0.5))?;
    let got = retriever.retrieve("q").await?;
    assert_eq!(got.len(), 3);
    let mut names = contents(&got);
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 3);
    Ok(())
}

#[tokio::test]
async fn mmr_equal_scores_keep_insertion_order() -> anyhow::Result<()> {
    let rows = vec![
        (Fragment::new("first"), vec![1.0, 0.0, 0.0]),
        (Fragment::new("second"), vec![1.0, 0.0, 0.0]),
        (Fragment::new("third"), vec![1.0, 0.0, 0.0]),
    ];
    let embedder: Arc<dyn Embedder> = Arc::new(TableEmbedder::new(&[("q", vec![1.0, 0.0, 0.0])]));
    for lambda in [1.0, 0.5] {
        let retriever = Retriever::new(index_of(&rows), embedder.clone(), RetrieverConfig::mmr(3, 3, lambda))?;
        let got = retriever.retrieve("q").await?;
        assert_eq!(contents(&got), vec!["first", "second", "third"], "lambda {lambda}");
    }
    Ok(())
}

#[test]
fn mmr_select_breaks_marginal_ties_by_rank() {
    // After "top" is picked, "left" and "right" are equally relevant and equally
    // redundant, so the higher-ranked one must come next.
    let index = index_of(&[
        (Fragment::new("top"), vec![1.0, 0.0, 0.0]),
        (Fragment::new("left"), vec![0.6, 0.8, 0.0]),
        (Fragment::new("right"), vec![0.6, 0.0, 0.8]),
    ]);
    let pool = index.search(&[1.0, 0.0, 0.0], 3).unwrap();
    let ranked: Vec<&str> = pool.iter().map(|h| h.entry.fragment().content.as_str()).collect();
    assert_eq!(ranked, vec!["top", "left", "right"]);
    assert_eq!(pool[1].score, pool[2].score);
    assert_eq!(mmr_select(&pool, 3, 0.5), vec![0, 1, 2]);
}

#[test]
fn mmr_select_on_empty_pool_is_empty() {
    assert!(mmr_select(&[], 3, 0.5).is_empty());
}

#[tokio::test]
async fn embedding_failure_propagates() {
    let index = index_of(&[(Fragment::new("a"), vec![1.0, 0.0])]);
    let retriever = Retriever::new(index, Arc::new(DownEmbedder), RetrieverConfig::similarity(1)).unwrap();
    let err = retriever.retrieve("q").await.unwrap_err();
    assert!(matches!(err, Error::Embedding(_)));
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn query_with_wrong_dimension_is_an_error() {
    let index = index_of(&[(Fragment::new("a"), vec![1.0, 0.0])]);
    let embedder = Arc::new(TableEmbedder::new(&[("q", vec![1.0, 0.0, 0.0])]));
    let retriever = Retriever::new(index, embedder, RetrieverConfig::similarity(1)).unwrap();
    let err = retriever.retrieve("q").await.unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { .. }));
}

#[test]
fn invalid_configs_are_rejected() {
    assert!(RetrieverConfig::similarity(0).validate().is_err());
    assert!(RetrieverConfig::mmr(4, 2, 0.5).validate().is_err());
    assert!(RetrieverConfig::mmr(2, 4, 1.5).validate().is_err());
    assert!(RetrieverConfig::similarity(3).with_score_threshold(1.2).validate().is_err());
    assert!(RetrieverConfig::mmr(2, 4, 0.0).validate().is_ok());
}

#[test]
fn config_from_settings() {
    let settings = RetrieverSettings {
        k: 2,
        search_type: SearchType::Mmr,
        fetch_k: 4,
        lambda: 0.5,
        score_threshold: Some(0.3),
        filter: None,
    };
    let config = RetrieverConfig::try_from(&settings).unwrap();
    assert_eq!(config.k, 2);
    assert_eq!(config.strategy, ragchat_vector::SearchStrategy::Mmr { fetch_k: 4, lambda: 0.5 });
    assert_eq!(config.score_threshold, Some(0.3));

    let bad = RetrieverSettings { k: 0, ..RetrieverSettings::default() };
    assert!(matches!(RetrieverConfig::try_from(&bad), Err(Error::InvalidConfig(_))));
}

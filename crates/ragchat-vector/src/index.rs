use ragchat_core::error::{Error, Result};
use ragchat_core::types::Fragment;

/// A fragment together with its embedding and cached L2 norm.
#[derive(Debug, Clone)]
pub struct EmbeddedFragment {
    fragment: Fragment,
    vector: Vec<f32>,
    norm: f32,
}

impl EmbeddedFragment {
    pub fn new(fragment: Fragment, vector: Vec<f32>) -> Self {
        let norm = l2_norm(&vector);
        Self { fragment, vector, norm }
    }

    pub fn fragment(&self) -> &Fragment { &self.fragment }

    /// Cosine similarity against another stored entry, using both cached norms.
    pub fn similarity(&self, other: &EmbeddedFragment) -> f32 {
        cosine_with_norms(&self.vector, self.norm, &other.vector, other.norm)
    }
}

/// An index entry paired with its similarity to a query.
#[derive(Debug, Clone, Copy)]
pub struct ScoredEntry<'a> {
    pub entry: &'a EmbeddedFragment,
    pub score: f32,
}

/// Insertion-ordered, in-memory store of embedded fragments.
///
/// All vectors share the dimensionality of the first insert.
#[derive(Debug, Default)]
pub struct VectorIndex {
    entries: Vec<EmbeddedFragment>,
    dim: Option<usize>,
}

impl VectorIndex {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
    pub fn dim(&self) -> Option<usize> { self.dim }
    pub fn entries(&self) -> &[EmbeddedFragment] { &self.entries }

    pub fn insert(&mut self, fragment: Fragment, vector: Vec<f32>) -> Result<()> {
        if vector.is_empty() {
            return Err(Error::Embedding("refusing to index an empty vector".into()));
        }
        match self.dim {
            Some(expected) if expected != vector.len() => {
                return Err(Error::DimensionMismatch { expected, actual: vector.len() });
            }
            Some(_) => {}
            None => self.dim = Some(vector.len()),
        }
        self.entries.push(EmbeddedFragment::new(fragment, vector));
        Ok(())
    }

    /// The `n` entries most cosine-similar to `query`, best first.
    ///
    /// Equal scores keep insertion order. Asking for more entries than the
    /// index holds returns all of them.
    pub fn search(&self, query: &[f32], n: usize) -> Result<Vec<ScoredEntry<'_>>> {
        if let Some(expected) = self.dim {
            if expected != query.len() {
                return Err(Error::DimensionMismatch { expected, actual: query.len() });
            }
        }
        let query_norm = l2_norm(query);
        let mut scored: Vec<ScoredEntry<'_>> = self
            .entries
            .iter()
            .map(|entry| ScoredEntry {
                entry,
                score: cosine_with_norms(query, query_norm, &entry.vector, entry.norm),
            })
            .collect();
        // `sort_by` is stable, which gives the insertion-order tie-break.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(n);
        Ok(scored)
    }
}

fn cosine_with_norms(a: &[f32], norm_a: f32, b: &[f32], norm_b: f32) -> f32 {
    if a.len() != b.len() || norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let cos = dot / (norm_a * norm_b);
    // `+ 0.0` folds -0.0 into 0.0 so equal scores also compare equal under `total_cmp`.
    if cos.is_finite() { cos + 0.0 } else { 0.0 }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

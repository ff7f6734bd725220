use std::cmp::Ordering;

use ragbook_core::error::{Error, Result};
use ragbook_core::types::{DocumentChunk, SearchHit};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: DocumentChunk,
    pub embedding: Vec<f32>,
}

/// Brute-force in-memory vector index. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dim: Option<usize>,
}

impl VectorIndex {
    /// All embeddings must share one non-zero dimension.
    pub fn from_entries(entries: Vec<IndexEntry>) -> Result<Self> {
        let dim = entries.first().map(|e| e.embedding.len());
        if let Some(d) = dim {
            if d == 0 {
                return Err(Error::InvalidArgument("embeddings must not be empty".into()));
            }
            if let Some(bad) = entries.iter().find(|e| e.embedding.len() != d) {
                return Err(Error::InvalidArgument(format!(
                    "embedding dimension mismatch for {}: {} != {d}",
                    bad.chunk.id,
                    bad.embedding.len()
                )));
            }
        }
        Ok(Self { entries, dim })
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
    pub fn dim(&self) -> Option<usize> { self.dim }
    pub fn entries(&self) -> &[IndexEntry] { &self.entries }

    /// Top `k` entries by cosine similarity; equal scores keep insertion order.
    pub fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let Some(dim) = self.dim else { return Ok(Vec::new()) };
        if query.len() != dim {
            return Err(Error::InvalidArgument(format!("query dimension {} != index dimension {dim}", query.len())));
        }
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(query, &e.embedding)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, score)| SearchHit { chunk: self.entries[i].chunk.clone(), score })
            .collect())
    }
}

/// Cosine similarity of equal-length vectors; 0.0 when either has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut na, mut nb) = (0f32, 0f32, 0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    let denom = na.sqrt() * nb.sqrt();
    if denom <= f32::EPSILON { 0.0 } else { dot / denom }
}

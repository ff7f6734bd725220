use std::sync::Arc;

use ragbook_core::error::{Error, Result};
use ragbook_core::traits::Embedder;
use ragbook_core::types::SearchHit;
use tracing::debug;

use crate::index::VectorIndex;

/// Embeds a query and returns the nearest chunks from a shared index.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self { index, embedder }
    }

    pub fn index(&self) -> &VectorIndex { &self.index }

    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Err(Error::InvalidArgument("query must not be blank".into()));
        }
        if top_k == 0 {
            return Err(Error::InvalidArgument("top_k must be positive".into()));
        }
        if self.index.is_empty() {
            return Ok(Vec::new());
        }
        let vector = self.embedder.embed(query)?;
        let hits = self.index.similarity_search(&vector, top_k)?;
        debug!(query, top_k, hits = hits.len(), "similarity search");
        Ok(hits)
    }
}

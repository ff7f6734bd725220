//! Embedding providers and tokenizers.
//!
//! `get_default_embedder` picks the implementation from settings; setting
//! `APP_USE_FAKE_EMBEDDINGS=1` forces the deterministic [`FakeEmbedder`]
//! regardless of the configured provider.

use std::sync::Arc;
use std::time::Duration;

use ragbook_core::config::{EmbeddingProvider, EmbeddingSettings};
use ragbook_core::error::Result;
use ragbook_core::traits::Embedder;
use tracing::info;

pub mod openai;
pub mod tokenize;

pub use openai::OpenAiEmbedder;
pub use tokenize::{load_tokenizer, HfTokenizer};

/// Hashed bag-of-words embedder: stable across runs, no network, L2-normalised.
pub struct FakeEmbedder {
    dim: usize,
    id: String,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim, id: format!("fake:xxh64:d{dim}") }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> Option<usize> { Some(self.dim) }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn fake_forced() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if fake_forced() || settings.provider == EmbeddingProvider::Fake {
        info!(dim = settings.fake_dim, "using fake embedder");
        return Ok(Arc::new(FakeEmbedder::new(settings.fake_dim)));
    }
    let embedder = OpenAiEmbedder::new(
        settings.api_key()?,
        settings.base_url.clone(),
        settings.model.clone(),
        settings.dimensions,
        Duration::from_secs(settings.timeout_secs),
        settings.max_retries,
        settings.batch_size,
    )?;
    info!(model = %settings.model, base_url = %settings.base_url, "using OpenAI embeddings");
    Ok(Arc::new(embedder))
}

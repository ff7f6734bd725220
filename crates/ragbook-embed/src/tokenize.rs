use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use ragbook_core::chunker::WhitespaceTokenizer;
use ragbook_core::config::{expand_path, TokenizerKind, TokenizerSettings};
use ragbook_core::error::{Error, Result};
use ragbook_core::traits::Tokenizer;

/// Tokenizer backed by a HuggingFace `tokenizer.json`.
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
}

impl HfTokenizer {
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ResourceNotFound(format!("tokenizer file {}", path.display())));
        }
        let inner = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| Error::InvalidConfig(format!("failed to load tokenizer from {}: {e}", path.display())))?;
        Ok(Self { inner })
    }
}

impl Tokenizer for HfTokenizer {
    fn token_spans(&self, text: &str) -> Result<Vec<Range<usize>>> {
        let enc = self
            .inner
            .encode(text, false)
            .map_err(|e| Error::Operation(format!("tokenization failed: {e}")))?;
        Ok(normalize_spans(text, enc.get_offsets().iter().map(|&(s, e)| s..e)))
    }
}

/// Snaps offsets to char boundaries, drops empty spans and merges overlaps so
/// spans are ordered and disjoint.
fn normalize_spans(text: &str, offsets: impl Iterator<Item = Range<usize>>) -> Vec<Range<usize>> {
    let mut spans: Vec<Range<usize>> = Vec::new();
    for r in offsets {
        let mut start = r.start.min(text.len());
        let mut end = r.end.min(text.len());
        while !text.is_char_boundary(start) { start -= 1; }
        while !text.is_char_boundary(end) { end += 1; }
        if start >= end { continue; }
        match spans.last_mut() {
            Some(prev) if start < prev.end => prev.end = prev.end.max(end),
            _ => spans.push(start..end),
        }
    }
    spans
}

pub fn load_tokenizer(settings: &TokenizerSettings) -> Result<Arc<dyn Tokenizer>> {
    match settings.kind {
        TokenizerKind::Whitespace => Ok(Arc::new(WhitespaceTokenizer)),
        TokenizerKind::HuggingFace => {
            let path = settings
                .path
                .as_deref()
                .ok_or_else(|| Error::InvalidConfig("tokenizer.path is required for the huggingface tokenizer".into()))?;
            Ok(Arc::new(HfTokenizer::from_file(&expand_path(path))?))
        }
    }
}

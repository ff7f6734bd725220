//! Token-bounded document chunking.
//!
//! Each chunk covers at most `chunk_size` tokens. When the token window holds
//! a sentence boundary past `min_chunk_size_chars` characters, the chunk is
//! cut after the token carrying the last such boundary so chunks tend to end
//! on whole sentences.

use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::traits::Tokenizer;
use crate::types::{Document, DocumentChunk};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in tokens.
    pub chunk_size: usize,
    /// Minimum characters before a sentence boundary may end a chunk.
    pub min_chunk_size_chars: usize,
    /// Chunks this short (in characters) or shorter are discarded.
    pub min_chunk_length_to_embed: usize,
    pub max_num_chunks: usize,
    pub keep_separator: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 300,
            min_chunk_size_chars: 350,
            min_chunk_length_to_embed: 5,
            max_num_chunks: 10_000,
            keep_separator: true,
        }
    }
}

/// Splits on runs of whitespace; every maximal non-whitespace run is a token.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn token_spans(&self, text: &str) -> Result<Vec<Range<usize>>> {
        let mut spans = Vec::new();
        let mut start: Option<usize> = None;
        for (i, ch) in text.char_indices() {
            match (ch.is_whitespace(), start) {
                (true, Some(s)) => { spans.push(s..i); start = None; }
                (false, None) => start = Some(i),
                _ => {}
            }
        }
        if let Some(s) = start { spans.push(s..text.len()); }
        Ok(spans)
    }
}

pub struct TokenChunker {
    config: ChunkingConfig,
    tokenizer: Arc<dyn Tokenizer>,
}

impl TokenChunker {
    pub fn new(config: ChunkingConfig, tokenizer: Arc<dyn Tokenizer>) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be positive".into()));
        }
        Ok(Self { config, tokenizer })
    }

    pub fn config(&self) -> &ChunkingConfig { &self.config }

    pub fn split_text(&self, text: &str) -> Result<Vec<String>> {
        let spans = self.tokenizer.token_spans(text)?;
        let mut chunks = Vec::new();
        let mut next = 0;
        while next < spans.len() && chunks.len() < self.config.max_num_chunks {
            let last = (next + self.config.chunk_size).min(spans.len()) - 1;
            let start = spans[next].start;
            let window = &text[start..spans[last].end];

            let mut cut = last;
            if let Some(boundary) = self.last_boundary(window) {
                let boundary = start + boundary;
                if let Some(offset) = spans[next..=last].iter().rposition(|s| s.start <= boundary) {
                    cut = next + offset;
                }
            }

            let raw = &text[start..spans[cut].end];
            let piece = if self.config.keep_separator {
                raw.trim().to_string()
            } else {
                raw.replace("\r\n", " ").replace('\n', " ").trim().to_string()
            };
            if piece.chars().count() > self.config.min_chunk_length_to_embed {
                chunks.push(piece);
            }
            next = cut + 1;
        }
        if next < spans.len() {
            warn!(max = self.config.max_num_chunks, dropped_tokens = spans.len() - next, "chunk limit reached, dropping tail");
        }
        Ok(chunks)
    }

    /// Byte offset of the last sentence boundary that sits past the minimum length.
    fn last_boundary(&self, window: &str) -> Option<usize> {
        window
            .char_indices()
            .enumerate()
            .filter(|(pos, (_, ch))| *pos > self.config.min_chunk_size_chars && matches!(ch, '.' | '?' | '!' | '\n'))
            .map(|(_, (byte, _))| byte)
            .last()
    }

    pub fn split_document(&self, doc: &Document) -> Result<Vec<DocumentChunk>> {
        let pieces = self.split_text(&doc.content)?;
        let total = pieces.len();
        Ok(pieces
            .into_iter()
            .enumerate()
            .map(|(i, content)| DocumentChunk {
                id: format!("{}:{}", doc.id, i),
                doc_id: doc.id.clone(),
                content,
                chunk_index: i,
                total_chunks: total,
                metadata: doc.metadata.clone(),
            })
            .collect())
    }

    pub fn split_documents(&self, docs: &[Document]) -> Result<Vec<DocumentChunk>> {
        let mut out = Vec::new();
        for doc in docs {
            out.extend(self.split_document(doc)?);
        }
        info!(documents = docs.len(), chunks = out.len(), chunk_size = self.config.chunk_size, "split documents");
        Ok(out)
    }
}

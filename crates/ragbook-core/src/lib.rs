//! Core types, traits, configuration, document loading and chunking for ragbook.

pub mod chunker;
pub mod config;
pub mod error;
pub mod loader;
pub mod traits;
pub mod types;

pub use chunker::{ChunkingConfig, TokenChunker, WhitespaceTokenizer};
pub use config::{Config, Settings};
pub use error::{Error, Result};
pub use loader::DocumentLoader;
pub use traits::{CompletionService, Embedder, Tokenizer};
pub use types::{ChatMessage, Document, DocumentChunk, Role, SearchHit};

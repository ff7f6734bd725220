//! Domain types shared by the loader, chunker, index and lessons.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type ChunkId = String;
pub type Meta = BTreeMap<String, String>;

/// A plain-text source document.
///
/// `id` is the path relative to the document directory (for a flat directory
/// this is the filename). `metadata` always carries `filename` and `source`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub metadata: Meta,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        let id = id.into();
        let filename = id.rsplit('/').next().unwrap_or(id.as_str()).to_string();
        let mut metadata = Meta::new();
        metadata.insert("filename".to_string(), filename);
        metadata.insert("source".to_string(), id.clone());
        Self { id, content: content.into(), metadata }
    }

    pub fn filename(&self) -> &str {
        self.metadata.get("filename").map_or(self.id.as_str(), String::as_str)
    }
}

/// A chunk of a source document that is independently embedded and retrieved.
///
/// - `id`: `"{doc_id}:{chunk_index}"`
/// - `doc_id`: back-reference to the owning `Document::id`
/// - `content`: the text payload of the chunk
/// - `chunk_index`/`total_chunks`: position within the parent document
/// - `metadata`: copied verbatim from the parent document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: ChunkId,
    pub doc_id: String,
    pub content: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    #[serde(default)]
    pub metadata: Meta,
}

/// A retrieved chunk with its similarity score. Higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk: DocumentChunk,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

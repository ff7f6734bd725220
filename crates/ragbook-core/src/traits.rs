use std::ops::Range;

use crate::error::{Error, Result};
use crate::types::ChatMessage;

pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `openai:text-embedding-3-small`).
    fn embedder_id(&self) -> &str;
    /// Embedding dimensionality, when known before the first call.
    fn dim(&self) -> Option<usize>;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| Error::upstream("embedding", "no vector returned"))
    }
}

pub trait CompletionService: Send + Sync {
    fn chat(&self, messages: &[ChatMessage]) -> Result<String>;

    fn complete(&self, prompt: &str) -> Result<String> {
        self.chat(&[ChatMessage::user(prompt)])
    }
}

pub trait Tokenizer: Send + Sync {
    /// Byte ranges of the tokens of `text`, in order and non-overlapping.
    fn token_spans(&self, text: &str) -> Result<Vec<Range<usize>>>;

    fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok(self.token_spans(text)?.len())
    }
}

use ragbook_core::error::{Error, Result};
use ragbook_core::types::SearchHit;
use ragbook_llm::PromptTemplate;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    pub text: String,
    pub included: usize,
    pub dropped: usize,
}

/// Renders retrieved chunks and the user query into a two-slot template.
///
/// Chunk texts are joined with `"\n"` in retrieval order. With a character
/// bound set, the lowest-ranked chunks are dropped until the prompt fits.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    template: PromptTemplate,
    documents_slot: String,
    query_slot: String,
    max_prompt_chars: Option<usize>,
}

impl PromptAssembler {
    pub fn new(
        template: PromptTemplate,
        documents_slot: impl Into<String>,
        query_slot: impl Into<String>,
        max_prompt_chars: Option<usize>,
    ) -> Self {
        Self { template, documents_slot: documents_slot.into(), query_slot: query_slot.into(), max_prompt_chars }
    }

    pub fn assemble(&self, query: &str, hits: &[SearchHit]) -> Result<AssembledPrompt> {
        for included in (0..=hits.len()).rev() {
            let documents = hits[..included].iter().map(|h| h.chunk.content.as_str()).collect::<Vec<_>>().join("\n");
            let text = self
                .template
                .render(&[(self.documents_slot.as_str(), documents.as_str()), (self.query_slot.as_str(), query)])?;
            let fits = self.max_prompt_chars.map_or(true, |max| text.chars().count() <= max);
            if fits {
                let dropped = hits.len() - included;
                if dropped > 0 {
                    warn!(dropped, included, max = ?self.max_prompt_chars, "prompt too long, dropped lowest-ranked chunks");
                }
                return Ok(AssembledPrompt { text, included, dropped });
            }
        }
        Err(Error::InvalidArgument(format!(
            "prompt exceeds {} characters even without retrieved context",
            self.max_prompt_chars.unwrap_or_default()
        )))
    }
}

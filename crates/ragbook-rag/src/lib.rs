//! Retrieval-augmented generation over the lesson corpus.
//!
//! `build_index` wires loader, chunker, embedder and snapshot storage from
//! [`Settings`] and runs the build-or-load bootstrap. [`RagPipeline`] answers
//! queries against the resulting immutable index.

use std::sync::Arc;

use ragbook_core::chunker::TokenChunker;
use ragbook_core::config::Settings;
use ragbook_core::error::Result;
use ragbook_core::loader::DocumentLoader;
use ragbook_core::traits::{CompletionService, Embedder};
use ragbook_core::types::SearchHit;
use ragbook_embed::load_tokenizer;
use ragbook_llm::PromptLibrary;
use ragbook_vector::{IndexBootstrap, JsonFileStorage, Retriever, VectorIndex};
use serde::Serialize;
use tracing::info;

pub mod assembler;
pub mod lessons;

pub use assembler::{AssembledPrompt, PromptAssembler};
pub use lessons::{ArtistSongs, Lessons};

pub const RAG_TEMPLATE: &str = "rag-john";

/// Bootstrap configured from settings, ready to `run()`.
pub fn index_bootstrap(settings: &Settings, embedder: Arc<dyn Embedder>) -> Result<IndexBootstrap> {
    let loader = DocumentLoader::new(settings.documents.dir(), &settings.documents.pattern)?;
    let chunker = TokenChunker::new(settings.chunking.clone(), load_tokenizer(&settings.tokenizer)?)?;
    let storage = JsonFileStorage::new(settings.index.path());
    Ok(IndexBootstrap::new(loader, chunker, embedder, Box::new(storage)).with_staleness(settings.index.staleness))
}

pub fn build_index(settings: &Settings, embedder: Arc<dyn Embedder>) -> Result<Arc<VectorIndex>> {
    let outcome = index_bootstrap(settings, embedder)?.run()?;
    info!(source = ?outcome.source, entries = outcome.index.len(), "index ready");
    Ok(outcome.index)
}

#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<SearchHit>,
    pub dropped: usize,
}

pub struct RagPipeline {
    retriever: Retriever,
    completion: Arc<dyn CompletionService>,
    assembler: PromptAssembler,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(
        retriever: Retriever,
        completion: Arc<dyn CompletionService>,
        assembler: PromptAssembler,
        top_k: usize,
    ) -> Self {
        Self { retriever, completion, assembler, top_k }
    }

    pub fn from_settings(
        settings: &Settings,
        index: Arc<VectorIndex>,
        embedder: Arc<dyn Embedder>,
        completion: Arc<dyn CompletionService>,
    ) -> Result<Self> {
        let template = PromptLibrary::new(settings.prompts.dir()).get(RAG_TEMPLATE)?;
        let assembler = PromptAssembler::new(template, "documents", "input", settings.retrieval.max_prompt_chars);
        Ok(Self::new(Retriever::new(index, embedder), completion, assembler, settings.retrieval.top_k))
    }

    pub fn top_k(&self) -> usize { self.top_k }

    pub fn index(&self) -> &VectorIndex { self.retriever.index() }

    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        self.retriever.search(query, top_k)
    }

    pub fn ask(&self, query: &str) -> Result<String> {
        Ok(self.answer(query)?.answer)
    }

    /// Like [`ask`](Self::ask) but also returns the chunks the answer was conditioned on.
    pub fn answer(&self, query: &str) -> Result<RagAnswer> {
        let hits = self.retriever.search(query, self.top_k)?;
        let prompt = self.assembler.assemble(query, &hits)?;
        let answer = self.completion.complete(&prompt.text)?;
        let sources = hits.into_iter().take(prompt.included).collect();
        Ok(RagAnswer { answer, sources, dropped: prompt.dropped })
    }
}

use std::sync::Arc;

use ragbook_core::config::Settings;
use ragbook_core::error::Result;
use ragbook_core::traits::{CompletionService, Embedder};
use ragbook_llm::PromptLibrary;
use ragbook_rag::{Lessons, RagPipeline};
use ragbook_vector::VectorIndex;

#[derive(Clone)]
pub struct AppState {
    pub lessons: Arc<Lessons>,
    pub rag: Arc<RagPipeline>,
    pub default_query: Arc<str>,
}

impl AppState {
    pub fn new(lessons: Lessons, rag: RagPipeline, default_query: &str) -> Self {
        Self { lessons: Arc::new(lessons), rag: Arc::new(rag), default_query: Arc::from(default_query) }
    }

    pub fn from_settings(
        settings: &Settings,
        index: Arc<VectorIndex>,
        embedder: Arc<dyn Embedder>,
        completion: Arc<dyn CompletionService>,
    ) -> Result<Self> {
        let lessons = Lessons::new(
            completion.clone(),
            PromptLibrary::new(settings.prompts.dir()),
            settings.prompts.context_file(),
        );
        let rag = RagPipeline::from_settings(settings, index, embedder, completion)?;
        Ok(Self::new(lessons, rag, &settings.retrieval.default_query))
    }
}

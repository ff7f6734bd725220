//! Language-model plumbing: chat clients, prompt templates and output parsers.

use std::sync::Arc;
use std::time::Duration;

use ragbook_core::config::{CompletionProvider, CompletionSettings};
use ragbook_core::error::{Error, Result};
use ragbook_core::traits::CompletionService;
use ragbook_core::types::{ChatMessage, Role};
use tracing::info;

pub mod openai;
pub mod parser;
pub mod template;

pub use openai::OpenAiChatClient;
pub use parser::{BeanOutputParser, ListOutputParser, MapOutputParser, OutputParser};
pub use template::{PromptLibrary, PromptTemplate};

/// Offline completion service that answers with the last user message.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoCompletion;

impl CompletionService for EchoCompletion {
    fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .ok_or_else(|| Error::InvalidArgument("no user message to answer".into()))
    }
}

pub fn get_default_completion(settings: &CompletionSettings) -> Result<Arc<dyn CompletionService>> {
    match settings.provider {
        CompletionProvider::Echo => {
            info!("using echo completion");
            Ok(Arc::new(EchoCompletion))
        }
        CompletionProvider::OpenAi => {
            let client = OpenAiChatClient::new(
                settings.api_key()?,
                settings.base_url.clone(),
                settings.model.clone(),
                settings.temperature,
                settings.max_tokens,
                Duration::from_secs(settings.timeout_secs),
            )?;
            info!(model = %settings.model, base_url = %settings.base_url, "using OpenAI chat completions");
            Ok(Arc::new(client))
        }
    }
}

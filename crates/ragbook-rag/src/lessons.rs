//! The chat lessons that sit in front of the RAG pipeline: a bare completion,
//! templated and persona prompts, structured output and context stuffing.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use ragbook_core::error::{Error, Result};
use ragbook_core::traits::CompletionService;
use ragbook_core::types::ChatMessage;
use ragbook_llm::{BeanOutputParser, ListOutputParser, MapOutputParser, OutputParser, PromptLibrary};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

pub const DAD_JOKE_PROMPT: &str = "Tell me a dad joke";
pub const DAD_PERSONA: &str = "You're a Dad. You only tell Dad Jokes. If someone asks you to tell a joke, \
either make it a Dad Joke or say you can't do it.";
pub const DAD_PERSONA_QUESTION: &str = "Talk to me about the 100 year war in France";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ArtistSongs {
    pub artist: String,
    pub songs: Vec<String>,
}

pub struct Lessons {
    completion: Arc<dyn CompletionService>,
    prompts: PromptLibrary,
    context_file: PathBuf,
}

impl Lessons {
    pub fn new(completion: Arc<dyn CompletionService>, prompts: PromptLibrary, context_file: impl Into<PathBuf>) -> Self {
        Self { completion, prompts, context_file: context_file.into() }
    }

    pub fn dad_joke(&self) -> Result<String> {
        self.completion.complete(DAD_JOKE_PROMPT)
    }

    pub fn youtube(&self, genre: &str) -> Result<String> {
        let genre = required("genre", genre)?;
        let prompt = self.prompts.get("youtube")?.render(&[("genre", genre)])?;
        self.completion.complete(&prompt)
    }

    pub fn dad_persona(&self) -> Result<String> {
        self.completion.chat(&[ChatMessage::system(DAD_PERSONA), ChatMessage::user(DAD_PERSONA_QUESTION)])
    }

    pub fn songs_list(&self, artist: &str) -> Result<Vec<String>> {
        self.structured("songs-list", artist, &ListOutputParser)
    }

    pub fn songs_map(&self, artist: &str) -> Result<Map<String, Value>> {
        self.structured("songs-map", artist, &MapOutputParser)
    }

    pub fn songs_bean(&self, artist: &str) -> Result<ArtistSongs> {
        self.structured("songs-bean", artist, &BeanOutputParser::<ArtistSongs>::new())
    }

    /// Stuffs the whole context document into the `john` template.
    pub fn john_context(&self) -> Result<String> {
        let context = fs::read_to_string(&self.context_file).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                Error::ResourceNotFound(format!("context document {}", self.context_file.display()))
            }
            _ => Error::Io(e),
        })?;
        let prompt = self.prompts.get("john")?.render(&[("context", context.as_str())])?;
        self.completion.complete(&prompt)
    }

    fn structured<P: OutputParser>(&self, template: &str, artist: &str, parser: &P) -> Result<P::Output> {
        let artist = required("artist", artist)?;
        let format = parser.format_instructions();
        let prompt = self.prompts.get(template)?.render(&[("artist", artist), ("format", format.as_str())])?;
        let reply = self.completion.complete(&prompt)?;
        debug!(template, chars = reply.len(), "structured reply");
        parser.parse(&reply)
    }
}

fn required<'a>(name: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument(format!("{name} must not be blank")));
    }
    Ok(trimmed)
}

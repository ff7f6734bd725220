//! Lightweight configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_INDEX__PATH`). Provides helpers to
//! expand `~` and `${VAR}` and to resolve relative paths against a known base
//! directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Load `config.toml` and the profile file from `dir`, then `APP_*` env vars.
    pub fn load_from(dir: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    /// Extract and validate the full typed settings.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self, env: &str) -> Result<()> {
        if matches!(env, "prod" | "production") {
            let provider: EmbeddingProvider = self.get("embedding.provider")?;
            if provider == EmbeddingProvider::Fake {
                return Err(Error::InvalidConfig("fake embeddings are not allowed in production".into()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub documents: DocumentSettings,
    pub chunking: ChunkingConfig,
    pub tokenizer: TokenizerSettings,
    pub index: IndexSettings,
    pub embedding: EmbeddingSettings,
    pub completion: CompletionSettings,
    pub retrieval: RetrievalSettings,
    pub prompts: PromptSettings,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(Error::InvalidConfig(msg.to_string()));
        if self.documents.dir.trim().is_empty() { return invalid("documents.dir must not be empty"); }
        if self.documents.pattern.trim().is_empty() { return invalid("documents.pattern must not be empty"); }
        if self.chunking.chunk_size == 0 { return invalid("chunking.chunk_size must be positive"); }
        if self.index.path.trim().is_empty() { return invalid("index.path must not be empty"); }
        if self.retrieval.top_k == 0 { return invalid("retrieval.top_k must be positive"); }
        if self.embedding.timeout_secs == 0 { return invalid("embedding.timeout_secs must be positive"); }
        if self.embedding.batch_size == 0 { return invalid("embedding.batch_size must be positive"); }
        if self.embedding.fake_dim == 0 { return invalid("embedding.fake_dim must be positive"); }
        if self.completion.timeout_secs == 0 { return invalid("completion.timeout_secs must be positive"); }
        if self.tokenizer.kind == TokenizerKind::HuggingFace && self.tokenizer.path.is_none() {
            return invalid("tokenizer.path is required for the huggingface tokenizer");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    pub dir: String,
    pub pattern: String,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self { dir: "data".to_string(), pattern: "*.txt".to_string() }
    }
}

impl DocumentSettings {
    pub fn dir(&self) -> PathBuf { expand_path(&self.dir) }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerKind {
    #[default]
    Whitespace,
    #[serde(alias = "hf")]
    HuggingFace,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerSettings {
    pub kind: TokenizerKind,
    /// Path to a `tokenizer.json`; required for `huggingface`.
    pub path: Option<String>,
}

/// What to do when a persisted index no longer matches the source documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StalenessPolicy {
    /// Load the snapshot without looking at the documents.
    #[default]
    Trust,
    /// Log a warning on mismatch and keep the snapshot.
    Warn,
    /// Rebuild and re-persist on mismatch.
    Rebuild,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub path: String,
    pub staleness: StalenessPolicy,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { path: "vectorstore.json".to_string(), staleness: StalenessPolicy::Trust }
    }
}

impl IndexSettings {
    pub fn path(&self) -> PathBuf { expand_path(&self.path) }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    OpenAi,
    Fake,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    pub base_url: String,
    pub model: String,
    pub dimensions: Option<usize>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub batch_size: usize,
    pub fake_dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::OpenAi,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: None,
            api_key: None,
            timeout_secs: 30,
            max_retries: 3,
            batch_size: 32,
            fake_dim: 1024,
        }
    }
}

impl EmbeddingSettings {
    pub fn api_key(&self) -> Result<String> { resolve_api_key(self.api_key.as_deref(), "embedding") }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionProvider {
    #[default]
    OpenAi,
    Echo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    pub provider: CompletionProvider,
    pub base_url: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            provider: CompletionProvider::OpenAi,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: Some(0.7),
            max_tokens: None,
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl CompletionSettings {
    pub fn api_key(&self) -> Result<String> { resolve_api_key(self.api_key.as_deref(), "completion") }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub default_query: String,
    /// Upper bound on the assembled RAG prompt, in characters. `None` is unbounded.
    pub max_prompt_chars: Option<usize>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 2, default_query: "Who is The Word?".to_string(), max_prompt_chars: Some(16_000) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    pub dir: String,
    /// Document stuffed whole into the context-window lesson.
    pub context_file: String,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self { dir: "prompts".to_string(), context_file: "data/john1.txt".to_string() }
    }
}

impl PromptSettings {
    pub fn dir(&self) -> PathBuf { expand_path(&self.dir) }
    pub fn context_file(&self) -> PathBuf { expand_path(&self.context_file) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8080 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { filter: "info".to_string() }
    }
}

fn resolve_api_key(configured: Option<&str>, section: &str) -> Result<String> {
    if let Some(key) = configured.filter(|k| !k.trim().is_empty()) {
        return Ok(key.trim().to_string());
    }
    match env::var("OPENAI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(Error::InvalidConfig(format!("missing API key: set {section}.api_key or OPENAI_API_KEY"))),
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

//! `{name}`-slot prompt templates loaded from `<dir>/<name>.st` files.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ragbook_core::error::{Error, Result};
use regex::{Captures, Regex};

fn slot_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("slot pattern is valid"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    name: String,
    source: String,
}

impl PromptTemplate {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self { name: name.into(), source: source.into() }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::ResourceNotFound(format!("prompt template {}", path.display())),
            _ => Error::Io(e),
        })?;
        let name = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        Ok(Self::new(name, source))
    }

    pub fn name(&self) -> &str { &self.name }

    /// Slot names in order of first appearance.
    pub fn variables(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        slot_regex()
            .captures_iter(&self.source)
            .filter_map(|c| {
                let name = c[1].to_string();
                seen.insert(name.clone()).then_some(name)
            })
            .collect()
    }

    /// Fills every slot in one pass; values are inserted literally.
    pub fn render(&self, vars: &[(&str, &str)]) -> Result<String> {
        let missing: Vec<String> =
            self.variables().into_iter().filter(|v| !vars.iter().any(|(k, _)| k == v)).collect();
        if !missing.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "template '{}' is missing variables: {}",
                self.name,
                missing.join(", ")
            )));
        }
        let rendered = slot_regex().replace_all(&self.source, |c: &Captures<'_>| {
            vars.iter().find(|(k, _)| *k == &c[1]).map(|(_, v)| v.to_string()).unwrap_or_default()
        });
        Ok(rendered.into_owned())
    }
}

/// Directory of `.st` templates.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    dir: PathBuf,
}

impl PromptLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    pub fn get(&self, name: &str) -> Result<PromptTemplate> {
        PromptTemplate::from_file(&self.dir.join(format!("{name}.st")))
    }
}

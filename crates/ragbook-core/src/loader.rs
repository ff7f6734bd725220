use std::fs;
use std::path::PathBuf;

use glob::{MatchOptions, Pattern};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::types::Document;

/// Reads every file under `root` whose relative path matches `pattern`.
pub struct DocumentLoader {
    root: PathBuf,
    pattern: Pattern,
}

impl DocumentLoader {
    pub fn new(root: impl Into<PathBuf>, pattern: &str) -> Result<Self> {
        let pattern = Pattern::new(pattern)
            .map_err(|e| Error::InvalidConfig(format!("bad document pattern '{pattern}': {e}")))?;
        Ok(Self { root: root.into(), pattern })
    }

    /// Matching paths relative to the root, `/`-separated and sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Err(Error::ResourceNotFound(format!("document directory {} does not exist", self.root.display())));
        }
        let options = MatchOptions { case_sensitive: true, require_literal_separator: true, require_literal_leading_dot: false };
        let mut matches = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name().into_iter() {
            let entry = entry.map_err(|e| Error::Operation(format!("walking {}: {e}", self.root.display())))?;
            if !entry.file_type().is_file() { continue; }
            let Ok(rel) = entry.path().strip_prefix(&self.root) else { continue };
            let rel = rel.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/");
            if self.pattern.matches_with(&rel, options) { matches.push(rel); }
        }
        matches.sort();
        Ok(matches)
    }

    pub fn load(&self) -> Result<Vec<Document>> {
        let files = self.list()?;
        if files.is_empty() {
            return Err(Error::ResourceNotFound(format!(
                "no documents matching '{}' under {}",
                self.pattern.as_str(),
                self.root.display()
            )));
        }
        let mut docs = Vec::with_capacity(files.len());
        for rel in files {
            let bytes = fs::read(self.root.join(&rel))?;
            debug!(file = %rel, bytes = bytes.len(), "read document");
            let content = String::from_utf8_lossy(&bytes).into_owned();
            docs.push(Document::new(rel, content));
        }
        info!(count = docs.len(), root = %self.root.display(), "loaded documents");
        Ok(docs)
    }
}

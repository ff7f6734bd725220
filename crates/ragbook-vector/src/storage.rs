//! Snapshot persistence for the vector index.
//!
//! A snapshot is one JSON document holding every entry plus the provenance
//! needed to judge staleness. Writes go to a temp file in the target
//! directory and are renamed into place.

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use ragbook_core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::info;

use crate::index::{IndexEntry, VectorIndex};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedIndex {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub embedder_id: String,
    pub fingerprint: String,
    pub chunk_size: usize,
    pub entries: Vec<IndexEntry>,
}

impl PersistedIndex {
    pub fn new(embedder_id: impl Into<String>, fingerprint: impl Into<String>, chunk_size: usize, entries: Vec<IndexEntry>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            created_at: Utc::now(),
            embedder_id: embedder_id.into(),
            fingerprint: fingerprint.into(),
            chunk_size,
            entries,
        }
    }

    /// Validates the snapshot and turns it into a searchable index.
    pub fn into_index(self, origin: &str) -> Result<VectorIndex> {
        if self.version != SNAPSHOT_VERSION {
            return Err(Error::IndexLoad {
                path: PathBuf::from(origin),
                reason: format!("unsupported snapshot version {} (expected {SNAPSHOT_VERSION})", self.version),
            });
        }
        VectorIndex::from_entries(self.entries)
            .map_err(|e| Error::IndexLoad { path: PathBuf::from(origin), reason: e.to_string() })
    }
}

pub trait IndexStorage: Send + Sync {
    /// Human-readable location, used in logs and errors.
    fn describe(&self) -> String;
    fn exists(&self) -> bool;
    fn load(&self) -> Result<PersistedIndex>;
    fn save(&self, snapshot: &PersistedIndex) -> Result<()>;
}

pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
    pub fn path(&self) -> &Path { &self.path }

    fn load_error(&self, reason: impl Into<String>) -> Error {
        Error::IndexLoad { path: self.path.clone(), reason: reason.into() }
    }
}

impl IndexStorage for JsonFileStorage {
    fn describe(&self) -> String { self.path.display().to_string() }

    fn exists(&self) -> bool { self.path.is_file() }

    fn load(&self) -> Result<PersistedIndex> {
        let file = fs::File::open(&self.path).map_err(|e| self.load_error(e.to_string()))?;
        let snapshot: PersistedIndex =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| self.load_error(e.to_string()))?;
        info!(path = %self.path.display(), entries = snapshot.entries.len(), "read index snapshot");
        Ok(snapshot)
    }

    fn save(&self, snapshot: &PersistedIndex) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(&mut writer, snapshot)
                .map_err(|e| Error::Operation(format!("failed to serialize index: {e}")))?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        info!(path = %self.path.display(), entries = snapshot.entries.len(), "saved index snapshot");
        Ok(())
    }
}

/// Keeps the snapshot in memory; lets tests stage an existing index.
#[derive(Default)]
pub struct InMemoryStorage {
    snapshot: Mutex<Option<PersistedIndex>>,
}

impl InMemoryStorage {
    pub fn new() -> Self { Self::default() }

    pub fn with_snapshot(snapshot: PersistedIndex) -> Self {
        Self { snapshot: Mutex::new(Some(snapshot)) }
    }

    pub fn snapshot(&self) -> Option<PersistedIndex> {
        self.snapshot.lock().ok().and_then(|s| s.clone())
    }
}

impl IndexStorage for InMemoryStorage {
    fn describe(&self) -> String { "memory".to_string() }

    fn exists(&self) -> bool { self.snapshot().is_some() }

    fn load(&self) -> Result<PersistedIndex> {
        self.snapshot().ok_or_else(|| Error::IndexLoad { path: PathBuf::from("memory"), reason: "no snapshot".into() })
    }

    fn save(&self, snapshot: &PersistedIndex) -> Result<()> {
        let mut slot = self.snapshot.lock().map_err(|_| Error::Operation("snapshot lock poisoned".into()))?;
        *slot = Some(snapshot.clone());
        Ok(())
    }
}

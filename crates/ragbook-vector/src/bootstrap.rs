//! Build-or-load state machine for the vector index.
//!
//! `Uninitialized -> LoadingFromDisk -> Ready` when storage holds a snapshot,
//! `Uninitialized -> Building -> Persisting -> Ready` otherwise. Under the
//! `rebuild` staleness policy a stale snapshot moves `LoadingFromDisk -> Building`.

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use ragbook_core::chunker::TokenChunker;
use ragbook_core::config::StalenessPolicy;
use ragbook_core::error::{Error, Result};
use ragbook_core::loader::DocumentLoader;
use ragbook_core::traits::Embedder;
use ragbook_core::types::Document;
use tracing::{debug, info, warn};

use crate::fingerprint::corpus_fingerprint;
use crate::index::{IndexEntry, VectorIndex};
use crate::storage::{IndexStorage, PersistedIndex};

const PROGRESS_BATCH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Uninitialized,
    LoadingFromDisk,
    Building,
    Persisting,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
    Loaded,
    Built,
}

pub struct BootstrapOutcome {
    pub index: Arc<VectorIndex>,
    pub source: IndexSource,
    pub history: Vec<IndexState>,
}

pub struct IndexBootstrap {
    loader: DocumentLoader,
    chunker: TokenChunker,
    embedder: Arc<dyn Embedder>,
    storage: Box<dyn IndexStorage>,
    staleness: StalenessPolicy,
    force_rebuild: bool,
    show_progress: bool,
    history: Vec<IndexState>,
}

impl IndexBootstrap {
    pub fn new(
        loader: DocumentLoader,
        chunker: TokenChunker,
        embedder: Arc<dyn Embedder>,
        storage: Box<dyn IndexStorage>,
    ) -> Self {
        Self {
            loader,
            chunker,
            embedder,
            storage,
            staleness: StalenessPolicy::Trust,
            force_rebuild: false,
            show_progress: false,
            history: vec![IndexState::Uninitialized],
        }
    }

    pub fn with_staleness(mut self, policy: StalenessPolicy) -> Self {
        self.staleness = policy;
        self
    }

    /// Ignore any existing snapshot and build from the documents.
    pub fn with_force_rebuild(mut self, force: bool) -> Self {
        self.force_rebuild = force;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn enter(&mut self, state: IndexState) {
        debug!(from = ?self.history.last(), to = ?state, "index state");
        self.history.push(state);
    }

    pub fn run(mut self) -> Result<BootstrapOutcome> {
        let mut preloaded = None;
        if !self.force_rebuild && self.storage.exists() {
            self.enter(IndexState::LoadingFromDisk);
            info!(storage = %self.storage.describe(), "loading index snapshot");
            let snapshot = self.storage.load()?;
            match self.check_staleness(&snapshot)? {
                Some(docs) if self.staleness == StalenessPolicy::Rebuild => {
                    info!("snapshot is stale, rebuilding");
                    preloaded = Some(docs);
                }
                _ => {
                    let index = snapshot.into_index(&self.storage.describe())?;
                    self.check_dimension(&index)?;
                    info!(entries = index.len(), "index loaded");
                    self.enter(IndexState::Ready);
                    return Ok(BootstrapOutcome { index: Arc::new(index), source: IndexSource::Loaded, history: self.history });
                }
            }
        }
        self.build(preloaded)
    }

    /// A snapshot from a model with another vector size cannot answer queries.
    fn check_dimension(&self, index: &VectorIndex) -> Result<()> {
        match (index.dim(), self.embedder.dim()) {
            (Some(stored), Some(current)) if stored != current => Err(Error::IndexLoad {
                path: self.storage.describe().into(),
                reason: format!(
                    "snapshot vectors have dimension {stored} but embedder {} produces {current}",
                    self.embedder.embedder_id()
                ),
            }),
            _ => Ok(()),
        }
    }

    /// Returns the freshly loaded documents when the snapshot is stale.
    fn check_staleness(&self, snapshot: &PersistedIndex) -> Result<Option<Vec<Document>>> {
        if self.staleness == StalenessPolicy::Trust {
            return Ok(None);
        }
        let docs = self.loader.load()?;
        let fingerprint = corpus_fingerprint(&docs, self.chunker.config().chunk_size);
        let same_corpus = fingerprint == snapshot.fingerprint;
        let same_embedder = snapshot.embedder_id == self.embedder.embedder_id();
        if same_corpus && same_embedder {
            return Ok(None);
        }
        warn!(
            same_corpus,
            same_embedder,
            snapshot_embedder = %snapshot.embedder_id,
            current_embedder = %self.embedder.embedder_id(),
            "index snapshot does not match the current documents"
        );
        Ok(Some(docs))
    }

    fn build(mut self, preloaded: Option<Vec<Document>>) -> Result<BootstrapOutcome> {
        self.enter(IndexState::Building);
        let docs = match preloaded {
            Some(docs) => docs,
            None => self.loader.load()?,
        };
        let chunks = self.chunker.split_documents(&docs)?;
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();

        let pb = if self.show_progress { ProgressBar::new(texts.len() as u64) } else { ProgressBar::hidden() };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(PROGRESS_BATCH) {
            embeddings.extend(self.embedder.embed_batch(batch)?);
            pb.set_position(embeddings.len() as u64);
        }
        pb.finish_with_message("embedded");
        if embeddings.len() != chunks.len() {
            return Err(Error::upstream(
                "embedding",
                format!("got {} vectors for {} chunks", embeddings.len(), chunks.len()),
            ));
        }

        let entries: Vec<IndexEntry> =
            chunks.into_iter().zip(embeddings).map(|(chunk, embedding)| IndexEntry { chunk, embedding }).collect();
        let index = VectorIndex::from_entries(entries)?;
        info!(entries = index.len(), dim = ?index.dim(), "index built");

        self.enter(IndexState::Persisting);
        let chunk_size = self.chunker.config().chunk_size;
        let snapshot = PersistedIndex::new(
            self.embedder.embedder_id(),
            corpus_fingerprint(&docs, chunk_size),
            chunk_size,
            index.entries().to_vec(),
        );
        self.storage.save(&snapshot)?;

        self.enter(IndexState::Ready);
        Ok(BootstrapOutcome { index: Arc::new(index), source: IndexSource::Built, history: self.history })
    }
}

//! In-memory vector index, snapshot persistence, the build-or-load bootstrap
//! and query-time retrieval.

pub mod bootstrap;
pub mod fingerprint;
pub mod index;
pub mod retriever;
pub mod storage;

pub use bootstrap::{BootstrapOutcome, IndexBootstrap, IndexSource, IndexState};
pub use index::{cosine_similarity, IndexEntry, VectorIndex};
pub use retriever::Retriever;
pub use storage::{IndexStorage, InMemoryStorage, JsonFileStorage, PersistedIndex};

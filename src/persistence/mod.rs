//! Persistence layer
//!
//! The graph lives in memory; durability comes from whole-graph snapshots
//! written on `flush()`, on `shutdown()` and, with `sync_on_commit`, after
//! every commit.

pub mod snapshot;

pub use snapshot::{read_snapshot, write_snapshot, Snapshot, StoredIndexEntry, SNAPSHOT_FILE, SNAPSHOT_VERSION};

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported snapshot version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Corrupt snapshot: {0}")]
    Corrupt(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

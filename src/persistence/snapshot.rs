//! Gzip-compressed bincode snapshots of the whole graph
//!
//! Layout of `graph.snapshot`: gzip stream containing a bincode
//! `SnapshotHeader` followed by the bincode `Snapshot` body. The header is
//! decoded first so an unknown version is reported before the body is touched.

use super::{PersistenceError, PersistenceResult};
use crate::database::GraphState;
use crate::graph::{Node, PropertyValue, Relationship};
use crate::index::ElementKind;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

pub const SNAPSHOT_FILE: &str = "graph.snapshot";
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotHeader {
    version: u32,
}

/// Serialized index entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredIndexEntry {
    pub kind: ElementKind,
    pub index: String,
    pub id: u64,
    pub field: String,
    pub value: PropertyValue,
}

/// Full copy of committed state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Next ids to hand out; ids are never reused across restarts
    pub next_node_id: u64,
    pub next_relationship_id: u64,
    pub nodes: Vec<Node>,
    pub relationships: Vec<Relationship>,
    pub index_entries: Vec<StoredIndexEntry>,
}

impl Snapshot {
    pub(crate) fn capture(state: &GraphState, next_node_id: u64, next_relationship_id: u64) -> Self {
        let mut index_entries = Vec::new();
        for kind in [ElementKind::Node, ElementKind::Relationship] {
            for (index, id, field, value) in state.indexes.entries(kind) {
                index_entries.push(StoredIndexEntry {
                    kind,
                    index,
                    id,
                    field,
                    value,
                });
            }
        }

        Snapshot {
            next_node_id,
            next_relationship_id,
            nodes: state.store.all_nodes().cloned().collect(),
            relationships: state.store.all_relationships().cloned().collect(),
            index_entries,
        }
    }

    /// Rebuild store and indexes
    pub(crate) fn restore(self) -> PersistenceResult<GraphState> {
        let mut state = GraphState::default();
        for node in self.nodes {
            state
                .store
                .insert_node(node)
                .map_err(|e| PersistenceError::Corrupt(e.to_string()))?;
        }
        for rel in self.relationships {
            state
                .store
                .insert_relationship(rel)
                .map_err(|e| PersistenceError::Corrupt(e.to_string()))?;
        }
        for entry in self.index_entries {
            state
                .indexes
                .add(entry.kind, &entry.index, entry.id, &entry.field, entry.value)
                .map_err(|e| PersistenceError::Corrupt(e.to_string()))?;
        }
        Ok(state)
    }
}

/// Write a snapshot into `dir`, replacing any previous one atomically
pub fn write_snapshot(dir: &Path, snapshot: &Snapshot) -> PersistenceResult<()> {
    fs::create_dir_all(dir)?;
    let target = dir.join(SNAPSHOT_FILE);
    let temp = dir.join(format!("{}.tmp", SNAPSHOT_FILE));

    {
        let file = File::create(&temp)?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        bincode::serialize_into(&mut encoder, &SnapshotHeader { version: SNAPSHOT_VERSION })?;
        bincode::serialize_into(&mut encoder, snapshot)?;
        let mut writer = encoder.finish()?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&temp, &target)?;
    info!(
        "Snapshot written to {:?} ({} nodes, {} relationships)",
        target,
        snapshot.nodes.len(),
        snapshot.relationships.len()
    );
    Ok(())
}

/// Read the snapshot in `dir`, if there is one
pub fn read_snapshot(dir: &Path) -> PersistenceResult<Option<Snapshot>> {
    let path = dir.join(SNAPSHOT_FILE);
    if !path.exists() {
        debug!("No snapshot at {:?}", path);
        return Ok(None);
    }

    let file = File::open(&path)?;
    let mut decoder = GzDecoder::new(BufReader::new(file));
    let header: SnapshotHeader = bincode::deserialize_from(&mut decoder)?;
    if header.version != SNAPSHOT_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found: header.version,
            supported: SNAPSHOT_VERSION,
        });
    }
    let snapshot: Snapshot = bincode::deserialize_from(&mut decoder)?;
    info!("Loaded snapshot from {:?} ({} nodes)", path, snapshot.nodes.len());
    Ok(Some(snapshot))
}

//! Embedded graph database
//!
//! `GraphDatabase` owns the committed graph and its legacy indexes behind a
//! single reader-writer lock. Reads take the read lock for the duration of
//! one operation; transactions take the write lock only while committing.
//! Handles are cheap to clone and share one database.

use crate::config::{ConfigError, GraphConfig};
use crate::graph::{GraphError, GraphResult, GraphStore, Node, NodeId, PropertyContainer, PropertyValue, Relationship, RelationshipId};
use crate::index::{ElementKind, IndexManager, IndexQuery, IndexResult};
use crate::persistence::{read_snapshot, write_snapshot, PersistenceError, PersistenceResult, Snapshot};
use crate::query::{Params, QueryEngine, QueryResult, RecordBatch};
use crate::transaction::{Transaction, TransactionId};
use crate::traversal::{StoreAccess, TraversalDescription, TraversalResult, Traverser};
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Id of the reference node created in a fresh database
pub const REFERENCE_NODE_ID: NodeId = NodeId(0);

/// Errors opening a database
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Committed graph plus its indexes, guarded together
#[derive(Debug, Default)]
pub(crate) struct GraphState {
    pub store: GraphStore,
    pub indexes: IndexManager,
}

struct DatabaseInner {
    config: GraphConfig,
    state: RwLock<GraphState>,
    next_node_id: AtomicU64,
    next_relationship_id: AtomicU64,
    next_tx_id: AtomicU64,
    queries: QueryEngine,
    /// Serialises snapshot writers
    flush_lock: Mutex<()>,
}

/// Shared handle to an embedded graph database
#[derive(Clone)]
pub struct GraphDatabase {
    inner: Arc<DatabaseInner>,
}

impl GraphDatabase {
    /// Open a database, loading the snapshot in `store_dir` if there is one
    pub fn open(config: GraphConfig) -> Result<Self, DatabaseError> {
        config.validate()?;

        let (state, next_node_id, next_relationship_id) = match &config.store_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(PersistenceError::from)?;
                match read_snapshot(dir)? {
                    Some(snapshot) => {
                        let (nodes, rels) = (snapshot.next_node_id, snapshot.next_relationship_id);
                        (snapshot.restore()?, nodes, rels)
                    }
                    None => (GraphState::default(), 0, 0),
                }
            }
            None => (GraphState::default(), 0, 0),
        };

        let db = Self::from_state(config, state, next_node_id, next_relationship_id);
        info!(
            "Opened graph database ({} nodes, {} relationships, store: {:?})",
            db.node_count(),
            db.relationship_count(),
            db.inner.config.store_dir
        );
        Ok(db)
    }

    /// Fresh in-memory database with default configuration
    pub fn in_memory() -> Self {
        Self::from_state(GraphConfig::in_memory(), GraphState::default(), 0, 0)
    }

    fn from_state(config: GraphConfig, mut state: GraphState, next_node_id: u64, next_relationship_id: u64) -> Self {
        let mut next_node_id = next_node_id;
        // Only a never-used id space gets a reference node; a deleted one stays deleted
        if config.create_reference_node && next_node_id == 0 && state.store.node_count() == 0 {
            if state.store.insert_node(Node::new(REFERENCE_NODE_ID)).is_ok() {
                debug!("Created reference node {}", REFERENCE_NODE_ID);
            }
            next_node_id = REFERENCE_NODE_ID.as_u64() + 1;
        }

        let queries = QueryEngine::new(config.query_cache_capacity);
        Self {
            inner: Arc::new(DatabaseInner {
                config,
                state: RwLock::new(state),
                next_node_id: AtomicU64::new(next_node_id),
                next_relationship_id: AtomicU64::new(next_relationship_id),
                next_tx_id: AtomicU64::new(1),
                queries,
                flush_lock: Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.inner.config
    }

    pub(crate) fn read_state(&self) -> RwLockReadGuard<'_, GraphState> {
        self.inner.state.read()
    }

    pub(crate) fn write_state(&self) -> RwLockWriteGuard<'_, GraphState> {
        self.inner.state.write()
    }

    pub(crate) fn next_node_id(&self) -> NodeId {
        NodeId::new(self.inner.next_node_id.fetch_add(1, Ordering::SeqCst))
    }

    pub(crate) fn next_relationship_id(&self) -> RelationshipId {
        RelationshipId::new(self.inner.next_relationship_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Start a new transaction
    pub fn begin_tx(&self) -> Transaction {
        let id: TransactionId = self.inner.next_tx_id.fetch_add(1, Ordering::SeqCst);
        Transaction::new(id, self.clone())
    }

    // ---- committed reads ----

    pub fn reference_node(&self) -> GraphResult<Node> {
        self.read_state()
            .store
            .get_node(REFERENCE_NODE_ID)
            .cloned()
            .ok_or(GraphError::ReferenceNodeMissing)
    }

    pub fn get_node(&self, id: NodeId) -> GraphResult<Node> {
        self.read_state()
            .store
            .get_node(id)
            .cloned()
            .ok_or(GraphError::NodeNotFound(id))
    }

    pub fn get_relationship(&self, id: RelationshipId) -> GraphResult<Relationship> {
        self.read_state()
            .store
            .get_relationship(id)
            .cloned()
            .ok_or(GraphError::RelationshipNotFound(id))
    }

    /// Committed node or relationship with raw `id`
    pub fn get_element<T: PropertyContainer>(&self, id: u64) -> Option<T> {
        T::fetch(&self.read_state().store, id)
    }

    pub fn node_count(&self) -> usize {
        self.read_state().store.node_count()
    }

    pub fn relationship_count(&self) -> usize {
        self.read_state().store.relationship_count()
    }

    /// Every committed node, in id order
    pub fn all_nodes(&self) -> Vec<Node> {
        let mut nodes: Vec<Node> = self.read_state().store.all_nodes().cloned().collect();
        nodes.sort_by_key(|n| n.id);
        nodes
    }

    /// Run a read-only Cypher statement against committed state
    pub fn execute_query(&self, statement: &str, params: &Params) -> QueryResult<RecordBatch> {
        let state = self.read_state();
        self.inner.queries.execute(statement, params, &state.store, &state.indexes)
    }

    /// Lazy traversal from `start` over committed state. Each step holds the
    /// read lock only while it expands one path.
    pub fn traverse(&self, start: NodeId, description: &TraversalDescription) -> TraversalResult<Traverser<GraphDatabase>> {
        Traverser::new(self.clone(), description.clone(), start)
    }

    /// Elements whose indexed `field` holds exactly `value`
    pub fn index_lookup<T: PropertyContainer>(
        &self,
        index: &str,
        field: &str,
        value: &PropertyValue,
    ) -> IndexResult<Vec<T>> {
        let state = self.read_state();
        let ids = state.indexes.get(T::KIND, index, field, value)?;
        Ok(ids.into_iter().filter_map(|id| T::fetch(&state.store, id)).collect())
    }

    /// Elements matching a parsed index query
    pub fn index_query<T: PropertyContainer>(&self, index: &str, query: &IndexQuery) -> IndexResult<Vec<T>> {
        let state = self.read_state();
        let ids = state.indexes.query(T::KIND, index, query)?;
        Ok(ids.into_iter().filter_map(|id| T::fetch(&state.store, id)).collect())
    }

    pub fn node_index_names(&self) -> Vec<String> {
        self.read_state().indexes.index_names(ElementKind::Node)
    }

    pub fn relationship_index_names(&self) -> Vec<String> {
        self.read_state().indexes.index_names(ElementKind::Relationship)
    }

    // ---- durability ----

    /// Write a snapshot of committed state; a no-op for in-memory databases
    pub fn flush(&self) -> PersistenceResult<()> {
        let Some(dir) = &self.inner.config.store_dir else {
            return Ok(());
        };
        let _guard = self.inner.flush_lock.lock();
        let snapshot = {
            let state = self.read_state();
            Snapshot::capture(
                &state,
                self.inner.next_node_id.load(Ordering::SeqCst),
                self.inner.next_relationship_id.load(Ordering::SeqCst),
            )
        };
        write_snapshot(dir, &snapshot)
    }

    /// Called after a commit changed committed state
    pub(crate) fn after_commit(&self) -> PersistenceResult<()> {
        if self.inner.config.sync_on_commit {
            self.flush()?;
        }
        Ok(())
    }

    /// Flush and release the database
    pub fn shutdown(self) -> PersistenceResult<()> {
        info!("Shutting down graph database");
        self.flush()
    }
}

impl StoreAccess for GraphDatabase {
    fn with_store<R>(&self, f: impl FnOnce(&GraphStore) -> R) -> R {
        f(&self.read_state().store)
    }
}

impl fmt::Debug for GraphDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphDatabase")
            .field("store_dir", &self.inner.config.store_dir)
            .field("nodes", &self.node_count())
            .field("relationships", &self.relationship_count())
            .finish()
    }
}

//! Buffered write transactions
//!
//! A transaction keeps every change to itself until `commit()`:
//! - created nodes and relationships live in the transaction
//! - changes to committed elements are recorded as operations
//! - reads through the transaction see its own pending writes
//!
//! Commit applies the whole change set under the database write lock and
//! either succeeds completely or leaves the database untouched. Commits are
//! serialised; there is no conflict detection, the last commit wins.

mod commit;
pub mod types;

pub use types::{TransactionError, TransactionId, TransactionResult, TransactionState};

use crate::database::GraphDatabase;
use crate::graph::{
    Direction, GraphError, Label, Node, NodeId, PropertyMap, PropertyValue, Relationship, RelationshipId,
    RelationshipType,
};
use crate::index::ElementKind;
use commit::ChangeSet;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use tracing::{debug, warn};
use types::TxOp;

/// A unit of work against a `GraphDatabase`
pub struct Transaction {
    id: TransactionId,
    db: GraphDatabase,
    state: TransactionState,
    created_nodes: IndexMap<NodeId, Node>,
    created_relationships: IndexMap<RelationshipId, Relationship>,
    deleted_nodes: FxHashSet<NodeId>,
    deleted_relationships: FxHashSet<RelationshipId>,
    ops: Vec<TxOp>,
}

impl Transaction {
    pub(crate) fn new(id: TransactionId, db: GraphDatabase) -> Self {
        debug!("Transaction {} started", id);
        Self {
            id,
            db,
            state: TransactionState::Active,
            created_nodes: IndexMap::new(),
            created_relationships: IndexMap::new(),
            deleted_nodes: FxHashSet::default(),
            deleted_relationships: FxHashSet::default(),
            ops: Vec::new(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    fn ensure_active(&self) -> TransactionResult<()> {
        if self.state.is_active() {
            Ok(())
        } else {
            Err(TransactionError::NotActive {
                id: self.id,
                state: self.state,
            })
        }
    }

    // ---- reads ----

    fn committed_node(&self, id: NodeId) -> Option<Node> {
        self.db.read_state().store.get_node(id).cloned()
    }

    fn committed_relationship(&self, id: RelationshipId) -> Option<Relationship> {
        self.db.read_state().store.get_relationship(id).cloned()
    }

    fn node_visible(&self, id: NodeId) -> bool {
        self.created_nodes.contains_key(&id)
            || (!self.deleted_nodes.contains(&id) && self.db.read_state().store.has_node(id))
    }

    fn relationship_visible(&self, id: RelationshipId) -> bool {
        self.created_relationships.contains_key(&id)
            || (!self.deleted_relationships.contains(&id) && self.db.read_state().store.has_relationship(id))
    }

    /// Node as seen by this transaction
    pub fn get_node(&self, id: NodeId) -> TransactionResult<Node> {
        self.ensure_active()?;
        if let Some(node) = self.created_nodes.get(&id) {
            return Ok(node.clone());
        }
        if self.deleted_nodes.contains(&id) {
            return Err(GraphError::NodeNotFound(id).into());
        }
        let mut node = self.committed_node(id).ok_or(GraphError::NodeNotFound(id))?;
        for op in &self.ops {
            match op {
                TxOp::SetNodeProperty { id: target, key, value } if *target == id => {
                    node.set_property(key.clone(), value.clone());
                }
                TxOp::RemoveNodeProperty { id: target, key } if *target == id => {
                    node.remove_property(key);
                }
                TxOp::AddLabel { id: target, label } if *target == id => {
                    node.add_label(label.clone());
                }
                _ => {}
            }
        }
        Ok(node)
    }

    /// Relationship as seen by this transaction
    pub fn get_relationship(&self, id: RelationshipId) -> TransactionResult<Relationship> {
        self.ensure_active()?;
        if let Some(rel) = self.created_relationships.get(&id) {
            return Ok(rel.clone());
        }
        if self.deleted_relationships.contains(&id) {
            return Err(GraphError::RelationshipNotFound(id).into());
        }
        let mut rel = self
            .committed_relationship(id)
            .ok_or(GraphError::RelationshipNotFound(id))?;
        for op in &self.ops {
            match op {
                TxOp::SetRelationshipProperty { id: target, key, value } if *target == id => {
                    rel.set_property(key.clone(), value.clone());
                }
                TxOp::RemoveRelationshipProperty { id: target, key } if *target == id => {
                    rel.remove_property(key);
                }
                _ => {}
            }
        }
        Ok(rel)
    }

    // ---- creation ----

    /// Create a node with properties
    pub fn create_node(&mut self, properties: PropertyMap) -> TransactionResult<Node> {
        self.create_node_with_labels(Vec::new(), properties)
    }

    /// Create a node with labels and properties
    pub fn create_node_with_labels(&mut self, labels: Vec<Label>, properties: PropertyMap) -> TransactionResult<Node> {
        self.ensure_active()?;
        let id = self.db.next_node_id();
        let node = Node::new_with_properties(id, labels, properties);
        self.created_nodes.insert(id, node.clone());
        Ok(node)
    }

    /// Create a typed relationship between two nodes visible to this transaction
    pub fn create_relationship(
        &mut self,
        start: NodeId,
        end: NodeId,
        rel_type: impl Into<RelationshipType>,
        properties: PropertyMap,
    ) -> TransactionResult<Relationship> {
        self.ensure_active()?;
        if !self.node_visible(start) {
            return Err(GraphError::InvalidRelationshipStart(start).into());
        }
        if !self.node_visible(end) {
            return Err(GraphError::InvalidRelationshipEnd(end).into());
        }
        let id = self.db.next_relationship_id();
        let rel = Relationship::new_with_properties(id, start, end, rel_type, properties);
        self.created_relationships.insert(id, rel.clone());
        Ok(rel)
    }

    // ---- updates ----

    pub fn set_node_property(
        &mut self,
        id: NodeId,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> TransactionResult<()> {
        self.ensure_active()?;
        let (key, value) = (key.into(), value.into());
        if let Some(node) = self.created_nodes.get_mut(&id) {
            node.set_property(key, value);
            return Ok(());
        }
        if !self.node_visible(id) {
            return Err(GraphError::NodeNotFound(id).into());
        }
        self.ops.push(TxOp::SetNodeProperty { id, key, value });
        Ok(())
    }

    pub fn remove_node_property(&mut self, id: NodeId, key: &str) -> TransactionResult<()> {
        self.ensure_active()?;
        if let Some(node) = self.created_nodes.get_mut(&id) {
            node.remove_property(key);
            return Ok(());
        }
        if !self.node_visible(id) {
            return Err(GraphError::NodeNotFound(id).into());
        }
        self.ops.push(TxOp::RemoveNodeProperty {
            id,
            key: key.to_string(),
        });
        Ok(())
    }

    pub fn add_label(&mut self, id: NodeId, label: impl Into<Label>) -> TransactionResult<()> {
        self.ensure_active()?;
        let label = label.into();
        if let Some(node) = self.created_nodes.get_mut(&id) {
            node.add_label(label);
            return Ok(());
        }
        if !self.node_visible(id) {
            return Err(GraphError::NodeNotFound(id).into());
        }
        self.ops.push(TxOp::AddLabel { id, label });
        Ok(())
    }

    pub fn set_relationship_property(
        &mut self,
        id: RelationshipId,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> TransactionResult<()> {
        self.ensure_active()?;
        let (key, value) = (key.into(), value.into());
        if let Some(rel) = self.created_relationships.get_mut(&id) {
            rel.set_property(key, value);
            return Ok(());
        }
        if !self.relationship_visible(id) {
            return Err(GraphError::RelationshipNotFound(id).into());
        }
        self.ops.push(TxOp::SetRelationshipProperty { id, key, value });
        Ok(())
    }

    pub fn remove_relationship_property(&mut self, id: RelationshipId, key: &str) -> TransactionResult<()> {
        self.ensure_active()?;
        if let Some(rel) = self.created_relationships.get_mut(&id) {
            rel.remove_property(key);
            return Ok(());
        }
        if !self.relationship_visible(id) {
            return Err(GraphError::RelationshipNotFound(id).into());
        }
        self.ops.push(TxOp::RemoveRelationshipProperty {
            id,
            key: key.to_string(),
        });
        Ok(())
    }

    // ---- deletion ----

    /// Delete a node. Fails if it still has relationships visible to this
    /// transaction. Its index entries go with it.
    pub fn delete_node(&mut self, id: NodeId) -> TransactionResult<()> {
        self.ensure_active()?;
        let attached_created = self
            .created_relationships
            .values()
            .any(|r| r.start == id || r.end == id);

        if self.created_nodes.contains_key(&id) {
            if attached_created {
                return Err(GraphError::NodeHasRelationships(id).into());
            }
            self.created_nodes.shift_remove(&id);
            self.ops.retain(|op| !op.targets(ElementKind::Node, id.as_u64()));
            return Ok(());
        }

        if !self.node_visible(id) {
            return Err(GraphError::NodeNotFound(id).into());
        }
        let attached_committed = self
            .db
            .read_state()
            .store
            .relationships(id, Direction::Both, &[])
            .iter()
            .any(|r| !self.deleted_relationships.contains(&r.id));
        if attached_created || attached_committed {
            return Err(GraphError::NodeHasRelationships(id).into());
        }

        self.deleted_nodes.insert(id);
        self.ops.push(TxOp::DeleteNode(id));
        Ok(())
    }

    /// Delete a relationship and its index entries
    pub fn delete_relationship(&mut self, id: RelationshipId) -> TransactionResult<()> {
        self.ensure_active()?;
        if self.created_relationships.shift_remove(&id).is_some() {
            self.ops
                .retain(|op| !op.targets(ElementKind::Relationship, id.as_u64()));
            return Ok(());
        }
        if !self.relationship_visible(id) {
            return Err(GraphError::RelationshipNotFound(id).into());
        }
        self.deleted_relationships.insert(id);
        self.ops.push(TxOp::DeleteRelationship(id));
        Ok(())
    }

    // ---- indexes ----

    fn ensure_element(&self, kind: ElementKind, id: u64) -> TransactionResult<()> {
        match kind {
            ElementKind::Node if !self.node_visible(NodeId::new(id)) => {
                Err(GraphError::NodeNotFound(NodeId::new(id)).into())
            }
            ElementKind::Relationship if !self.relationship_visible(RelationshipId::new(id)) => {
                Err(GraphError::RelationshipNotFound(RelationshipId::new(id)).into())
            }
            _ => Ok(()),
        }
    }

    /// Associate `field = value` with an element in a named index
    pub fn add_to_index(
        &mut self,
        kind: ElementKind,
        index: &str,
        id: u64,
        field: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> TransactionResult<()> {
        self.ensure_active()?;
        self.db.read_state().indexes.check_kind(kind, index)?;
        self.ensure_element(kind, id)?;
        self.ops.push(TxOp::IndexAdd {
            kind,
            index: index.to_string(),
            id,
            field: field.into(),
            value: value.into(),
        });
        Ok(())
    }

    /// Remove entries of an element from a named index; `None` removes every
    /// value under `field`
    pub fn remove_from_index(
        &mut self,
        kind: ElementKind,
        index: &str,
        id: u64,
        field: impl Into<String>,
        value: Option<PropertyValue>,
    ) -> TransactionResult<()> {
        self.ensure_active()?;
        self.db.read_state().indexes.check_kind(kind, index)?;
        self.ops.push(TxOp::IndexRemove {
            kind,
            index: index.to_string(),
            id,
            field: field.into(),
            value,
        });
        Ok(())
    }

    // ---- completion ----

    /// Apply all buffered changes atomically
    pub fn commit(&mut self) -> TransactionResult<()> {
        self.ensure_active()?;

        let result = {
            let changes = ChangeSet {
                nodes: self.created_nodes.values().collect(),
                relationships: self.created_relationships.values().collect(),
                ops: &self.ops,
            };
            if changes.is_empty() {
                Ok(false)
            } else {
                let mut state = self.db.write_state();
                commit::apply(&mut state, &changes).map(|_| true)
            }
        };

        match result {
            Ok(changed) => {
                debug!(
                    "Transaction {} committed ({} nodes, {} relationships, {} ops)",
                    self.id,
                    self.created_nodes.len(),
                    self.created_relationships.len(),
                    self.ops.len()
                );
                self.state = TransactionState::Committed;
                self.clear();
                if changed {
                    self.db.after_commit()?;
                }
                Ok(())
            }
            Err(e) => {
                warn!("Transaction {} commit failed: {}", self.id, e);
                self.state = TransactionState::RolledBack;
                self.clear();
                Err(TransactionError::CommitFailed {
                    id: self.id,
                    cause: Box::new(e),
                })
            }
        }
    }

    /// Discard all buffered changes
    pub fn rollback(&mut self) -> TransactionResult<()> {
        self.ensure_active()?;
        debug!("Transaction {} rolled back", self.id);
        self.state = TransactionState::RolledBack;
        self.clear();
        Ok(())
    }

    fn clear(&mut self) {
        self.created_nodes.clear();
        self.created_relationships.clear();
        self.deleted_nodes.clear();
        self.deleted_relationships.clear();
        self.ops.clear();
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.state.is_active() {
            warn!("Transaction {} dropped while active, rolling back", self.id);
            self.state = TransactionState::RolledBack;
            self.clear();
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("created_nodes", &self.created_nodes.len())
            .field("created_relationships", &self.created_relationships.len())
            .field("ops", &self.ops.len())
            .finish()
    }
}

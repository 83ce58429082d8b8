//! In-memory graph storage
//!
//! Arena layout indexed by id:
//! - nodes: NodeId -> Option<Node>
//! - relationships: RelationshipId -> Option<Relationship>
//! - outgoing / incoming: NodeId -> adjacency list of RelationshipId
//! - label_index / type_index for label and type scans
//!
//! Ids are allocated outside the store, from the database's atomic counters,
//! so a transaction can hand out ids before it commits. Slots of rolled-back ids
//! simply stay empty.

use super::node::Node;
use super::property::PropertyValue;
use super::relationship::Relationship;
use super::types::{Direction, Label, NodeId, RelationshipId, RelationshipType};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors that can occur during graph operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Relationship {0} not found")]
    RelationshipNotFound(RelationshipId),

    #[error("Node {0} already exists")]
    NodeAlreadyExists(NodeId),

    #[error("Relationship {0} already exists")]
    RelationshipAlreadyExists(RelationshipId),

    #[error("Invalid relationship: start node {0} does not exist")]
    InvalidRelationshipStart(NodeId),

    #[error("Invalid relationship: end node {0} does not exist")]
    InvalidRelationshipEnd(NodeId),

    #[error("Node {0} still has relationships")]
    NodeHasRelationships(NodeId),

    #[error("Reference node not found")]
    ReferenceNodeMissing,
}

pub type GraphResult<T> = Result<T, GraphError>;

/// In-memory graph storage
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: Vec<Option<Node>>,
    relationships: Vec<Option<Relationship>>,
    outgoing: Vec<Vec<RelationshipId>>,
    incoming: Vec<Vec<RelationshipId>>,
    label_index: FxHashMap<Label, BTreeSet<NodeId>>,
    type_index: FxHashMap<RelationshipType, BTreeSet<RelationshipId>>,
    node_count: usize,
    relationship_count: usize,
}

impl GraphStore {
    /// Create a new empty graph store
    pub fn new() -> Self {
        GraphStore {
            nodes: Vec::with_capacity(1024),
            relationships: Vec::with_capacity(4096),
            outgoing: Vec::with_capacity(1024),
            incoming: Vec::with_capacity(1024),
            ..Default::default()
        }
    }

    /// Insert a node under its pre-allocated id
    pub fn insert_node(&mut self, node: Node) -> GraphResult<()> {
        let id = node.id;
        let idx = id.as_u64() as usize;

        if self.has_node(id) {
            return Err(GraphError::NodeAlreadyExists(id));
        }

        // Ensure storage capacity
        if idx >= self.nodes.len() {
            self.nodes.resize(idx + 1, None);
            self.outgoing.resize(idx + 1, Vec::new());
            self.incoming.resize(idx + 1, Vec::new());
        }

        for label in &node.labels {
            self.label_index.entry(label.clone()).or_default().insert(id);
        }

        self.nodes[idx] = Some(node);
        self.node_count += 1;
        Ok(())
    }

    /// Insert a relationship under its pre-allocated id
    pub fn insert_relationship(&mut self, relationship: Relationship) -> GraphResult<()> {
        let id = relationship.id;
        let idx = id.as_u64() as usize;

        if !self.has_node(relationship.start) {
            return Err(GraphError::InvalidRelationshipStart(relationship.start));
        }
        if !self.has_node(relationship.end) {
            return Err(GraphError::InvalidRelationshipEnd(relationship.end));
        }
        if self.has_relationship(id) {
            return Err(GraphError::RelationshipAlreadyExists(id));
        }

        if idx >= self.relationships.len() {
            self.relationships.resize(idx + 1, None);
        }

        self.outgoing[relationship.start.as_u64() as usize].push(id);
        self.incoming[relationship.end.as_u64() as usize].push(id);
        self.type_index
            .entry(relationship.rel_type.clone())
            .or_default()
            .insert(id);

        self.relationships[idx] = Some(relationship);
        self.relationship_count += 1;
        Ok(())
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.as_u64() as usize).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> GraphResult<&mut Node> {
        self.nodes
            .get_mut(id.as_u64() as usize)
            .and_then(Option::as_mut)
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// Check if a node exists
    pub fn has_node(&self, id: NodeId) -> bool {
        self.get_node(id).is_some()
    }

    /// Get a relationship by ID
    pub fn get_relationship(&self, id: RelationshipId) -> Option<&Relationship> {
        self.relationships.get(id.as_u64() as usize).and_then(Option::as_ref)
    }

    fn relationship_mut(&mut self, id: RelationshipId) -> GraphResult<&mut Relationship> {
        self.relationships
            .get_mut(id.as_u64() as usize)
            .and_then(Option::as_mut)
            .ok_or(GraphError::RelationshipNotFound(id))
    }

    /// Check if a relationship exists
    pub fn has_relationship(&self, id: RelationshipId) -> bool {
        self.get_relationship(id).is_some()
    }

    /// Set a node property, returning the previous value
    pub fn set_node_property(
        &mut self,
        id: NodeId,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> GraphResult<Option<PropertyValue>> {
        Ok(self.node_mut(id)?.set_property(key, value))
    }

    /// Remove a node property, returning the removed value
    pub fn remove_node_property(&mut self, id: NodeId, key: &str) -> GraphResult<Option<PropertyValue>> {
        Ok(self.node_mut(id)?.remove_property(key))
    }

    /// Set a relationship property, returning the previous value
    pub fn set_relationship_property(
        &mut self,
        id: RelationshipId,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> GraphResult<Option<PropertyValue>> {
        Ok(self.relationship_mut(id)?.set_property(key, value))
    }

    /// Remove a relationship property, returning the removed value
    pub fn remove_relationship_property(
        &mut self,
        id: RelationshipId,
        key: &str,
    ) -> GraphResult<Option<PropertyValue>> {
        Ok(self.relationship_mut(id)?.remove_property(key))
    }

    /// Add a label to an existing node AND update the label index.
    /// Returns false if the node already had it.
    pub fn add_label(&mut self, id: NodeId, label: impl Into<Label>) -> GraphResult<bool> {
        let label = label.into();
        let node = self.node_mut(id)?;
        if node.has_label(&label) {
            return Ok(false);
        }
        node.add_label(label.clone());
        self.label_index.entry(label).or_default().insert(id);
        Ok(true)
    }

    /// Remove a label from a node. Returns false if it was not set.
    pub fn remove_label(&mut self, id: NodeId, label: &Label) -> GraphResult<bool> {
        let node = self.node_mut(id)?;
        if !node.labels.remove(label) {
            return Ok(false);
        }
        if let Some(set) = self.label_index.get_mut(label) {
            set.remove(&id);
            if set.is_empty() {
                self.label_index.remove(label);
            }
        }
        Ok(true)
    }

    /// Delete a node. The node must not have relationships left.
    pub fn delete_node(&mut self, id: NodeId) -> GraphResult<Node> {
        if !self.has_node(id) {
            return Err(GraphError::NodeNotFound(id));
        }
        if self.degree(id) > 0 {
            return Err(GraphError::NodeHasRelationships(id));
        }

        let idx = id.as_u64() as usize;
        let node = self.nodes[idx].take().ok_or(GraphError::NodeNotFound(id))?;

        for label in &node.labels {
            if let Some(set) = self.label_index.get_mut(label) {
                set.remove(&id);
                if set.is_empty() {
                    self.label_index.remove(label);
                }
            }
        }

        self.node_count -= 1;
        Ok(node)
    }

    /// Delete a relationship
    pub fn delete_relationship(&mut self, id: RelationshipId) -> GraphResult<Relationship> {
        let idx = id.as_u64() as usize;
        let relationship = self
            .relationships
            .get_mut(idx)
            .and_then(Option::take)
            .ok_or(GraphError::RelationshipNotFound(id))?;

        if let Some(list) = self.outgoing.get_mut(relationship.start.as_u64() as usize) {
            list.retain(|r| *r != id);
        }
        if let Some(list) = self.incoming.get_mut(relationship.end.as_u64() as usize) {
            list.retain(|r| *r != id);
        }
        if let Some(set) = self.type_index.get_mut(&relationship.rel_type) {
            set.remove(&id);
            if set.is_empty() {
                self.type_index.remove(&relationship.rel_type);
            }
        }

        self.relationship_count -= 1;
        Ok(relationship)
    }

    /// Relationships attached to `node` in `direction`, optionally restricted
    /// to `types`. Adjacency order; outgoing before incoming for `Both`, and a
    /// self-loop is reported once.
    pub fn relationships(
        &self,
        node: NodeId,
        direction: Direction,
        types: &[RelationshipType],
    ) -> Vec<&Relationship> {
        let idx = node.as_u64() as usize;
        let mut result = Vec::new();

        let type_ok = |r: &Relationship| types.is_empty() || types.contains(&r.rel_type);

        if matches!(direction, Direction::Outgoing | Direction::Both) {
            if let Some(list) = self.outgoing.get(idx) {
                for id in list {
                    if let Some(r) = self.get_relationship(*id) {
                        if type_ok(r) {
                            result.push(r);
                        }
                    }
                }
            }
        }
        if matches!(direction, Direction::Incoming | Direction::Both) {
            if let Some(list) = self.incoming.get(idx) {
                for id in list {
                    if let Some(r) = self.get_relationship(*id) {
                        let loop_seen = direction == Direction::Both && r.start == r.end;
                        if type_ok(r) && !loop_seen {
                            result.push(r);
                        }
                    }
                }
            }
        }

        result
    }

    /// Outgoing relationships of a node
    pub fn get_outgoing_relationships(&self, node: NodeId) -> Vec<&Relationship> {
        self.relationships(node, Direction::Outgoing, &[])
    }

    /// Incoming relationships of a node
    pub fn get_incoming_relationships(&self, node: NodeId) -> Vec<&Relationship> {
        self.relationships(node, Direction::Incoming, &[])
    }

    /// Number of relationships attached to a node
    pub fn degree(&self, node: NodeId) -> usize {
        let idx = node.as_u64() as usize;
        let out = self.outgoing.get(idx).map_or(0, Vec::len);
        let inc = self.incoming.get(idx).map_or(0, Vec::len);
        out + inc
    }

    /// Get all nodes with a specific label, in id order
    pub fn get_nodes_by_label(&self, label: &Label) -> Vec<&Node> {
        self.label_index
            .get(label)
            .map(|ids| ids.iter().filter_map(|id| self.get_node(*id)).collect())
            .unwrap_or_default()
    }

    /// Get all relationships of a type, in id order
    pub fn get_relationships_by_type(&self, rel_type: &RelationshipType) -> Vec<&Relationship> {
        self.type_index
            .get(rel_type)
            .map(|ids| ids.iter().filter_map(|id| self.get_relationship(*id)).collect())
            .unwrap_or_default()
    }

    /// All nodes in id order
    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter_map(Option::as_ref)
    }

    /// All relationships in id order
    pub fn all_relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter().filter_map(Option::as_ref)
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn relationship_count(&self) -> usize {
        self.relationship_count
    }

    /// Clear all data
    pub fn clear(&mut self) {
        *self = GraphStore::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PropertyMap;

    fn node(id: u64) -> Node {
        Node::new(NodeId::new(id))
    }

    fn rel(id: u64, start: u64, end: u64, rel_type: &str) -> Relationship {
        Relationship::new(RelationshipId::new(id), NodeId::new(start), NodeId::new(end), rel_type)
    }

    #[test]
    fn test_insert_and_get() {
        let mut store = GraphStore::new();
        store.insert_node(node(1)).unwrap();
        store.insert_node(node(2)).unwrap();
        store.insert_relationship(rel(1, 1, 2, "KNOWS")).unwrap();

        assert_eq!(store.node_count(), 2);
        assert_eq!(store.relationship_count(), 1);
        assert!(store.get_node(NodeId::new(1)).is_some());
        assert!(store.get_node(NodeId::new(3)).is_none());
        assert_eq!(store.get_relationship(RelationshipId::new(1)).unwrap().end, NodeId::new(2));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut store = GraphStore::new();
        store.insert_node(node(1)).unwrap();
        assert_eq!(store.insert_node(node(1)), Err(GraphError::NodeAlreadyExists(NodeId::new(1))));
    }

    #[test]
    fn test_relationship_requires_endpoints() {
        let mut store = GraphStore::new();
        store.insert_node(node(1)).unwrap();

        let err = store.insert_relationship(rel(1, 1, 9, "KNOWS")).unwrap_err();
        assert_eq!(err, GraphError::InvalidRelationshipEnd(NodeId::new(9)));
        let err = store.insert_relationship(rel(1, 9, 1, "KNOWS")).unwrap_err();
        assert_eq!(err, GraphError::InvalidRelationshipStart(NodeId::new(9)));
    }

    #[test]
    fn test_adjacency_and_direction() {
        let mut store = GraphStore::new();
        for id in 1..=3 {
            store.insert_node(node(id)).unwrap();
        }
        store.insert_relationship(rel(1, 1, 2, "KNOWS")).unwrap();
        store.insert_relationship(rel(2, 3, 1, "KNOWS")).unwrap();
        store.insert_relationship(rel(3, 1, 3, "LIKES")).unwrap();
        store.insert_relationship(rel(4, 1, 1, "SELF")).unwrap();

        let out: Vec<u64> = store
            .relationships(NodeId::new(1), Direction::Outgoing, &[])
            .iter()
            .map(|r| r.id.as_u64())
            .collect();
        assert_eq!(out, vec![1, 3, 4]);

        let inc = store.relationships(NodeId::new(1), Direction::Incoming, &[]);
        assert_eq!(inc.len(), 2);

        // self-loop appears once
        let both = store.relationships(NodeId::new(1), Direction::Both, &[]);
        assert_eq!(both.len(), 4);

        let knows = store.relationships(NodeId::new(1), Direction::Both, &[RelationshipType::new("KNOWS")]);
        assert_eq!(knows.len(), 2);
    }

    #[test]
    fn test_delete_node_with_relationships_fails() {
        let mut store = GraphStore::new();
        store.insert_node(node(1)).unwrap();
        store.insert_node(node(2)).unwrap();
        store.insert_relationship(rel(1, 1, 2, "KNOWS")).unwrap();

        assert_eq!(store.delete_node(NodeId::new(1)), Err(GraphError::NodeHasRelationships(NodeId::new(1))));

        store.delete_relationship(RelationshipId::new(1)).unwrap();
        assert!(store.delete_node(NodeId::new(1)).is_ok());
        assert_eq!(store.node_count(), 1);
        assert_eq!(store.degree(NodeId::new(2)), 0);
        assert!(store.get_relationships_by_type(&RelationshipType::new("KNOWS")).is_empty());
    }

    #[test]
    fn test_label_index() {
        let mut store = GraphStore::new();
        let person = Node::new_with_properties(NodeId::new(1), vec![Label::new("Person")], PropertyMap::new());
        store.insert_node(person).unwrap();
        store.insert_node(node(2)).unwrap();
        assert!(store.add_label(NodeId::new(2), "Person").unwrap());
        assert!(!store.add_label(NodeId::new(2), "Person").unwrap());

        assert_eq!(store.get_nodes_by_label(&Label::new("Person")).len(), 2);
        store.delete_node(NodeId::new(1)).unwrap();
        assert_eq!(store.get_nodes_by_label(&Label::new("Person")).len(), 1);
    }

    #[test]
    fn test_property_updates() {
        let mut store = GraphStore::new();
        store.insert_node(node(1)).unwrap();

        assert_eq!(store.set_node_property(NodeId::new(1), "name", "Alice").unwrap(), None);
        let old = store.set_node_property(NodeId::new(1), "name", "Bob").unwrap();
        assert_eq!(old, Some(PropertyValue::from("Alice")));
        assert_eq!(
            store.set_node_property(NodeId::new(5), "name", "x"),
            Err(GraphError::NodeNotFound(NodeId::new(5)))
        );
    }

    #[test]
    fn test_all_nodes_in_id_order() {
        let mut store = GraphStore::new();
        store.insert_node(node(5)).unwrap();
        store.insert_node(node(2)).unwrap();
        store.insert_node(node(9)).unwrap();

        let ids: Vec<u64> = store.all_nodes().map(|n| n.id.as_u64()).collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }
}

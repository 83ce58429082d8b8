//! Relationship implementation for the property graph
//!
//! Relationships are typed and directed; several may connect the same pair of
//! nodes.

use super::property::{PropertyMap, PropertyValue};
use super::types::{Direction, NodeId, RelationshipId, RelationshipType};
use serde::{Deserialize, Serialize};

/// A directed, typed relationship between two nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    /// Unique identifier for this relationship
    pub id: RelationshipId,

    /// Node the relationship starts at
    pub start: NodeId,

    /// Node the relationship ends at
    pub end: NodeId,

    /// Relationship type (e.g., "KNOWS")
    pub rel_type: RelationshipType,

    /// Properties associated with this relationship
    pub properties: PropertyMap,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

impl Relationship {
    /// Create a new relationship without properties
    pub fn new(
        id: RelationshipId,
        start: NodeId,
        end: NodeId,
        rel_type: impl Into<RelationshipType>,
    ) -> Self {
        Self::new_with_properties(id, start, end, rel_type, PropertyMap::new())
    }

    /// Create a new relationship with properties
    pub fn new_with_properties(
        id: RelationshipId,
        start: NodeId,
        end: NodeId,
        rel_type: impl Into<RelationshipType>,
        properties: PropertyMap,
    ) -> Self {
        Relationship {
            id,
            start,
            end,
            rel_type: rel_type.into(),
            properties,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn id(&self) -> RelationshipId {
        self.id
    }

    pub fn start_node(&self) -> NodeId {
        self.start
    }

    pub fn end_node(&self) -> NodeId {
        self.end
    }

    pub fn rel_type(&self) -> &RelationshipType {
        &self.rel_type
    }

    pub fn is_type(&self, rel_type: &RelationshipType) -> bool {
        &self.rel_type == rel_type
    }

    /// The node at the other end, seen from `node`
    pub fn other_node(&self, node: NodeId) -> Option<NodeId> {
        if self.start == node {
            Some(self.end)
        } else if self.end == node {
            Some(self.start)
        } else {
            None
        }
    }

    /// Whether this relationship leaves `node` in the given direction
    pub fn matches_direction(&self, node: NodeId, direction: Direction) -> bool {
        match direction {
            Direction::Outgoing => self.start == node,
            Direction::Incoming => self.end == node,
            Direction::Both => self.start == node || self.end == node,
        }
    }

    /// Set a property value, returning the previous one
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Option<PropertyValue> {
        self.properties.insert(key.into(), value.into())
    }

    /// Get a property value
    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Remove a property
    pub fn remove_property(&mut self, key: &str) -> Option<PropertyValue> {
        self.properties.remove(key)
    }

    /// Check if property exists
    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }
}

impl PartialEq for Relationship {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Relationship {}

impl std::hash::Hash for Relationship {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

//! Behaviour shared by nodes and relationships

use super::node::Node;
use super::property::{PropertyMap, PropertyValue};
use super::relationship::Relationship;
use super::store::GraphStore;
use super::types::{NodeId, RelationshipId};
use crate::index::ElementKind;

/// An element that carries properties and can be indexed
pub trait PropertyContainer: Clone + Send + 'static {
    const KIND: ElementKind;

    /// Raw id, unique within the element kind
    fn element_id(&self) -> u64;

    fn properties(&self) -> &PropertyMap;

    fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties().get(key)
    }

    /// Load the committed element with `id`
    fn fetch(store: &GraphStore, id: u64) -> Option<Self>;
}

impl PropertyContainer for Node {
    const KIND: ElementKind = ElementKind::Node;

    fn element_id(&self) -> u64 {
        self.id.as_u64()
    }

    fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    fn fetch(store: &GraphStore, id: u64) -> Option<Self> {
        store.get_node(NodeId::new(id)).cloned()
    }
}

impl PropertyContainer for Relationship {
    const KIND: ElementKind = ElementKind::Relationship;

    fn element_id(&self) -> u64 {
        self.id.as_u64()
    }

    fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    fn fetch(store: &GraphStore, id: u64) -> Option<Self> {
        store.get_relationship(RelationshipId::new(id)).cloned()
    }
}

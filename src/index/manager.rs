//! Manager for named legacy indexes
//!
//! Node and relationship indexes live in separate namespaces; a name taken by
//! one kind cannot be used for the other.

use super::element_index::ElementIndex;
use super::query::IndexQuery;
use super::{ElementKind, IndexError, IndexResult};
use crate::graph::PropertyValue;
use std::collections::BTreeMap;

/// One `(index, element id, field, value)` entry
pub type IndexEntry = (String, u64, String, PropertyValue);

/// All named indexes of a database.
///
/// Not synchronised on its own: the database guards it with the same lock as
/// the graph store so a commit updates both atomically.
#[derive(Debug, Default)]
pub struct IndexManager {
    node_indexes: BTreeMap<String, ElementIndex>,
    relationship_indexes: BTreeMap<String, ElementIndex>,
}

impl IndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn indexes(&self, kind: ElementKind) -> &BTreeMap<String, ElementIndex> {
        match kind {
            ElementKind::Node => &self.node_indexes,
            ElementKind::Relationship => &self.relationship_indexes,
        }
    }

    fn indexes_mut(&mut self, kind: ElementKind) -> &mut BTreeMap<String, ElementIndex> {
        match kind {
            ElementKind::Node => &mut self.node_indexes,
            ElementKind::Relationship => &mut self.relationship_indexes,
        }
    }

    /// Fails if `name` belongs to the other element kind
    pub fn check_kind(&self, kind: ElementKind, name: &str) -> IndexResult<()> {
        let other = kind.other();
        if self.indexes(other).contains_key(name) {
            return Err(IndexError::KindMismatch {
                name: name.to_string(),
                existing: other,
                requested: kind,
            });
        }
        Ok(())
    }

    fn get_index(&self, kind: ElementKind, name: &str) -> IndexResult<&ElementIndex> {
        self.check_kind(kind, name)?;
        self.indexes(kind)
            .get(name)
            .ok_or_else(|| IndexError::NoSuchIndex(name.to_string()))
    }

    /// Add an entry, creating the index on first write.
    /// Returns the scalar values that were newly indexed.
    pub fn add(
        &mut self,
        kind: ElementKind,
        name: &str,
        id: u64,
        field: &str,
        value: PropertyValue,
    ) -> IndexResult<Vec<PropertyValue>> {
        self.check_kind(kind, name)?;
        Ok(self
            .indexes_mut(kind)
            .entry(name.to_string())
            .or_default()
            .add(id, field, value))
    }

    /// Remove entries of one element; a missing index removes nothing
    pub fn remove(
        &mut self,
        kind: ElementKind,
        name: &str,
        id: u64,
        field: &str,
        value: Option<&PropertyValue>,
    ) -> IndexResult<Vec<PropertyValue>> {
        self.check_kind(kind, name)?;
        Ok(self
            .indexes_mut(kind)
            .get_mut(name)
            .map(|index| index.remove(id, field, value))
            .unwrap_or_default())
    }

    /// Drop an element from every index of its kind
    pub fn remove_element(&mut self, kind: ElementKind, id: u64) -> Vec<IndexEntry> {
        let mut removed = Vec::new();
        for (name, index) in self.indexes_mut(kind).iter_mut() {
            for (field, value) in index.remove_element(id) {
                removed.push((name.clone(), id, field, value));
            }
        }
        removed
    }

    /// Exact lookup
    pub fn get(&self, kind: ElementKind, name: &str, field: &str, value: &PropertyValue) -> IndexResult<Vec<u64>> {
        Ok(self.get_index(kind, name)?.get(field, value))
    }

    pub fn query(&self, kind: ElementKind, name: &str, query: &IndexQuery) -> IndexResult<Vec<u64>> {
        self.get_index(kind, name)?.query(query)
    }

    pub fn exists(&self, kind: ElementKind, name: &str) -> bool {
        self.indexes(kind).contains_key(name)
    }

    pub fn index_names(&self, kind: ElementKind) -> Vec<String> {
        self.indexes(kind).keys().cloned().collect()
    }

    /// Every entry of one kind, for snapshots
    pub fn entries(&self, kind: ElementKind) -> Vec<IndexEntry> {
        self.indexes(kind)
            .iter()
            .flat_map(|(name, index)| {
                index
                    .entries()
                    .into_iter()
                    .map(move |(id, field, value)| (name.clone(), id, field, value))
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.node_indexes.clear();
        self.relationship_indexes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_on_first_write() {
        let mut manager = IndexManager::new();
        assert!(!manager.exists(ElementKind::Node, "people"));

        manager.add(ElementKind::Node, "people", 1, "name", "Neo".into()).unwrap();
        assert!(manager.exists(ElementKind::Node, "people"));
        assert_eq!(manager.get(ElementKind::Node, "people", "name", &"Neo".into()).unwrap(), vec![1]);
        assert_eq!(manager.index_names(ElementKind::Node), vec!["people".to_string()]);
    }

    #[test]
    fn test_missing_index_lookup() {
        let manager = IndexManager::new();
        let err = manager.get(ElementKind::Node, "nope", "name", &"x".into()).unwrap_err();
        assert_eq!(err, IndexError::NoSuchIndex("nope".to_string()));
    }

    #[test]
    fn test_kind_mismatch() {
        let mut manager = IndexManager::new();
        manager.add(ElementKind::Node, "shared", 1, "k", "v".into()).unwrap();

        let err = manager
            .add(ElementKind::Relationship, "shared", 1, "k", "v".into())
            .unwrap_err();
        assert!(matches!(err, IndexError::KindMismatch { existing: ElementKind::Node, .. }));

        let err = manager.query(ElementKind::Relationship, "shared", &IndexQuery::All).unwrap_err();
        assert!(matches!(err, IndexError::KindMismatch { .. }));
    }

    #[test]
    fn test_remove_element_across_indexes() {
        let mut manager = IndexManager::new();
        manager.add(ElementKind::Node, "a", 5, "name", "x".into()).unwrap();
        manager.add(ElementKind::Node, "b", 5, "tag", "y".into()).unwrap();
        manager.add(ElementKind::Node, "b", 6, "tag", "y".into()).unwrap();

        let removed = manager.remove_element(ElementKind::Node, 5);
        assert_eq!(removed.len(), 2);
        assert_eq!(manager.get(ElementKind::Node, "b", "tag", &"y".into()).unwrap(), vec![6]);
        assert_eq!(manager.entries(ElementKind::Node).len(), 1);
    }
}

//! B-Tree based index for one field of a named index

use crate::graph::PropertyValue;
use std::collections::{BTreeMap, BTreeSet};

/// Value -> ordered set of element ids, for a single field
#[derive(Debug, Clone, Default)]
pub struct PropertyIndex {
    index: BTreeMap<PropertyValue, BTreeSet<u64>>,
}

impl PropertyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the pair was already present
    pub fn insert(&mut self, value: PropertyValue, id: u64) -> bool {
        self.index.entry(value).or_default().insert(id)
    }

    /// Returns false if the pair was not present
    pub fn remove(&mut self, value: &PropertyValue, id: u64) -> bool {
        let Some(ids) = self.index.get_mut(value) else {
            return false;
        };
        let removed = ids.remove(&id);
        if ids.is_empty() {
            self.index.remove(value);
        }
        removed
    }

    /// Ids for an exact value, ascending
    pub fn get(&self, value: &PropertyValue) -> Vec<u64> {
        self.index
            .get(value)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn range<R>(&self, range: R) -> BTreeSet<u64>
    where
        R: std::ops::RangeBounds<PropertyValue>,
    {
        let mut result = BTreeSet::new();
        for (_, ids) in self.index.range(range) {
            result.extend(ids.iter().copied());
        }
        result
    }

    /// Ids of every value accepted by `pred`
    pub fn matching<F>(&self, mut pred: F) -> BTreeSet<u64>
    where
        F: FnMut(&PropertyValue) -> bool,
    {
        let mut result = BTreeSet::new();
        for (value, ids) in &self.index {
            if pred(value) {
                result.extend(ids.iter().copied());
            }
        }
        result
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_index_ops() {
        let mut index = PropertyIndex::new();
        let val = PropertyValue::Integer(100);

        assert!(index.insert(val.clone(), 2));
        assert!(index.insert(val.clone(), 1));
        assert!(!index.insert(val.clone(), 1));

        assert_eq!(index.get(&val), vec![1, 2]);

        assert!(index.remove(&val, 1));
        assert!(!index.remove(&val, 1));
        assert_eq!(index.get(&val), vec![2]);

        index.remove(&val, 2);
        assert!(index.is_empty());
    }

    #[test]
    fn test_property_index_range() {
        let mut index = PropertyIndex::new();
        for i in 1..=10 {
            index.insert(PropertyValue::Integer(i), i as u64);
        }

        use std::ops::Bound;
        let range = (
            Bound::Included(PropertyValue::Integer(3)),
            Bound::Included(PropertyValue::Integer(7)),
        );
        let results: Vec<u64> = index.range(range).into_iter().collect();
        assert_eq!(results, vec![3, 4, 5, 6, 7]);
    }
}

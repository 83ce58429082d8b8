//! A named legacy index: field -> value -> element ids

use super::property_index::PropertyIndex;
use super::query::IndexQuery;
use super::IndexResult;
use crate::graph::PropertyValue;
use std::collections::{BTreeMap, BTreeSet};

/// Entries for one named index of a single element kind.
///
/// Keeps a reverse map from element to its entries so an element can be
/// dropped from the index without knowing what it was indexed under.
#[derive(Debug, Clone, Default)]
pub struct ElementIndex {
    fields: BTreeMap<String, PropertyIndex>,
    owned: BTreeMap<u64, BTreeSet<(String, PropertyValue)>>,
}

fn scalars(value: PropertyValue) -> Vec<PropertyValue> {
    match value {
        PropertyValue::Array(items) => items.into_iter().flat_map(scalars).collect(),
        other => vec![other],
    }
}

impl ElementIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `value` under `field`. Arrays are indexed per element.
    /// Returns the entries that were not present before.
    pub fn add(&mut self, id: u64, field: &str, value: PropertyValue) -> Vec<PropertyValue> {
        let mut added = Vec::new();
        for scalar in scalars(value) {
            let index = self.fields.entry(field.to_string()).or_default();
            if index.insert(scalar.clone(), id) {
                self.owned
                    .entry(id)
                    .or_default()
                    .insert((field.to_string(), scalar.clone()));
                added.push(scalar);
            }
        }
        added
    }

    /// Remove entries of `id` under `field`; `None` removes every value.
    /// Returns the entries actually removed.
    pub fn remove(&mut self, id: u64, field: &str, value: Option<&PropertyValue>) -> Vec<PropertyValue> {
        let targets: Vec<PropertyValue> = match value {
            Some(v) => scalars(v.clone()),
            None => self
                .owned
                .get(&id)
                .map(|entries| {
                    entries
                        .iter()
                        .filter(|(f, _)| f == field)
                        .map(|(_, v)| v.clone())
                        .collect()
                })
                .unwrap_or_default(),
        };

        let mut removed = Vec::new();
        for scalar in targets {
            if self.remove_entry(id, field, &scalar) {
                removed.push(scalar);
            }
        }
        removed
    }

    /// Drop every entry of an element, returning them as `(field, value)`
    pub fn remove_element(&mut self, id: u64) -> Vec<(String, PropertyValue)> {
        let Some(entries) = self.owned.remove(&id) else {
            return Vec::new();
        };
        for (field, value) in &entries {
            if let Some(index) = self.fields.get_mut(field) {
                index.remove(value, id);
                if index.is_empty() {
                    self.fields.remove(field);
                }
            }
        }
        entries.into_iter().collect()
    }

    fn remove_entry(&mut self, id: u64, field: &str, value: &PropertyValue) -> bool {
        let Some(index) = self.fields.get_mut(field) else {
            return false;
        };
        if !index.remove(value, id) {
            return false;
        }
        if index.is_empty() {
            self.fields.remove(field);
        }
        if let Some(entries) = self.owned.get_mut(&id) {
            entries.remove(&(field.to_string(), value.clone()));
            if entries.is_empty() {
                self.owned.remove(&id);
            }
        }
        true
    }

    /// Exact lookup, ids ascending
    pub fn get(&self, field: &str, value: &PropertyValue) -> Vec<u64> {
        let Some(index) = self.fields.get(field) else {
            return Vec::new();
        };
        match value {
            PropertyValue::Array(_) => {
                let mut ids = BTreeSet::new();
                for scalar in scalars(value.clone()) {
                    ids.extend(index.get(&scalar));
                }
                ids.into_iter().collect()
            }
            _ => index.get(value),
        }
    }

    /// Evaluate a query, ids ascending
    pub fn query(&self, query: &IndexQuery) -> IndexResult<Vec<u64>> {
        Ok(self.evaluate(query)?.into_iter().collect())
    }

    fn evaluate(&self, query: &IndexQuery) -> IndexResult<BTreeSet<u64>> {
        match query {
            IndexQuery::All => Ok(self.owned.keys().copied().collect()),
            IndexQuery::And(a, b) => {
                let left = self.evaluate(a)?;
                let right = self.evaluate(b)?;
                Ok(left.intersection(&right).copied().collect())
            }
            IndexQuery::Or(a, b) => {
                let mut left = self.evaluate(a)?;
                left.extend(self.evaluate(b)?);
                Ok(left)
            }
            IndexQuery::Not(q) => {
                let excluded = self.evaluate(q)?;
                Ok(self
                    .owned
                    .keys()
                    .filter(|id| !excluded.contains(id))
                    .copied()
                    .collect())
            }
            IndexQuery::Term { field, .. }
            | IndexQuery::Wildcard { field, .. }
            | IndexQuery::Range { field, .. } => {
                let matcher = query.matcher()?;
                Ok(self
                    .fields
                    .get(field)
                    .map(|index| index.matching(|v| matcher.matches(v)))
                    .unwrap_or_default())
            }
        }
    }

    /// Every `(id, field, value)` entry, for snapshots
    pub fn entries(&self) -> Vec<(u64, String, PropertyValue)> {
        self.owned
            .iter()
            .flat_map(|(id, entries)| {
                entries
                    .iter()
                    .map(move |(field, value)| (*id, field.clone(), value.clone()))
            })
            .collect()
    }

    pub fn contains_element(&self, id: u64) -> bool {
        self.owned.contains_key(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.owned.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ElementIndex {
        let mut index = ElementIndex::new();
        index.add(1, "name", "Neo".into());
        index.add(2, "name", "Trinity".into());
        index.add(3, "name", "Morpheus".into());
        index.add(1, "age", 37.into());
        index.add(2, "age", 29.into());
        index
    }

    #[test]
    fn test_add_and_get() {
        let mut index = sample();
        assert_eq!(index.get("name", &"Neo".into()), vec![1]);
        assert!(index.get("name", &"Smith".into()).is_empty());
        assert!(index.get("missing", &"Neo".into()).is_empty());

        // re-adding is a no-op
        assert!(index.add(1, "name", "Neo".into()).is_empty());
    }

    #[test]
    fn test_array_values_indexed_per_element() {
        let mut index = ElementIndex::new();
        let tags = PropertyValue::Array(vec!["red".into(), "blue".into()]);
        assert_eq!(index.add(7, "tag", tags).len(), 2);

        assert_eq!(index.get("tag", &"red".into()), vec![7]);
        assert_eq!(index.get("tag", &"blue".into()), vec![7]);
    }

    #[test]
    fn test_remove_variants() {
        let mut index = sample();
        index.add(1, "name", "The One".into());

        assert_eq!(index.remove(1, "name", Some(&"Neo".into())), vec![PropertyValue::from("Neo")]);
        assert_eq!(index.get("name", &"The One".into()), vec![1]);

        assert_eq!(index.remove(1, "name", None).len(), 1);
        assert!(index.get("name", &"The One".into()).is_empty());
        assert_eq!(index.get("age", &37.into()), vec![1]);

        let removed = index.remove_element(2);
        assert_eq!(removed.len(), 2);
        assert!(!index.contains_element(2));
        assert!(index.get("name", &"Trinity".into()).is_empty());
    }

    #[test]
    fn test_queries() {
        let index = sample();
        let q = |s: &str| index.query(&IndexQuery::parse(s).unwrap()).unwrap();

        assert_eq!(q("*:*"), vec![1, 2, 3]);
        assert_eq!(q("name:Neo"), vec![1]);
        assert_eq!(q("name:*r*"), vec![2, 3]);
        assert_eq!(q("age:[30 TO 40]"), vec![1]);
        assert_eq!(q("name:Neo OR name:Trinity"), vec![1, 2]);
        assert_eq!(q("name:*i* AND age:29"), vec![2]);
        assert_eq!(q("NOT name:Neo"), vec![2, 3]);
        assert_eq!(q("age:37"), vec![1]);
    }

    #[test]
    fn test_entries() {
        let index = sample();
        let entries = index.entries();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].0, 1);
    }
}

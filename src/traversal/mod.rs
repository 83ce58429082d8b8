//! Traversal framework
//!
//! A `TraversalDescription` says how to walk the graph (order, which
//! relationships to follow, uniqueness, evaluators). Running it from a start
//! node yields `Path`s lazily, the zero-length start path first.

pub mod evaluator;

pub use evaluator::{Evaluation, Evaluator, Evaluators};

use crate::graph::{Direction, GraphStore, NodeId, Path, Relationship, RelationshipId, RelationshipType};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Traversal errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TraversalError {
    #[error("Traversal start node {0} not found")]
    StartNodeNotFound(NodeId),
}

pub type TraversalResult<T> = Result<T, TraversalError>;

/// Order in which branches are visited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    DepthFirst,
    BreadthFirst,
}

/// Which elements may be visited more than once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uniqueness {
    /// A node is visited at most once per traversal
    NodeGlobal,
    /// A relationship is followed at most once per traversal
    RelationshipGlobal,
    /// A node appears at most once in each path
    NodePath,
    /// A relationship appears at most once in each path
    RelationshipPath,
    /// No restriction; bound the walk with an evaluator
    None,
}

/// Immutable description of a traversal. Builder methods return a new value.
#[derive(Clone)]
pub struct TraversalDescription {
    order: Order,
    expanders: Vec<(RelationshipType, Direction)>,
    uniqueness: Uniqueness,
    evaluators: Vec<Arc<dyn Evaluator>>,
}

impl Default for TraversalDescription {
    fn default() -> Self {
        Self {
            order: Order::DepthFirst,
            expanders: Vec::new(),
            uniqueness: Uniqueness::NodeGlobal,
            evaluators: Vec::new(),
        }
    }
}

impl fmt::Debug for TraversalDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraversalDescription")
            .field("order", &self.order)
            .field("expanders", &self.expanders)
            .field("uniqueness", &self.uniqueness)
            .field("evaluators", &self.evaluators.len())
            .finish()
    }
}

impl TraversalDescription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn breadth_first(&self) -> Self {
        Self {
            order: Order::BreadthFirst,
            ..self.clone()
        }
    }

    pub fn depth_first(&self) -> Self {
        Self {
            order: Order::DepthFirst,
            ..self.clone()
        }
    }

    /// Follow relationships of `rel_type` in `direction`. Repeatable; with
    /// none given every relationship is followed in both directions.
    pub fn relationships(&self, rel_type: impl Into<RelationshipType>, direction: Direction) -> Self {
        let mut next = self.clone();
        next.expanders.push((rel_type.into(), direction));
        next
    }

    pub fn uniqueness(&self, uniqueness: Uniqueness) -> Self {
        Self {
            uniqueness,
            ..self.clone()
        }
    }

    /// Add an evaluator; all evaluators must agree to include or continue
    pub fn evaluator(&self, evaluator: impl Evaluator + 'static) -> Self {
        let mut next = self.clone();
        next.evaluators.push(Arc::new(evaluator));
        next
    }

    pub fn order(&self) -> Order {
        self.order
    }

    pub fn get_uniqueness(&self) -> Uniqueness {
        self.uniqueness
    }

    /// Start a lazy traversal over `store`
    pub fn traverse<'a>(&self, store: &'a GraphStore, start: NodeId) -> TraversalResult<Traverser<&'a GraphStore>> {
        Traverser::new(store, self.clone(), start)
    }

    fn evaluate(&self, path: &Path) -> Evaluation {
        self.evaluators
            .iter()
            .fold(Evaluation::IncludeAndContinue, |acc, e| acc.combine(e.evaluate(path)))
    }

    fn expand<'s>(&self, store: &'s GraphStore, node: NodeId) -> Vec<&'s Relationship> {
        if self.expanders.is_empty() {
            return store.relationships(node, Direction::Both, &[]);
        }
        let mut seen: FxHashSet<RelationshipId> = FxHashSet::default();
        let mut result = Vec::new();
        for (rel_type, direction) in &self.expanders {
            for rel in store.relationships(node, *direction, std::slice::from_ref(rel_type)) {
                if seen.insert(rel.id) {
                    result.push(rel);
                }
            }
        }
        result
    }
}

/// Read access to the graph a traversal walks.
///
/// The traverser asks for the store once per step, so an implementation
/// may take a lock for the duration of `with_store` only.
pub trait StoreAccess {
    fn with_store<R>(&self, f: impl FnOnce(&GraphStore) -> R) -> R;
}

impl StoreAccess for &GraphStore {
    fn with_store<R>(&self, f: impl FnOnce(&GraphStore) -> R) -> R {
        f(*self)
    }
}

/// Lazy iterator over the paths of one traversal
pub struct Traverser<S> {
    source: S,
    description: TraversalDescription,
    frontier: VecDeque<Path>,
    visited_nodes: FxHashSet<NodeId>,
    visited_relationships: FxHashSet<RelationshipId>,
}

impl<S: StoreAccess> Traverser<S> {
    pub fn new(source: S, description: TraversalDescription, start: NodeId) -> TraversalResult<Self> {
        let node = source
            .with_store(|store| store.get_node(start).cloned())
            .ok_or(TraversalError::StartNodeNotFound(start))?;

        let mut frontier = VecDeque::new();
        frontier.push_back(Path::single(node));

        Ok(Self {
            source,
            description,
            frontier,
            visited_nodes: FxHashSet::default(),
            visited_relationships: FxHashSet::default(),
        })
    }

    /// Record a popped path; false if global uniqueness already saw its end
    fn visit(&mut self, path: &Path) -> bool {
        match self.description.uniqueness {
            Uniqueness::NodeGlobal => self.visited_nodes.insert(path.end_node().id),
            Uniqueness::RelationshipGlobal => match path.last_relationship() {
                Some(rel) => self.visited_relationships.insert(rel.id),
                None => true,
            },
            Uniqueness::NodePath | Uniqueness::RelationshipPath | Uniqueness::None => true,
        }
    }

    /// Whether `path` may be extended over `rel` to `next`
    fn admits(&self, path: &Path, rel: &Relationship, next: NodeId) -> bool {
        match self.description.uniqueness {
            Uniqueness::NodeGlobal => !self.visited_nodes.contains(&next),
            Uniqueness::RelationshipGlobal => !self.visited_relationships.contains(&rel.id),
            Uniqueness::NodePath => !path.nodes().iter().any(|n| n.id == next),
            Uniqueness::RelationshipPath => !path.contains_relationship(rel),
            Uniqueness::None => true,
        }
    }

    fn expand(&mut self, path: &Path) {
        let end = path.end_node().id;
        let children = self.source.with_store(|store| {
            let mut children = Vec::new();
            for rel in self.description.expand(store, end) {
                let Some(next_id) = rel.other_node(end) else {
                    continue;
                };
                if !self.admits(path, rel, next_id) {
                    continue;
                }
                if let Some(next) = store.get_node(next_id) {
                    children.push(path.extend(rel.clone(), next.clone()));
                }
            }
            children
        });

        match self.description.order {
            Order::BreadthFirst => self.frontier.extend(children),
            // Reversed so the first child is popped first
            Order::DepthFirst => {
                for child in children.into_iter().rev() {
                    self.frontier.push_back(child);
                }
            }
        }
    }
}

impl<S: StoreAccess> Iterator for Traverser<S> {
    type Item = Path;

    fn next(&mut self) -> Option<Path> {
        loop {
            let path = match self.description.order {
                Order::BreadthFirst => self.frontier.pop_front()?,
                Order::DepthFirst => self.frontier.pop_back()?,
            };
            if !self.visit(&path) {
                continue;
            }
            let evaluation = self.description.evaluate(&path);
            if evaluation.continues() {
                self.expand(&path);
            }
            if evaluation.includes() {
                return Some(path);
            }
        }
    }
}

impl<S> fmt::Debug for Traverser<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Traverser")
            .field("description", &self.description)
            .field("frontier", &self.frontier.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, Relationship};

    // 0 -KNOWS-> 1 -KNOWS-> 2 -KNOWS-> 3
    // 0 -LIKES-> 4
    fn chain() -> GraphStore {
        let mut store = GraphStore::new();
        for id in 0..=4 {
            store.insert_node(Node::new(NodeId::new(id))).unwrap();
        }
        let rels = [(1, 0, 1, "KNOWS"), (2, 1, 2, "KNOWS"), (3, 2, 3, "KNOWS"), (4, 0, 4, "LIKES")];
        for (id, s, e, t) in rels {
            store
                .insert_relationship(Relationship::new(RelationshipId::new(id), NodeId::new(s), NodeId::new(e), t))
                .unwrap();
        }
        store
    }

    fn ends(paths: impl Iterator<Item = Path>) -> Vec<u64> {
        paths.map(|p| p.end_node().id.as_u64()).collect()
    }

    #[test]
    fn test_default_visits_everything_depth_first() {
        let store = chain();
        let desc = TraversalDescription::new();
        let result = ends(desc.traverse(&store, NodeId::new(0)).unwrap());
        assert_eq!(result, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_breadth_first_order() {
        let store = chain();
        let desc = TraversalDescription::new().breadth_first();
        let result = ends(desc.traverse(&store, NodeId::new(0)).unwrap());
        assert_eq!(result, vec![0, 1, 4, 2, 3]);
    }

    #[test]
    fn test_relationship_filter_and_depth() {
        let store = chain();
        let desc = TraversalDescription::new()
            .relationships("KNOWS", Direction::Outgoing)
            .evaluator(Evaluators::to_depth(2))
            .evaluator(Evaluators::exclude_start_position());
        let paths: Vec<Path> = desc.traverse(&store, NodeId::new(0)).unwrap().collect();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[1].length(), 2);
        assert_eq!(paths[1].end_node().id, NodeId::new(2));
    }

    #[test]
    fn test_incoming_direction() {
        let store = chain();
        let desc = TraversalDescription::new().relationships("KNOWS", Direction::Incoming);
        let result = ends(desc.traverse(&store, NodeId::new(3)).unwrap());
        assert_eq!(result, vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_closure_evaluator() {
        let store = chain();
        let desc = TraversalDescription::new().evaluator(|p: &Path| {
            Evaluation::of(p.end_node().id.as_u64() % 2 == 0, true)
        });
        let result = ends(desc.traverse(&store, NodeId::new(0)).unwrap());
        assert_eq!(result, vec![0, 2, 4]);
    }

    #[test]
    fn test_uniqueness_modes_on_cycle() {
        // triangle 0 -> 1 -> 2 -> 0
        let mut store = GraphStore::new();
        for id in 0..3 {
            store.insert_node(Node::new(NodeId::new(id))).unwrap();
        }
        for (id, s, e) in [(1, 0, 1), (2, 1, 2), (3, 2, 0)] {
            store
                .insert_relationship(Relationship::new(RelationshipId::new(id), NodeId::new(s), NodeId::new(e), "NEXT"))
                .unwrap();
        }

        let base = TraversalDescription::new().relationships("NEXT", Direction::Outgoing);
        assert_eq!(base.traverse(&store, NodeId::new(0)).unwrap().count(), 3);

        // the path may come back to the start node, but no relationship repeats
        let rel_path = base.uniqueness(Uniqueness::RelationshipPath);
        let lengths: Vec<usize> = rel_path.traverse(&store, NodeId::new(0)).unwrap().map(|p| p.length()).collect();
        assert_eq!(lengths, vec![0, 1, 2, 3]);

        let bounded = base.uniqueness(Uniqueness::None).evaluator(Evaluators::to_depth(4));
        assert_eq!(bounded.traverse(&store, NodeId::new(0)).unwrap().count(), 5);
    }

    // 0 -R-> 1, 0 -R-> 2, 1 -R-> 2
    fn diamond() -> GraphStore {
        let mut store = GraphStore::new();
        for id in 0..3 {
            store.insert_node(Node::new(NodeId::new(id))).unwrap();
        }
        for (id, s, e) in [(1, 0, 1), (2, 0, 2), (3, 1, 2)] {
            store
                .insert_relationship(Relationship::new(RelationshipId::new(id), NodeId::new(s), NodeId::new(e), "R"))
                .unwrap();
        }
        store
    }

    #[test]
    fn test_depth_first_reaches_shared_node_through_first_branch() {
        let store = diamond();
        let desc = TraversalDescription::new().depth_first().relationships("R", Direction::Outgoing);
        let paths: Vec<Vec<u64>> = desc
            .traverse(&store, NodeId::new(0))
            .unwrap()
            .map(|p| p.nodes().iter().map(|n| n.id.as_u64()).collect())
            .collect();
        assert_eq!(paths, vec![vec![0], vec![0, 1], vec![0, 1, 2]]);
    }

    #[test]
    fn test_relationship_global_follows_each_relationship_once() {
        let store = diamond();
        let desc = TraversalDescription::new()
            .relationships("R", Direction::Outgoing)
            .uniqueness(Uniqueness::RelationshipGlobal);
        let last: Vec<Option<u64>> = desc
            .traverse(&store, NodeId::new(0))
            .unwrap()
            .map(|p| p.last_relationship().map(|r| r.id.as_u64()))
            .collect();
        assert_eq!(last, vec![None, Some(1), Some(3), Some(2)]);
    }

    #[test]
    fn test_unbounded_traversal_is_lazy() {
        let store = chain();
        let desc = TraversalDescription::new()
            .relationships("KNOWS", Direction::Both)
            .uniqueness(Uniqueness::None);
        let lengths: Vec<usize> = desc
            .traverse(&store, NodeId::new(0))
            .unwrap()
            .take(4)
            .map(|p| p.length())
            .collect();
        assert_eq!(lengths, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_unknown_start() {
        let store = chain();
        let desc = TraversalDescription::new();
        assert_eq!(
            desc.traverse(&store, NodeId::new(42)).err(),
            Some(TraversalError::StartNodeNotFound(NodeId::new(42)))
        );
    }
}

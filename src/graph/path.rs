//! Paths produced by traversals and named query patterns

use super::node::Node;
use super::relationship::Relationship;

/// A walk through the graph: a start node followed by alternating
/// relationships and nodes.
///
/// Invariant: `nodes.len() == relationships.len() + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    nodes: Vec<Node>,
    relationships: Vec<Relationship>,
}

impl Path {
    /// Zero-length path holding only its start node
    pub fn single(start: Node) -> Self {
        Self {
            nodes: vec![start],
            relationships: Vec::new(),
        }
    }

    /// New path with one more hop
    pub fn extend(&self, relationship: Relationship, node: Node) -> Self {
        let mut next = self.clone();
        next.relationships.push(relationship);
        next.nodes.push(node);
        next
    }

    pub fn start_node(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn end_node(&self) -> &Node {
        &self.nodes[self.nodes.len() - 1]
    }

    pub fn last_relationship(&self) -> Option<&Relationship> {
        self.relationships.last()
    }

    /// Number of relationships
    pub fn length(&self) -> usize {
        self.relationships.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn contains_node(&self, node: &Node) -> bool {
        self.nodes.iter().any(|n| n.id == node.id)
    }

    pub fn contains_relationship(&self, relationship: &Relationship) -> bool {
        self.relationships.iter().any(|r| r.id == relationship.id)
    }
}

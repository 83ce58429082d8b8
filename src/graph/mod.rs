//! Core graph engine
//!
//! Property graph data model:
//! - Nodes with optional labels and properties
//! - Typed, directed relationships with properties
//! - Paths (start node plus alternating relationships and nodes)
//! - In-memory arena storage with adjacency lists

pub mod element;
pub mod node;
pub mod path;
pub mod property;
pub mod relationship;
pub mod store;
pub mod types;

// Re-export main types
pub use element::PropertyContainer;
pub use node::Node;
pub use path::Path;
pub use property::{Property, PropertyMap, PropertyValue};
pub use relationship::Relationship;
pub use store::{GraphError, GraphResult, GraphStore};
pub use types::{Direction, Label, NodeId, RelationshipId, RelationshipType};

//! Graph Template
//!
//! An embedded property graph with a data-access template on top.
//!
//! # Architecture
//!
//! The engine:
//! - `graph`: nodes, relationships, paths and the in-memory store
//! - `index`: legacy named indexes with a Lucene-style query syntax
//! - `transaction`: buffered transactions with atomic commits
//! - `traversal`: traversal descriptions, evaluators and uniqueness rules
//! - `query`: a read-only Cypher subset
//! - `persistence`: compressed whole-graph snapshots
//! - `database`: the embedded database tying these together
//!
//! The template:
//! - `template`: `GraphOperations` and its implementation `GraphTemplate`
//! - `conversion`: the lazy `QueryResult` and result converters
//! - `error`: `DataAccessError` and exception translation
//!
//! ## Example Usage
//!
//! ```rust
//! use graph_template::{props, GraphOperations, GraphTemplate, Node};
//!
//! let template = GraphTemplate::in_memory();
//!
//! let neo = template.create_node(&props! {"name" => "Neo"}).unwrap();
//! let trinity = template.create_node(&props! {"name" => "Trinity"}).unwrap();
//! template.create_relationship(&neo, &trinity, "KNOWS", &[]).unwrap();
//!
//! // Index and look up
//! template.index(Some("people"), neo.clone(), "name", "Neo").unwrap();
//! let found: Node = template.lookup("people", "name", "Neo").unwrap().single().unwrap();
//! assert_eq!(found.id, neo.id);
//!
//! // Query and convert
//! let names: Vec<String> = template
//!     .query("MATCH (a {name: 'Neo'})-[:KNOWS]->(b) RETURN b.name")
//!     .unwrap()
//!     .to::<String>()
//!     .as_vec()
//!     .unwrap();
//! assert_eq!(names, vec!["Trinity"]);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod conversion;
pub mod database;
pub mod error;
pub mod graph;
pub mod index;
pub mod persistence;
pub mod query;
pub mod template;
pub mod transaction;
pub mod traversal;

// Re-export main types for convenience
pub use graph::{
    Direction, GraphError, GraphResult, GraphStore, Label, Node, NodeId, Path, Property, PropertyContainer,
    PropertyMap, PropertyValue, Relationship, RelationshipId, RelationshipType,
};

pub use index::{ElementKind, IndexError, IndexQuery, IndexResult};

pub use transaction::{Transaction, TransactionError, TransactionId, TransactionResult, TransactionState};

pub use traversal::{
    Evaluation, Evaluator, Evaluators, Order, StoreAccess, TraversalDescription, TraversalError, Traverser, Uniqueness,
};

pub use query::{parse_query, Params, Query, QueryEngine, QueryError, RecordBatch, Row, Value};

pub use persistence::{PersistenceError, PersistenceResult, Snapshot};

pub use config::{ConfigError, GraphConfig};

pub use database::{DatabaseError, GraphDatabase};

pub use error::{DataAccessError, DataAccessResult, ErrorCategory, ExceptionTranslator, GraphExceptionTranslator};

pub use conversion::{ConversionError, ConvertedResult, JsonResultConverter, QueryResult, ResultConverter, ToJson};

pub use template::{GraphCallback, GraphOperations, GraphTemplate};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

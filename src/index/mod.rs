//! Legacy named indexes
//!
//! Explicit `(field, value) -> element` associations maintained by the
//! application, queried by exact value or with a Lucene-style query string.

pub mod element_index;
pub mod manager;
pub mod property_index;
pub mod query;

pub use element_index::ElementIndex;
pub use manager::{IndexEntry, IndexManager};
pub use property_index::PropertyIndex;
pub use query::IndexQuery;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which element type an index holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Node,
    Relationship,
}

impl ElementKind {
    pub fn other(self) -> Self {
        match self {
            ElementKind::Node => ElementKind::Relationship,
            ElementKind::Relationship => ElementKind::Node,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Node => write!(f, "node"),
            ElementKind::Relationship => write!(f, "relationship"),
        }
    }
}

/// Index errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("Index '{0}' does not exist")]
    NoSuchIndex(String),

    #[error("Index '{name}' is a {existing} index, cannot use it as a {requested} index")]
    KindMismatch {
        name: String,
        existing: ElementKind,
        requested: ElementKind,
    },

    #[error("Invalid index query: {0}")]
    InvalidQuery(String),
}

pub type IndexResult<T> = Result<T, IndexError>;

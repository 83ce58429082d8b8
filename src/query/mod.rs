//! Query processing module
//!
//! Read-only Cypher support:
//! - START lookups by id, over all elements, or through an index
//! - MATCH path patterns with variable length relationships
//! - WHERE, RETURN [DISTINCT], aggregation, ORDER BY, SKIP and LIMIT
//!
//! Parsed statements are kept in an LRU cache keyed by statement text.

pub mod ast;
pub mod executor;
pub mod parser;

pub use ast::Query;
pub use executor::{ExecutionError, ExecutionResult, QueryExecutor, Record, RecordBatch, Row, Value};
pub use parser::{parse_query, ParseError, ParseResult};

use crate::graph::{GraphStore, PropertyValue};
use crate::index::IndexManager;
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

/// Named query parameters
pub type Params = HashMap<String, PropertyValue>;

/// Parse or execution failure
#[derive(Error, Debug)]
pub enum QueryError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

pub type QueryResult<T> = Result<T, QueryError>;

const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Query engine - parses with a statement cache and executes against a store
pub struct QueryEngine {
    cache: Mutex<LruCache<String, Arc<Query>>>,
}

impl QueryEngine {
    /// Create an engine caching up to `capacity` parsed statements
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or(NonZeroUsize::new(DEFAULT_CACHE_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Parse `statement`, reusing a cached AST when available
    pub fn prepare(&self, statement: &str) -> QueryResult<Arc<Query>> {
        if let Some(query) = self.cache.lock().get(statement) {
            trace!(statement, "query cache hit");
            return Ok(Arc::clone(query));
        }

        let query = Arc::new(parse_query(statement)?);
        self.cache.lock().put(statement.to_string(), Arc::clone(&query));
        Ok(query)
    }

    /// Parse and execute a read-only query
    pub fn execute(
        &self,
        statement: &str,
        params: &Params,
        store: &GraphStore,
        indexes: &IndexManager,
    ) -> QueryResult<RecordBatch> {
        let query = self.prepare(statement)?;
        let executor = QueryExecutor::new(store, indexes, params);
        Ok(executor.execute(&query)?)
    }

    /// Number of cached statements
    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("cached", &self.cached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, NodeId};

    #[test]
    fn test_engine_caches_statements() {
        let engine = QueryEngine::new(2);
        let mut store = GraphStore::new();
        let mut node = Node::new(NodeId::new(1));
        node.set_property("name", "Neo");
        store.insert_node(node).unwrap();
        let indexes = IndexManager::new();

        let statement = "MATCH (n) RETURN n.name";
        let first = engine.execute(statement, &Params::new(), &store, &indexes).unwrap();
        let second = engine.execute(statement, &Params::new(), &store, &indexes).unwrap();
        assert_eq!(first, second);
        assert_eq!(engine.cached(), 1);

        engine.prepare("MATCH (a) RETURN a").unwrap();
        engine.prepare("MATCH (b) RETURN b").unwrap();
        assert_eq!(engine.cached(), 2);
    }

    #[test]
    fn test_engine_errors() {
        let engine = QueryEngine::default();
        let store = GraphStore::new();
        let indexes = IndexManager::new();

        let err = engine.execute("MATCH (n RETURN n", &Params::new(), &store, &indexes).unwrap_err();
        assert!(matches!(err, QueryError::Parse(_)));
        assert_eq!(engine.cached(), 0);

        let err = engine.execute("START n=node(5) RETURN n", &Params::new(), &store, &indexes).unwrap_err();
        assert!(matches!(err, QueryError::Execution(_)));
    }
}

//! GraphOperations - the data-access interface

use super::GraphCallback;
use crate::conversion::QueryResult;
use crate::error::DataAccessResult;
use crate::graph::{Node, NodeId, Path, Property, PropertyContainer, PropertyValue, Relationship, RelationshipId, RelationshipType};
use crate::index::IndexQuery;
use crate::query::{Params, Row};
use crate::transaction::Transaction;
use crate::traversal::TraversalDescription;

/// Data access operations on a property graph.
///
/// Every operation reports failures as `DataAccessError`. Operations that
/// change the graph run in their own transaction; their effects are visible
/// to other readers only once that transaction commits.
pub trait GraphOperations {
    /// Run `callback` against the database outside any transaction
    fn exec<T, C>(&self, callback: C) -> DataAccessResult<T>
    where
        C: GraphCallback<T>;

    /// Run `callback` in a transaction; commits on `Ok`, rolls back on `Err`
    fn exec_in_transaction<T, F>(&self, callback: F) -> DataAccessResult<T>
    where
        F: FnOnce(&mut Transaction) -> anyhow::Result<T>;

    fn reference_node(&self) -> DataAccessResult<Node>;

    fn get_node(&self, id: NodeId) -> DataAccessResult<Node>;

    /// Create a node carrying `props`, applied in order
    fn create_node(&self, props: &[Property]) -> DataAccessResult<Node>;

    fn get_relationship(&self, id: RelationshipId) -> DataAccessResult<Relationship>;

    /// Create a typed relationship between two existing nodes
    fn create_relationship<R>(
        &self,
        start: &Node,
        end: &Node,
        rel_type: R,
        props: &[Property],
    ) -> DataAccessResult<Relationship>
    where
        R: Into<RelationshipType>;

    /// Add `field = value` for `element` to the named index and hand the
    /// element back. `None` uses the configured default index for its kind.
    fn index<T, V>(&self, index_name: Option<&str>, element: T, field: &str, value: V) -> DataAccessResult<T>
    where
        T: PropertyContainer,
        V: Into<PropertyValue>;

    /// Wrap any sequence in a lazy `QueryResult`
    fn convert<T, I>(&self, iterable: I) -> QueryResult<T>
    where
        T: 'static,
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static;

    /// Run a read-only Cypher statement; rows are keyed by column name
    fn query(&self, statement: &str) -> DataAccessResult<QueryResult<Row>> {
        self.query_with_params(statement, &Params::new())
    }

    fn query_with_params(&self, statement: &str, params: &Params) -> DataAccessResult<QueryResult<Row>>;

    /// Every path `traversal` yields from `start`
    fn traverse(&self, start: &Node, traversal: &TraversalDescription) -> DataAccessResult<QueryResult<Path>>;

    /// Elements whose `field` holds exactly `value` in the named index
    fn lookup<T, V>(&self, index_name: &str, field: &str, value: V) -> DataAccessResult<QueryResult<T>>
    where
        T: PropertyContainer,
        V: Into<PropertyValue>;

    /// Elements matching an index query string such as `name:Ne* AND age:[20 TO 40]`
    fn lookup_query<T>(&self, index_name: &str, query: &str) -> DataAccessResult<QueryResult<T>>
    where
        T: PropertyContainer;

    /// Elements matching a query object
    fn lookup_with<T>(&self, index_name: &str, query: &IndexQuery) -> DataAccessResult<QueryResult<T>>
    where
        T: PropertyContainer;

    /// Delete a node or relationship together with its index entries
    fn delete<T>(&self, element: &T) -> DataAccessResult<()>
    where
        T: PropertyContainer;

    /// Set one property and return the committed element
    fn set_property<T, V>(&self, element: &T, key: &str, value: V) -> DataAccessResult<T>
    where
        T: PropertyContainer,
        V: Into<PropertyValue>;
}

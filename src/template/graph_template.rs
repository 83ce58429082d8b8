//! GraphTemplate - `GraphOperations` over an embedded database

use super::operations::GraphOperations;
use super::GraphCallback;
use crate::config::GraphConfig;
use crate::conversion::QueryResult;
use crate::database::GraphDatabase;
use crate::error::{DataAccessResult, ExceptionTranslator, GraphExceptionTranslator};
use crate::graph::{
    GraphError, Node, NodeId, Path, Property, PropertyContainer, PropertyValue, Relationship, RelationshipId,
    RelationshipType,
};
use crate::index::{ElementKind, IndexQuery};
use crate::query::{Params, Row};
use crate::transaction::{Transaction, TransactionResult};
use crate::traversal::TraversalDescription;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Template for data access against a `GraphDatabase`.
///
/// Cheap to clone; clones share the database and the translator.
#[derive(Clone)]
pub struct GraphTemplate {
    db: GraphDatabase,
    translator: Arc<dyn ExceptionTranslator>,
}

impl GraphTemplate {
    pub fn new(db: GraphDatabase) -> Self {
        Self::with_translator(db, GraphExceptionTranslator)
    }

    /// Template that translates callback errors with `translator`
    pub fn with_translator(db: GraphDatabase, translator: impl ExceptionTranslator + 'static) -> Self {
        Self {
            db,
            translator: Arc::new(translator),
        }
    }

    /// Open a database from `config` and wrap it
    pub fn open(config: GraphConfig) -> DataAccessResult<Self> {
        Ok(Self::new(GraphDatabase::open(config)?))
    }

    pub fn in_memory() -> Self {
        Self::new(GraphDatabase::in_memory())
    }

    pub fn database(&self) -> &GraphDatabase {
        &self.db
    }

    /// Run `work` in a fresh transaction and commit it
    fn in_transaction<T>(&self, work: impl FnOnce(&mut Transaction) -> TransactionResult<T>) -> DataAccessResult<T> {
        let mut tx = self.db.begin_tx();
        match work(&mut tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                rollback_quietly(&mut tx);
                Err(err.into())
            }
        }
    }

    fn resolve_index<'a>(&'a self, index_name: Option<&'a str>, kind: ElementKind) -> &'a str {
        match index_name {
            Some(name) => name,
            None => match kind {
                ElementKind::Node => &self.db.config().default_node_index,
                ElementKind::Relationship => &self.db.config().default_relationship_index,
            },
        }
    }

    fn committed<T: PropertyContainer>(&self, id: u64) -> DataAccessResult<T> {
        self.db
            .get_element(id)
            .ok_or_else(|| missing_element(T::KIND, id).into())
    }
}

fn rollback_quietly(tx: &mut Transaction) {
    if let Err(err) = tx.rollback() {
        warn!("Rollback of transaction {} failed: {}", tx.id(), err);
    }
}

fn missing_element(kind: ElementKind, id: u64) -> GraphError {
    match kind {
        ElementKind::Node => GraphError::NodeNotFound(NodeId::new(id)),
        ElementKind::Relationship => GraphError::RelationshipNotFound(RelationshipId::new(id)),
    }
}

impl GraphOperations for GraphTemplate {
    fn exec<T, C>(&self, callback: C) -> DataAccessResult<T>
    where
        C: GraphCallback<T>,
    {
        callback(&self.db).map_err(|err| self.translator.translate(err))
    }

    fn exec_in_transaction<T, F>(&self, callback: F) -> DataAccessResult<T>
    where
        F: FnOnce(&mut Transaction) -> anyhow::Result<T>,
    {
        let mut tx = self.db.begin_tx();
        match callback(&mut tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                debug!("Callback failed, rolling back transaction {}", tx.id());
                rollback_quietly(&mut tx);
                Err(self.translator.translate(err))
            }
        }
    }

    fn reference_node(&self) -> DataAccessResult<Node> {
        Ok(self.db.reference_node()?)
    }

    fn get_node(&self, id: NodeId) -> DataAccessResult<Node> {
        Ok(self.db.get_node(id)?)
    }

    fn create_node(&self, props: &[Property]) -> DataAccessResult<Node> {
        let node = self.in_transaction(|tx| tx.create_node(Property::to_map(props)))?;
        debug!("Created node {} with {} properties", node.id, node.properties.len());
        Ok(node)
    }

    fn get_relationship(&self, id: RelationshipId) -> DataAccessResult<Relationship> {
        Ok(self.db.get_relationship(id)?)
    }

    fn create_relationship<R>(
        &self,
        start: &Node,
        end: &Node,
        rel_type: R,
        props: &[Property],
    ) -> DataAccessResult<Relationship>
    where
        R: Into<RelationshipType>,
    {
        let rel_type = rel_type.into();
        let rel = self.in_transaction(|tx| tx.create_relationship(start.id, end.id, rel_type, Property::to_map(props)))?;
        debug!("Created relationship {} ({})-[:{}]->({})", rel.id, rel.start, rel.rel_type, rel.end);
        Ok(rel)
    }

    fn index<T, V>(&self, index_name: Option<&str>, element: T, field: &str, value: V) -> DataAccessResult<T>
    where
        T: PropertyContainer,
        V: Into<PropertyValue>,
    {
        let index = self.resolve_index(index_name, T::KIND);
        let value = value.into();
        debug!("Indexing {} {} in '{}': {} = {}", T::KIND, element.element_id(), index, field, value);
        self.in_transaction(|tx| tx.add_to_index(T::KIND, index, element.element_id(), field, value))?;
        Ok(element)
    }

    fn convert<T, I>(&self, iterable: I) -> QueryResult<T>
    where
        T: 'static,
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        QueryResult::new(iterable)
    }

    fn query_with_params(&self, statement: &str, params: &Params) -> DataAccessResult<QueryResult<Row>> {
        debug!("Executing query: {}", statement);
        let batch = self.db.execute_query(statement, params)?;
        Ok(QueryResult::new(batch))
    }

    fn traverse(&self, start: &Node, traversal: &TraversalDescription) -> DataAccessResult<QueryResult<Path>> {
        debug!("Traversing from node {}", start.id);
        let paths = self.db.traverse(start.id, traversal)?;
        Ok(QueryResult::new(paths))
    }

    fn lookup<T, V>(&self, index_name: &str, field: &str, value: V) -> DataAccessResult<QueryResult<T>>
    where
        T: PropertyContainer,
        V: Into<PropertyValue>,
    {
        let found: Vec<T> = self.db.index_lookup(index_name, field, &value.into())?;
        debug!("Index '{}' lookup on {} matched {}", index_name, field, found.len());
        Ok(QueryResult::new(found))
    }

    fn lookup_query<T>(&self, index_name: &str, query: &str) -> DataAccessResult<QueryResult<T>>
    where
        T: PropertyContainer,
    {
        let parsed = IndexQuery::parse(query)?;
        self.lookup_with(index_name, &parsed)
    }

    fn lookup_with<T>(&self, index_name: &str, query: &IndexQuery) -> DataAccessResult<QueryResult<T>>
    where
        T: PropertyContainer,
    {
        let found: Vec<T> = self.db.index_query(index_name, query)?;
        debug!("Index '{}' query matched {}", index_name, found.len());
        Ok(QueryResult::new(found))
    }

    fn delete<T>(&self, element: &T) -> DataAccessResult<()>
    where
        T: PropertyContainer,
    {
        let id = element.element_id();
        self.in_transaction(|tx| match T::KIND {
            ElementKind::Node => tx.delete_node(NodeId::new(id)),
            ElementKind::Relationship => tx.delete_relationship(RelationshipId::new(id)),
        })?;
        debug!("Deleted {} {}", T::KIND, id);
        Ok(())
    }

    fn set_property<T, V>(&self, element: &T, key: &str, value: V) -> DataAccessResult<T>
    where
        T: PropertyContainer,
        V: Into<PropertyValue>,
    {
        let id = element.element_id();
        let value = value.into();
        self.in_transaction(|tx| match T::KIND {
            ElementKind::Node => tx.set_node_property(NodeId::new(id), key, value),
            ElementKind::Relationship => tx.set_relationship_property(RelationshipId::new(id), key, value),
        })?;
        self.committed(id)
    }
}

impl fmt::Debug for GraphTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphTemplate").field("db", &self.db).finish_non_exhaustive()
    }
}

impl From<GraphDatabase> for GraphTemplate {
    fn from(db: GraphDatabase) -> Self {
        Self::new(db)
    }
}

//! Data access errors
//!
//! Every engine module reports failures through its own `thiserror` enum.
//! The template surfaces one type, [`DataAccessError`], and maps each engine
//! error onto it. Callbacks that return `anyhow::Error` are translated by an
//! [`ExceptionTranslator`], which downcasts to the engine error types.

use crate::config::ConfigError;
use crate::conversion::ConversionError;
use crate::database::DatabaseError;
use crate::graph::GraphError;
use crate::index::IndexError;
use crate::persistence::PersistenceError;
use crate::query::{ExecutionError, ParseError, QueryError};
use crate::transaction::TransactionError;
use crate::traversal::TraversalError;
use std::fmt;
use thiserror::Error;

/// Whether retrying the failed operation can succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Retrying without a change in input fails the same way
    NonTransient,
    /// A retry may succeed
    Transient,
    Uncategorized,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::NonTransient => write!(f, "non-transient"),
            ErrorCategory::Transient => write!(f, "transient"),
            ErrorCategory::Uncategorized => write!(f, "uncategorized"),
        }
    }
}

/// Uniform error of every template operation
#[derive(Error, Debug)]
pub enum DataAccessError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Expected one result, got none")]
    EmptyResult,

    #[error("Incorrect result size: expected {expected}, got {actual}")]
    IncorrectResultSize { expected: usize, actual: usize },

    #[error("Invalid API usage: {0}")]
    InvalidApiUsage(String),

    #[error("Invalid resource usage: {0}")]
    InvalidResourceUsage(String),

    #[error("Data integrity violation: {0}")]
    DataIntegrityViolation(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Transaction failure: {0}")]
    TransactionFailure(String),

    #[error("Resource failure: {0}")]
    ResourceFailure(String),

    #[error("Uncategorized data access error: {0}")]
    Uncategorized(#[source] anyhow::Error),
}

pub type DataAccessResult<T> = Result<T, DataAccessError>;

impl DataAccessError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DataAccessError::TransactionFailure(_) | DataAccessError::ResourceFailure(_) => ErrorCategory::Transient,
            DataAccessError::Uncategorized(_) => ErrorCategory::Uncategorized,
            _ => ErrorCategory::NonTransient,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DataAccessError::NotFound(_))
    }

    pub fn is_transient(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }
}

impl From<GraphError> for DataAccessError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::NodeNotFound(_) | GraphError::RelationshipNotFound(_) | GraphError::ReferenceNodeMissing => {
                DataAccessError::NotFound(err.to_string())
            }
            GraphError::NodeAlreadyExists(_)
            | GraphError::RelationshipAlreadyExists(_)
            | GraphError::InvalidRelationshipStart(_)
            | GraphError::InvalidRelationshipEnd(_)
            | GraphError::NodeHasRelationships(_) => DataAccessError::DataIntegrityViolation(err.to_string()),
        }
    }
}

impl From<IndexError> for DataAccessError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::KindMismatch { .. } => DataAccessError::InvalidApiUsage(err.to_string()),
            IndexError::NoSuchIndex(_) | IndexError::InvalidQuery(_) => {
                DataAccessError::InvalidResourceUsage(err.to_string())
            }
        }
    }
}

impl From<TransactionError> for DataAccessError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::NotActive { .. } => DataAccessError::InvalidApiUsage(err.to_string()),
            TransactionError::Graph(e) => e.into(),
            TransactionError::Index(e) => e.into(),
            TransactionError::CommitFailed { .. } => DataAccessError::TransactionFailure(err.to_string()),
            TransactionError::Sync(e) => e.into(),
        }
    }
}

impl From<TraversalError> for DataAccessError {
    fn from(err: TraversalError) -> Self {
        match err {
            TraversalError::StartNodeNotFound(_) => DataAccessError::NotFound(err.to_string()),
        }
    }
}

impl From<ParseError> for DataAccessError {
    fn from(err: ParseError) -> Self {
        DataAccessError::InvalidResourceUsage(err.to_string())
    }
}

impl From<ExecutionError> for DataAccessError {
    fn from(err: ExecutionError) -> Self {
        match err {
            ExecutionError::Index(e) => e.into(),
            ExecutionError::Graph(e) => e.into(),
            ExecutionError::TypeError(_) => DataAccessError::TypeMismatch(err.to_string()),
            ExecutionError::VariableNotFound(_)
            | ExecutionError::ParameterMissing(_)
            | ExecutionError::UnknownFunction(_)
            | ExecutionError::RuntimeError(_) => DataAccessError::InvalidResourceUsage(err.to_string()),
        }
    }
}

impl From<QueryError> for DataAccessError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Parse(e) => e.into(),
            QueryError::Execution(e) => e.into(),
        }
    }
}

impl From<PersistenceError> for DataAccessError {
    fn from(err: PersistenceError) -> Self {
        DataAccessError::ResourceFailure(err.to_string())
    }
}

impl From<ConversionError> for DataAccessError {
    fn from(err: ConversionError) -> Self {
        DataAccessError::TypeMismatch(err.to_string())
    }
}

impl From<ConfigError> for DataAccessError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(_) => DataAccessError::ResourceFailure(err.to_string()),
            ConfigError::Yaml(_) | ConfigError::InvalidValue { .. } => DataAccessError::InvalidApiUsage(err.to_string()),
        }
    }
}

impl From<DatabaseError> for DataAccessError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Config(e) => e.into(),
            DatabaseError::Persistence(e) => e.into(),
        }
    }
}

impl From<anyhow::Error> for DataAccessError {
    fn from(err: anyhow::Error) -> Self {
        GraphExceptionTranslator.translate(err)
    }
}

/// Turns arbitrary callback errors into `DataAccessError`
pub trait ExceptionTranslator: Send + Sync {
    fn translate(&self, error: anyhow::Error) -> DataAccessError;
}

/// Recognises every engine error type; anything else is `Uncategorized`
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphExceptionTranslator;

macro_rules! downcast_into {
    ($error:ident, $($ty:ty),+ $(,)?) => {
        $(
            let $error = match $error.downcast::<$ty>() {
                Ok(err) => return DataAccessError::from(err),
                Err(other) => other,
            };
        )+
    };
}

impl ExceptionTranslator for GraphExceptionTranslator {
    fn translate(&self, error: anyhow::Error) -> DataAccessError {
        let error = match error.downcast::<DataAccessError>() {
            Ok(err) => return err,
            Err(other) => other,
        };
        downcast_into!(
            error,
            GraphError,
            IndexError,
            TransactionError,
            TraversalError,
            QueryError,
            ParseError,
            ExecutionError,
            PersistenceError,
            ConversionError,
            ConfigError,
            DatabaseError,
        );
        DataAccessError::Uncategorized(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeId, RelationshipId};

    #[test]
    fn test_graph_errors() {
        assert!(DataAccessError::from(GraphError::NodeNotFound(NodeId::new(7))).is_not_found());
        assert!(DataAccessError::from(GraphError::RelationshipNotFound(RelationshipId::new(7))).is_not_found());
        assert!(matches!(
            DataAccessError::from(GraphError::NodeHasRelationships(NodeId::new(1))),
            DataAccessError::DataIntegrityViolation(_)
        ));
    }

    #[test]
    fn test_nested_errors_unwrap() {
        let err = TransactionError::Graph(GraphError::InvalidRelationshipEnd(NodeId::new(9)));
        assert!(matches!(DataAccessError::from(err), DataAccessError::DataIntegrityViolation(_)));

        let err = QueryError::Execution(ExecutionError::Graph(GraphError::NodeNotFound(NodeId::new(3))));
        assert!(DataAccessError::from(err).is_not_found());

        let err = QueryError::Execution(ExecutionError::Index(IndexError::NoSuchIndex("people".into())));
        assert!(matches!(DataAccessError::from(err), DataAccessError::InvalidResourceUsage(_)));
    }

    #[test]
    fn test_categories() {
        assert_eq!(DataAccessError::EmptyResult.category(), ErrorCategory::NonTransient);
        assert!(DataAccessError::TransactionFailure("x".into()).is_transient());
        assert_eq!(
            DataAccessError::Uncategorized(anyhow::anyhow!("boom")).category(),
            ErrorCategory::Uncategorized
        );
    }

    #[test]
    fn test_translator_downcasts() {
        let translator = GraphExceptionTranslator;

        let err = translator.translate(anyhow::Error::new(TraversalError::StartNodeNotFound(NodeId::new(4))));
        assert!(err.is_not_found());

        let err = translator.translate(anyhow::Error::new(IndexError::KindMismatch {
            name: "people".into(),
            existing: crate::index::ElementKind::Node,
            requested: crate::index::ElementKind::Relationship,
        }));
        assert!(matches!(err, DataAccessError::InvalidApiUsage(_)));

        let err = translator.translate(anyhow::Error::new(DataAccessError::EmptyResult));
        assert!(matches!(err, DataAccessError::EmptyResult));

        let err = translator.translate(anyhow::anyhow!("something else"));
        assert!(matches!(err, DataAccessError::Uncategorized(_)));
    }

    #[test]
    fn test_context_does_not_hide_engine_error() {
        let err = anyhow::Error::new(GraphError::NodeNotFound(NodeId::new(1))).context("loading user");
        assert!(DataAccessError::from(err).is_not_found());
    }
}

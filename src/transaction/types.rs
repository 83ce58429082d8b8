//! Transaction types: state, errors and buffered operations

use crate::graph::{GraphError, Label, NodeId, PropertyValue, RelationshipId};
use crate::index::{ElementKind, IndexError};
use crate::persistence::PersistenceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Transaction ID
pub type TransactionId = u64;

/// Transaction state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionState {
    /// Accepting reads and writes
    Active,
    /// Changes applied to the database
    Committed,
    /// Changes discarded
    RolledBack,
}

impl TransactionState {
    pub fn is_active(&self) -> bool {
        matches!(self, TransactionState::Active)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionState::Active => write!(f, "Active"),
            TransactionState::Committed => write!(f, "Committed"),
            TransactionState::RolledBack => write!(f, "RolledBack"),
        }
    }
}

/// Transaction errors
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Transaction {id} is not active (state: {state})")]
    NotActive {
        id: TransactionId,
        state: TransactionState,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Index(#[from] IndexError),

    /// Commit was undone; the database is unchanged
    #[error("Transaction {id} commit failed: {cause}")]
    CommitFailed {
        id: TransactionId,
        #[source]
        cause: Box<TransactionError>,
    },

    /// Commit applied in memory but the snapshot could not be written
    #[error("Transaction committed but sync failed: {0}")]
    Sync(#[from] PersistenceError),
}

pub type TransactionResult<T> = Result<T, TransactionError>;

/// A buffered change to committed state
#[derive(Debug, Clone)]
pub(crate) enum TxOp {
    SetNodeProperty {
        id: NodeId,
        key: String,
        value: PropertyValue,
    },
    RemoveNodeProperty {
        id: NodeId,
        key: String,
    },
    AddLabel {
        id: NodeId,
        label: Label,
    },
    SetRelationshipProperty {
        id: RelationshipId,
        key: String,
        value: PropertyValue,
    },
    RemoveRelationshipProperty {
        id: RelationshipId,
        key: String,
    },
    DeleteNode(NodeId),
    DeleteRelationship(RelationshipId),
    IndexAdd {
        kind: ElementKind,
        index: String,
        id: u64,
        field: String,
        value: PropertyValue,
    },
    IndexRemove {
        kind: ElementKind,
        index: String,
        id: u64,
        field: String,
        value: Option<PropertyValue>,
    },
}

impl TxOp {
    /// Whether the op refers to the given element
    pub(crate) fn targets(&self, kind: ElementKind, element: u64) -> bool {
        match (self, kind) {
            (TxOp::SetNodeProperty { id, .. }, ElementKind::Node)
            | (TxOp::RemoveNodeProperty { id, .. }, ElementKind::Node)
            | (TxOp::AddLabel { id, .. }, ElementKind::Node)
            | (TxOp::DeleteNode(id), ElementKind::Node) => id.as_u64() == element,
            (TxOp::SetRelationshipProperty { id, .. }, ElementKind::Relationship)
            | (TxOp::RemoveRelationshipProperty { id, .. }, ElementKind::Relationship)
            | (TxOp::DeleteRelationship(id), ElementKind::Relationship) => id.as_u64() == element,
            (TxOp::IndexAdd { kind: k, id, .. }, _) | (TxOp::IndexRemove { kind: k, id, .. }, _) => {
                *k == kind && *id == element
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert!(TransactionState::Active.is_active());
        assert!(TransactionState::Committed.is_terminal());
        assert!(TransactionState::RolledBack.is_terminal());
        assert_eq!(TransactionState::RolledBack.to_string(), "RolledBack");
    }

    #[test]
    fn test_op_targets() {
        let op = TxOp::IndexAdd {
            kind: ElementKind::Node,
            index: "node".into(),
            id: 3,
            field: "name".into(),
            value: "x".into(),
        };
        assert!(op.targets(ElementKind::Node, 3));
        assert!(!op.targets(ElementKind::Relationship, 3));
        assert!(TxOp::DeleteNode(NodeId::new(3)).targets(ElementKind::Node, 3));
        assert!(!TxOp::DeleteNode(NodeId::new(3)).targets(ElementKind::Relationship, 3));
    }
}

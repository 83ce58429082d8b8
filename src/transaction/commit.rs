//! Applying a transaction to the store under the write lock
//!
//! Every applied step records its inverse. If a later step fails the inverse
//! steps are replayed newest first, leaving store and indexes as they were.

use super::types::{TransactionError, TransactionResult, TxOp};
use crate::database::GraphState;
use crate::graph::{Label, Node, NodeId, PropertyValue, Relationship, RelationshipId};
use crate::index::ElementKind;
use tracing::warn;

#[derive(Debug)]
enum Undo {
    RemoveNode(NodeId),
    RemoveRelationship(RelationshipId),
    RestoreNodeProperty {
        id: NodeId,
        key: String,
        previous: Option<PropertyValue>,
    },
    RestoreRelationshipProperty {
        id: RelationshipId,
        key: String,
        previous: Option<PropertyValue>,
    },
    RemoveLabel {
        id: NodeId,
        label: Label,
    },
    RestoreNode(Node),
    RestoreRelationship(Relationship),
    Unindex {
        kind: ElementKind,
        index: String,
        id: u64,
        field: String,
        value: PropertyValue,
    },
    Reindex {
        kind: ElementKind,
        index: String,
        id: u64,
        field: String,
        value: PropertyValue,
    },
}

/// Everything a transaction wants to write
pub(crate) struct ChangeSet<'a> {
    pub nodes: Vec<&'a Node>,
    pub relationships: Vec<&'a Relationship>,
    pub ops: &'a [TxOp],
}

impl ChangeSet<'_> {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationships.is_empty() && self.ops.is_empty()
    }
}

/// Apply all changes or none
pub(crate) fn apply(state: &mut GraphState, changes: &ChangeSet<'_>) -> TransactionResult<()> {
    let mut undo = Vec::new();
    match apply_steps(state, changes, &mut undo) {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!("Undoing {} applied steps after commit error: {}", undo.len(), e);
            revert(state, undo);
            Err(e)
        }
    }
}

fn apply_steps(state: &mut GraphState, changes: &ChangeSet<'_>, undo: &mut Vec<Undo>) -> TransactionResult<()> {
    for node in &changes.nodes {
        state.store.insert_node((*node).clone())?;
        undo.push(Undo::RemoveNode(node.id));
    }

    for rel in &changes.relationships {
        state.store.insert_relationship((*rel).clone())?;
        undo.push(Undo::RemoveRelationship(rel.id));
    }

    for op in changes.ops {
        apply_op(state, op, undo)?;
    }
    Ok(())
}

fn apply_op(state: &mut GraphState, op: &TxOp, undo: &mut Vec<Undo>) -> TransactionResult<()> {
    match op {
        TxOp::SetNodeProperty { id, key, value } => {
            let previous = state.store.set_node_property(*id, key.clone(), value.clone())?;
            undo.push(Undo::RestoreNodeProperty {
                id: *id,
                key: key.clone(),
                previous,
            });
        }
        TxOp::RemoveNodeProperty { id, key } => {
            let previous = state.store.remove_node_property(*id, key)?;
            undo.push(Undo::RestoreNodeProperty {
                id: *id,
                key: key.clone(),
                previous,
            });
        }
        TxOp::AddLabel { id, label } => {
            if state.store.add_label(*id, label.clone())? {
                undo.push(Undo::RemoveLabel {
                    id: *id,
                    label: label.clone(),
                });
            }
        }
        TxOp::SetRelationshipProperty { id, key, value } => {
            let previous = state
                .store
                .set_relationship_property(*id, key.clone(), value.clone())?;
            undo.push(Undo::RestoreRelationshipProperty {
                id: *id,
                key: key.clone(),
                previous,
            });
        }
        TxOp::RemoveRelationshipProperty { id, key } => {
            let previous = state.store.remove_relationship_property(*id, key)?;
            undo.push(Undo::RestoreRelationshipProperty {
                id: *id,
                key: key.clone(),
                previous,
            });
        }
        TxOp::DeleteNode(id) => {
            let node = state.store.delete_node(*id)?;
            undo.push(Undo::RestoreNode(node));
            for (index, element, field, value) in state.indexes.remove_element(ElementKind::Node, id.as_u64()) {
                undo.push(Undo::Reindex {
                    kind: ElementKind::Node,
                    index,
                    id: element,
                    field,
                    value,
                });
            }
        }
        TxOp::DeleteRelationship(id) => {
            let rel = state.store.delete_relationship(*id)?;
            undo.push(Undo::RestoreRelationship(rel));
            for (index, element, field, value) in state
                .indexes
                .remove_element(ElementKind::Relationship, id.as_u64())
            {
                undo.push(Undo::Reindex {
                    kind: ElementKind::Relationship,
                    index,
                    id: element,
                    field,
                    value,
                });
            }
        }
        TxOp::IndexAdd { kind, index, id, field, value } => {
            ensure_element(state, *kind, *id)?;
            for added in state.indexes.add(*kind, index, *id, field, value.clone())? {
                undo.push(Undo::Unindex {
                    kind: *kind,
                    index: index.clone(),
                    id: *id,
                    field: field.clone(),
                    value: added,
                });
            }
        }
        TxOp::IndexRemove { kind, index, id, field, value } => {
            for removed in state.indexes.remove(*kind, index, *id, field, value.as_ref())? {
                undo.push(Undo::Reindex {
                    kind: *kind,
                    index: index.clone(),
                    id: *id,
                    field: field.clone(),
                    value: removed,
                });
            }
        }
    }
    Ok(())
}

fn ensure_element(state: &GraphState, kind: ElementKind, id: u64) -> TransactionResult<()> {
    let exists = match kind {
        ElementKind::Node => state.store.has_node(NodeId::new(id)),
        ElementKind::Relationship => state.store.has_relationship(RelationshipId::new(id)),
    };
    if exists {
        Ok(())
    } else {
        Err(TransactionError::Graph(match kind {
            ElementKind::Node => crate::graph::GraphError::NodeNotFound(NodeId::new(id)),
            ElementKind::Relationship => {
                crate::graph::GraphError::RelationshipNotFound(RelationshipId::new(id))
            }
        }))
    }
}

fn revert(state: &mut GraphState, undo: Vec<Undo>) {
    for step in undo.into_iter().rev() {
        let result: TransactionResult<()> = match step {
            Undo::RemoveNode(id) => state.store.delete_node(id).map(|_| ()).map_err(Into::into),
            Undo::RemoveRelationship(id) => state
                .store
                .delete_relationship(id)
                .map(|_| ())
                .map_err(Into::into),
            Undo::RestoreNodeProperty { id, key, previous } => {
                let restored = match previous {
                    Some(value) => state.store.set_node_property(id, key, value),
                    None => state.store.remove_node_property(id, &key),
                };
                restored.map(|_| ()).map_err(Into::into)
            }
            Undo::RestoreRelationshipProperty { id, key, previous } => {
                let restored = match previous {
                    Some(value) => state.store.set_relationship_property(id, key, value),
                    None => state.store.remove_relationship_property(id, &key),
                };
                restored.map(|_| ()).map_err(Into::into)
            }
            Undo::RemoveLabel { id, label } => state.store.remove_label(id, &label).map(|_| ()).map_err(Into::into),
            Undo::RestoreNode(node) => state.store.insert_node(node).map_err(Into::into),
            Undo::RestoreRelationship(rel) => state.store.insert_relationship(rel).map_err(Into::into),
            Undo::Unindex { kind, index, id, field, value } => state
                .indexes
                .remove(kind, &index, id, &field, Some(&value))
                .map(|_| ())
                .map_err(Into::into),
            Undo::Reindex { kind, index, id, field, value } => state
                .indexes
                .add(kind, &index, id, &field, value)
                .map(|_| ())
                .map_err(Into::into),
        };
        if let Err(e) = result {
            warn!("Undo step failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphError, PropertyMap};

    fn state_with_nodes(ids: &[u64]) -> GraphState {
        let mut state = GraphState::default();
        for id in ids {
            state.store.insert_node(Node::new(NodeId::new(*id))).unwrap();
        }
        state
    }

    #[test]
    fn test_apply_all() {
        let mut state = state_with_nodes(&[1]);
        let node = Node::new_with_properties(NodeId::new(2), vec![], PropertyMap::new());
        let rel = Relationship::new(RelationshipId::new(1), NodeId::new(1), NodeId::new(2), "KNOWS");
        let ops = vec![
            TxOp::SetNodeProperty {
                id: NodeId::new(1),
                key: "name".into(),
                value: "root".into(),
            },
            TxOp::IndexAdd {
                kind: ElementKind::Node,
                index: "node".into(),
                id: 2,
                field: "k".into(),
                value: "v".into(),
            },
        ];
        let changes = ChangeSet {
            nodes: vec![&node],
            relationships: vec![&rel],
            ops: &ops,
        };

        apply(&mut state, &changes).unwrap();
        assert_eq!(state.store.node_count(), 2);
        assert_eq!(state.store.relationship_count(), 1);
        assert_eq!(
            state.indexes.get(ElementKind::Node, "node", "k", &"v".into()).unwrap(),
            vec![2]
        );
    }

    #[test]
    fn test_failed_commit_leaves_state_untouched() {
        let mut state = state_with_nodes(&[1, 2]);
        let rel = Relationship::new(RelationshipId::new(1), NodeId::new(1), NodeId::new(2), "KNOWS");
        state.store.insert_relationship(rel).unwrap();
        state.indexes.add(ElementKind::Node, "node", 2, "name", "two".into()).unwrap();

        let node = Node::new(NodeId::new(3));
        let ops = vec![
            TxOp::SetNodeProperty {
                id: NodeId::new(2),
                key: "name".into(),
                value: "changed".into(),
            },
            TxOp::IndexRemove {
                kind: ElementKind::Node,
                index: "node".into(),
                id: 2,
                field: "name".into(),
                value: None,
            },
            // fails: node 1 still has a relationship
            TxOp::DeleteNode(NodeId::new(1)),
        ];
        let changes = ChangeSet {
            nodes: vec![&node],
            relationships: vec![],
            ops: &ops,
        };

        let err = apply(&mut state, &changes).unwrap_err();
        assert!(matches!(
            err,
            TransactionError::Graph(GraphError::NodeHasRelationships(_))
        ));

        assert_eq!(state.store.node_count(), 2);
        assert!(!state.store.has_node(NodeId::new(3)));
        assert!(state.store.get_node(NodeId::new(2)).unwrap().get_property("name").is_none());
        assert_eq!(
            state.indexes.get(ElementKind::Node, "node", "name", &"two".into()).unwrap(),
            vec![2]
        );
    }
}

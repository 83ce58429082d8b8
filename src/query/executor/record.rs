//! Record structures for query execution
//!
//! Records carry variable bindings through the pipeline; rows are the
//! projected output.

use crate::graph::{Node, NodeId, Path, PropertyValue, Relationship, RelationshipId};
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A result row: column name to value, in `RETURN` order
pub type Row = IndexMap<String, Value>;

/// Value types that can be bound to variables or returned in a row
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    /// A scalar, list or map made only of property values
    Property(PropertyValue),
    Node(Node),
    Relationship(Relationship),
    Path(Path),
    /// A list holding at least one graph element
    List(Vec<Value>),
    /// A map holding at least one graph element
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Build a list value; lists of plain properties collapse to an array
    pub fn list(items: Vec<Value>) -> Value {
        if items.iter().all(|v| matches!(v, Value::Null | Value::Property(_))) {
            Value::Property(PropertyValue::Array(
                items.into_iter().map(Value::into_property_lossy).collect(),
            ))
        } else {
            Value::List(items)
        }
    }

    /// Build a map value; maps of plain properties collapse to a property map
    pub fn map(entries: BTreeMap<String, Value>) -> Value {
        if entries.values().all(|v| matches!(v, Value::Null | Value::Property(_))) {
            Value::Property(PropertyValue::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, v.into_property_lossy()))
                    .collect(),
            ))
        } else {
            Value::Map(entries)
        }
    }

    fn into_property_lossy(self) -> PropertyValue {
        match self {
            Value::Property(p) => p,
            _ => PropertyValue::Null,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_relationship(&self) -> Option<&Relationship> {
        match self {
            Value::Relationship(rel) => Some(rel),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Value::Path(path) => Some(path),
            _ => None,
        }
    }

    pub fn as_property(&self) -> Option<&PropertyValue> {
        match self {
            Value::Property(prop) => Some(prop),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn node_id(&self) -> Option<NodeId> {
        self.as_node().map(|n| n.id)
    }

    pub fn relationship_id(&self) -> Option<RelationshipId> {
        self.as_relationship().map(|r| r.id)
    }

    /// Items of a list value, whichever representation it has
    pub fn list_items(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(items) => Some(items.clone()),
            Value::Property(PropertyValue::Array(items)) => {
                Some(items.iter().cloned().map(Value::from).collect())
            }
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Property(p) => p.type_name(),
            Value::Node(_) => "Node",
            Value::Relationship(_) => "Relationship",
            Value::Path(_) => "Path",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Map(_) => 0,
            Value::Node(_) => 1,
            Value::Relationship(_) => 2,
            Value::List(_) => 3,
            Value::Path(_) => 4,
            Value::Property(_) => 5,
            Value::Null => 6,
        }
    }

    /// Total order used by ORDER BY, DISTINCT and min/max. Null sorts last.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Property(a), Value::Property(b)) => a.cmp(b),
            (Value::Node(a), Value::Node(b)) => a.id.cmp(&b.id),
            (Value::Relationship(a), Value::Relationship(b)) => a.id.cmp(&b.id),
            (Value::Path(a), Value::Path(b)) => path_key(a).cmp(&path_key(b)),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b) {
                    let ord = x.sort_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Map(a), Value::Map(b)) => {
                for ((ka, va), (kb, vb)) in a.iter().zip(b) {
                    let ord = ka.cmp(kb).then_with(|| va.sort_cmp(vb));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

fn path_key(path: &Path) -> (Vec<NodeId>, Vec<RelationshipId>) {
    (
        path.nodes().iter().map(|n| n.id).collect(),
        path.relationships().iter().map(|r| r.id).collect(),
    )
}

// Graph elements compare by identity
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.sort_cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Null => {}
            Value::Property(p) => p.hash(state),
            Value::Node(n) => n.id.hash(state),
            Value::Relationship(r) => r.id.hash(state),
            Value::Path(p) => path_key(p).hash(state),
            Value::List(items) => items.hash(state),
            Value::Map(entries) => entries.hash(state),
        }
    }
}

impl From<PropertyValue> for Value {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Null => Value::Null,
            other => Value::Property(other),
        }
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(node)
    }
}

impl From<Relationship> for Value {
    fn from(rel: Relationship) -> Self {
        Value::Relationship(rel)
    }
}

impl From<Path> for Value {
    fn from(path: Path) -> Self {
        Value::Path(path)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Property(p) => write!(f, "{}", p),
            Value::Node(n) => write!(f, "Node[{}]", n.id.as_u64()),
            Value::Relationship(r) => write!(
                f,
                "({})-[{}:{}]->({})",
                r.start.as_u64(),
                r.id.as_u64(),
                r.rel_type.as_str(),
                r.end.as_u64()
            ),
            Value::Path(p) => write!(f, "Path(length {})", p.length()),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// A single record flowing through the query pipeline
#[derive(Debug, Clone, Default)]
pub struct Record {
    /// Variable bindings in binding order
    bindings: IndexMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable to a value
    pub fn bind(&mut self, variable: impl Into<String>, value: Value) {
        self.bindings.insert(variable.into(), value);
    }

    pub fn get(&self, variable: &str) -> Option<&Value> {
        self.bindings.get(variable)
    }

    pub fn has(&self, variable: &str) -> bool {
        self.bindings.contains_key(variable)
    }

    pub fn bindings(&self) -> &IndexMap<String, Value> {
        &self.bindings
    }

    /// Merge another record into this one
    pub fn merge(&mut self, other: Record) {
        self.bindings.extend(other.bindings);
    }
}

/// Prefix for executor-internal bindings
pub(crate) const HIDDEN_PREFIX: &str = "  ";

/// The result set of a query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordBatch {
    /// Column names, in `RETURN` order
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl RecordBatch {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// All values of one column, in row order
    pub fn column(&self, name: &str) -> Vec<&Value> {
        self.rows.iter().filter_map(|row| row.get(name)).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }
}

impl IntoIterator for RecordBatch {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

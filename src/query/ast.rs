//! Abstract Syntax Tree for the read-only Cypher subset

use crate::graph::{Direction, Label, PropertyValue, RelationshipType};
use crate::index::ElementKind;

/// A parsed read-only query
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub start_clause: Option<StartClause>,
    pub match_clauses: Vec<MatchClause>,
    pub where_clause: Option<WhereClause>,
    pub return_clause: ReturnClause,
    pub order_by: Option<OrderByClause>,
    pub skip: Option<Expression>,
    pub limit: Option<Expression>,
}

/// `START n=node(1), r=relationship:links(kind="x")`
#[derive(Debug, Clone, PartialEq)]
pub struct StartClause {
    pub points: Vec<StartPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartPoint {
    pub variable: String,
    pub kind: ElementKind,
    pub lookup: StartLookup,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StartLookup {
    /// `node(1, 2)`; each expression is an id or a list of ids
    Ids(Vec<Expression>),
    /// `node(*)`
    All,
    /// `node:index(field = "value")`
    IndexExact {
        index: String,
        field: String,
        value: Expression,
    },
    /// `node:index("field:value AND ...")`
    IndexQuery { index: String, query: Expression },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchClause {
    pub patterns: Vec<PathPattern>,
}

/// `p = (a)-[r]->(b)...`
#[derive(Debug, Clone, PartialEq)]
pub struct PathPattern {
    pub variable: Option<String>,
    pub start: NodePattern,
    pub segments: Vec<PathSegment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub relationship: RelationshipPattern,
    pub node: NodePattern,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodePattern {
    pub variable: Option<String>,
    pub labels: Vec<Label>,
    pub properties: Vec<(String, Expression)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipPattern {
    pub variable: Option<String>,
    pub types: Vec<RelationshipType>,
    pub direction: Direction,
    pub length: Option<LengthPattern>,
    pub properties: Vec<(String, Expression)>,
}

/// Variable length `*min..max`; open ends are `None`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthPattern {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub predicate: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(PropertyValue),
    Parameter(String),
    Variable(String),
    Property {
        expr: Box<Expression>,
        property: String,
    },
    List(Vec<Expression>),
    Map(Vec<(String, Expression)>),
    Binary {
        left: Box<Expression>,
        op: BinaryOp,
        right: Box<Expression>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expression>,
    },
    Function {
        name: String,
        distinct: bool,
        args: Vec<Expression>,
    },
    CountStar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Xor,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    StartsWith,
    EndsWith,
    Contains,
    In,
    RegexMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Minus,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnClause {
    /// Empty for `RETURN *`
    pub items: Vec<ReturnItem>,
    pub distinct: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnItem {
    pub expression: Expression,
    pub alias: Option<String>,
    /// Source text, used as the column name without an alias
    pub text: String,
}

impl ReturnItem {
    pub fn column_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByClause {
    pub items: Vec<OrderByItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub expression: Expression,
    pub ascending: bool,
    pub text: String,
}

const AGGREGATES: [&str; 6] = ["count", "sum", "avg", "min", "max", "collect"];

/// Whether `name` is an aggregate function, ignoring case
pub fn is_aggregate_function(name: &str) -> bool {
    AGGREGATES.contains(&name.to_lowercase().as_str())
}

impl Expression {
    /// Whether this is an aggregate call
    pub fn is_aggregate(&self) -> bool {
        match self {
            Expression::CountStar => true,
            Expression::Function { name, .. } => is_aggregate_function(name),
            _ => false,
        }
    }

    /// Whether an aggregate call appears anywhere inside
    pub fn contains_aggregate(&self) -> bool {
        if self.is_aggregate() {
            return true;
        }
        match self {
            Expression::Property { expr, .. } | Expression::Unary { expr, .. } => expr.contains_aggregate(),
            Expression::Binary { left, right, .. } => left.contains_aggregate() || right.contains_aggregate(),
            Expression::List(items) | Expression::Function { args: items, .. } => {
                items.iter().any(Expression::contains_aggregate)
            }
            Expression::Map(entries) => entries.iter().any(|(_, e)| e.contains_aggregate()),
            _ => false,
        }
    }
}

impl Query {
    pub fn is_aggregating(&self) -> bool {
        self.return_clause
            .items
            .iter()
            .any(|item| item.expression.contains_aggregate())
    }
}

//! Query execution engine
//!
//! A query runs as a pipeline over records: START lookups (cartesian
//! product), MATCH expansion, WHERE filtering, projection or grouping,
//! DISTINCT, ORDER BY, SKIP and LIMIT.

pub mod aggregate;
pub mod eval;
pub mod matcher;
pub mod record;

pub use aggregate::Accumulator;
pub use eval::ExecutionContext;
pub use record::{Record, RecordBatch, Row, Value};

use crate::graph::{GraphError, GraphStore, NodeId, PropertyValue, RelationshipId};
use crate::index::{ElementKind, IndexError, IndexManager, IndexQuery};
use crate::query::ast::{Expression, Query, ReturnItem, StartClause, StartLookup, StartPoint};
use crate::query::Params;
use indexmap::IndexMap;
use record::HIDDEN_PREFIX;
use rustc_hash::FxHashSet;
use thiserror::Error;

/// Execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// Variable not found
    #[error("Variable not found: {0}")]
    VariableNotFound(String),

    /// A `$param` with no supplied value
    #[error("Missing parameter: {0}")]
    ParameterMissing(String),

    /// Type error
    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Runtime error
    #[error("Runtime error: {0}")]
    RuntimeError(String),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// Query executor for read-only queries
pub struct QueryExecutor<'a> {
    ctx: ExecutionContext<'a>,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(store: &'a GraphStore, indexes: &'a IndexManager, params: &'a Params) -> Self {
        Self {
            ctx: ExecutionContext::new(store, indexes, params),
        }
    }

    /// Execute a parsed query and return its rows
    pub fn execute(&self, query: &Query) -> ExecutionResult<RecordBatch> {
        let mut records = match &query.start_clause {
            Some(start) => self.start_records(start)?,
            None => vec![Record::new()],
        };

        for clause in &query.match_clauses {
            for pattern in &clause.patterns {
                let mut next = Vec::new();
                for record in &records {
                    next.extend(matcher::match_pattern(&self.ctx, pattern, record)?);
                }
                records = next;
            }
        }

        if let Some(where_clause) = &query.where_clause {
            let mut kept = Vec::with_capacity(records.len());
            for record in records {
                if self.ctx.is_true(&where_clause.predicate, &record)? {
                    kept.push(record);
                }
            }
            records = kept;
        }

        let columns = output_columns(query);
        let mut rows = if query.is_aggregating() {
            self.aggregate(query, records)?
        } else {
            self.project(query, &columns, records)?
        };

        if query.return_clause.distinct {
            let mut seen = FxHashSet::default();
            rows.retain(|(row, _)| seen.insert(row.values().cloned().collect::<Vec<_>>()));
        }

        if let Some(order_by) = &query.order_by {
            let mut keyed = Vec::with_capacity(rows.len());
            for (row, scope) in rows {
                let mut keys = Vec::with_capacity(order_by.items.len());
                for item in &order_by.items {
                    let key = match row.get(&item.text) {
                        Some(value) => value.clone(),
                        None => self.ctx.evaluate(&item.expression, &scope)?,
                    };
                    keys.push(key);
                }
                keyed.push((keys, row, scope));
            }
            keyed.sort_by(|(a, ..), (b, ..)| {
                for ((x, y), item) in a.iter().zip(b).zip(&order_by.items) {
                    let ord = x.sort_cmp(y);
                    let ord = if item.ascending { ord } else { ord.reverse() };
                    if ord.is_ne() {
                        return ord;
                    }
                }
                std::cmp::Ordering::Equal
            });
            rows = keyed.into_iter().map(|(_, row, scope)| (row, scope)).collect();
        }

        let skip = self.row_count(query.skip.as_ref(), "SKIP")?.unwrap_or(0);
        let limit = self.row_count(query.limit.as_ref(), "LIMIT")?;

        let mut batch = RecordBatch::new(columns);
        batch.rows = rows
            .into_iter()
            .skip(skip)
            .take(limit.unwrap_or(usize::MAX))
            .map(|(row, _)| row)
            .collect();
        Ok(batch)
    }

    fn start_records(&self, start: &StartClause) -> ExecutionResult<Vec<Record>> {
        let mut records = vec![Record::new()];
        for point in &start.points {
            let values = self.start_values(point)?;
            let mut next = Vec::with_capacity(records.len() * values.len());
            for record in &records {
                for value in &values {
                    let mut extended = record.clone();
                    extended.bind(point.variable.clone(), value.clone());
                    next.push(extended);
                }
            }
            records = next;
        }
        Ok(records)
    }

    fn start_values(&self, point: &StartPoint) -> ExecutionResult<Vec<Value>> {
        let empty = Record::new();
        let ids: Vec<u64> = match &point.lookup {
            StartLookup::All => {
                return Ok(match point.kind {
                    ElementKind::Node => self.ctx.store.all_nodes().cloned().map(Value::Node).collect(),
                    ElementKind::Relationship => self
                        .ctx
                        .store
                        .all_relationships()
                        .cloned()
                        .map(Value::Relationship)
                        .collect(),
                });
            }
            StartLookup::Ids(exprs) => {
                let mut ids = Vec::new();
                for expr in exprs {
                    collect_ids(&self.ctx.evaluate(expr, &empty)?, &mut ids)?;
                }
                // Unknown ids fail the query
                return ids
                    .into_iter()
                    .map(|id| self.element(point.kind, id))
                    .collect();
            }
            StartLookup::IndexExact { index, field, value } => {
                let value = match self.ctx.evaluate(value, &empty)? {
                    Value::Property(p) => p,
                    Value::Null => PropertyValue::Null,
                    other => {
                        return Err(ExecutionError::TypeError(format!(
                            "Index value must be a property, got {}",
                            other.type_name()
                        )))
                    }
                };
                self.ctx.indexes.get(point.kind, index, field, &value)?
            }
            StartLookup::IndexQuery { index, query } => {
                let text = match self.ctx.evaluate(query, &empty)? {
                    Value::Property(PropertyValue::String(s)) => s,
                    other => {
                        return Err(ExecutionError::TypeError(format!(
                            "Index query must be a string, got {}",
                            other.type_name()
                        )))
                    }
                };
                let query = IndexQuery::parse(&text)?;
                self.ctx.indexes.query(point.kind, index, &query)?
            }
        };

        // Skip index entries whose element is gone
        Ok(ids
            .into_iter()
            .filter_map(|id| self.element(point.kind, id).ok())
            .collect())
    }

    fn element(&self, kind: ElementKind, id: u64) -> ExecutionResult<Value> {
        match kind {
            ElementKind::Node => self
                .ctx
                .store
                .get_node(NodeId::new(id))
                .cloned()
                .map(Value::Node)
                .ok_or(ExecutionError::Graph(GraphError::NodeNotFound(NodeId::new(id)))),
            ElementKind::Relationship => self
                .ctx
                .store
                .get_relationship(RelationshipId::new(id))
                .cloned()
                .map(Value::Relationship)
                .ok_or(ExecutionError::Graph(GraphError::RelationshipNotFound(RelationshipId::new(id)))),
        }
    }

    /// Plain projection; each row keeps its source record for ORDER BY
    fn project(&self, query: &Query, columns: &[String], records: Vec<Record>) -> ExecutionResult<Vec<(Row, Record)>> {
        let items = &query.return_clause.items;
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let mut row = Row::new();
            if items.is_empty() {
                for column in columns {
                    row.insert(column.clone(), record.get(column).cloned().unwrap_or(Value::Null));
                }
            } else {
                for item in items {
                    row.insert(item.column_name().to_string(), self.ctx.evaluate(&item.expression, &record)?);
                }
            }
            let scope = scope_of(record, &row);
            rows.push((row, scope));
        }
        Ok(rows)
    }

    /// Grouped projection; non-aggregate items are the grouping keys
    fn aggregate(&self, query: &Query, records: Vec<Record>) -> ExecutionResult<Vec<(Row, Record)>> {
        let items = &query.return_clause.items;

        let mut aggregates = Vec::new();
        let rewritten: Vec<Option<Expression>> = items
            .iter()
            .map(|item| {
                item.expression
                    .contains_aggregate()
                    .then(|| extract_aggregates(&item.expression, &mut aggregates))
            })
            .collect();
        let prototypes = aggregates
            .iter()
            .map(Accumulator::for_expression)
            .collect::<ExecutionResult<Vec<_>>>()?;

        struct Group {
            keys: Vec<Value>,
            first: Record,
            accumulators: Vec<Accumulator>,
        }

        let key_items: Vec<&ReturnItem> = items.iter().filter(|i| !i.expression.contains_aggregate()).collect();
        let mut groups: IndexMap<Vec<Value>, Group> = IndexMap::new();

        for record in records {
            let keys = key_items
                .iter()
                .map(|item| self.ctx.evaluate(&item.expression, &record))
                .collect::<ExecutionResult<Vec<_>>>()?;
            let values = prototypes
                .iter()
                .map(|(_, arg)| arg.as_ref().map(|a| self.ctx.evaluate(a, &record)).transpose())
                .collect::<ExecutionResult<Vec<_>>>()?;

            let group = groups.entry(keys.clone()).or_insert_with(|| Group {
                keys,
                first: record,
                accumulators: prototypes.iter().map(|(acc, _)| acc.clone()).collect(),
            });
            for (acc, value) in group.accumulators.iter_mut().zip(values) {
                acc.update(value)?;
            }
        }

        // Aggregating without keys always yields one row
        if groups.is_empty() && key_items.is_empty() {
            groups.insert(
                Vec::new(),
                Group {
                    keys: Vec::new(),
                    first: Record::new(),
                    accumulators: prototypes.iter().map(|(acc, _)| acc.clone()).collect(),
                },
            );
        }

        let mut rows = Vec::with_capacity(groups.len());
        for (_, group) in groups {
            let mut scope = group.first;
            for (i, acc) in group.accumulators.into_iter().enumerate() {
                scope.bind(hidden_name(i), acc.finish());
            }

            let mut keys = group.keys.into_iter();
            let mut row = Row::new();
            for (item, rewritten) in items.iter().zip(&rewritten) {
                let value = match rewritten {
                    Some(expr) => self.ctx.evaluate(expr, &scope)?,
                    None => keys.next().unwrap_or(Value::Null),
                };
                row.insert(item.column_name().to_string(), value);
            }
            let scope = scope_of(scope, &row);
            rows.push((row, scope));
        }
        Ok(rows)
    }

    fn row_count(&self, expr: Option<&Expression>, clause: &str) -> ExecutionResult<Option<usize>> {
        let Some(expr) = expr else {
            return Ok(None);
        };
        match self.ctx.evaluate(expr, &Record::new())? {
            Value::Property(PropertyValue::Integer(n)) if n >= 0 => Ok(Some(n as usize)),
            other => Err(ExecutionError::TypeError(format!(
                "{} expects a non-negative integer, got {}",
                clause, other
            ))),
        }
    }
}

/// ORDER BY sees the source bindings plus the returned columns
fn scope_of(mut record: Record, row: &Row) -> Record {
    for (column, value) in row {
        record.bind(column.clone(), value.clone());
    }
    record
}

fn hidden_name(index: usize) -> String {
    format!("{}agg{}", HIDDEN_PREFIX, index)
}

/// Replace every aggregate call in `expr` with a hidden variable, collecting
/// the calls in order
fn extract_aggregates(expr: &Expression, found: &mut Vec<Expression>) -> Expression {
    if expr.is_aggregate() {
        found.push(expr.clone());
        return Expression::Variable(hidden_name(found.len() - 1));
    }
    match expr {
        Expression::Property { expr, property } => Expression::Property {
            expr: Box::new(extract_aggregates(expr, found)),
            property: property.clone(),
        },
        Expression::List(items) => Expression::List(items.iter().map(|e| extract_aggregates(e, found)).collect()),
        Expression::Map(entries) => Expression::Map(
            entries
                .iter()
                .map(|(k, e)| (k.clone(), extract_aggregates(e, found)))
                .collect(),
        ),
        Expression::Binary { left, op, right } => Expression::Binary {
            left: Box::new(extract_aggregates(left, found)),
            op: *op,
            right: Box::new(extract_aggregates(right, found)),
        },
        Expression::Unary { op, expr } => Expression::Unary {
            op: *op,
            expr: Box::new(extract_aggregates(expr, found)),
        },
        Expression::Function { name, distinct, args } => Expression::Function {
            name: name.clone(),
            distinct: *distinct,
            args: args.iter().map(|e| extract_aggregates(e, found)).collect(),
        },
        other => other.clone(),
    }
}

/// Ids from an integer or a list of integers
fn collect_ids(value: &Value, ids: &mut Vec<u64>) -> ExecutionResult<()> {
    match value {
        Value::Property(PropertyValue::Integer(id)) if *id >= 0 => ids.push(*id as u64),
        Value::Property(PropertyValue::Array(items)) => {
            for item in items {
                collect_ids(&Value::from(item.clone()), ids)?;
            }
        }
        other => {
            return Err(ExecutionError::TypeError(format!(
                "START ids must be non-negative integers, got {}",
                other
            )))
        }
    }
    Ok(())
}

/// Column names; `RETURN *` lists every named variable in order of appearance
fn output_columns(query: &Query) -> Vec<String> {
    if !query.return_clause.items.is_empty() {
        return query
            .return_clause
            .items
            .iter()
            .map(|item| item.column_name().to_string())
            .collect();
    }

    let mut columns: Vec<String> = Vec::new();
    let mut push = |name: &Option<String>| {
        if let Some(name) = name {
            if !columns.contains(name) {
                columns.push(name.clone());
            }
        }
    };
    if let Some(start) = &query.start_clause {
        for point in &start.points {
            push(&Some(point.variable.clone()));
        }
    }
    for clause in &query.match_clauses {
        for pattern in &clause.patterns {
            push(&pattern.variable);
            push(&pattern.start.variable);
            for segment in &pattern.segments {
                push(&segment.relationship.variable);
                push(&segment.node.variable);
            }
        }
    }
    columns
}

//! Pattern matching for MATCH clauses
//!
//! Each path pattern is matched left to right by depth-first expansion from
//! every candidate start node. A relationship is used at most once per
//! matched path pattern.

use super::eval::{equals, ExecutionContext};
use super::record::{Record, Value};
use super::{ExecutionError, ExecutionResult};
use crate::graph::{Node, Path, Relationship, RelationshipId};
use crate::query::ast::{Expression, NodePattern, PathPattern, RelationshipPattern};
use rustc_hash::FxHashSet;

/// All extensions of `record` that match `pattern`
pub fn match_pattern(ctx: &ExecutionContext<'_>, pattern: &PathPattern, record: &Record) -> ExecutionResult<Vec<Record>> {
    let mut matches = Vec::new();
    let mut used = FxHashSet::default();

    for node in start_candidates(ctx, &pattern.start, record)? {
        if !node_matches(ctx, &pattern.start, &node, record)? {
            continue;
        }
        let mut bound = record.clone();
        if !bind_node(&pattern.start, &node, &mut bound) {
            continue;
        }
        let mut matcher = PathMatcher {
            ctx,
            pattern,
            used: &mut used,
            out: &mut matches,
        };
        matcher.expand(0, bound, Path::single(node))?;
    }

    Ok(matches)
}

fn start_candidates(ctx: &ExecutionContext<'_>, pattern: &NodePattern, record: &Record) -> ExecutionResult<Vec<Node>> {
    if let Some(bound) = pattern.variable.as_deref().and_then(|v| record.get(v)) {
        return match bound {
            Value::Node(node) => Ok(vec![node.clone()]),
            Value::Null => Ok(Vec::new()),
            other => Err(ExecutionError::TypeError(format!(
                "Variable '{}' is a {}, not a node",
                pattern.variable.as_deref().unwrap_or_default(),
                other.type_name()
            ))),
        };
    }

    let nodes = match pattern.labels.first() {
        Some(label) => ctx.store.get_nodes_by_label(label).into_iter().cloned().collect(),
        None => ctx.store.all_nodes().cloned().collect(),
    };
    Ok(nodes)
}

fn properties_match(
    ctx: &ExecutionContext<'_>,
    expected: &[(String, Expression)],
    actual: impl Fn(&str) -> Value,
    record: &Record,
) -> ExecutionResult<bool> {
    for (key, expr) in expected {
        let wanted = ctx.evaluate(expr, record)?;
        if equals(&actual(key), &wanted) != Some(true) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn node_matches(ctx: &ExecutionContext<'_>, pattern: &NodePattern, node: &Node, record: &Record) -> ExecutionResult<bool> {
    if !pattern.labels.iter().all(|label| node.has_label(label)) {
        return Ok(false);
    }
    properties_match(
        ctx,
        &pattern.properties,
        |key| node.get_property(key).cloned().map(Value::from).unwrap_or(Value::Null),
        record,
    )
}

fn relationship_matches(
    ctx: &ExecutionContext<'_>,
    pattern: &RelationshipPattern,
    rel: &Relationship,
    record: &Record,
) -> ExecutionResult<bool> {
    properties_match(
        ctx,
        &pattern.properties,
        |key| rel.get_property(key).cloned().map(Value::from).unwrap_or(Value::Null),
        record,
    )
}

/// Bind `value` to `variable`, or check it against an existing binding
fn bind(variable: Option<&str>, value: Value, record: &mut Record) -> bool {
    let Some(variable) = variable else {
        return true;
    };
    match record.get(variable) {
        Some(existing) => *existing == value,
        None => {
            record.bind(variable, value);
            true
        }
    }
}

fn bind_node(pattern: &NodePattern, node: &Node, record: &mut Record) -> bool {
    bind(pattern.variable.as_deref(), Value::Node(node.clone()), record)
}

struct PathMatcher<'m, 'a> {
    ctx: &'m ExecutionContext<'a>,
    pattern: &'m PathPattern,
    used: &'m mut FxHashSet<RelationshipId>,
    out: &'m mut Vec<Record>,
}

impl PathMatcher<'_, '_> {
    fn expand(&mut self, segment: usize, record: Record, path: Path) -> ExecutionResult<()> {
        let pattern = self.pattern;
        let Some(step) = pattern.segments.get(segment) else {
            let mut record = record;
            if let Some(var) = &pattern.variable {
                if !bind(Some(var), Value::Path(path), &mut record) {
                    return Ok(());
                }
            }
            self.out.push(record);
            return Ok(());
        };

        match &step.relationship.length {
            None => self.single_hop(segment, record, path),
            Some(length) => {
                let min = length.min.unwrap_or(1);
                let max = length.max;
                self.variable_hops(segment, &record, path, &mut Vec::new(), min, max)
            }
        }
    }

    /// Relationships leaving the end of `path` that fit the segment
    fn candidates(&self, segment: usize, path: &Path, record: &Record) -> ExecutionResult<Vec<(Relationship, Node)>> {
        let rel_pattern = &self.pattern.segments[segment].relationship;
        let current = path.end_node().id;
        let store = self.ctx.store;

        let mut result = Vec::new();
        for rel in store.relationships(current, rel_pattern.direction, &rel_pattern.types) {
            if self.used.contains(&rel.id) || !relationship_matches(self.ctx, rel_pattern, rel, record)? {
                continue;
            }
            let Some(next) = rel.other_node(current).and_then(|id| store.get_node(id)) else {
                continue;
            };
            result.push((rel.clone(), next.clone()));
        }
        Ok(result)
    }

    fn single_hop(&mut self, segment: usize, record: Record, path: Path) -> ExecutionResult<()> {
        let pattern = self.pattern;
        let step = &pattern.segments[segment];
        for (rel, next) in self.candidates(segment, &path, &record)? {
            if !node_matches(self.ctx, &step.node, &next, &record)? {
                continue;
            }
            let mut bound = record.clone();
            if !bind(step.relationship.variable.as_deref(), Value::Relationship(rel.clone()), &mut bound)
                || !bind_node(&step.node, &next, &mut bound)
            {
                continue;
            }
            self.used.insert(rel.id);
            let result = self.expand(segment + 1, bound, path.extend(rel.clone(), next));
            self.used.remove(&rel.id);
            result?;
        }
        Ok(())
    }

    fn variable_hops(
        &mut self,
        segment: usize,
        record: &Record,
        path: Path,
        hops: &mut Vec<Relationship>,
        min: usize,
        max: Option<usize>,
    ) -> ExecutionResult<()> {
        let pattern = self.pattern;
        let step = &pattern.segments[segment];

        if hops.len() >= min {
            let end = path.end_node();
            if node_matches(self.ctx, &step.node, end, record)? {
                let mut bound = record.clone();
                let rels = Value::list(hops.iter().cloned().map(Value::Relationship).collect());
                if bind(step.relationship.variable.as_deref(), rels, &mut bound) && bind_node(&step.node, end, &mut bound) {
                    self.expand(segment + 1, bound, path.clone())?;
                }
            }
        }

        if max.is_some_and(|m| hops.len() >= m) {
            return Ok(());
        }

        for (rel, next) in self.candidates(segment, &path, record)? {
            self.used.insert(rel.id);
            hops.push(rel.clone());
            let result = self.variable_hops(segment, record, path.extend(rel.clone(), next), hops, min, max);
            hops.pop();
            self.used.remove(&rel.id);
            result?;
        }
        Ok(())
    }
}

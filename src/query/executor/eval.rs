//! Expression evaluation
//!
//! Cypher null semantics: comparisons and arithmetic with null yield null,
//! boolean operators use three-valued logic.

use super::record::{Record, Value};
use super::{ExecutionError, ExecutionResult};
use crate::graph::{GraphStore, PropertyValue};
use crate::index::IndexManager;
use crate::query::ast::{BinaryOp, Expression, UnaryOp};
use crate::query::Params;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Everything an expression may read while a query runs
pub struct ExecutionContext<'a> {
    pub store: &'a GraphStore,
    pub indexes: &'a IndexManager,
    pub params: &'a Params,
    regex_cache: RefCell<FxHashMap<String, Regex>>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(store: &'a GraphStore, indexes: &'a IndexManager, params: &'a Params) -> Self {
        Self {
            store,
            indexes,
            params,
            regex_cache: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn parameter(&self, name: &str) -> ExecutionResult<Value> {
        self.params
            .get(name)
            .cloned()
            .map(Value::from)
            .ok_or_else(|| ExecutionError::ParameterMissing(name.to_string()))
    }

    /// Evaluate an expression against one record
    pub fn evaluate(&self, expr: &Expression, record: &Record) -> ExecutionResult<Value> {
        match expr {
            Expression::Literal(value) => Ok(Value::from(value.clone())),
            Expression::Parameter(name) => self.parameter(name),
            Expression::Variable(name) => record
                .get(name)
                .cloned()
                .ok_or_else(|| ExecutionError::VariableNotFound(name.clone())),
            Expression::Property { expr, property } => {
                let target = self.evaluate(expr, record)?;
                property_of(&target, property)
            }
            Expression::List(items) => {
                let values = items
                    .iter()
                    .map(|item| self.evaluate(item, record))
                    .collect::<ExecutionResult<Vec<_>>>()?;
                Ok(Value::list(values))
            }
            Expression::Map(entries) => {
                let mut map = BTreeMap::new();
                for (key, value) in entries {
                    map.insert(key.clone(), self.evaluate(value, record)?);
                }
                Ok(Value::map(map))
            }
            Expression::Binary { left, op, right } => self.evaluate_binary(left, *op, right, record),
            Expression::Unary { op, expr } => {
                let value = self.evaluate(expr, record)?;
                evaluate_unary(*op, value)
            }
            Expression::Function { name, args, .. } => {
                if expr.is_aggregate() {
                    return Err(ExecutionError::RuntimeError(format!(
                        "Aggregate {}() is only allowed in RETURN",
                        name
                    )));
                }
                self.call_function(name, args, record)
            }
            Expression::CountStar => Err(ExecutionError::RuntimeError(
                "count(*) is only allowed in RETURN".to_string(),
            )),
        }
    }

    /// Evaluate a predicate; only `true` passes
    pub fn is_true(&self, expr: &Expression, record: &Record) -> ExecutionResult<bool> {
        Ok(truth(&self.evaluate(expr, record)?)? == Some(true))
    }

    fn evaluate_binary(
        &self,
        left: &Expression,
        op: BinaryOp,
        right: &Expression,
        record: &Record,
    ) -> ExecutionResult<Value> {
        let lhs = self.evaluate(left, record)?;

        // Short-circuit where the left side decides
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            match (op, truth(&lhs)?) {
                (BinaryOp::And, Some(false)) => return Ok(boolean(false)),
                (BinaryOp::Or, Some(true)) => return Ok(boolean(true)),
                _ => {}
            }
        }

        let rhs = self.evaluate(right, record)?;
        match op {
            BinaryOp::And => Ok(tristate(match (truth(&lhs)?, truth(&rhs)?) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            })),
            BinaryOp::Or => Ok(tristate(match (truth(&lhs)?, truth(&rhs)?) {
                (Some(true), _) | (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            })),
            BinaryOp::Xor => Ok(tristate(match (truth(&lhs)?, truth(&rhs)?) {
                (Some(a), Some(b)) => Some(a != b),
                _ => None,
            })),
            BinaryOp::Eq => Ok(tristate(equals(&lhs, &rhs))),
            BinaryOp::Ne => Ok(tristate(equals(&lhs, &rhs).map(|eq| !eq))),
            BinaryOp::Lt => Ok(tristate(compare(&lhs, &rhs).map(Ordering::is_lt))),
            BinaryOp::Le => Ok(tristate(compare(&lhs, &rhs).map(Ordering::is_le))),
            BinaryOp::Gt => Ok(tristate(compare(&lhs, &rhs).map(Ordering::is_gt))),
            BinaryOp::Ge => Ok(tristate(compare(&lhs, &rhs).map(Ordering::is_ge))),
            BinaryOp::Add => add(lhs, rhs),
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => arithmetic(op, &lhs, &rhs),
            BinaryOp::StartsWith => Ok(string_test(&lhs, &rhs, |a, b| a.starts_with(b))),
            BinaryOp::EndsWith => Ok(string_test(&lhs, &rhs, |a, b| a.ends_with(b))),
            BinaryOp::Contains => Ok(string_test(&lhs, &rhs, |a, b| a.contains(b))),
            BinaryOp::In => contains_element(&lhs, &rhs),
            BinaryOp::RegexMatch => self.regex_match(&lhs, &rhs),
        }
    }

    fn regex_match(&self, lhs: &Value, rhs: &Value) -> ExecutionResult<Value> {
        let (Some(text), Some(pattern)) = (as_str(lhs), as_str(rhs)) else {
            return Ok(Value::Null);
        };

        let mut cache = self.regex_cache.borrow_mut();
        if !cache.contains_key(pattern) {
            let regex = Regex::new(&format!("^(?:{})$", pattern))
                .map_err(|e| ExecutionError::RuntimeError(format!("Invalid regex '{}': {}", pattern, e)))?;
            cache.insert(pattern.to_string(), regex);
        }
        Ok(boolean(cache.get(pattern).is_some_and(|re| re.is_match(text))))
    }

    fn call_function(&self, name: &str, args: &[Expression], record: &Record) -> ExecutionResult<Value> {
        let lname = name.to_lowercase();

        // coalesce and exists must see nulls before they become errors
        if lname == "coalesce" {
            for arg in args {
                let value = self.evaluate(arg, record)?;
                if !value.is_null() {
                    return Ok(value);
                }
            }
            return Ok(Value::Null);
        }

        let values = args
            .iter()
            .map(|arg| self.evaluate(arg, record))
            .collect::<ExecutionResult<Vec<_>>>()?;

        if lname == "exists" {
            let [value] = expect_args::<1>(name, values)?;
            return Ok(boolean(!value.is_null()));
        }

        let [arg] = expect_args::<1>(name, values)?;
        if arg.is_null() {
            return Ok(Value::Null);
        }

        match lname.as_str() {
            "id" => match &arg {
                Value::Node(n) => Ok(integer(n.id.as_u64() as i64)),
                Value::Relationship(r) => Ok(integer(r.id.as_u64() as i64)),
                other => Err(type_error(name, "a node or relationship", other)),
            },
            "type" => match &arg {
                Value::Relationship(r) => Ok(Value::from(PropertyValue::from(r.rel_type.as_str()))),
                other => Err(type_error(name, "a relationship", other)),
            },
            "labels" => match &arg {
                Value::Node(n) => Ok(Value::from(PropertyValue::Array(
                    n.labels.iter().map(|l| PropertyValue::from(l.as_str())).collect(),
                ))),
                other => Err(type_error(name, "a node", other)),
            },
            "length" => match &arg {
                Value::Path(p) => Ok(integer(p.length() as i64)),
                other => size_of(other).ok_or_else(|| type_error(name, "a path", other)),
            },
            "size" => size_of(&arg).ok_or_else(|| type_error(name, "a string or list", &arg)),
            "nodes" => match arg {
                Value::Path(p) => Ok(Value::list(p.nodes().iter().cloned().map(Value::Node).collect())),
                other => Err(type_error(name, "a path", &other)),
            },
            "relationships" | "rels" => match arg {
                Value::Path(p) => Ok(Value::list(
                    p.relationships().iter().cloned().map(Value::Relationship).collect(),
                )),
                other => Err(type_error(name, "a path", &other)),
            },
            "startnode" | "endnode" => match &arg {
                Value::Relationship(r) => {
                    let id = if lname == "startnode" { r.start } else { r.end };
                    Ok(self.store.get_node(id).cloned().map(Value::Node).unwrap_or(Value::Null))
                }
                other => Err(type_error(name, "a relationship", other)),
            },
            "toupper" => as_str(&arg)
                .map(|s| Value::from(PropertyValue::from(s.to_uppercase())))
                .ok_or_else(|| type_error(name, "a string", &arg)),
            "tolower" => as_str(&arg)
                .map(|s| Value::from(PropertyValue::from(s.to_lowercase())))
                .ok_or_else(|| type_error(name, "a string", &arg)),
            "tostring" => match &arg {
                Value::Property(PropertyValue::String(s)) => Ok(Value::from(PropertyValue::from(s.as_str()))),
                Value::Property(p) => Ok(Value::from(PropertyValue::from(p.index_text()))),
                other => Err(type_error(name, "a scalar", other)),
            },
            "abs" => match &arg {
                Value::Property(PropertyValue::Integer(i)) => i
                    .checked_abs()
                    .map(integer)
                    .ok_or_else(|| ExecutionError::RuntimeError("Integer overflow in abs()".to_string())),
                Value::Property(PropertyValue::Float(f)) => Ok(Value::from(PropertyValue::Float(f.abs()))),
                other => Err(type_error(name, "a number", other)),
            },
            _ => Err(ExecutionError::UnknownFunction(name.to_string())),
        }
    }
}

fn expect_args<const N: usize>(name: &str, values: Vec<Value>) -> ExecutionResult<[Value; N]> {
    let count = values.len();
    values.try_into().map_err(|_| {
        if KNOWN_FUNCTIONS.contains(&name.to_lowercase().as_str()) {
            ExecutionError::RuntimeError(format!("{}() expects {} argument(s), got {}", name, N, count))
        } else {
            ExecutionError::UnknownFunction(name.to_string())
        }
    })
}

const KNOWN_FUNCTIONS: [&str; 17] = [
    "id", "type", "labels", "length", "size", "nodes", "relationships", "rels", "startnode", "endnode",
    "toupper", "tolower", "tostring", "abs", "exists", "coalesce", "count",
];

fn type_error(function: &str, expected: &str, got: &Value) -> ExecutionError {
    ExecutionError::TypeError(format!(
        "{}() expects {}, got {}",
        function,
        expected,
        got.type_name()
    ))
}

fn boolean(b: bool) -> Value {
    Value::Property(PropertyValue::Boolean(b))
}

fn integer(i: i64) -> Value {
    Value::Property(PropertyValue::Integer(i))
}

fn tristate(b: Option<bool>) -> Value {
    b.map(boolean).unwrap_or(Value::Null)
}

fn as_str(value: &Value) -> Option<&str> {
    value.as_property().and_then(PropertyValue::as_string)
}

/// Three-valued truth of a value; non-booleans are a type error
pub(crate) fn truth(value: &Value) -> ExecutionResult<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Property(PropertyValue::Boolean(b)) => Ok(Some(*b)),
        other => Err(ExecutionError::TypeError(format!(
            "Expected a boolean, got {}",
            other.type_name()
        ))),
    }
}

/// Property of a node, relationship or map; null propagates
pub(crate) fn property_of(target: &Value, property: &str) -> ExecutionResult<Value> {
    match target {
        Value::Null => Ok(Value::Null),
        Value::Node(n) => Ok(n.get_property(property).cloned().map(Value::from).unwrap_or(Value::Null)),
        Value::Relationship(r) => Ok(r.get_property(property).cloned().map(Value::from).unwrap_or(Value::Null)),
        Value::Property(PropertyValue::Map(map)) => {
            Ok(map.get(property).cloned().map(Value::from).unwrap_or(Value::Null))
        }
        Value::Map(map) => Ok(map.get(property).cloned().unwrap_or(Value::Null)),
        other => Err(ExecutionError::TypeError(format!(
            "Cannot read property '{}' of {}",
            property,
            other.type_name()
        ))),
    }
}

/// Equality; null when either side is null
pub(crate) fn equals(lhs: &Value, rhs: &Value) -> Option<bool> {
    if lhs.is_null() || rhs.is_null() {
        return None;
    }
    Some(lhs == rhs)
}

/// Ordering between comparable values; null for nulls and mixed types
fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    let (Value::Property(a), Value::Property(b)) = (lhs, rhs) else {
        return None;
    };
    let comparable = matches!(
        (a, b),
        (PropertyValue::Integer(_) | PropertyValue::Float(_), PropertyValue::Integer(_) | PropertyValue::Float(_))
            | (PropertyValue::String(_), PropertyValue::String(_))
            | (PropertyValue::Boolean(_), PropertyValue::Boolean(_))
            | (PropertyValue::DateTime(_), PropertyValue::DateTime(_))
    );
    if !comparable {
        return None;
    }
    if let (Some(x), Some(y)) = (a.as_float(), b.as_float()) {
        if x.is_nan() || y.is_nan() {
            return None;
        }
    }
    Some(a.cmp(b))
}

fn string_test(lhs: &Value, rhs: &Value, test: impl Fn(&str, &str) -> bool) -> Value {
    match (as_str(lhs), as_str(rhs)) {
        (Some(a), Some(b)) => boolean(test(a, b)),
        _ => Value::Null,
    }
}

fn contains_element(needle: &Value, haystack: &Value) -> ExecutionResult<Value> {
    if haystack.is_null() {
        return Ok(Value::Null);
    }
    let items = haystack.list_items().ok_or_else(|| {
        ExecutionError::TypeError(format!("IN expects a list, got {}", haystack.type_name()))
    })?;
    if needle.is_null() {
        return Ok(if items.is_empty() { boolean(false) } else { Value::Null });
    }

    let mut saw_null = false;
    for item in &items {
        match equals(needle, item) {
            Some(true) => return Ok(boolean(true)),
            None => saw_null = true,
            Some(false) => {}
        }
    }
    Ok(if saw_null { Value::Null } else { boolean(false) })
}

fn size_of(value: &Value) -> Option<Value> {
    match value {
        Value::Property(PropertyValue::String(s)) => Some(integer(s.chars().count() as i64)),
        Value::Property(PropertyValue::Array(items)) => Some(integer(items.len() as i64)),
        Value::List(items) => Some(integer(items.len() as i64)),
        _ => None,
    }
}

fn add(lhs: Value, rhs: Value) -> ExecutionResult<Value> {
    if lhs.is_null() || rhs.is_null() {
        return Ok(Value::Null);
    }

    // List concatenation and append
    if let Some(mut items) = lhs.list_items() {
        match rhs.list_items() {
            Some(more) => items.extend(more),
            None => items.push(rhs),
        }
        return Ok(Value::list(items));
    }
    if let Some(mut items) = rhs.list_items() {
        items.insert(0, lhs);
        return Ok(Value::list(items));
    }

    match (&lhs, &rhs) {
        (Value::Property(PropertyValue::String(a)), Value::Property(b)) => {
            Ok(Value::from(PropertyValue::String(format!("{}{}", a, scalar_text(b)))))
        }
        (Value::Property(a), Value::Property(PropertyValue::String(b))) => {
            Ok(Value::from(PropertyValue::String(format!("{}{}", scalar_text(a), b))))
        }
        _ => arithmetic(BinaryOp::Add, &lhs, &rhs),
    }
}

fn scalar_text(value: &PropertyValue) -> String {
    match value {
        PropertyValue::String(s) => s.clone(),
        other => other.index_text(),
    }
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> ExecutionResult<Value> {
    if lhs.is_null() || rhs.is_null() {
        return Ok(Value::Null);
    }
    let (Some(a), Some(b)) = (lhs.as_property(), rhs.as_property()) else {
        return Err(arithmetic_error(op, lhs, rhs));
    };

    match (a, b) {
        (PropertyValue::Integer(x), PropertyValue::Integer(y)) => {
            let (x, y) = (*x, *y);
            let result = match op {
                BinaryOp::Add => x.checked_add(y),
                BinaryOp::Sub => x.checked_sub(y),
                BinaryOp::Mul => x.checked_mul(y),
                BinaryOp::Div | BinaryOp::Mod if y == 0 => {
                    return Err(ExecutionError::RuntimeError("Division by zero".to_string()));
                }
                BinaryOp::Div => x.checked_div(y),
                BinaryOp::Mod => x.checked_rem(y),
                _ => None,
            };
            result
                .map(integer)
                .ok_or_else(|| ExecutionError::RuntimeError(format!("Integer overflow in {:?}", op)))
        }
        _ => {
            let (Some(x), Some(y)) = (a.as_number(), b.as_number()) else {
                return Err(arithmetic_error(op, lhs, rhs));
            };
            let result = match op {
                BinaryOp::Add => x + y,
                BinaryOp::Sub => x - y,
                BinaryOp::Mul => x * y,
                BinaryOp::Div => x / y,
                BinaryOp::Mod => x % y,
                _ => return Err(arithmetic_error(op, lhs, rhs)),
            };
            Ok(Value::from(PropertyValue::Float(result)))
        }
    }
}

fn arithmetic_error(op: BinaryOp, lhs: &Value, rhs: &Value) -> ExecutionError {
    ExecutionError::TypeError(format!(
        "Cannot apply {:?} to {} and {}",
        op,
        lhs.type_name(),
        rhs.type_name()
    ))
}

fn evaluate_unary(op: UnaryOp, value: Value) -> ExecutionResult<Value> {
    match op {
        UnaryOp::IsNull => Ok(boolean(value.is_null())),
        UnaryOp::IsNotNull => Ok(boolean(!value.is_null())),
        UnaryOp::Not => Ok(tristate(truth(&value)?.map(|b| !b))),
        UnaryOp::Minus => match value {
            Value::Null => Ok(Value::Null),
            Value::Property(PropertyValue::Integer(i)) => i
                .checked_neg()
                .map(integer)
                .ok_or_else(|| ExecutionError::RuntimeError("Integer overflow in negation".to_string())),
            Value::Property(PropertyValue::Float(f)) => Ok(Value::from(PropertyValue::Float(-f))),
            other => Err(ExecutionError::TypeError(format!("Cannot negate {}", other.type_name()))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, NodeId, Relationship, RelationshipId};
    use crate::query::parser::parse_query;

    fn eval_with(store: &GraphStore, params: &Params, text: &str, record: &Record) -> ExecutionResult<Value> {
        let query = parse_query(&format!("MATCH (n) RETURN {}", text)).unwrap();
        let indexes = IndexManager::new();
        let ctx = ExecutionContext::new(store, &indexes, params);
        ctx.evaluate(&query.return_clause.items[0].expression, record)
    }

    fn eval(text: &str) -> ExecutionResult<Value> {
        eval_with(&GraphStore::new(), &Params::new(), text, &Record::new())
    }

    fn prop(value: impl Into<PropertyValue>) -> Value {
        Value::from(value.into())
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), prop(7));
        assert_eq!(eval("7 / 2").unwrap(), prop(3));
        assert_eq!(eval("7 % 4").unwrap(), prop(3));
        assert_eq!(eval("1 + 0.5").unwrap(), prop(1.5));
        assert_eq!(eval("-(2 - 5)").unwrap(), prop(3));
        assert_eq!(eval("'a' + 1").unwrap(), prop("a1"));
        assert_eq!(eval("[1] + 2").unwrap(), prop(vec![PropertyValue::Integer(1), PropertyValue::Integer(2)]));
        assert!(matches!(eval("1 / 0"), Err(ExecutionError::RuntimeError(_))));
        assert!(matches!(eval("true + 1"), Err(ExecutionError::TypeError(_))));
    }

    #[test]
    fn test_non_boolean_left_operands() {
        assert_eq!(eval("1 / 2").unwrap(), prop(0));
        assert_eq!(eval("2 * 3 + 1").unwrap(), prop(7));
        assert_eq!(eval("3 - 1 = 2").unwrap(), prop(true));
        assert_eq!(eval("'ab' =~ 'a.'").unwrap(), prop(true));
        assert_eq!(eval("'ab' <> 'ba'").unwrap(), prop(true));
        assert_eq!(eval("2 IN [1, 2]").unwrap(), prop(true));
        assert_eq!(eval("'ab' STARTS WITH 'a'").unwrap(), prop(true));
        assert!(matches!(eval("1 AND true"), Err(ExecutionError::TypeError(_))));
        assert!(matches!(eval("'x' OR false"), Err(ExecutionError::TypeError(_))));
    }

    #[test]
    fn test_null_semantics() {
        assert!(eval("null = null").unwrap().is_null());
        assert!(eval("1 < null").unwrap().is_null());
        assert!(eval("null + 1").unwrap().is_null());
        assert_eq!(eval("null IS NULL").unwrap(), prop(true));
        assert_eq!(eval("false AND null").unwrap(), prop(false));
        assert_eq!(eval("true OR null").unwrap(), prop(true));
        assert!(eval("true AND null").unwrap().is_null());
        assert!(eval("NOT null").unwrap().is_null());
        assert!(eval("2 IN [1, null]").unwrap().is_null());
        assert_eq!(eval("1 IN [1, null]").unwrap(), prop(true));
    }

    #[test]
    fn test_comparisons_and_strings() {
        assert_eq!(eval("1 = 1.0").unwrap(), prop(true));
        assert_eq!(eval("'b' > 'a'").unwrap(), prop(true));
        assert!(eval("'1' < 2").unwrap().is_null());
        assert_eq!(eval("true XOR false").unwrap(), prop(true));
        assert_eq!(eval("'Neo' STARTS WITH 'N'").unwrap(), prop(true));
        assert_eq!(eval("'Neo' ENDS WITH 'x'").unwrap(), prop(false));
        assert_eq!(eval("'Trinity' CONTAINS 'in'").unwrap(), prop(true));
        assert_eq!(eval("'Trinity' =~ 'T.*y'").unwrap(), prop(true));
        assert_eq!(eval("'Trinity' =~ 'rin'").unwrap(), prop(false));
        assert!(matches!(eval("'a' =~ '('"), Err(ExecutionError::RuntimeError(_))));
    }

    #[test]
    fn test_scalar_functions() {
        assert_eq!(eval("toUpper('neo')").unwrap(), prop("NEO"));
        assert_eq!(eval("tolower('NEO')").unwrap(), prop("neo"));
        assert_eq!(eval("toString(42)").unwrap(), prop("42"));
        assert_eq!(eval("size('abc')").unwrap(), prop(3));
        assert_eq!(eval("size([1, 2])").unwrap(), prop(2));
        assert_eq!(eval("abs(-3)").unwrap(), prop(3));
        assert_eq!(eval("coalesce(null, 'x', 'y')").unwrap(), prop("x"));
        assert!(eval("toUpper(null)").unwrap().is_null());
        assert!(matches!(eval("nope(1)"), Err(ExecutionError::UnknownFunction(_))));
        assert!(matches!(eval("abs('x')"), Err(ExecutionError::TypeError(_))));
        assert!(matches!(eval("count(1)"), Err(ExecutionError::RuntimeError(_))));
    }

    #[test]
    fn test_graph_functions() {
        let mut store = GraphStore::new();
        let mut a = Node::new(NodeId::new(1));
        a.add_label("Person");
        a.set_property("name", "Neo");
        store.insert_node(a.clone()).unwrap();
        store.insert_node(Node::new(NodeId::new(2))).unwrap();
        let rel = Relationship::new(RelationshipId::new(5), NodeId::new(1), NodeId::new(2), "KNOWS");
        store.insert_relationship(rel.clone()).unwrap();

        let mut record = Record::new();
        record.bind("n", Value::Node(a));
        record.bind("r", Value::Relationship(rel));
        let params = Params::new();

        assert_eq!(eval_with(&store, &params, "id(n)", &record).unwrap(), prop(1));
        assert_eq!(eval_with(&store, &params, "n.name", &record).unwrap(), prop("Neo"));
        assert!(eval_with(&store, &params, "n.missing", &record).unwrap().is_null());
        assert_eq!(eval_with(&store, &params, "exists(n.name)", &record).unwrap(), prop(true));
        assert_eq!(eval_with(&store, &params, "type(r)", &record).unwrap(), prop("KNOWS"));
        assert_eq!(
            eval_with(&store, &params, "labels(n)", &record).unwrap(),
            prop(vec![PropertyValue::from("Person")])
        );
        assert_eq!(
            eval_with(&store, &params, "endNode(r)", &record).unwrap().node_id(),
            Some(NodeId::new(2))
        );
        assert!(matches!(
            eval_with(&store, &params, "m", &record),
            Err(ExecutionError::VariableNotFound(_))
        ));
    }

    #[test]
    fn test_parameters() {
        let mut params = Params::new();
        params.insert("name".to_string(), PropertyValue::from("Neo"));
        let store = GraphStore::new();
        assert_eq!(eval_with(&store, &params, "$name + '!'", &Record::new()).unwrap(), prop("Neo!"));
        assert!(matches!(
            eval_with(&store, &params, "$other", &Record::new()),
            Err(ExecutionError::ParameterMissing(_))
        ));
    }
}

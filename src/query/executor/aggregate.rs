//! Aggregate accumulators for `count`, `sum`, `avg`, `min`, `max` and `collect`

use super::record::Value;
use super::{ExecutionError, ExecutionResult};
use crate::graph::PropertyValue;
use crate::query::ast::Expression;
use rustc_hash::FxHashSet;
use std::cmp::Ordering;

#[derive(Debug, Clone)]
enum State {
    Count(i64),
    Sum { int: i64, float: f64, is_float: bool },
    Avg { total: f64, count: usize },
    Min(Option<Value>),
    Max(Option<Value>),
    Collect(Vec<Value>),
}

/// Running state of one aggregate call within one group
#[derive(Debug, Clone)]
pub struct Accumulator {
    function: String,
    state: State,
    /// Seen values for DISTINCT aggregates
    seen: Option<FxHashSet<Value>>,
    /// count(*) counts rows, not values
    count_rows: bool,
}

impl Accumulator {
    /// Accumulator for an aggregate expression, and the argument to feed it
    pub fn for_expression(expr: &Expression) -> ExecutionResult<(Self, Option<Expression>)> {
        match expr {
            Expression::CountStar => Ok((
                Self {
                    function: "count".to_string(),
                    state: State::Count(0),
                    seen: None,
                    count_rows: true,
                },
                None,
            )),
            Expression::Function { name, distinct, args } => {
                let function = name.to_lowercase();
                let state = match function.as_str() {
                    "count" => State::Count(0),
                    "sum" => State::Sum { int: 0, float: 0.0, is_float: false },
                    "avg" => State::Avg { total: 0.0, count: 0 },
                    "min" => State::Min(None),
                    "max" => State::Max(None),
                    "collect" => State::Collect(Vec::new()),
                    _ => return Err(ExecutionError::UnknownFunction(name.clone())),
                };
                let [arg] = <[Expression; 1]>::try_from(args.clone()).map_err(|_| {
                    ExecutionError::RuntimeError(format!("{}() expects exactly one argument", name))
                })?;
                Ok((
                    Self {
                        function,
                        state,
                        seen: distinct.then(FxHashSet::default),
                        count_rows: false,
                    },
                    Some(arg),
                ))
            }
            other => Err(ExecutionError::RuntimeError(format!("Not an aggregate: {:?}", other))),
        }
    }

    /// Feed one row's argument value; `None` for `count(*)`
    pub fn update(&mut self, value: Option<Value>) -> ExecutionResult<()> {
        if self.count_rows {
            if let State::Count(n) = &mut self.state {
                *n += 1;
            }
            return Ok(());
        }

        let Some(value) = value.filter(|v| !v.is_null()) else {
            return Ok(());
        };
        if let Some(seen) = &mut self.seen {
            if !seen.insert(value.clone()) {
                return Ok(());
            }
        }

        match &mut self.state {
            State::Count(n) => *n += 1,
            State::Sum { int, float, is_float } => match value.as_property() {
                Some(PropertyValue::Integer(i)) => {
                    *float += *i as f64;
                    match int.checked_add(*i) {
                        Some(sum) => *int = sum,
                        None => *is_float = true,
                    }
                }
                Some(PropertyValue::Float(f)) => {
                    *float += f;
                    *is_float = true;
                }
                _ => return Err(type_error(&self.function, &value)),
            },
            State::Avg { total, count } => match value.as_property().and_then(PropertyValue::as_number) {
                Some(x) => {
                    *total += x;
                    *count += 1;
                }
                None => return Err(type_error(&self.function, &value)),
            },
            State::Min(current) => keep_if(current, value, Ordering::Less),
            State::Max(current) => keep_if(current, value, Ordering::Greater),
            State::Collect(items) => items.push(value),
        }
        Ok(())
    }

    /// Final value for the group
    pub fn finish(self) -> Value {
        match self.state {
            State::Count(n) => Value::from(PropertyValue::Integer(n)),
            State::Sum { int, float, is_float } => {
                if is_float {
                    Value::from(PropertyValue::Float(float))
                } else {
                    Value::from(PropertyValue::Integer(int))
                }
            }
            State::Avg { total, count } => {
                if count == 0 {
                    Value::Null
                } else {
                    Value::from(PropertyValue::Float(total / count as f64))
                }
            }
            State::Min(value) | State::Max(value) => value.unwrap_or(Value::Null),
            State::Collect(items) => Value::list(items),
        }
    }
}

fn type_error(function: &str, value: &Value) -> ExecutionError {
    ExecutionError::TypeError(format!(
        "{}() expects numbers, got {}",
        function,
        value.type_name()
    ))
}

fn keep_if(current: &mut Option<Value>, candidate: Value, wanted: Ordering) {
    let replace = match current {
        Some(existing) => candidate.sort_cmp(existing) == wanted,
        None => true,
    };
    if replace {
        *current = Some(candidate);
    }
}

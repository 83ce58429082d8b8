//! Cypher query parser using Pest
//!
//! Produces the read-only AST in [`crate::query::ast`]. Operator precedence
//! is resolved with a Pratt parser over the flat `expression` rule.

use crate::graph::{Direction, Label, PropertyValue, RelationshipType};
use crate::index::ElementKind;
use crate::query::ast::*;
use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "query/cypher.pest"]
struct CypherParser;

static PRATT_PARSER: LazyLock<PrattParser<Rule>> = LazyLock::new(|| {
    PrattParser::new()
        .op(Op::infix(Rule::or_op, Assoc::Left))
        .op(Op::infix(Rule::xor_op, Assoc::Left))
        .op(Op::infix(Rule::and_op, Assoc::Left))
        .op(Op::prefix(Rule::not_op))
        .op(Op::infix(Rule::eq_op, Assoc::Left)
            | Op::infix(Rule::ne_op, Assoc::Left)
            | Op::infix(Rule::lt_op, Assoc::Left)
            | Op::infix(Rule::le_op, Assoc::Left)
            | Op::infix(Rule::gt_op, Assoc::Left)
            | Op::infix(Rule::ge_op, Assoc::Left)
            | Op::infix(Rule::regex_op, Assoc::Left)
            | Op::infix(Rule::starts_with_op, Assoc::Left)
            | Op::infix(Rule::ends_with_op, Assoc::Left)
            | Op::infix(Rule::contains_op, Assoc::Left)
            | Op::infix(Rule::in_op, Assoc::Left))
        .op(Op::postfix(Rule::is_null) | Op::postfix(Rule::is_not_null))
        .op(Op::infix(Rule::add_op, Assoc::Left) | Op::infix(Rule::sub_op, Assoc::Left))
        .op(Op::infix(Rule::mul_op, Assoc::Left)
            | Op::infix(Rule::div_op, Assoc::Left)
            | Op::infix(Rule::mod_op, Assoc::Left))
        .op(Op::prefix(Rule::neg_op))
        .op(Op::postfix(Rule::property_lookup))
});

/// Parser errors
#[derive(Error, Debug)]
pub enum ParseError {
    /// Pest parsing error
    #[error("Parse error: {0}")]
    PestError(#[from] Box<pest::error::Error<Rule>>),

    /// Semantic error
    #[error("Semantic error: {0}")]
    SemanticError(String),

    /// Unsupported feature
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        ParseError::PestError(Box::new(err))
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parse a Cypher query string into an AST
pub fn parse_query(input: &str) -> ParseResult<Query> {
    let mut pairs = CypherParser::parse(Rule::query, input)?;
    let root = pairs
        .next()
        .ok_or_else(|| ParseError::SemanticError("Empty query".to_string()))?;

    let mut start_clause = None;
    let mut match_clauses = Vec::new();
    let mut where_clause = None;
    let mut return_clause = None;
    let mut order_by = None;
    let mut skip = None;
    let mut limit = None;

    for inner in root.into_inner() {
        match inner.as_rule() {
            Rule::start_clause => start_clause = Some(parse_start_clause(inner)?),
            Rule::match_clause => match_clauses.push(parse_match_clause(inner)?),
            Rule::where_clause => where_clause = Some(parse_where_clause(inner)?),
            Rule::return_clause => return_clause = Some(parse_return_clause(inner)?),
            Rule::order_by_clause => order_by = Some(parse_order_by_clause(inner)?),
            Rule::skip_clause => skip = Some(parse_row_count(inner)?),
            Rule::limit_clause => limit = Some(parse_row_count(inner)?),
            _ => {}
        }
    }

    if start_clause.is_none() && match_clauses.is_empty() {
        return Err(ParseError::SemanticError(
            "Query needs a START or MATCH clause".to_string(),
        ));
    }

    Ok(Query {
        start_clause,
        match_clauses,
        where_clause,
        return_clause: return_clause
            .ok_or_else(|| ParseError::SemanticError("Missing RETURN clause".to_string()))?,
        order_by,
        skip,
        limit,
    })
}

fn parse_start_clause(pair: Pair<Rule>) -> ParseResult<StartClause> {
    let points = pair
        .into_inner()
        .filter(|p| p.as_rule() == Rule::start_point)
        .map(parse_start_point)
        .collect::<ParseResult<Vec<_>>>()?;
    Ok(StartClause { points })
}

fn parse_start_point(pair: Pair<Rule>) -> ParseResult<StartPoint> {
    let mut variable = None;
    let mut kind = ElementKind::Node;
    let mut lookup = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::variable => variable = Some(variable_name(inner)),
            Rule::node_kw => kind = ElementKind::Node,
            Rule::rel_kw => kind = ElementKind::Relationship,
            Rule::id_lookup => lookup = Some(parse_id_lookup(inner)?),
            Rule::index_lookup => lookup = Some(parse_index_lookup(inner)?),
            _ => {}
        }
    }

    Ok(StartPoint {
        variable: variable.ok_or_else(|| ParseError::SemanticError("Missing START variable".to_string()))?,
        kind,
        lookup: lookup.ok_or_else(|| ParseError::SemanticError("Missing START lookup".to_string()))?,
    })
}

fn parse_id_lookup(pair: Pair<Rule>) -> ParseResult<StartLookup> {
    let mut ids = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::all_ids => return Ok(StartLookup::All),
            Rule::expression => ids.push(parse_expression(inner)?),
            _ => {}
        }
    }
    Ok(StartLookup::Ids(ids))
}

fn parse_index_lookup(pair: Pair<Rule>) -> ParseResult<StartLookup> {
    let mut index = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::identifier => index = Some(identifier_text(inner.as_str())),
            Rule::index_exact => {
                let index = index
                    .take()
                    .ok_or_else(|| ParseError::SemanticError("Missing index name".to_string()))?;
                let mut field = None;
                let mut value = None;
                for part in inner.into_inner() {
                    match part.as_rule() {
                        Rule::identifier => field = Some(identifier_text(part.as_str())),
                        _ => value = Some(parse_lookup_value(part)?),
                    }
                }
                return Ok(StartLookup::IndexExact {
                    index,
                    field: field.ok_or_else(|| ParseError::SemanticError("Missing index field".to_string()))?,
                    value: value.ok_or_else(|| ParseError::SemanticError("Missing index value".to_string()))?,
                });
            }
            Rule::index_query => {
                let index = index
                    .take()
                    .ok_or_else(|| ParseError::SemanticError("Missing index name".to_string()))?;
                let query = inner
                    .into_inner()
                    .next()
                    .ok_or_else(|| ParseError::SemanticError("Missing index query".to_string()))?;
                return Ok(StartLookup::IndexQuery {
                    index,
                    query: parse_lookup_value(query)?,
                });
            }
            _ => {}
        }
    }
    Err(ParseError::SemanticError("Invalid index lookup".to_string()))
}

/// A string literal or a parameter reference
fn parse_lookup_value(pair: Pair<Rule>) -> ParseResult<Expression> {
    match pair.as_rule() {
        Rule::string => Ok(Expression::Literal(PropertyValue::String(parse_string(pair)))),
        Rule::parameter | Rule::legacy_parameter => Ok(parameter_expression(pair)),
        rule => Err(ParseError::SemanticError(format!("Unexpected lookup value: {:?}", rule))),
    }
}

fn parse_match_clause(pair: Pair<Rule>) -> ParseResult<MatchClause> {
    let patterns = pair
        .into_inner()
        .filter(|p| p.as_rule() == Rule::path_pattern)
        .map(parse_path_pattern)
        .collect::<ParseResult<Vec<_>>>()?;
    Ok(MatchClause { patterns })
}

fn parse_path_pattern(pair: Pair<Rule>) -> ParseResult<PathPattern> {
    let mut variable = None;
    let mut nodes = Vec::new();
    let mut relationships = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::variable => variable = Some(variable_name(inner)),
            Rule::node_pattern => nodes.push(parse_node_pattern(inner)?),
            Rule::rel_pattern => relationships.push(parse_rel_pattern(inner)?),
            _ => {}
        }
    }

    if nodes.is_empty() {
        return Err(ParseError::SemanticError("Path must have at least one node".to_string()));
    }

    let start = nodes.remove(0);
    let segments = relationships
        .into_iter()
        .zip(nodes)
        .map(|(relationship, node)| PathSegment { relationship, node })
        .collect();

    Ok(PathPattern {
        variable,
        start,
        segments,
    })
}

fn parse_node_pattern(pair: Pair<Rule>) -> ParseResult<NodePattern> {
    let mut variable = None;
    let mut labels = Vec::new();
    let mut properties = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::variable => variable = Some(variable_name(inner)),
            Rule::label => {
                if let Some(name) = inner.into_inner().next() {
                    labels.push(Label::new(identifier_text(name.as_str())));
                }
            }
            Rule::map_literal => properties = parse_map_entries(inner)?,
            _ => {}
        }
    }

    Ok(NodePattern {
        variable,
        labels,
        properties,
    })
}

fn parse_rel_pattern(pair: Pair<Rule>) -> ParseResult<RelationshipPattern> {
    let mut incoming = false;
    let mut outgoing = false;
    let mut variable = None;
    let mut types = Vec::new();
    let mut length = None;
    let mut properties = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::left_arrow => incoming = true,
            Rule::right_arrow => outgoing = true,
            Rule::rel_detail => {
                for detail in inner.into_inner() {
                    match detail.as_rule() {
                        Rule::variable => variable = Some(variable_name(detail)),
                        Rule::rel_types => {
                            for name in detail.into_inner() {
                                types.push(RelationshipType::new(identifier_text(name.as_str())));
                            }
                        }
                        Rule::var_length => length = Some(parse_length_pattern(detail)?),
                        Rule::map_literal => properties = parse_map_entries(detail)?,
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    let direction = match (incoming, outgoing) {
        (true, false) => Direction::Incoming,
        (false, true) => Direction::Outgoing,
        _ => Direction::Both,
    };

    Ok(RelationshipPattern {
        variable,
        types,
        direction,
        length,
        properties,
    })
}

fn parse_length_pattern(pair: Pair<Rule>) -> ParseResult<LengthPattern> {
    let mut min = None;
    let mut max = None;
    let mut ranged = false;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::min_hops => min = Some(parse_hops(inner)?),
            Rule::max_hops => max = Some(parse_hops(inner)?),
            Rule::dots => ranged = true,
            _ => {}
        }
    }

    // `*3` means exactly three hops
    if !ranged {
        max = min;
    }
    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            return Err(ParseError::SemanticError(format!(
                "Invalid variable length range *{}..{}",
                lo, hi
            )));
        }
    }
    Ok(LengthPattern { min, max })
}

fn parse_hops(pair: Pair<Rule>) -> ParseResult<usize> {
    pair.as_str()
        .trim()
        .parse()
        .map_err(|_| ParseError::SemanticError(format!("Invalid hop count: {}", pair.as_str())))
}

fn parse_map_entries(pair: Pair<Rule>) -> ParseResult<Vec<(String, Expression)>> {
    let mut entries = Vec::new();
    for entry in pair.into_inner() {
        let mut parts = entry.into_inner();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            return Err(ParseError::SemanticError("Malformed map entry".to_string()));
        };
        entries.push((identifier_text(key.as_str()), parse_expression(value)?));
    }
    Ok(entries)
}

fn parse_where_clause(pair: Pair<Rule>) -> ParseResult<WhereClause> {
    let expression = pair
        .into_inner()
        .find(|p| p.as_rule() == Rule::expression)
        .ok_or_else(|| ParseError::SemanticError("Missing WHERE predicate".to_string()))?;
    Ok(WhereClause {
        predicate: parse_expression(expression)?,
    })
}

fn parse_return_clause(pair: Pair<Rule>) -> ParseResult<ReturnClause> {
    let mut items = Vec::new();
    let mut distinct = false;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::distinct => distinct = true,
            Rule::return_item => items.push(parse_return_item(inner)?),
            _ => {}
        }
    }

    Ok(ReturnClause { items, distinct })
}

fn parse_return_item(pair: Pair<Rule>) -> ParseResult<ReturnItem> {
    let mut expression = None;
    let mut alias = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::expression => {
                let text = inner.as_str().trim().to_string();
                expression = Some((parse_expression(inner)?, text));
            }
            Rule::identifier => alias = Some(identifier_text(inner.as_str())),
            _ => {}
        }
    }

    let (expression, text) =
        expression.ok_or_else(|| ParseError::SemanticError("Missing expression in RETURN".to_string()))?;
    Ok(ReturnItem {
        expression,
        alias,
        text,
    })
}

fn parse_order_by_clause(pair: Pair<Rule>) -> ParseResult<OrderByClause> {
    let items = pair
        .into_inner()
        .filter(|p| p.as_rule() == Rule::order_item)
        .map(parse_order_item)
        .collect::<ParseResult<Vec<_>>>()?;
    Ok(OrderByClause { items })
}

fn parse_order_item(pair: Pair<Rule>) -> ParseResult<OrderByItem> {
    let mut expression = None;
    let mut ascending = true;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::expression => {
                let text = inner.as_str().trim().to_string();
                expression = Some((parse_expression(inner)?, text));
            }
            Rule::sort_dir => {
                ascending = !inner.as_str().to_ascii_lowercase().starts_with("desc");
            }
            _ => {}
        }
    }

    let (expression, text) =
        expression.ok_or_else(|| ParseError::SemanticError("Missing expression in ORDER BY".to_string()))?;
    Ok(OrderByItem {
        expression,
        ascending,
        text,
    })
}

/// SKIP / LIMIT argument
fn parse_row_count(pair: Pair<Rule>) -> ParseResult<Expression> {
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::integer => return parse_integer(inner.as_str()).map(Expression::Literal),
            Rule::parameter | Rule::legacy_parameter => return Ok(parameter_expression(inner)),
            _ => {}
        }
    }
    Err(ParseError::SemanticError("Missing row count".to_string()))
}

pub(crate) fn parse_expression(pair: Pair<Rule>) -> ParseResult<Expression> {
    PRATT_PARSER
        .map_primary(parse_primary)
        .map_prefix(|op, rhs| {
            let op = match op.as_rule() {
                Rule::not_op => UnaryOp::Not,
                Rule::neg_op => UnaryOp::Minus,
                rule => return Err(ParseError::SemanticError(format!("Unexpected prefix: {:?}", rule))),
            };
            Ok(Expression::Unary {
                op,
                expr: Box::new(rhs?),
            })
        })
        .map_postfix(|lhs, op| {
            let lhs = lhs?;
            match op.as_rule() {
                Rule::property_lookup => {
                    let name = op
                        .into_inner()
                        .next()
                        .map(|p| identifier_text(p.as_str()))
                        .ok_or_else(|| ParseError::SemanticError("Missing property name".to_string()))?;
                    Ok(Expression::Property {
                        expr: Box::new(lhs),
                        property: name,
                    })
                }
                Rule::is_null => Ok(Expression::Unary {
                    op: UnaryOp::IsNull,
                    expr: Box::new(lhs),
                }),
                Rule::is_not_null => Ok(Expression::Unary {
                    op: UnaryOp::IsNotNull,
                    expr: Box::new(lhs),
                }),
                rule => Err(ParseError::SemanticError(format!("Unexpected postfix: {:?}", rule))),
            }
        })
        .map_infix(|left, op, right| {
            let left = left?;
            let right = right?;

            let op = match op.as_rule() {
                Rule::or_op => BinaryOp::Or,
                Rule::xor_op => BinaryOp::Xor,
                Rule::and_op => BinaryOp::And,
                Rule::eq_op => BinaryOp::Eq,
                Rule::ne_op => BinaryOp::Ne,
                Rule::lt_op => BinaryOp::Lt,
                Rule::le_op => BinaryOp::Le,
                Rule::gt_op => BinaryOp::Gt,
                Rule::ge_op => BinaryOp::Ge,
                Rule::regex_op => BinaryOp::RegexMatch,
                Rule::starts_with_op => BinaryOp::StartsWith,
                Rule::ends_with_op => BinaryOp::EndsWith,
                Rule::contains_op => BinaryOp::Contains,
                Rule::in_op => BinaryOp::In,
                Rule::add_op => BinaryOp::Add,
                Rule::sub_op => BinaryOp::Sub,
                Rule::mul_op => BinaryOp::Mul,
                Rule::div_op => BinaryOp::Div,
                Rule::mod_op => BinaryOp::Mod,
                rule => return Err(ParseError::SemanticError(format!("Unexpected operator: {:?}", rule))),
            };

            Ok(Expression::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            })
        })
        .parse(pair.into_inner())
}

fn parse_primary(pair: Pair<Rule>) -> ParseResult<Expression> {
    match pair.as_rule() {
        Rule::null => Ok(Expression::Literal(PropertyValue::Null)),
        Rule::boolean => Ok(Expression::Literal(PropertyValue::Boolean(
            pair.as_str().eq_ignore_ascii_case("true"),
        ))),
        Rule::integer => parse_integer(pair.as_str()).map(Expression::Literal),
        Rule::float => pair
            .as_str()
            .parse::<f64>()
            .map(|f| Expression::Literal(PropertyValue::Float(f)))
            .map_err(|_| ParseError::SemanticError(format!("Invalid float: {}", pair.as_str()))),
        Rule::string => Ok(Expression::Literal(PropertyValue::String(parse_string(pair)))),
        Rule::parameter | Rule::legacy_parameter => Ok(parameter_expression(pair)),
        Rule::count_star => Ok(Expression::CountStar),
        Rule::function_call => parse_function_call(pair),
        Rule::list_literal => Ok(Expression::List(
            pair.into_inner()
                .map(parse_expression)
                .collect::<ParseResult<Vec<_>>>()?,
        )),
        Rule::map_literal => Ok(Expression::Map(parse_map_entries(pair)?)),
        Rule::variable => Ok(Expression::Variable(variable_name(pair))),
        Rule::expression => parse_expression(pair),
        rule => Err(ParseError::SemanticError(format!("Unexpected expression: {:?}", rule))),
    }
}

fn parse_function_call(pair: Pair<Rule>) -> ParseResult<Expression> {
    let mut name = None;
    let mut distinct = false;
    let mut args = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::identifier => name = Some(identifier_text(inner.as_str())),
            Rule::distinct => distinct = true,
            Rule::expression => args.push(parse_expression(inner)?),
            _ => {}
        }
    }

    let name = name.ok_or_else(|| ParseError::SemanticError("Missing function name".to_string()))?;
    if distinct && !is_aggregate_function(&name) {
        return Err(ParseError::UnsupportedFeature(format!("DISTINCT in {}()", name)));
    }
    Ok(Expression::Function { name, distinct, args })
}

fn parse_integer(text: &str) -> ParseResult<PropertyValue> {
    text.trim()
        .parse::<i64>()
        .map(PropertyValue::Integer)
        .map_err(|_| ParseError::SemanticError(format!("Integer out of range: {}", text)))
}

fn parameter_expression(pair: Pair<Rule>) -> Expression {
    let name = pair
        .into_inner()
        .next()
        .map(|p| identifier_text(p.as_str()))
        .unwrap_or_default();
    Expression::Parameter(name)
}

fn variable_name(pair: Pair<Rule>) -> String {
    identifier_text(pair.as_str().trim())
}

/// Strip backtick quoting
fn identifier_text(text: &str) -> String {
    text.strip_prefix('`')
        .and_then(|t| t.strip_suffix('`'))
        .unwrap_or(text)
        .to_string()
}

fn parse_string(pair: Pair<Rule>) -> String {
    let raw = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_match() {
        let ast = parse_query("MATCH (n:Person) RETURN n").unwrap();
        assert_eq!(ast.match_clauses.len(), 1);
        let pattern = &ast.match_clauses[0].patterns[0];
        assert_eq!(pattern.start.variable.as_deref(), Some("n"));
        assert_eq!(pattern.start.labels, vec![Label::new("Person")]);
        assert_eq!(ast.return_clause.items[0].column_name(), "n");
    }

    #[test]
    fn test_parse_start_forms() {
        let ast = parse_query("start n=node(1, 2), r=relationship(*) return n, r").unwrap();
        let points = &ast.start_clause.unwrap().points;
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].kind, ElementKind::Node);
        assert_eq!(
            points[0].lookup,
            StartLookup::Ids(vec![
                Expression::Literal(PropertyValue::Integer(1)),
                Expression::Literal(PropertyValue::Integer(2)),
            ])
        );
        assert_eq!(points[1].kind, ElementKind::Relationship);
        assert_eq!(points[1].lookup, StartLookup::All);
    }

    #[test]
    fn test_parse_index_start() {
        let ast = parse_query(r#"START n=node:people(name = "Neo") RETURN n"#).unwrap();
        assert_eq!(
            ast.start_clause.unwrap().points[0].lookup,
            StartLookup::IndexExact {
                index: "people".to_string(),
                field: "name".to_string(),
                value: Expression::Literal(PropertyValue::from("Neo")),
            }
        );

        let ast = parse_query(r#"START n=node:people("name:N*") RETURN n"#).unwrap();
        assert!(matches!(
            &ast.start_clause.unwrap().points[0].lookup,
            StartLookup::IndexQuery { index, .. } if index == "people"
        ));

        let ast = parse_query("START n=node:people({q}) RETURN n").unwrap();
        assert_eq!(
            ast.start_clause.unwrap().points[0].lookup,
            StartLookup::IndexQuery {
                index: "people".to_string(),
                query: Expression::Parameter("q".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_relationship_patterns() {
        let ast = parse_query("MATCH p = (a)-[r:KNOWS|LIKES*1..3]->(b)<-[:OWNS]-(c)--(d) RETURN p").unwrap();
        let pattern = &ast.match_clauses[0].patterns[0];
        assert_eq!(pattern.variable.as_deref(), Some("p"));
        assert_eq!(pattern.segments.len(), 3);

        let first = &pattern.segments[0].relationship;
        assert_eq!(first.variable.as_deref(), Some("r"));
        assert_eq!(first.types, vec![RelationshipType::new("KNOWS"), RelationshipType::new("LIKES")]);
        assert_eq!(first.direction, Direction::Outgoing);
        assert_eq!(first.length, Some(LengthPattern { min: Some(1), max: Some(3) }));

        assert_eq!(pattern.segments[1].relationship.direction, Direction::Incoming);
        assert_eq!(pattern.segments[2].relationship.direction, Direction::Both);
        assert_eq!(pattern.segments[2].relationship.length, None);
    }

    #[test]
    fn test_parse_variable_lengths() {
        let ast = parse_query("MATCH (a)-[*]->(b), (a)-[*2]->(c), (a)-[*..4]->(d) RETURN b").unwrap();
        let patterns = &ast.match_clauses[0].patterns;
        assert_eq!(patterns[0].segments[0].relationship.length, Some(LengthPattern { min: None, max: None }));
        assert_eq!(patterns[1].segments[0].relationship.length, Some(LengthPattern { min: Some(2), max: Some(2) }));
        assert_eq!(patterns[2].segments[0].relationship.length, Some(LengthPattern { min: None, max: Some(4) }));

        assert!(parse_query("MATCH (a)-[*3..1]->(b) RETURN b").is_err());
    }

    #[test]
    fn test_parse_node_properties() {
        let ast = parse_query(r#"MATCH (n:Person {name: "Alice", age: $age}) RETURN n"#).unwrap();
        let props = &ast.match_clauses[0].patterns[0].start.properties;
        assert_eq!(props.len(), 2);
        assert_eq!(props[1], ("age".to_string(), Expression::Parameter("age".to_string())));
    }

    #[test]
    fn test_parse_precedence() {
        let ast = parse_query("MATCH (n) WHERE n.a = 1 OR n.b = 2 AND NOT n.c RETURN n").unwrap();
        let Expression::Binary { op, right, .. } = ast.where_clause.unwrap().predicate else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Or);
        let Expression::Binary { op, right, .. } = *right else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::And);
        assert!(matches!(*right, Expression::Unary { op: UnaryOp::Not, .. }));

        let ast = parse_query("MATCH (n) RETURN 1 + 2 * 3 AS x").unwrap();
        let Expression::Binary { op, right, .. } = &ast.return_clause.items[0].expression else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(**right, Expression::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_parse_null_checks_and_string_ops() {
        let ast = parse_query(
            "MATCH (n) WHERE n.name IS NOT NULL AND n.name STARTS WITH 'A' AND n.nick is null RETURN n",
        )
        .unwrap();
        let text = format!("{:?}", ast.where_clause.unwrap().predicate);
        assert!(text.contains("IsNotNull"));
        assert!(text.contains("StartsWith"));
        assert!(text.contains("IsNull"));
    }

    #[test]
    fn test_parse_in_and_regex() {
        let ast = parse_query("MATCH (n) WHERE n.age IN [1, 2] AND n.name =~ 'A.*' RETURN n").unwrap();
        let Expression::Binary { left, right, .. } = ast.where_clause.unwrap().predicate else {
            panic!("expected binary");
        };
        assert!(matches!(*left, Expression::Binary { op: BinaryOp::In, .. }));
        assert!(matches!(*right, Expression::Binary { op: BinaryOp::RegexMatch, .. }));
    }

    #[test]
    fn test_parse_return_modifiers() {
        let ast = parse_query(
            "MATCH (n) RETURN DISTINCT n.name AS name, count(*) ORDER BY name DESC, n.age SKIP 1 LIMIT $max;",
        )
        .unwrap();
        assert!(ast.return_clause.distinct);
        assert_eq!(ast.return_clause.items[0].column_name(), "name");
        assert_eq!(ast.return_clause.items[1].column_name(), "count(*)");
        assert_eq!(ast.return_clause.items[1].expression, Expression::CountStar);

        let order = ast.order_by.as_ref().unwrap();
        assert!(!order.items[0].ascending);
        assert!(order.items[1].ascending);
        assert_eq!(ast.skip, Some(Expression::Literal(PropertyValue::Integer(1))));
        assert_eq!(ast.limit, Some(Expression::Parameter("max".to_string())));
        assert!(ast.is_aggregating());
    }

    #[test]
    fn test_parse_return_star() {
        let ast = parse_query("MATCH (a)-->(b) RETURN *").unwrap();
        assert!(ast.return_clause.items.is_empty());
    }

    #[test]
    fn test_parse_functions() {
        let ast = parse_query("MATCH (n) RETURN count(DISTINCT n.name), toUpper(n.name), coalesce(n.a, 'x')").unwrap();
        let items = &ast.return_clause.items;
        assert!(matches!(&items[0].expression, Expression::Function { distinct: true, .. }));
        assert!(matches!(&items[1].expression, Expression::Function { name, .. } if name == "toUpper"));
        assert!(parse_query("MATCH (n) RETURN toUpper(DISTINCT n.name)").is_err());
    }

    #[test]
    fn test_parse_literals() {
        let ast = parse_query(r#"MATCH (n) RETURN -1.5, "a\"b", true, null, {k: 1}"#).unwrap();
        let items = &ast.return_clause.items;
        assert!(matches!(&items[0].expression, Expression::Unary { op: UnaryOp::Minus, .. }));
        assert_eq!(items[1].expression, Expression::Literal(PropertyValue::from("a\"b")));
        assert_eq!(items[2].expression, Expression::Literal(PropertyValue::Boolean(true)));
        assert_eq!(items[3].expression, Expression::Literal(PropertyValue::Null));
        assert!(matches!(&items[4].expression, Expression::Map(entries) if entries.len() == 1));
    }

    #[test]
    fn test_keywords_are_word_bounded() {
        let ast = parse_query("MATCH (order_item) WHERE order_item.notes = 'x' RETURN order_item").unwrap();
        assert_eq!(
            ast.match_clauses[0].patterns[0].start.variable.as_deref(),
            Some("order_item")
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_query("RETURN 1"), Err(ParseError::SemanticError(_))));
        assert!(matches!(parse_query("MATCH (n) RETURN"), Err(ParseError::PestError(_))));
        assert!(parse_query("MATCH (n) CREATE (m) RETURN n").is_err());
    }
}

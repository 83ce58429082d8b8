//! Index query objects and the Lucene-style query syntax
//!
//! ```text
//! name:Neo                 exact term
//! name:"Thomas Anderson"   phrase
//! name:Ne*  title:?atrix   wildcards
//! age:[18 TO 30]           inclusive range, {18 TO 30} exclusive
//! *:*                      every entry
//! a:x AND (b:y OR NOT c:z)
//! ```

use super::IndexError;
use crate::graph::PropertyValue;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

#[derive(Parser)]
#[grammar = "index/query.pest"]
struct IndexQueryParser;

/// A query against a single named index
#[derive(Debug, Clone, PartialEq)]
pub enum IndexQuery {
    /// Every indexed element
    All,
    /// Field value whose index text equals `text`
    Term { field: String, text: String },
    /// `*` matches any run of characters, `?` exactly one
    Wildcard { field: String, pattern: String },
    /// Bounds compare numerically when both are numbers, else as text.
    /// `None` leaves that side open.
    Range {
        field: String,
        low: Option<String>,
        high: Option<String>,
        inclusive: bool,
    },
    And(Box<IndexQuery>, Box<IndexQuery>),
    Or(Box<IndexQuery>, Box<IndexQuery>),
    Not(Box<IndexQuery>),
}

impl IndexQuery {
    pub fn all() -> Self {
        IndexQuery::All
    }

    pub fn term(field: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        IndexQuery::Term {
            field: field.into(),
            text: value.into().index_text(),
        }
    }

    pub fn wildcard(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        IndexQuery::Wildcard {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    /// Inclusive range; a `Null` bound is open
    pub fn range(
        field: impl Into<String>,
        low: impl Into<PropertyValue>,
        high: impl Into<PropertyValue>,
    ) -> Self {
        let bound = |v: PropertyValue| (!v.is_null()).then(|| v.index_text());
        IndexQuery::Range {
            field: field.into(),
            low: bound(low.into()),
            high: bound(high.into()),
            inclusive: true,
        }
    }

    pub fn and(self, other: IndexQuery) -> Self {
        IndexQuery::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: IndexQuery) -> Self {
        IndexQuery::Or(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        IndexQuery::Not(Box::new(self))
    }

    /// Parse the textual query syntax
    pub fn parse(input: &str) -> Result<Self, IndexError> {
        let mut pairs = IndexQueryParser::parse(Rule::query, input)
            .map_err(|e| IndexError::InvalidQuery(e.to_string()))?;
        let query = pairs
            .next()
            .and_then(|p| p.into_inner().next())
            .ok_or_else(|| IndexError::InvalidQuery(format!("empty query: {:?}", input)))?;
        build_or(query)
    }

    /// Compile into a value predicate for one field
    pub(crate) fn matcher(&self) -> Result<ValueMatcher, IndexError> {
        match self {
            IndexQuery::Term { text, .. } => Ok(ValueMatcher::Text(text.clone())),
            IndexQuery::Wildcard { pattern, .. } => {
                let regex = Regex::new(&wildcard_regex(pattern))
                    .map_err(|e| IndexError::InvalidQuery(e.to_string()))?;
                Ok(ValueMatcher::Pattern(regex))
            }
            IndexQuery::Range { low, high, inclusive, .. } => Ok(ValueMatcher::Range {
                low: low.clone(),
                high: high.clone(),
                inclusive: *inclusive,
            }),
            other => Err(IndexError::InvalidQuery(format!("not a field clause: {}", other))),
        }
    }
}

impl FromStr for IndexQuery {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IndexQuery::parse(s)
    }
}

impl fmt::Display for IndexQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexQuery::All => write!(f, "*:*"),
            IndexQuery::Term { field, text } => {
                if text.is_empty() || text.chars().any(|c| c.is_whitespace() || "*?:()[]{}\"\\!".contains(c)) {
                    write!(f, "{}:\"{}\"", field, text.replace('\\', "\\\\").replace('"', "\\\""))
                } else {
                    write!(f, "{}:{}", field, text)
                }
            }
            IndexQuery::Wildcard { field, pattern } => write!(f, "{}:{}", field, pattern),
            IndexQuery::Range { field, low, high, inclusive } => {
                let (open, close) = if *inclusive { ('[', ']') } else { ('{', '}') };
                write!(
                    f,
                    "{}:{}{} TO {}{}",
                    field,
                    open,
                    low.as_deref().unwrap_or("*"),
                    high.as_deref().unwrap_or("*"),
                    close
                )
            }
            IndexQuery::And(a, b) => write!(f, "({} AND {})", a, b),
            IndexQuery::Or(a, b) => write!(f, "({} OR {})", a, b),
            IndexQuery::Not(q) => write!(f, "NOT {}", q),
        }
    }
}

/// Compiled field predicate
#[derive(Debug)]
pub(crate) enum ValueMatcher {
    Text(String),
    Pattern(Regex),
    Range {
        low: Option<String>,
        high: Option<String>,
        inclusive: bool,
    },
}

impl ValueMatcher {
    pub(crate) fn matches(&self, value: &PropertyValue) -> bool {
        match self {
            ValueMatcher::Text(text) => value.index_text() == *text,
            ValueMatcher::Pattern(regex) => regex.is_match(&value.index_text()),
            ValueMatcher::Range { low, high, inclusive } => in_range(value, low.as_deref(), high.as_deref(), *inclusive),
        }
    }
}

fn in_range(value: &PropertyValue, low: Option<&str>, high: Option<&str>, inclusive: bool) -> bool {
    let numeric_bound = |b: Option<&str>| b.map(|s| s.parse::<f64>().ok());
    let (nl, nh) = (numeric_bound(low), numeric_bound(high));
    let bounds_numeric = !matches!(nl, Some(None)) && !matches!(nh, Some(None)) && (low.is_some() || high.is_some());

    let check = |ord: std::cmp::Ordering, want: std::cmp::Ordering| {
        ord == want || (inclusive && ord == std::cmp::Ordering::Equal)
    };

    if bounds_numeric {
        let Some(n) = value.as_number() else {
            return false;
        };
        if let Some(Some(l)) = nl {
            if !check(n.total_cmp(&l), std::cmp::Ordering::Greater) {
                return false;
            }
        }
        if let Some(Some(h)) = nh {
            if !check(n.total_cmp(&h), std::cmp::Ordering::Less) {
                return false;
            }
        }
        true
    } else {
        let text = value.index_text();
        if let Some(l) = low {
            if !check(text.as_str().cmp(l), std::cmp::Ordering::Greater) {
                return false;
            }
        }
        if let Some(h) = high {
            if !check(text.as_str().cmp(h), std::cmp::Ordering::Less) {
                return false;
            }
        }
        true
    }
}

fn wildcard_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push_str(&regex::escape(&next.to_string()));
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

fn build_or(pair: Pair<Rule>) -> Result<IndexQuery, IndexError> {
    let mut result: Option<IndexQuery> = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::and_expr => {
                let clause = build_and(inner)?;
                result = Some(match result {
                    Some(acc) => acc.or(clause),
                    None => clause,
                });
            }
            Rule::or_op => {}
            other => return Err(unexpected(other)),
        }
    }
    result.ok_or_else(|| IndexError::InvalidQuery("empty expression".to_string()))
}

fn build_and(pair: Pair<Rule>) -> Result<IndexQuery, IndexError> {
    let mut result: Option<IndexQuery> = None;
    let mut negate_next = false;
    for inner in pair.into_inner() {
        let clause = match inner.as_rule() {
            Rule::and_op => continue,
            Rule::not_op => {
                negate_next = true;
                continue;
            }
            Rule::unary => build_unary(inner)?,
            _ => build_primary(inner)?,
        };
        let clause = if std::mem::take(&mut negate_next) {
            clause.not()
        } else {
            clause
        };
        result = Some(match result {
            Some(acc) => acc.and(clause),
            None => clause,
        });
    }
    result.ok_or_else(|| IndexError::InvalidQuery("empty clause".to_string()))
}

fn build_unary(pair: Pair<Rule>) -> Result<IndexQuery, IndexError> {
    let mut negations = 0;
    let mut primary = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::not_op => negations += 1,
            _ => primary = Some(build_primary(inner)?),
        }
    }
    let mut query = primary.ok_or_else(|| IndexError::InvalidQuery("missing clause".to_string()))?;
    for _ in 0..negations {
        query = query.not();
    }
    Ok(query)
}

fn build_primary(pair: Pair<Rule>) -> Result<IndexQuery, IndexError> {
    match pair.as_rule() {
        Rule::all_docs => Ok(IndexQuery::All),
        Rule::group => {
            let inner = pair
                .into_inner()
                .next()
                .ok_or_else(|| IndexError::InvalidQuery("empty group".to_string()))?;
            build_or(inner)
        }
        Rule::field_clause => build_field_clause(pair),
        other => Err(unexpected(other)),
    }
}

fn build_field_clause(pair: Pair<Rule>) -> Result<IndexQuery, IndexError> {
    let mut inner = pair.into_inner();
    let (Some(field), Some(value)) = (inner.next(), inner.next()) else {
        return Err(IndexError::InvalidQuery("incomplete field clause".to_string()));
    };
    let field = field.as_str().to_string();

    match value.as_rule() {
        Rule::phrase => {
            let raw = value.into_inner().next().map(|p| p.as_str()).unwrap_or("");
            Ok(IndexQuery::Term {
                field,
                text: raw.replace("\\\"", "\"").replace("\\\\", "\\"),
            })
        }
        Rule::term => {
            let raw = value.as_str();
            if has_unescaped_wildcard(raw) {
                Ok(IndexQuery::Wildcard {
                    field,
                    pattern: raw.to_string(),
                })
            } else {
                Ok(IndexQuery::Term {
                    field,
                    text: unescape(raw),
                })
            }
        }
        Rule::range => {
            let mut inclusive = true;
            let mut bounds = Vec::with_capacity(2);
            for part in value.into_inner() {
                match part.as_rule() {
                    Rule::excl_open | Rule::excl_close => inclusive = false,
                    Rule::bound => bounds.push(part.as_str()),
                    _ => {}
                }
            }
            let open = |b: Option<&&str>| b.filter(|s| **s != "*").map(|s| s.to_string());
            Ok(IndexQuery::Range {
                field,
                low: open(bounds.first()),
                high: open(bounds.get(1)),
                inclusive,
            })
        }
        other => Err(unexpected(other)),
    }
}

fn has_unescaped_wildcard(raw: &str) -> bool {
    let mut escaped = false;
    for c in raw.chars() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '*' | '?' => return true,
            _ => {}
        }
    }
    false
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn unexpected(rule: Rule) -> IndexError {
    IndexError::InvalidQuery(format!("unexpected {:?}", rule))
}

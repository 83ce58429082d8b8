//! Property value types for graph nodes and relationships
//!
//! Values are totally ordered and hashable so they can key the B-tree maps
//! behind the legacy indexes. Integers and floats compare numerically, which
//! makes `Integer(1) == Float(1.0)` as in Cypher.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Property value type supporting multiple data types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(i64), // Unix timestamp in milliseconds
    Array(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
    Null,
}

impl PropertyValue {
    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// Get string value if this is a string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get integer value if this is an integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get float value if this is a float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Numeric view of integers and floats
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Integer(i) => Some(*i as f64),
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get boolean value if this is a boolean
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get datetime value if this is a datetime
    pub fn as_datetime(&self) -> Option<i64> {
        match self {
            PropertyValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Get array value if this is an array
    pub fn as_array(&self) -> Option<&Vec<PropertyValue>> {
        match self {
            PropertyValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Get map value if this is a map
    pub fn as_map(&self) -> Option<&BTreeMap<String, PropertyValue>> {
        match self {
            PropertyValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Get type name as string
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "String",
            PropertyValue::Integer(_) => "Integer",
            PropertyValue::Float(_) => "Float",
            PropertyValue::Boolean(_) => "Boolean",
            PropertyValue::DateTime(_) => "DateTime",
            PropertyValue::Array(_) => "Array",
            PropertyValue::Map(_) => "Map",
            PropertyValue::Null => "Null",
        }
    }

    /// Text form used when matching index query terms
    pub fn index_text(&self) -> String {
        match self {
            PropertyValue::String(s) => s.clone(),
            PropertyValue::Integer(i) => i.to_string(),
            PropertyValue::Float(f) => f.to_string(),
            PropertyValue::Boolean(b) => b.to_string(),
            PropertyValue::DateTime(dt) => dt.to_string(),
            PropertyValue::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Convert to plain JSON (no enum tagging)
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PropertyValue::String(s) => serde_json::Value::String(s.clone()),
            PropertyValue::Integer(i) => serde_json::Value::from(*i),
            PropertyValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            PropertyValue::Boolean(b) => serde_json::Value::Bool(*b),
            PropertyValue::DateTime(dt) => serde_json::Value::from(*dt),
            PropertyValue::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(|v| v.to_json()).collect())
            }
            PropertyValue::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            PropertyValue::Null => serde_json::Value::Null,
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            PropertyValue::Null => 0,
            PropertyValue::Boolean(_) => 1,
            PropertyValue::Integer(_) | PropertyValue::Float(_) => 2,
            PropertyValue::String(_) => 3,
            PropertyValue::DateTime(_) => 4,
            PropertyValue::Array(_) => 5,
            PropertyValue::Map(_) => 6,
        }
    }
}

impl Ord for PropertyValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use PropertyValue::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => float_cmp(*a, *b),
            (Integer(a), Float(b)) => integer_float_cmp(*a, *b),
            (Float(a), Integer(b)) => integer_float_cmp(*b, *a).reverse(),
            (String(a), String(b)) => a.cmp(b),
            (DateTime(a), DateTime(b)) => a.cmp(b),
            (Array(a), Array(b)) => a.cmp(b),
            (Map(a), Map(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

/// Total order on floats where -0.0 equals 0.0 and NaNs sort at the ends
fn float_cmp(a: f64, b: f64) -> Ordering {
    if a == b {
        Ordering::Equal
    } else {
        a.total_cmp(&b)
    }
}

/// Exact comparison of an integer with a float, without rounding the integer
fn integer_float_cmp(i: i64, f: f64) -> Ordering {
    // 2^63, the first float above i64::MAX
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;

    if f.is_nan() {
        return if f.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if f >= LIMIT {
        return Ordering::Less;
    }
    if f < -LIMIT {
        return Ordering::Greater;
    }

    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal if f > whole => Ordering::Less,
        Ordering::Equal if f < whole => Ordering::Greater,
        ordering => ordering,
    }
}

impl PartialOrd for PropertyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PropertyValue {}

impl Hash for PropertyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_rank().hash(state);
        match self {
            PropertyValue::Null => {}
            PropertyValue::Boolean(b) => b.hash(state),
            PropertyValue::Integer(i) => i.hash(state),
            // Integral floats hash like the equal integer
            PropertyValue::Float(f) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    (*f as i64).hash(state)
                } else {
                    f.to_bits().hash(state)
                }
            }
            PropertyValue::String(s) => s.hash(state),
            PropertyValue::DateTime(dt) => dt.hash(state),
            PropertyValue::Array(arr) => arr.hash(state),
            PropertyValue::Map(map) => map.hash(state),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "\"{}\"", s),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Float(fl) => write!(f, "{}", fl),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::DateTime(dt) => write!(f, "DateTime({})", dt),
            PropertyValue::Array(arr) => {
                write!(f, "[")?;
                for (i, val) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", val)?;
                }
                write!(f, "]")
            }
            PropertyValue::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, val)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, val)?;
                }
                write!(f, "}}")
            }
            PropertyValue::Null => write!(f, "null"),
        }
    }
}

// Convenience conversions
impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Integer(i as i64)
    }
}

impl From<u32> for PropertyValue {
    fn from(i: u32) -> Self {
        PropertyValue::Integer(i as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(arr: Vec<PropertyValue>) -> Self {
        PropertyValue::Array(arr)
    }
}

impl From<BTreeMap<String, PropertyValue>> for PropertyValue {
    fn from(map: BTreeMap<String, PropertyValue>) -> Self {
        PropertyValue::Map(map)
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(PropertyValue::Null)
    }
}

impl From<&serde_json::Value> for PropertyValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => PropertyValue::Null,
            serde_json::Value::Bool(b) => PropertyValue::Boolean(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => PropertyValue::Integer(i),
                None => PropertyValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => PropertyValue::String(s.clone()),
            serde_json::Value::Array(arr) => {
                PropertyValue::Array(arr.iter().map(PropertyValue::from).collect())
            }
            serde_json::Value::Object(obj) => PropertyValue::Map(
                obj.iter().map(|(k, v)| (k.clone(), PropertyValue::from(v))).collect(),
            ),
        }
    }
}

/// Property map for storing node and relationship properties
pub type PropertyMap = HashMap<String, PropertyValue>;

/// A single name/value pair supplied when creating an element
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Fold an ordered property list into a map; later duplicates win
    pub fn to_map(props: &[Property]) -> PropertyMap {
        let mut map = PropertyMap::with_capacity(props.len());
        for prop in props {
            map.insert(prop.name.clone(), prop.value.clone());
        }
        map
    }
}

impl<K: Into<String>, V: Into<PropertyValue>> From<(K, V)> for Property {
    fn from((name, value): (K, V)) -> Self {
        Property::new(name, value)
    }
}

/// Build an ordered property list: `props!{"name" => "Alice", "age" => 30}`
#[macro_export]
macro_rules! props {
    () => {
        ::std::vec::Vec::<$crate::graph::Property>::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {
        vec![$($crate::graph::Property::new($name, $value)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_integer_float_ordering_is_exact() {
        let big = 1i64 << 53;
        let float = PropertyValue::Float(big as f64);
        assert_eq!(PropertyValue::Integer(big), float);
        assert!(PropertyValue::Integer(big + 1) > float);
        assert!(float < PropertyValue::Integer(big + 1));
        assert!(PropertyValue::Integer(i64::MAX) < PropertyValue::Float(9.3e18));
        assert!(PropertyValue::Integer(i64::MIN) > PropertyValue::Float(f64::NEG_INFINITY));
        assert!(PropertyValue::Integer(2) > PropertyValue::Float(1.5));
        assert!(PropertyValue::Integer(-2) < PropertyValue::Float(-1.5));
        assert!(PropertyValue::Integer(-1) > PropertyValue::Float(-1.5));
        assert_eq!(PropertyValue::Float(-0.0), PropertyValue::Integer(0));
        assert_eq!(PropertyValue::Float(-0.0), PropertyValue::Float(0.0));

        let keys: BTreeSet<PropertyValue> = [
            PropertyValue::Integer(big),
            PropertyValue::Float(big as f64),
            PropertyValue::Integer(big + 1),
        ]
        .into_iter()
        .collect();
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_property_value_types() {
        assert_eq!(PropertyValue::String("test".to_string()).type_name(), "String");
        assert_eq!(PropertyValue::Integer(42).type_name(), "Integer");
        assert_eq!(PropertyValue::Float(2.5).type_name(), "Float");
        assert_eq!(PropertyValue::Boolean(true).type_name(), "Boolean");
        assert_eq!(PropertyValue::DateTime(1234567890).type_name(), "DateTime");
        assert_eq!(PropertyValue::Array(vec![]).type_name(), "Array");
        assert_eq!(PropertyValue::Map(BTreeMap::new()).type_name(), "Map");
        assert_eq!(PropertyValue::Null.type_name(), "Null");
    }

    #[test]
    fn test_numeric_equality_and_hash() {
        use std::collections::HashSet;

        assert_eq!(PropertyValue::Integer(1), PropertyValue::Float(1.0));
        assert!(PropertyValue::Integer(1) < PropertyValue::Float(1.5));

        let mut set = HashSet::new();
        set.insert(PropertyValue::Integer(7));
        assert!(set.contains(&PropertyValue::Float(7.0)));
    }

    #[test]
    fn test_cross_type_ordering() {
        let mut values = vec![
            PropertyValue::String("a".into()),
            PropertyValue::Integer(3),
            PropertyValue::Null,
            PropertyValue::Boolean(false),
        ];
        values.sort();
        assert_eq!(values[0], PropertyValue::Null);
        assert_eq!(values[1], PropertyValue::Boolean(false));
        assert_eq!(values[2], PropertyValue::Integer(3));
        assert_eq!(values[3], PropertyValue::String("a".into()));
    }

    #[test]
    fn test_to_json_is_untagged() {
        let mut map = BTreeMap::new();
        map.insert("k".to_string(), PropertyValue::Integer(1));
        let value = PropertyValue::Array(vec![PropertyValue::from("x"), PropertyValue::Map(map)]);
        assert_eq!(value.to_json(), serde_json::json!(["x", {"k": 1}]));
    }

    #[test]
    fn test_props_macro_keeps_order_and_last_wins() {
        let props = props! {"name" => "Alice", "age" => 30, "name" => "Alicia"};
        assert_eq!(props.len(), 3);
        assert_eq!(props[1], Property::new("age", 30));

        let map = Property::to_map(&props);
        assert_eq!(map.get("name").unwrap().as_string(), Some("Alicia"));
    }

    #[test]
    fn test_index_text() {
        assert_eq!(PropertyValue::Integer(42).index_text(), "42");
        assert_eq!(PropertyValue::from("Neo").index_text(), "Neo");
        assert_eq!(PropertyValue::Boolean(true).index_text(), "true");
    }
}

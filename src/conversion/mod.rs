//! Result conversion
//!
//! Query rows, graph elements and paths convert to plain JSON through
//! [`ToJson`]; a [`ResultConverter`] turns such values into caller types.
//! [`QueryResult`] wraps any sequence lazily so conversion happens only as
//! results are consumed.

pub mod result;

pub use result::{ConvertedResult, QueryResult};

use crate::graph::{Node, Path, PropertyValue, Relationship};
use crate::query::{Row, Value};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as Json};
use thiserror::Error;

/// Conversion failures
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Cannot convert {found} into {target}: {source}")]
    Json {
        found: &'static str,
        target: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Conversion failed: {0}")]
    Custom(String),
}

/// Plain JSON view of an engine value
pub trait ToJson {
    fn to_json(&self) -> Json;
}

impl ToJson for PropertyValue {
    fn to_json(&self) -> Json {
        PropertyValue::to_json(self)
    }
}

impl ToJson for Node {
    fn to_json(&self) -> Json {
        let mut object: Map<String, Json> = self.properties.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
        object.insert("_id".to_string(), Json::from(self.id.as_u64()));
        Json::Object(object)
    }
}

impl ToJson for Relationship {
    fn to_json(&self) -> Json {
        let mut object: Map<String, Json> = self.properties.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
        object.insert("_id".to_string(), Json::from(self.id.as_u64()));
        object.insert("_type".to_string(), Json::from(self.rel_type.as_str()));
        object.insert("_start".to_string(), Json::from(self.start.as_u64()));
        object.insert("_end".to_string(), Json::from(self.end.as_u64()));
        Json::Object(object)
    }
}

impl ToJson for Path {
    fn to_json(&self) -> Json {
        let mut object = Map::new();
        object.insert("nodes".to_string(), self.nodes().iter().map(ToJson::to_json).collect());
        object.insert(
            "relationships".to_string(),
            self.relationships().iter().map(ToJson::to_json).collect(),
        );
        Json::Object(object)
    }
}

impl ToJson for Value {
    fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Property(p) => p.to_json(),
            Value::Node(n) => n.to_json(),
            Value::Relationship(r) => r.to_json(),
            Value::Path(p) => p.to_json(),
            Value::List(items) => items.iter().map(ToJson::to_json).collect(),
            Value::Map(map) => Json::Object(map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()),
        }
    }
}

impl ToJson for Row {
    fn to_json(&self) -> Json {
        Json::Object(self.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
    }
}

impl ToJson for Json {
    fn to_json(&self) -> Json {
        self.clone()
    }
}

/// Converts one result element into a caller type
pub trait ResultConverter<T, R> {
    fn convert(&self, value: T) -> Result<R, ConversionError>;
}

impl<T, R, F> ResultConverter<T, R> for F
where
    F: Fn(T) -> Result<R, ConversionError>,
{
    fn convert(&self, value: T) -> Result<R, ConversionError> {
        self(value)
    }
}

/// Default converter: through JSON into any `DeserializeOwned` type
///
/// A single-column row converts as its only value when the row itself does
/// not fit the target, so `RETURN n.name` converts straight into `String`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResultConverter;

impl<T: ToJson, R: DeserializeOwned> ResultConverter<T, R> for JsonResultConverter {
    fn convert(&self, value: T) -> Result<R, ConversionError> {
        let json = value.to_json();
        match serde_json::from_value::<R>(json.clone()) {
            Ok(converted) => Ok(converted),
            Err(source) => {
                if let Json::Object(object) = &json {
                    if object.len() == 1 {
                        if let Some(only) = object.values().next() {
                            if let Ok(converted) = serde_json::from_value::<R>(only.clone()) {
                                return Ok(converted);
                            }
                        }
                    }
                }
                Err(ConversionError::Json {
                    found: json_type(&json),
                    target: std::any::type_name::<R>(),
                    source,
                })
            }
        }
    }
}

fn json_type(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

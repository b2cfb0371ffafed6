use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

use crate::domain::DomainError;

/// Ordered, non-empty list of unique field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Schema(Vec<String>);

impl Schema {
    pub fn new<I, S>(fields: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if fields.is_empty() {
            return Err(DomainError::validation("Schema must contain at least one field"));
        }

        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if field.trim().is_empty() {
                return Err(DomainError::validation("Schema field names must not be blank"));
            }
            if !seen.insert(field.as_str()) {
                return Err(DomainError::validation(format!(
                    "Duplicate schema field: {field}"
                )));
            }
        }

        Ok(Self(fields))
    }

    /// Parses the JSON-encoded field list sent alongside an upload.
    pub fn from_json(raw: &str) -> Result<Self, DomainError> {
        let fields: Vec<String> = serde_json::from_str(raw)
            .map_err(|e| DomainError::validation(format!("Invalid headers list: {e}")))?;
        Self::new(fields)
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|f| f == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Vec::<String>::deserialize(deserializer)?;
        Schema::new(fields).map_err(serde::de::Error::custom)
    }
}

/// One extracted unit: field name to string value, kept in field order.
///
/// Records produced by [`RawExtraction::normalize`] carry exactly the schema's
/// keys. Serializes as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionRecord {
    fields: Vec<(String, String)>,
}

impl ExtractionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// A record with every schema field set to an empty string.
    pub fn blank(schema: &Schema) -> Self {
        Self {
            fields: schema.iter().map(|f| (f.to_string(), String::new())).collect(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == field)
            .map(|(_, v)| v.as_str())
    }

    /// Sets a value, appending the field if it is not present.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let field = field.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == field) {
            Some((_, v)) => *v = value,
            None => self.fields.push((field, value)),
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Reshapes the record to exactly the schema's keys.
    pub fn conform(&self, schema: &Schema) -> Self {
        Self {
            fields: schema
                .iter()
                .map(|f| (f.to_string(), self.get(f).unwrap_or_default().to_string()))
                .collect(),
        }
    }

    /// Values ordered by an arbitrary header row, blank where absent.
    pub fn to_row(&self, headers: &[String]) -> Vec<String> {
        headers
            .iter()
            .map(|h| self.get(h).unwrap_or_default().to_string())
            .collect()
    }
}

impl Serialize for ExtractionRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ExtractionRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = ExtractionRecord;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of field names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut record = ExtractionRecord::new();
                while let Some((key, value)) = access.next_entry::<String, Value>()? {
                    record.set(key, coerce_value(&value));
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

/// Why an upstream body could not be read as records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeError(pub String);

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ShapeError {}

/// Shape of an upstream extraction answer, resolved once at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum RawExtraction {
    Single(Map<String, Value>),
    Many(Vec<Map<String, Value>>),
}

impl RawExtraction {
    /// Accepts a raw object, a raw array of objects, or an object wrapping a
    /// single array of objects (`{"records": [...]}`). An object whose only key
    /// is a schema field is a record, never a wrapper.
    pub fn from_value(value: Value, schema: &Schema) -> Result<Self, ShapeError> {
        match value {
            Value::Array(items) => Self::objects(items).map(Self::Many),
            Value::Object(mut map) => match wrapper_key(&map, schema) {
                Some(key) => match map.remove(&key) {
                    Some(Value::Array(items)) => Self::objects(items).map(Self::Many),
                    _ => Err(ShapeError(format!("wrapper '{key}' lost its array"))),
                },
                None => Ok(Self::Single(map)),
            },
            other => Err(ShapeError(format!(
                "expected an object or array, got {}",
                kind(&other)
            ))),
        }
    }

    fn objects(items: Vec<Value>) -> Result<Vec<Map<String, Value>>, ShapeError> {
        items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(map) => Ok(map),
                other => Err(ShapeError(format!(
                    "array element {i} is {}, expected an object",
                    kind(&other)
                ))),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Produces records with exactly the schema's keys.
    pub fn normalize(self, schema: &Schema) -> Vec<ExtractionRecord> {
        match self {
            Self::Single(map) => vec![normalize_map(&map, schema)],
            Self::Many(items) => items.iter().map(|m| normalize_map(m, schema)).collect(),
        }
    }
}

fn wrapper_key(map: &Map<String, Value>, schema: &Schema) -> Option<String> {
    if map.len() != 1 {
        return None;
    }
    match map.iter().next() {
        Some((key, Value::Array(items)))
            if !schema.contains(key) && items.iter().all(Value::is_object) =>
        {
            Some(key.clone())
        }
        _ => None,
    }
}

fn normalize_map(map: &Map<String, Value>, schema: &Schema) -> ExtractionRecord {
    ExtractionRecord {
        fields: schema
            .iter()
            .map(|f| {
                let value = map.get(f).map(coerce_value).unwrap_or_default();
                (f.to_string(), value)
            })
            .collect(),
    }
}

fn coerce_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

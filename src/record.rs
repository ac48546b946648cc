//! Records and field resolution
//!
//! A [`Record`] is one deserialized log entry: a JSON object mapping field
//! names to values. Field values stay as `serde_json::Value`, whose variants
//! (null, bool, number, string, array, object) are converted to text by the
//! single rule in [`value_to_string`].
//!
//! A [`FieldSpec`] names one field through a list of alternative keys, e.g.
//! `level,loglevel,severity`. Resolution tries each key in order and the
//! first key present in the record wins.

use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::TailResult;

/// Ordered list of alternative field names.
///
/// # Examples
///
/// ```
/// use logstash_kafka_tail::record::{FieldSpec, Record};
///
/// let spec = FieldSpec::parse("a,b");
/// let record = Record::from_json(br#"{"b": "x"}"#).unwrap();
/// assert_eq!(record.resolve_string(&spec), Some("x".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSpec {
    raw: String,
    names: Vec<String>,
}

impl FieldSpec {
    /// Parse a comma-separated list of alternative field names
    pub fn parse(spec: &str) -> Self {
        Self {
            raw: spec.to_string(),
            names: spec.split(',').map(str::to_string).collect(),
        }
    }

    /// Alternative names in resolution order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The spec as it was written in the configuration
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One deserialized log entry.
///
/// Records are immutable once built and move through the pipeline by value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Deserialize a record from a JSON payload.
    ///
    /// A JSON `null` payload yields an empty record. Any payload that is not
    /// a JSON object (or `null`) is rejected.
    ///
    /// # Errors
    ///
    /// Returns `TailError::Deserialize` if the payload is not valid JSON or
    /// not an object.
    pub fn from_json(payload: &[u8]) -> TailResult<Self> {
        let fields: Option<Map<String, Value>> = serde_json::from_slice(payload)?;
        Ok(Self {
            fields: fields.unwrap_or_default(),
        })
    }

    /// Look up a single key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Resolve a field spec, first present alternative wins
    pub fn resolve(&self, spec: &FieldSpec) -> Option<&Value> {
        spec.names().iter().find_map(|name| self.fields.get(name))
    }

    /// Resolve a field spec and stringify the value
    pub fn resolve_string(&self, spec: &FieldSpec) -> Option<String> {
        self.resolve(spec).map(value_to_string)
    }

    /// Number of top-level fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true when the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serialize the whole record as compact JSON with keys in sorted order,
    /// nested objects included.
    pub fn to_canonical_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&SortedObject(&self.fields))
    }
}

struct SortedObject<'a>(&'a Map<String, Value>);

impl Serialize for SortedObject<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut entries: Vec<_> = self.0.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in entries {
            map.serialize_entry(key, &SortedValue(value))?;
        }
        map.end()
    }
}

struct SortedValue<'a>(&'a Value);

impl Serialize for SortedValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(fields) => SortedObject(fields).serialize(serializer),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&SortedValue(item))?;
                }
                seq.end()
            }
            other => other.serialize(serializer),
        }
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// Render a field value as display text.
///
/// - strings are used verbatim
/// - booleans become `true` / `false`
/// - integers print without a decimal point, and so do floats holding an
///   integral value below 2^53 (`1.0` prints as `1`)
/// - `null` prints as `null`
/// - arrays and objects print as compact JSON
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                return n.to_string();
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < MAX_EXACT_FLOAT => {
                    format!("{}", f as i64)
                }
                _ => n.to_string(),
            }
        }
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

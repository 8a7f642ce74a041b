//! Structural value type shared by the reactive store, memo keys, event
//! payloads and serialized trees.
//!
//! `Value` is deliberately opaque to the engine: reconciliation never looks
//! inside one except through deep equality (`PartialEq`) and deep clone
//! (`Clone`). Date-like data is carried as [`Value::Stamp`] (epoch
//! milliseconds) and compares by the underlying instant, not by reference.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    // Serializes as a bare integer; the date-ness survives in memory only.
    Stamp(i64),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    /// Builds a map value preserving entry order.
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Value
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn list<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Value {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    /// A date-like value pinned to an epoch-millisecond instant.
    pub fn stamp(epoch_millis: i64) -> Value {
        Value::Stamp(epoch_millis)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Text rendition used when a value lands in host text content.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Str(s) => s.clone(),
            Value::Stamp(ms) => ms.to_string(),
            Value::List(_) | Value::Map(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
        }
    }
}

pub(crate) fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{f}")
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(map: IndexMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_equality_is_structural() {
        let a = Value::map([("items", Value::list([1, 2, 3])), ("done", Value::from(false))]);
        let b = Value::map([("items", Value::list([1, 2, 3])), ("done", Value::from(false))]);
        assert_eq!(a, b);
        let c = Value::map([("items", Value::list([1, 2, 4])), ("done", Value::from(false))]);
        assert_ne!(a, c);
    }

    #[test]
    fn stamps_compare_by_instant() {
        assert_eq!(Value::stamp(1_700_000_000_000), Value::stamp(1_700_000_000_000));
        assert_ne!(Value::stamp(1), Value::stamp(2));
        // A stamp is not interchangeable with a plain integer.
        assert_ne!(Value::stamp(5), Value::Int(5));
    }

    #[test]
    fn clone_is_deep() {
        let original = Value::map([("nested", Value::list(["x"]))]);
        let mut copy = original.clone();
        if let Value::Map(map) = &mut copy {
            map.insert("extra".into(), Value::Null);
        }
        assert_ne!(original, copy);
    }

    #[test]
    fn json_round_trip() {
        let value = Value::map([
            ("count", Value::from(3)),
            ("label", Value::from("items")),
            ("ratio", Value::from(0.5)),
        ]);
        let encoded = serde_json::to_string(&value).unwrap();
        let decoded: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value, decoded);
    }

    #[test]
    fn text_rendition_trims_integral_floats() {
        assert_eq!(Value::from(4.0).to_text(), "4");
        assert_eq!(Value::from(4.5).to_text(), "4.5");
        assert_eq!(Value::Null.to_text(), "");
    }
}

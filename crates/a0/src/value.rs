//! Runtime values.
//!
//! The value set is closed: Null, Bool, Number (IEEE-754 double — integer
//! literals are stored as doubles too, so `1 == 1.0`), String, List, and
//! the insertion-ordered Record. Values are immutable from the language's
//! perspective; every list/record update builds a new value.

use std::fmt;

use indexmap::IndexMap;
use serde::{Serialize, Serializer, ser::{SerializeMap, SerializeSeq}};

type RecordMap = IndexMap<String, Value, ahash::RandomState>;

/// An insertion-ordered string-keyed container.
///
/// Re-setting an existing key updates the value in place without changing
/// its position; new keys append. Lookup is O(1) amortized. Equality is
/// order-insensitive (same key/value pairs, any order).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    entries: RecordMap,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    /// Removes a key, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }

    /// The first entry in insertion order, if any.
    #[must_use]
    pub fn first(&self) -> Option<(&String, &Value)> {
        self.entries.first()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut record = Self::new();
        for (k, v) in iter {
            record.set(k, v);
        }
        record
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// A runtime value.
///
/// Equality is structural and deep, strict on variant kind: `1 == "1"` is
/// false, lists compare element-wise in order, records compare as key/value
/// sets. Numbers follow `f64` comparison, so `1 == 1.0` holds and NaN is
/// unequal to itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Record(Record),
}

impl Value {
    /// Truthiness: Null, false, 0, and "" are falsy; everything else —
    /// including the empty list and the empty record — is truthy.
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::List(_) | Self::Record(_) => true,
        }
    }

    /// The variant name as reported by `typeof` and used in type errors.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Record(_) => "record",
        }
    }

    /// Deep structural equality (same relation as `==` in the language).
    #[must_use]
    pub fn deep_eq(&self, other: &Self) -> bool {
        self == other
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    /// The string form used by `join`, `str.concat`, and templating:
    /// strings verbatim, everything else in its display form.
    #[must_use]
    pub fn stringify(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Converts a `serde_json` value (objects keep their order thanks to
    /// `preserve_order`) into a runtime value.
    #[must_use]
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
            serde_json::Value::Object(map) => {
                Self::Record(map.into_iter().map(|(k, v)| (k, Self::from_json(v))).collect())
            }
        }
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => number_to_json(*n),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => serde_json::Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Record(record) => {
                serde_json::Value::Object(record.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.is_finite() && (i64::MIN as f64..=i64::MAX as f64).contains(&n) {
        return serde_json::Value::Number(serde_json::Number::from(n as i64));
    }
    serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => {
                // Integral doubles serialize in integer form.
                if n.fract() == 0.0 && n.is_finite() && (i64::MIN as f64..=i64::MAX as f64).contains(n) {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Self::String(s) => serializer.serialize_str(s),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Record(record) => record.serialize(serializer),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && (i64::MIN as f64..=i64::MAX as f64).contains(n) {
                    write!(f, "{}", *n as i64)
                } else {
                    f.write_str(ryu::Buffer::new().format(*n))
                }
            }
            Self::String(s) => write!(f, "{}", serde_json::Value::String(s.clone())),
            Self::List(_) | Self::Record(_) => {
                let rendered = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&rendered)
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), v.clone())).collect()
    }

    #[test]
    fn record_preserves_insertion_order() {
        let mut r = Record::new();
        r.set("b", Value::Number(1.0));
        r.set("a", Value::Number(2.0));
        r.set("c", Value::Number(3.0));
        let keys: Vec<_> = r.keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn resetting_a_key_keeps_its_position() {
        let mut r = Record::new();
        r.set("b", Value::Number(1.0));
        r.set("a", Value::Number(2.0));
        r.set("b", Value::Number(9.0));
        let keys: Vec<_> = r.keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(r.get("b"), Some(&Value::Number(9.0)));
    }

    #[test]
    fn record_equality_ignores_order() {
        let x = record(&[("a", Value::Number(1.0)), ("b", Value::Number(2.0))]);
        let y = record(&[("b", Value::Number(2.0)), ("a", Value::Number(1.0))]);
        assert_eq!(Value::Record(x), Value::Record(y));
    }

    #[test]
    fn numbers_have_one_runtime_type() {
        assert_eq!(Value::Number(1.0), Value::Number(1.0));
        assert!(Value::Number(1.0).deep_eq(&Value::Number(1.0)));
    }

    #[test]
    fn equality_is_strict_on_kind() {
        assert_ne!(Value::Number(1.0), Value::String("1".into()));
        assert_ne!(Value::Bool(false), Value::Number(0.0));
        assert_ne!(Value::Null, Value::Bool(false));
    }

    #[test]
    fn truthiness_table() {
        assert!(!Value::Null.truthy());
        assert!(!Value::Bool(false).truthy());
        assert!(!Value::Number(0.0).truthy());
        assert!(!Value::String(String::new()).truthy());
        assert!(Value::Bool(true).truthy());
        assert!(Value::Number(-1.5).truthy());
        assert!(Value::String("x".into()).truthy());
        assert!(Value::List(vec![]).truthy());
        assert!(Value::Record(Record::new()).truthy());
    }

    #[test]
    fn integral_numbers_serialize_without_fraction() {
        let v = Value::List(vec![Value::Number(14.0), Value::Number(2.5)]);
        assert_eq!(serde_json::to_string(&v).unwrap(), "[14,2.5]");
    }

    #[test]
    fn json_round_trip_preserves_object_order() {
        let parsed: serde_json::Value = serde_json::from_str(r#"{"z":1,"a":{"m":[true,null]}}"#).unwrap();
        let value = Value::from_json(parsed);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"z":1,"a":{"m":[true,null]}}"#);
    }
}

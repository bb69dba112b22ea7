//! Evidence collected from `assert` and `check` expressions.
//!
//! Entries accumulate in insertion order over the life of a run. On
//! success they are returned next to the value; on failure they travel
//! with the runtime error, so an audit sees everything recorded before the
//! halt. A run whose evidence contains any `ok = false` entry maps to a
//! distinguished exit status even when a value was produced.

use serde::{Serialize, Serializer};

use crate::{diag::Span, value::Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum EvidenceKind {
    Assert,
    Check,
}

impl Serialize for EvidenceKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evidence {
    pub kind: EvidenceKind,
    pub ok: bool,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub span: Span,
}

impl Evidence {
    /// The record form the expression itself evaluates to, so evidence can
    /// be captured with a `->` target.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut record = crate::value::Record::new();
        record.set("kind", Value::String(self.kind.to_string()));
        record.set("ok", Value::Bool(self.ok));
        record.set("msg", Value::String(self.msg.clone()));
        if let Some(details) = &self.details {
            record.set("details", details.clone());
        }
        Value::Record(record)
    }
}

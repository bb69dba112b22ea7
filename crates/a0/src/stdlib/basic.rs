//! Equality, logic, and generic access helpers.

use crate::value::{Record, Value};

use super::{Args, FnError, FnResult};

/// `eq { a, b }` — deep structural equality.
pub(super) fn eq(args: &Record) -> FnResult {
    let args = Args::new(args);
    Ok(Value::Bool(args.req("a")?.deep_eq(args.req("b")?)))
}

/// `not { v }` — negated truthiness.
pub(super) fn not(args: &Record) -> FnResult {
    Ok(Value::Bool(!Args::new(args).req("v")?.truthy()))
}

/// `and { a, b }` — truthiness conjunction. Both operands are already
/// evaluated by the time they arrive; there is no short-circuiting here.
pub(super) fn and(args: &Record) -> FnResult {
    let args = Args::new(args);
    Ok(Value::Bool(args.req("a")?.truthy() && args.req("b")?.truthy()))
}

/// `or { a, b }` — truthiness disjunction.
pub(super) fn or(args: &Record) -> FnResult {
    let args = Args::new(args);
    Ok(Value::Bool(args.req("a")?.truthy() || args.req("b")?.truthy()))
}

/// `coalesce { in }` — first non-null element of the list, else null.
pub(super) fn coalesce(args: &Record) -> FnResult {
    let items = Args::new(args).list("in")?;
    Ok(items.iter().find(|v| !matches!(v, Value::Null)).cloned().unwrap_or(Value::Null))
}

/// `contains { in, value }` — list membership, substring, or record key.
pub(super) fn contains(args: &Record) -> FnResult {
    let args = Args::new(args);
    let haystack = args.req("in")?;
    let needle = args.req("value")?;
    let found = match haystack {
        Value::List(items) => items.iter().any(|v| v.deep_eq(needle)),
        Value::String(s) => {
            let sub = needle
                .as_str()
                .ok_or_else(|| FnError::new(format!("`value` must be a string when `in` is a string, got {}", needle.kind())))?;
            s.contains(sub)
        }
        Value::Record(record) => {
            let key = needle
                .as_str()
                .ok_or_else(|| FnError::new(format!("`value` must be a string key when `in` is a record, got {}", needle.kind())))?;
            record.contains_key(key)
        }
        other => {
            return Err(FnError::new(format!("`in` must be a list, string, or record, got {}", other.kind())));
        }
    };
    Ok(Value::Bool(found))
}

/// `typeof { v }` — the variant name.
pub(super) fn type_of(args: &Record) -> FnResult {
    Ok(Value::String(Args::new(args).req("v")?.kind().to_owned()))
}

/// `len { in }` — list length, record size, or string character count.
pub(super) fn len(args: &Record) -> FnResult {
    let value = Args::new(args).req("in")?;
    let n = match value {
        Value::List(items) => items.len(),
        Value::Record(record) => record.len(),
        Value::String(s) => s.chars().count(),
        other => return Err(FnError::new(format!("`in` must be a list, record, or string, got {}", other.kind()))),
    };
    Ok(Value::Number(n as f64))
}

/// `get { in, key }` / `get { in, index, default? }` — record field or
/// list element. Absent keys and out-of-range indexes yield the default
/// (null when none is given) rather than an error.
pub(super) fn get(args: &Record) -> FnResult {
    let args = Args::new(args);
    let container = args.req("in")?;
    let fallback = args.opt("default").cloned().unwrap_or(Value::Null);
    match container {
        Value::Record(record) => {
            let key = args.str("key")?;
            Ok(record.get(key).cloned().unwrap_or(fallback))
        }
        Value::List(items) => {
            let index = args.number("index")?;
            if index.fract() != 0.0 || index < 0.0 {
                return Ok(fallback);
            }
            Ok(items.get(index as usize).cloned().unwrap_or(fallback))
        }
        other => Err(FnError::new(format!("`in` must be a record or list, got {}", other.kind()))),
    }
}

/// `put { in, key, value }` — record with the key set (appended or
/// updated in place, preserving order).
pub(super) fn put(args: &Record) -> FnResult {
    let args = Args::new(args);
    let mut record = args.record("in")?.clone();
    let key = args.str("key")?;
    record.set(key, args.req("value")?.clone());
    Ok(Value::Record(record))
}

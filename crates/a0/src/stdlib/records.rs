//! Record helpers.

use crate::value::{Record, Value};

use super::{Args, FnResult};

/// `keys { in }` — the keys in insertion order.
pub(super) fn keys(args: &Record) -> FnResult {
    let record = Args::new(args).record("in")?;
    Ok(Value::List(record.keys().map(|k| Value::String(k.clone())).collect()))
}

/// `values { in }` — the values in insertion order.
pub(super) fn values(args: &Record) -> FnResult {
    let record = Args::new(args).record("in")?;
    Ok(Value::List(record.values().cloned().collect()))
}

/// `entries { in }` — `{key, value}` records in insertion order.
pub(super) fn entries(args: &Record) -> FnResult {
    let record = Args::new(args).record("in")?;
    let items = record
        .iter()
        .map(|(k, v)| {
            let mut entry = Record::new();
            entry.set("key", Value::String(k.clone()));
            entry.set("value", v.clone());
            Value::Record(entry)
        })
        .collect();
    Ok(Value::List(items))
}

/// `merge { a, b }` — `a` with `b`'s entries written over it, in order:
/// existing keys update in place, new keys append.
pub(super) fn merge(args: &Record) -> FnResult {
    let args = Args::new(args);
    let mut merged = args.record("a")?.clone();
    for (k, v) in args.record("b")? {
        merged.set(k.clone(), v.clone());
    }
    Ok(Value::Record(merged))
}

/// `patch { in, patch }` — merge-patch: records merge recursively, a null
/// in the patch removes the key, anything else replaces the target value.
pub(super) fn patch(args: &Record) -> FnResult {
    let args = Args::new(args);
    let base = args.record("in")?;
    let delta = args.record("patch")?;
    Ok(Value::Record(apply_patch(base, delta)))
}

fn apply_patch(base: &Record, delta: &Record) -> Record {
    let mut out = base.clone();
    for (key, patch_value) in delta {
        match patch_value {
            Value::Null => {
                out.remove(key);
            }
            Value::Record(nested) => {
                let patched = match out.get(key) {
                    Some(Value::Record(existing)) => apply_patch(existing, nested),
                    _ => apply_patch(&Record::new(), nested),
                };
                out.set(key.clone(), Value::Record(patched));
            }
            other => out.set(key.clone(), other.clone()),
        }
    }
    out
}

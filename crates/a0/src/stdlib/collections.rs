//! List helpers.

use std::cmp::Ordering;

use crate::value::{Record, Value};

use super::{Args, FnError, FnResult};

/// Upper bound on `range` output, protecting the sandbox from a single
/// call allocating unbounded memory.
const MAX_RANGE_LEN: f64 = 10_000_000.0;

/// `append { in, value }` — new list with the value at the end.
pub(super) fn append(args: &Record) -> FnResult {
    let args = Args::new(args);
    let mut items = args.list("in")?.to_vec();
    items.push(args.req("value")?.clone());
    Ok(Value::List(items))
}

/// `concat { a, b }` — concatenation of two lists.
pub(super) fn concat(args: &Record) -> FnResult {
    let args = Args::new(args);
    let mut items = args.list("a")?.to_vec();
    items.extend_from_slice(args.list("b")?);
    Ok(Value::List(items))
}

/// `sort { in, by? }` — ascending stable sort. The elements (or their
/// `by` fields) must be all numbers or all strings.
pub(super) fn sort(args: &Record) -> FnResult {
    let args = Args::new(args);
    let items = args.list("in")?;
    let by = args.opt_str("by")?;

    let key_of = |item: &Value| -> Result<Value, FnError> {
        match by {
            None => Ok(item.clone()),
            Some(field) => {
                let record = item
                    .as_record()
                    .ok_or_else(|| FnError::new(format!("sort by `{field}` requires record elements, got {}", item.kind())))?;
                record
                    .get(field)
                    .cloned()
                    .ok_or_else(|| FnError::new(format!("sort: element is missing field `{field}`")))
            }
        }
    };

    let mut keyed: Vec<(Value, Value)> = Vec::with_capacity(items.len());
    for item in items {
        keyed.push((key_of(item)?, item.clone()));
    }
    for (key, _) in &keyed {
        if !matches!(key, Value::Number(_) | Value::String(_)) {
            return Err(FnError::new(format!("sort keys must be numbers or strings, got {}", key.kind())));
        }
    }
    if keyed.iter().any(|(k, _)| matches!(k, Value::Number(_))) && keyed.iter().any(|(k, _)| matches!(k, Value::String(_))) {
        return Err(FnError::new("sort keys must not mix numbers and strings"));
    }

    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.total_cmp(y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => Ordering::Equal,
    });
    Ok(Value::List(keyed.into_iter().map(|(_, v)| v).collect()))
}

/// `filter { in, by }` — the pure stdlib form: keeps record elements whose
/// `by` field is truthy. Non-records and missing fields drop out.
///
/// Predicate-body filtering (`filter { in, as } { ... }`) is an evaluator
/// construct, not a stdlib call.
pub(super) fn filter(args: &Record) -> FnResult {
    let args = Args::new(args);
    let items = args.list("in")?;
    let by = args.str("by")?;
    let kept = items
        .iter()
        .filter(|item| {
            item.as_record()
                .and_then(|record| record.get(by))
                .is_some_and(Value::truthy)
        })
        .cloned()
        .collect();
    Ok(Value::List(kept))
}

/// `find { in, by, value }` — first record whose `by` field equals the
/// value; `find { in, value }` — first element equal to the value. Null
/// when nothing matches.
pub(super) fn find(args: &Record) -> FnResult {
    let args = Args::new(args);
    let items = args.list("in")?;
    let needle = args.req("value")?;
    let found = match args.opt_str("by")? {
        Some(field) => items.iter().find(|item| {
            item.as_record()
                .and_then(|record| record.get(field))
                .is_some_and(|v| v.deep_eq(needle))
        }),
        None => items.iter().find(|item| item.deep_eq(needle)),
    };
    Ok(found.cloned().unwrap_or(Value::Null))
}

/// `range { to, from?, step? }` — numbers in `[from, to)`, step > 0.
pub(super) fn range(args: &Record) -> FnResult {
    let args = Args::new(args);
    let to = args.number("to")?;
    let from = args.opt_number("from")?.unwrap_or(0.0);
    let step = args.opt_number("step")?.unwrap_or(1.0);
    if step <= 0.0 {
        return Err(FnError::new("`step` must be a positive number"));
    }
    if (to - from) / step > MAX_RANGE_LEN {
        return Err(FnError::new("range is too large"));
    }
    let mut items = Vec::new();
    let mut current = from;
    while current < to {
        items.push(Value::Number(current));
        current += step;
    }
    Ok(Value::List(items))
}

/// `join { in, sep? }` — elements stringified and joined.
pub(super) fn join(args: &Record) -> FnResult {
    let args = Args::new(args);
    let items = args.list("in")?;
    let sep = args.opt_str("sep")?.unwrap_or("");
    let joined = items.iter().map(Value::stringify).collect::<Vec<_>>().join(sep);
    Ok(Value::String(joined))
}

/// `unique { in }` — first occurrences, deep equality, order preserved.
pub(super) fn unique(args: &Record) -> FnResult {
    let items = Args::new(args).list("in")?;
    let mut seen: Vec<Value> = Vec::new();
    for item in items {
        if !seen.iter().any(|v| v.deep_eq(item)) {
            seen.push(item.clone());
        }
    }
    Ok(Value::List(seen))
}

/// `pluck { in, key }` — the key's value from each record element; null
/// where the field is missing.
pub(super) fn pluck(args: &Record) -> FnResult {
    let args = Args::new(args);
    let items = args.list("in")?;
    let key = args.str("key")?;
    let plucked = items
        .iter()
        .map(|item| {
            item.as_record()
                .and_then(|record| record.get(key))
                .cloned()
                .unwrap_or(Value::Null)
        })
        .collect();
    Ok(Value::List(plucked))
}

/// `reverse { in }` — elements in reverse order.
pub(super) fn reverse(args: &Record) -> FnResult {
    let mut items = Args::new(args).list("in")?.to_vec();
    items.reverse();
    Ok(Value::List(items))
}

/// `slice { in, from?, to? }` — elements in `[from, to)`, clamped to the
/// list bounds; negative or fractional indexes are an error.
pub(super) fn slice(args: &Record) -> FnResult {
    let args = Args::new(args);
    let items = args.list("in")?;
    let index_of = |key: &str, default: usize| -> Result<usize, FnError> {
        match args.opt_number(key)? {
            None => Ok(default),
            Some(n) if n >= 0.0 && n.fract() == 0.0 => Ok(n as usize),
            Some(_) => Err(FnError::new(format!("`{key}` must be a non-negative integer"))),
        }
    };
    let from = index_of("from", 0)?.min(items.len());
    let to = index_of("to", items.len())?.min(items.len());
    if from > to {
        return Ok(Value::List(Vec::new()));
    }
    Ok(Value::List(items[from..to].to_vec()))
}

/// `flat { in }` — flattens one level of nesting.
pub(super) fn flat(args: &Record) -> FnResult {
    let items = Args::new(args).list("in")?;
    let mut out = Vec::new();
    for item in items {
        match item {
            Value::List(inner) => out.extend(inner.iter().cloned()),
            other => out.push(other.clone()),
        }
    }
    Ok(Value::List(out))
}

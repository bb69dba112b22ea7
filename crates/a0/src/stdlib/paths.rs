//! Slash-separated path helpers, registered under the `path.` prefix.
//!
//! These are pure string operations; they never touch a filesystem.

use crate::value::{Record, Value};

use super::{Args, FnError, FnResult};

/// `path.join { in }` — joins string segments with `/`, collapsing
/// duplicate separators at the joints.
pub(super) fn join(args: &Record) -> FnResult {
    let items = Args::new(args).list("in")?;
    let mut out = String::new();
    for item in items {
        let seg = item
            .as_str()
            .ok_or_else(|| FnError::new(format!("`in` must contain only strings, got {}", item.kind())))?;
        if seg.is_empty() {
            continue;
        }
        if out.is_empty() {
            out.push_str(seg);
        } else {
            let trimmed = seg.trim_start_matches('/');
            if !out.ends_with('/') {
                out.push('/');
            }
            out.push_str(trimmed);
        }
    }
    Ok(Value::String(out))
}

/// `path.base { in }` — the final component.
pub(super) fn base(args: &Record) -> FnResult {
    let path = Args::new(args).str("in")?;
    let trimmed = path.trim_end_matches('/');
    let base = trimmed.rsplit('/').next().unwrap_or("");
    Ok(Value::String(base.to_owned()))
}

/// `path.dir { in }` — everything before the final component, `"."` when
/// there is none.
pub(super) fn dir(args: &Record) -> FnResult {
    let path = Args::new(args).str("in")?;
    let trimmed = path.trim_end_matches('/');
    let dir = match trimmed.rfind('/') {
        Some(0) => "/",
        Some(idx) => &trimmed[..idx],
        None => ".",
    };
    Ok(Value::String(dir.to_owned()))
}

/// `path.ext { in }` — the extension of the final component, without the
/// dot; empty when there is none.
pub(super) fn ext(args: &Record) -> FnResult {
    let path = Args::new(args).str("in")?;
    let base = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    let ext = match base.rfind('.') {
        Some(idx) if idx > 0 => &base[idx + 1..],
        _ => "",
    };
    Ok(Value::String(ext.to_owned()))
}

//! String helpers, registered under the `str.` prefix.

use crate::value::{Record, Value};

use super::{Args, FnResult};

/// `str.concat { in }` — every element stringified and concatenated.
pub(super) fn concat(args: &Record) -> FnResult {
    let items = Args::new(args).list("in")?;
    Ok(Value::String(items.iter().map(Value::stringify).collect()))
}

/// `str.split { in, sep }` — substring split, keeping empty pieces.
pub(super) fn split(args: &Record) -> FnResult {
    let args = Args::new(args);
    let input = args.str("in")?;
    let sep = args.str("sep")?;
    let parts = if sep.is_empty() {
        input.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        input.split(sep).map(|p| Value::String(p.to_owned())).collect()
    };
    Ok(Value::List(parts))
}

/// `str.starts { in, prefix }`
pub(super) fn starts(args: &Record) -> FnResult {
    let args = Args::new(args);
    Ok(Value::Bool(args.str("in")?.starts_with(args.str("prefix")?)))
}

/// `str.ends { in, suffix }`
pub(super) fn ends(args: &Record) -> FnResult {
    let args = Args::new(args);
    Ok(Value::Bool(args.str("in")?.ends_with(args.str("suffix")?)))
}

/// `str.replace { in, from, to }` — every literal occurrence.
pub(super) fn replace(args: &Record) -> FnResult {
    let args = Args::new(args);
    let input = args.str("in")?;
    let from = args.str("from")?;
    let to = args.str("to")?;
    if from.is_empty() {
        return Ok(Value::String(input.to_owned()));
    }
    Ok(Value::String(input.replace(from, to)))
}

/// `str.lower { in }`
pub(super) fn lower(args: &Record) -> FnResult {
    Ok(Value::String(Args::new(args).str("in")?.to_lowercase()))
}

/// `str.upper { in }`
pub(super) fn upper(args: &Record) -> FnResult {
    Ok(Value::String(Args::new(args).str("in")?.to_uppercase()))
}

/// `str.trim { in }` — leading and trailing whitespace removed.
pub(super) fn trim(args: &Record) -> FnResult {
    Ok(Value::String(Args::new(args).str("in")?.trim().to_owned()))
}

/// `str.template { in, vars }` — `{name}` placeholders filled from the
/// vars record; unknown names keep their placeholder.
pub(super) fn template(args: &Record) -> FnResult {
    let args = Args::new(args);
    let input = args.str("in")?;
    let vars = args.record("vars")?;
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match vars.get(name) {
                    Some(value) => out.push_str(&value.stringify()),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Ok(Value::String(out))
}

//! JSON parsing, registered as `parse.json`.

use crate::value::{Record, Value};

use super::{Args, FnError, FnResult};

/// `parse.json { in }` — parses a JSON document into a value. Object keys
/// keep their document order.
pub(super) fn parse_json(args: &Record) -> FnResult {
    let text = Args::new(args).str("in")?;
    let parsed: serde_json::Value =
        serde_json::from_str(text).map_err(|e| FnError::new(format!("invalid JSON: {e}")))?;
    Ok(Value::from_json(parsed))
}

//! Numeric helpers, registered under the `math.` prefix.

use crate::value::{Record, Value};

use super::{Args, FnError, FnResult};

fn numbers(items: &[Value]) -> Result<Vec<f64>, FnError> {
    items
        .iter()
        .map(|v| {
            v.as_number()
                .ok_or_else(|| FnError::new(format!("`in` must contain only numbers, got {}", v.kind())))
        })
        .collect()
}

/// `math.max { in }` — largest number in a non-empty list.
pub(super) fn max(args: &Record) -> FnResult {
    let items = numbers(Args::new(args).list("in")?)?;
    items
        .into_iter()
        .reduce(f64::max)
        .map(Value::Number)
        .ok_or_else(|| FnError::new("`in` must not be empty"))
}

/// `math.min { in }` — smallest number in a non-empty list.
pub(super) fn min(args: &Record) -> FnResult {
    let items = numbers(Args::new(args).list("in")?)?;
    items
        .into_iter()
        .reduce(f64::min)
        .map(Value::Number)
        .ok_or_else(|| FnError::new("`in` must not be empty"))
}

/// `math.sum { in }` — sum of a list of numbers; the empty list sums to 0.
pub(super) fn sum(args: &Record) -> FnResult {
    let items = numbers(Args::new(args).list("in")?)?;
    Ok(Value::Number(items.iter().sum()))
}

/// `math.abs { v }`
pub(super) fn abs(args: &Record) -> FnResult {
    Ok(Value::Number(Args::new(args).number("v")?.abs()))
}

/// `math.floor { v }`
pub(super) fn floor(args: &Record) -> FnResult {
    Ok(Value::Number(Args::new(args).number("v")?.floor()))
}

/// `math.ceil { v }`
pub(super) fn ceil(args: &Record) -> FnResult {
    Ok(Value::Number(Args::new(args).number("v")?.ceil()))
}

/// `math.round { v }` — half away from zero.
pub(super) fn round(args: &Record) -> FnResult {
    Ok(Value::Number(Args::new(args).number("v")?.round()))
}

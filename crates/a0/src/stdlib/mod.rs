//! The standard library: pure, synchronous functions.
//!
//! Every function takes a single argument record and returns a value or an
//! error; errors surface in the language as `E_FN`. Stdlib functions never
//! block and never invoke tools — effectful work belongs to the tool layer.
//!
//! `map` and `reduce` are deliberately *not* here: they invoke user
//! functions, which this synchronous contract cannot express, so the
//! evaluator intercepts them before stdlib dispatch.

mod basic;
mod collections;
mod json;
mod numeric;
mod paths;
mod records;
mod strings;

use std::fmt;

use ahash::AHashMap;

use crate::value::{Record, Value};

/// Error reported by a stdlib function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FnError {
    pub message: String,
}

impl FnError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for FnError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for FnError {
    fn from(message: &str) -> Self {
        Self {
            message: message.to_owned(),
        }
    }
}

impl fmt::Display for FnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for FnError {}

pub type FnResult = Result<Value, FnError>;

/// A registered stdlib function.
pub type StdlibFnPtr = Box<dyn Fn(&Record) -> FnResult + Send + Sync>;

pub struct StdlibFn {
    pub name: String,
    pub execute: StdlibFnPtr,
}

impl fmt::Debug for StdlibFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdlibFn").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Stdlib lookup by (possibly dotted) name.
#[derive(Debug, Default)]
pub struct StdlibRegistry {
    fns: AHashMap<String, StdlibFn>,
}

impl StdlibRegistry {
    /// An empty registry; useful for testing the evaluator in isolation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The full default function set.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let defaults: &[(&str, fn(&Record) -> FnResult)] = &[
            ("eq", basic::eq),
            ("not", basic::not),
            ("and", basic::and),
            ("or", basic::or),
            ("coalesce", basic::coalesce),
            ("contains", basic::contains),
            ("typeof", basic::type_of),
            ("len", basic::len),
            ("get", basic::get),
            ("put", basic::put),
            ("append", collections::append),
            ("concat", collections::concat),
            ("sort", collections::sort),
            ("filter", collections::filter),
            ("find", collections::find),
            ("range", collections::range),
            ("join", collections::join),
            ("unique", collections::unique),
            ("pluck", collections::pluck),
            ("flat", collections::flat),
            ("reverse", collections::reverse),
            ("slice", collections::slice),
            ("keys", records::keys),
            ("values", records::values),
            ("entries", records::entries),
            ("merge", records::merge),
            ("patch", records::patch),
            ("parse.json", json::parse_json),
            ("math.max", numeric::max),
            ("math.min", numeric::min),
            ("math.sum", numeric::sum),
            ("math.abs", numeric::abs),
            ("math.floor", numeric::floor),
            ("math.ceil", numeric::ceil),
            ("math.round", numeric::round),
            ("str.concat", strings::concat),
            ("str.split", strings::split),
            ("str.starts", strings::starts),
            ("str.ends", strings::ends),
            ("str.replace", strings::replace),
            ("str.lower", strings::lower),
            ("str.upper", strings::upper),
            ("str.trim", strings::trim),
            ("str.template", strings::template),
            ("path.join", paths::join),
            ("path.base", paths::base),
            ("path.dir", paths::dir),
            ("path.ext", paths::ext),
        ];
        for (name, f) in defaults {
            registry.register(name, *f);
        }
        registry
    }

    /// Registers (or replaces) a function under the given name.
    pub fn register(&mut self, name: &str, execute: impl Fn(&Record) -> FnResult + Send + Sync + 'static) {
        self.fns.insert(
            name.to_owned(),
            StdlibFn {
                name: name.to_owned(),
                execute: Box::new(execute),
            },
        );
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&StdlibFn> {
        self.fns.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fns.contains_key(name)
    }
}

/// Typed access to an argument record.
pub(crate) struct Args<'a> {
    record: &'a Record,
}

impl<'a> Args<'a> {
    pub fn new(record: &'a Record) -> Self {
        Self { record }
    }

    pub fn opt(&self, key: &str) -> Option<&'a Value> {
        self.record.get(key)
    }

    pub fn req(&self, key: &str) -> Result<&'a Value, FnError> {
        self.record
            .get(key)
            .ok_or_else(|| FnError::new(format!("missing argument `{key}`")))
    }

    pub fn str(&self, key: &str) -> Result<&'a str, FnError> {
        let value = self.req(key)?;
        value
            .as_str()
            .ok_or_else(|| FnError::new(format!("`{key}` must be a string, got {}", value.kind())))
    }

    pub fn number(&self, key: &str) -> Result<f64, FnError> {
        let value = self.req(key)?;
        value
            .as_number()
            .ok_or_else(|| FnError::new(format!("`{key}` must be a number, got {}", value.kind())))
    }

    pub fn list(&self, key: &str) -> Result<&'a [Value], FnError> {
        let value = self.req(key)?;
        value
            .as_list()
            .ok_or_else(|| FnError::new(format!("`{key}` must be a list, got {}", value.kind())))
    }

    pub fn record(&self, key: &str) -> Result<&'a Record, FnError> {
        let value = self.req(key)?;
        value
            .as_record()
            .ok_or_else(|| FnError::new(format!("`{key}` must be a record, got {}", value.kind())))
    }

    pub fn opt_str(&self, key: &str) -> Result<Option<&'a str>, FnError> {
        match self.opt(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| FnError::new(format!("`{key}` must be a string, got {}", value.kind()))),
        }
    }

    pub fn opt_number(&self, key: &str) -> Result<Option<f64>, FnError> {
        match self.opt(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_number()
                .map(Some)
                .ok_or_else(|| FnError::new(format!("`{key}` must be a number, got {}", value.kind()))),
        }
    }
}

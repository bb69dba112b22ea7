//! The tool contract: host-supplied, capability-gated, possibly-blocking
//! operations.
//!
//! Tools are the only code that may block or touch the outside world; the
//! evaluator stays platform-neutral and can be unit-tested with an empty
//! registry. Each tool declares a mode (`read` for `call?`, `effect` for
//! `do`), a capability id checked against the allowed set at dispatch, and
//! an optional input schema validated before invocation.

use std::fmt;

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::{cancel::CancelToken, value::{Record, Value}};

/// Invocation mode declared by a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ToolMode {
    /// Invocable with `call?` (and with `do`).
    Read,
    /// Invocable only with `do`.
    Effect,
}

/// Value kinds an input schema can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    String,
    Number,
    Bool,
    Record,
    List,
    Any,
}

impl SchemaType {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => matches!(value, Value::String(_)),
            Self::Number => matches!(value, Value::Number(_)),
            Self::Bool => matches!(value, Value::Bool(_)),
            Self::Record => matches!(value, Value::Record(_)),
            Self::List => matches!(value, Value::List(_)),
            Self::Any => true,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Record => "record",
            Self::List => "list",
            Self::Any => "any",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FieldSpec {
    kind: SchemaType,
    required: bool,
}

/// Structural schema for a tool's argument record: field presence, kinds,
/// and optionality. Unknown extra fields are accepted.
#[derive(Debug, Clone, Default)]
pub struct InputSchema {
    fields: IndexMap<String, FieldSpec, ahash::RandomState>,
}

impl InputSchema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn required(mut self, name: impl Into<String>, kind: SchemaType) -> Self {
        self.fields.insert(name.into(), FieldSpec { kind, required: true });
        self
    }

    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, kind: SchemaType) -> Self {
        self.fields.insert(name.into(), FieldSpec { kind, required: false });
        self
    }

    pub fn validate(&self, args: &Record) -> Result<(), String> {
        for (name, spec) in &self.fields {
            match args.get(name) {
                None => {
                    if spec.required {
                        return Err(format!("missing required field `{name}`"));
                    }
                }
                Some(value) => {
                    if !spec.kind.matches(value) {
                        return Err(format!(
                            "field `{name}` must be a {}, got {}",
                            spec.kind.name(),
                            value.kind()
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Error reported by a tool body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolError {
    pub message: String,
}

impl ToolError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for ToolError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for ToolError {
    fn from(message: &str) -> Self {
        Self {
            message: message.to_owned(),
        }
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ToolError {}

/// A tool body. Receives the cancellation token (tools are the only
/// component permitted to block, and must stay idempotent under
/// cancellation) and the evaluated argument record.
pub type ToolFn = Box<dyn Fn(&CancelToken, &Record) -> Result<Value, ToolError> + Send + Sync>;

/// A registered tool.
pub struct ToolDef {
    pub name: String,
    pub mode: ToolMode,
    pub capability_id: String,
    pub input_schema: Option<InputSchema>,
    pub execute: ToolFn,
}

impl ToolDef {
    pub fn new(
        name: impl Into<String>,
        mode: ToolMode,
        capability_id: impl Into<String>,
        execute: impl Fn(&CancelToken, &Record) -> Result<Value, ToolError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            mode,
            capability_id: capability_id.into(),
            input_schema: None,
            execute: Box::new(execute),
        }
    }

    #[must_use]
    pub fn with_schema(mut self, schema: InputSchema) -> Self {
        self.input_schema = Some(schema);
        self
    }
}

impl fmt::Debug for ToolDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDef")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("capability_id", &self.capability_id)
            .field("has_schema", &self.input_schema.is_some())
            .finish_non_exhaustive()
    }
}

/// Tool lookup by dotted name.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: AHashMap<String, ToolDef>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool under its declared name. Re-registering a name
    /// replaces the earlier definition.
    pub fn register(&mut self, tool: ToolDef) {
        self.tools.insert(tool.name.clone(), tool);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDef> {
        self.tools.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

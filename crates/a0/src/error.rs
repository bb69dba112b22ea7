//! Runtime error shape and internal unwinding.

use std::fmt;

use serde::Serialize;

use crate::{
    diag::{ErrorCode, Span},
    evidence::Evidence,
    value::{Record, Value},
};

/// A failure during execution.
///
/// Carries the span of the offending node when known, an optional details
/// record, and the evidence snapshot accumulated before the failure.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Record>,
    pub evidence: Vec<Evidence>,
}

impl RuntimeError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            span: None,
            details: None,
            evidence: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: Record) -> Self {
        self.details = Some(details);
        self
    }

    /// The record bound to a `catch` name: `{code, message, details?}`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut record = Record::new();
        record.set("code", Value::String(self.code.to_string()));
        record.set("message", Value::String(self.message.clone()));
        if let Some(details) = &self.details {
            record.set("details", Value::Record(details.clone()));
        }
        Value::Record(record)
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error[{}]: {}", self.code, self.message)?;
        if let Some(span) = &self.span {
            write!(f, " at {span}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

/// Internal unwinding channel for the evaluator.
///
/// `Error` unwinds to the nearest enclosing `try`; `Cancelled` passes
/// through every `try` and terminates the run.
#[derive(Debug)]
pub(crate) enum Unwind {
    Error(RuntimeError),
    Cancelled(RuntimeError),
}

impl Unwind {
    pub fn into_error(self) -> RuntimeError {
        match self {
            Self::Error(e) | Self::Cancelled(e) => e,
        }
    }
}

impl From<RuntimeError> for Unwind {
    fn from(e: RuntimeError) -> Self {
        Self::Error(e)
    }
}

//! Diagnostics: stable error codes, source spans, and message formatting.
//!
//! Every error surfaced by the pipeline — lexing, parsing, validation, or a
//! runtime failure — carries one of the codes below. The codes are part of
//! the host contract: exit-status mapping and trace tooling key off the
//! exact strings, so the rendered form of each code is fixed here and
//! nowhere else.

use std::{fmt, sync::Arc};

use serde::{Serialize, Serializer, ser::SerializeStruct};

/// A half-open region of source text.
///
/// Lines and columns are 1-based; the end position is exclusive at the
/// token level. The file name is shared across every span of a program, so
/// it is stored behind an `Arc` and cloning a span is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub file: Arc<str>,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    #[must_use]
    pub fn new(file: &Arc<str>, start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            file: Arc::clone(file),
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Joins two spans into the smallest span covering both.
    ///
    /// Both spans must come from the same file; the first span's file wins.
    #[must_use]
    pub fn to(&self, other: &Self) -> Self {
        Self {
            file: Arc::clone(&self.file),
            start_line: self.start_line,
            start_col: self.start_col,
            end_line: other.end_line,
            end_col: other.end_col,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.start_line, self.start_col)
    }
}

impl Serialize for Span {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Span", 5)?;
        s.serialize_field("file", &*self.file)?;
        s.serialize_field("start_line", &self.start_line)?;
        s.serialize_field("start_col", &self.start_col)?;
        s.serialize_field("end_line", &self.end_line)?;
        s.serialize_field("end_col", &self.end_col)?;
        s.end()
    }
}

/// Machine-readable error code.
///
/// Rendered forms (`E_LEX`, `E_PARSE`, ...) are stable; hosts match on them
/// for exit-status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
pub enum ErrorCode {
    /// Unrecognized input; raised by the lexer.
    #[strum(serialize = "E_LEX")]
    Lex,
    /// Syntax error, unexpected token; raised by the parser.
    #[strum(serialize = "E_PARSE")]
    Parse,
    /// Malformed AST: a well-tokenized construct missing required fields
    /// (inline-if without `then`, `for` without `as`, ...).
    #[strum(serialize = "E_AST")]
    Ast,
    /// A function body does not end in a `return` statement.
    #[strum(serialize = "E_NO_RETURN")]
    NoReturn,
    /// A `return` statement is followed by further statements in its block.
    #[strum(serialize = "E_RETURN_NOT_LAST")]
    ReturnNotLast,
    /// A `cap` header key is not a known capability.
    #[strum(serialize = "E_UNKNOWN_CAP")]
    UnknownCap,
    /// A `budget` header key is unknown, or its value is not an integer.
    #[strum(serialize = "E_UNKNOWN_BUDGET")]
    UnknownBudget,
    /// Two `let`/`fn` declarations with the same name in one block.
    #[strum(serialize = "E_DUP_BINDING")]
    DupBinding,
    /// Two `fn` declarations with the same name anywhere in the program.
    #[strum(serialize = "E_FN_DUP")]
    FnDup,
    /// An identifier path references a name not bound in any enclosing scope.
    #[strum(serialize = "E_UNBOUND")]
    Unbound,
    /// `call?` used on a tool whose declared mode is "effect".
    #[strum(serialize = "E_CALL_EFFECT")]
    CallEffect,
    /// A tool is invoked whose capability is not in the `cap` header.
    #[strum(serialize = "E_UNDECLARED_CAP")]
    UndeclaredCap,
    /// The host policy denies a capability the program declares or a tool needs.
    #[strum(serialize = "E_CAP_DENIED")]
    CapDenied,
    /// Tool name not present in the tool registry.
    #[strum(serialize = "E_UNKNOWN_TOOL")]
    UnknownTool,
    /// Function name matches neither a user function nor a stdlib function.
    #[strum(serialize = "E_UNKNOWN_FN")]
    UnknownFn,
    /// Tool arguments rejected by the tool's input schema.
    #[strum(serialize = "E_TOOL_ARGS")]
    ToolArgs,
    /// The tool body itself reported an error.
    #[strum(serialize = "E_TOOL")]
    Tool,
    /// A stdlib function reported an error.
    #[strum(serialize = "E_FN")]
    Fn,
    /// Wrong operand kind, division/modulo by zero, spread of a non-record.
    #[strum(serialize = "E_TYPE")]
    Type,
    /// Dotted access on a non-record, or a missing field.
    #[strum(serialize = "E_PATH")]
    Path,
    /// `for` (or `filter`) applied to a non-list value.
    #[strum(serialize = "E_FOR_NOT_LIST")]
    ForNotList,
    /// `match` applied to a non-record value.
    #[strum(serialize = "E_MATCH_NOT_RECORD")]
    MatchNotRecord,
    /// `match` subject carries neither a handled `ok` nor `err` key.
    #[strum(serialize = "E_MATCH_NO_ARM")]
    MatchNoArm,
    /// One of the four budgets is exhausted.
    #[strum(serialize = "E_BUDGET")]
    Budget,
    /// A fatal failed assertion.
    #[strum(serialize = "E_ASSERT")]
    Assert,
    /// The host fired the cancellation token. Not catchable by `try`.
    #[strum(serialize = "E_CANCELLED")]
    Cancelled,
}

impl ErrorCode {
    /// True for codes produced before execution starts (exit status 2).
    #[must_use]
    pub fn is_static(self) -> bool {
        matches!(
            self,
            Self::Lex
                | Self::Parse
                | Self::Ast
                | Self::NoReturn
                | Self::ReturnNotLast
                | Self::UnknownCap
                | Self::UnknownBudget
                | Self::DupBinding
                | Self::FnDup
                | Self::Unbound
                | Self::CallEffect
                | Self::UndeclaredCap
        )
    }
}

impl ErrorCode {
    /// The host exit-status convention: 2 for pre-execution findings, 3
    /// for a capability denial, 5 for an assertion failure, 4 for every
    /// other runtime error.
    #[must_use]
    pub fn exit_status(self) -> u8 {
        if self.is_static() {
            2
        } else if self == Self::CapDenied {
            3
        } else if self == Self::Assert {
            5
        } else {
            4
        }
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_ref())
    }
}

/// A single pre-execution finding: lex, parse, or validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            span: None,
            hint: None,
        }
    }

    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Multi-line human form:
    ///
    /// ```text
    /// error[E_PARSE]: unexpected token `}`
    ///   --> script.a0:3:14
    ///   hint: expected an expression
    /// ```
    #[must_use]
    pub fn pretty(&self) -> String {
        let mut out = format!("error[{}]: {}", self.code, self.message);
        if let Some(span) = &self.span {
            out.push_str(&format!("\n  --> {span}"));
        }
        if let Some(hint) = &self.hint {
            out.push_str(&format!("\n  hint: {hint}"));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error[{}]: {}", self.code, self.message)?;
        if let Some(span) = &self.span {
            write!(f, " at {span}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        let file: Arc<str> = Arc::from("t.a0");
        Span::new(&file, 2, 5, 2, 9)
    }

    #[test]
    fn code_strings_are_stable() {
        assert_eq!(ErrorCode::Lex.to_string(), "E_LEX");
        assert_eq!(ErrorCode::ReturnNotLast.to_string(), "E_RETURN_NOT_LAST");
        assert_eq!(ErrorCode::CapDenied.as_ref(), "E_CAP_DENIED");
        assert_eq!(ErrorCode::ForNotList.as_ref(), "E_FOR_NOT_LIST");
    }

    #[test]
    fn pretty_renders_span_and_hint() {
        let d = Diagnostic::new(ErrorCode::Parse, "unexpected token `}`")
            .with_span(span())
            .with_hint("expected an expression");
        assert_eq!(
            d.pretty(),
            "error[E_PARSE]: unexpected token `}`\n  --> t.a0:2:5\n  hint: expected an expression"
        );
    }

    #[test]
    fn static_codes_cover_validator_set() {
        assert!(ErrorCode::Unbound.is_static());
        assert!(ErrorCode::UndeclaredCap.is_static());
        assert!(!ErrorCode::CapDenied.is_static());
        assert!(!ErrorCode::Budget.is_static());
    }
}

#![doc = include_str!("../../../README.md")]

pub mod ast;
mod budget;
mod cancel;
pub mod capability;
mod diag;
mod env;
mod error;
mod eval;
mod evidence;
mod lex;
mod parse;
mod run;
mod stdlib;
mod token;
mod tools;
pub mod tracer;
mod validate;
mod value;

pub use crate::{
    budget::{Budget, BudgetError, BudgetTracker},
    cancel::CancelToken,
    diag::{Diagnostic, ErrorCode, Span},
    error::RuntimeError,
    evidence::{Evidence, EvidenceKind},
    lex::lex,
    parse::parse,
    run::{ExecOptions, Outcome, Runner, compile},
    stdlib::{FnError, FnResult, StdlibFn, StdlibFnPtr, StdlibRegistry},
    token::{Keyword, Token, TokenKind},
    tools::{InputSchema, SchemaType, ToolDef, ToolError, ToolFn, ToolMode, ToolRegistry},
    validate::validate,
    value::{Record, Value},
};

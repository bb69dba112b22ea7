//! Public interface for compiling and running A0 programs.

use crate::{
    ast::Program,
    budget::Budget,
    cancel::CancelToken,
    capability::CapabilitySet,
    diag::Diagnostic,
    error::RuntimeError,
    eval::{self, EvalRequest},
    evidence::Evidence,
    lex::lex,
    parse::parse,
    stdlib::StdlibRegistry,
    tools::ToolRegistry,
    tracer::TraceSink,
    validate::validate,
    value::Value,
};

/// Lexes, parses, and validates a source file.
///
/// The tool registry feeds the validator's static tool checks; pass an
/// empty registry when tools are resolved later. Returns the complete
/// diagnostic list on any failure — execution must not proceed unless the
/// list is empty.
pub fn compile(source: &str, file: &str, tools: &ToolRegistry) -> Result<Program, Vec<Diagnostic>> {
    let tokens = lex(source, file).map_err(|d| vec![d])?;
    let program = parse(tokens).map_err(|d| vec![d])?;
    let diags = validate(&program, tools);
    if diags.is_empty() { Ok(program) } else { Err(diags) }
}

/// Host-supplied execution options.
pub struct ExecOptions<'a> {
    pub tools: &'a ToolRegistry,
    pub stdlib: &'a StdlibRegistry,
    /// Allowed capability set; defaults to allow-all for embedding hosts
    /// that do their own gating.
    pub caps: CapabilitySet,
    pub trace: Option<&'a mut dyn TraceSink>,
    /// Correlates trace events of one execution; generated when absent.
    pub run_id: Option<String>,
    /// Optional host ceiling clamped over the program's `budget` header.
    pub budget_ceiling: Option<Budget>,
}

impl<'a> ExecOptions<'a> {
    #[must_use]
    pub fn new(tools: &'a ToolRegistry, stdlib: &'a StdlibRegistry) -> Self {
        Self {
            tools,
            stdlib,
            caps: CapabilitySet::unrestricted(),
            trace: None,
            run_id: None,
            budget_ceiling: None,
        }
    }

    #[must_use]
    pub fn with_caps(mut self, caps: CapabilitySet) -> Self {
        self.caps = caps;
        self
    }

    #[must_use]
    pub fn with_trace(mut self, sink: &'a mut dyn TraceSink) -> Self {
        self.trace = Some(sink);
        self
    }

    #[must_use]
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    #[must_use]
    pub fn with_budget_ceiling(mut self, ceiling: Budget) -> Self {
        self.budget_ceiling = Some(ceiling);
        self
    }
}

/// A successful run: the result value and the evidence log.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Outcome {
    pub value: Value,
    pub evidence: Vec<Evidence>,
}

impl Outcome {
    /// True when any `check` (or `assert`) recorded a failing entry; hosts
    /// map this to exit status 5 even though a value was produced.
    #[must_use]
    pub fn has_failed_checks(&self) -> bool {
        self.evidence.iter().any(|e| !e.ok)
    }

    /// The host exit-status convention for a produced value.
    #[must_use]
    pub fn exit_status(&self) -> u8 {
        if self.has_failed_checks() { 5 } else { 0 }
    }
}

/// A compiled program, ready to execute any number of times.
///
/// # Example
/// ```
/// use a0::{CancelToken, ExecOptions, Runner, StdlibRegistry, ToolRegistry, Value};
///
/// let tools = ToolRegistry::new();
/// let stdlib = StdlibRegistry::with_defaults();
/// let runner = Runner::new("return 2 + 3 * 4", "demo.a0", &tools).unwrap();
/// let outcome = runner
///     .execute(ExecOptions::new(&tools, &stdlib), &CancelToken::new())
///     .unwrap();
/// assert_eq!(outcome.value, Value::Number(14.0));
/// ```
#[derive(Debug, Clone)]
pub struct Runner {
    program: Program,
}

impl Runner {
    /// Compiles source text; any lex/parse/validation finding fails the
    /// construction with the full diagnostic list.
    pub fn new(source: &str, file: &str, tools: &ToolRegistry) -> Result<Self, Vec<Diagnostic>> {
        compile(source, file, tools).map(|program| Self { program })
    }

    /// Wraps an already-validated program.
    #[must_use]
    pub fn from_program(program: Program) -> Self {
        Self { program }
    }

    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Executes the program under the given options.
    ///
    /// On failure the error carries the span of the offending node and the
    /// evidence snapshot accumulated before the halt.
    pub fn execute(&self, opts: ExecOptions<'_>, cancel: &CancelToken) -> Result<Outcome, RuntimeError> {
        let run_id = opts
            .run_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let (value, evidence) = eval::execute(
            &self.program,
            EvalRequest {
                tools: opts.tools,
                stdlib: opts.stdlib,
                caps: &opts.caps,
                sink: opts.trace,
                run_id: &run_id,
                cancel,
                budget_ceiling: opts.budget_ceiling,
            },
        )?;
        Ok(Outcome { value, evidence })
    }
}

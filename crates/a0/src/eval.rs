//! The tree-walking evaluator.
//!
//! Owns the execution context: the scope chain, the user-function table,
//! the accumulated evidence, the budget tracker, and the trace sink.
//! Execution is single-threaded and cooperative; suspension happens only
//! inside tool bodies, and the cancellation token plus wall-clock budget
//! are checked at documented checkpoints — before each statement, before
//! each iteration of an iteration construct, and after each tool call.
//! There are no extra checks inside hot expression paths, which keeps the
//! pure fragment deterministic.

use std::{rc::Rc, time::Instant};

use ahash::AHashMap;
use serde_json::json;

use crate::{
    ast::{CallMode, Expr, ExprKind, Header, IdentPath, Program, RecordEntry, Stmt, StmtKind, BinOp, UnOp},
    budget::{Budget, BudgetError, BudgetTracker},
    cancel::CancelToken,
    capability::CapabilitySet,
    diag::{ErrorCode, Span},
    env::Scope,
    error::{RuntimeError, Unwind},
    evidence::{Evidence, EvidenceKind},
    stdlib::StdlibRegistry,
    tools::{ToolMode, ToolRegistry},
    tracer::{TraceEvent, TraceEventKind, TraceSink},
    value::{Record, Value},
};

/// Everything the evaluator needs from the host for one run.
pub(crate) struct EvalRequest<'h, 't> {
    pub tools: &'h ToolRegistry,
    pub stdlib: &'h StdlibRegistry,
    pub caps: &'h CapabilitySet,
    pub sink: Option<&'t mut dyn TraceSink>,
    pub run_id: &'h str,
    pub cancel: &'h CancelToken,
    pub budget_ceiling: Option<Budget>,
}

/// Runs a validated program to completion.
///
/// On success returns the result value with the evidence log; on failure
/// the error carries the evidence snapshot accumulated before the halt.
pub(crate) fn execute<'p, 'h, 't>(program: &'p Program, req: EvalRequest<'h, 't>) -> Result<(Value, Vec<Evidence>), RuntimeError> {
    // Budget header first: defaults are all zero (no limit).
    let mut declared = Budget::default();
    for header in &program.headers {
        if let Header::Budget { entries, .. } = header {
            for entry in entries {
                if let RecordEntry::Field { key, value, .. } = entry
                    && let ExprKind::Int(n) = value.kind
                {
                    declared.set(key, u64::try_from(n).unwrap_or(0));
                }
            }
        }
    }
    let limits = match &req.budget_ceiling {
        Some(ceiling) => declared.clamped_by(ceiling),
        None => declared,
    };

    // Capability header next: a declared-but-denied capability refuses the
    // run before any statement executes and before run_start is emitted.
    for header in &program.headers {
        if let Header::Cap { entries, .. } = header {
            for entry in entries {
                if let RecordEntry::Field { key, key_span, value } = entry
                    && matches!(value.kind, ExprKind::Bool(true))
                    && let Err(denied) = req.caps.check(key)
                {
                    return Err(
                        RuntimeError::new(ErrorCode::CapDenied, denied.to_string()).with_span(key_span.clone()),
                    );
                }
            }
        }
    }

    let mut ev = Evaluator {
        tools: req.tools,
        stdlib: req.stdlib,
        caps: req.caps,
        sink: req.sink,
        run_id: req.run_id,
        cancel: req.cancel,
        budget: BudgetTracker::new(limits),
        evidence: Vec::new(),
        functions: AHashMap::new(),
    };

    ev.emit(TraceEventKind::RunStart, None, None);
    let result = ev.run_program(program);
    let elapsed_ms = ev.budget.elapsed_ms();
    match result {
        Ok(value) => {
            ev.emit(TraceEventKind::RunEnd, None, Some(json!({ "elapsed_ms": elapsed_ms })));
            Ok((value, ev.evidence))
        }
        Err(unwind) => {
            let mut error = unwind.into_error();
            ev.emit(
                TraceEventKind::Error,
                error.span.as_ref(),
                Some(json!({ "code": error.code.as_ref(), "message": error.message })),
            );
            ev.emit(TraceEventKind::RunEnd, None, Some(json!({ "elapsed_ms": elapsed_ms })));
            error.evidence = std::mem::take(&mut ev.evidence);
            Err(error)
        }
    }
}

/// How a statement block finished.
enum BlockExit {
    /// A terminal `return` produced this value.
    Return(Value),
    /// Fell off the end; carries the last expression-statement value.
    Fell(Option<Value>),
}

/// A block used as an expression body yields its `return` value, or Null.
fn block_value(exit: BlockExit) -> Value {
    match exit {
        BlockExit::Return(value) => value,
        BlockExit::Fell(_) => Value::Null,
    }
}

fn rt(code: ErrorCode, message: impl Into<String>, span: &Span) -> Unwind {
    Unwind::Error(RuntimeError::new(code, message).with_span(span.clone()))
}

#[derive(Clone)]
struct UserFn<'p> {
    params: &'p [String],
    body: &'p [Stmt],
    closure: Rc<Scope>,
}

struct Evaluator<'p, 'h, 't> {
    tools: &'h ToolRegistry,
    stdlib: &'h StdlibRegistry,
    caps: &'h CapabilitySet,
    sink: Option<&'t mut dyn TraceSink>,
    run_id: &'h str,
    cancel: &'h CancelToken,
    budget: BudgetTracker,
    evidence: Vec<Evidence>,
    functions: AHashMap<String, UserFn<'p>>,
}

impl<'p, 'h, 't> Evaluator<'p, 'h, 't> {
    fn run_program(&mut self, program: &'p Program) -> Result<Value, Unwind> {
        let top = Scope::root();
        // Top-level functions are registered up front with the top-level
        // scope as their closure, so calls may precede declarations.
        for stmt in &program.stmts {
            if let StmtKind::FnDecl { name, params, body, .. } = &stmt.kind {
                self.functions.insert(
                    name.clone(),
                    UserFn {
                        params,
                        body,
                        closure: Rc::clone(&top),
                    },
                );
            }
        }
        match self.exec_block(&program.stmts, &top)? {
            BlockExit::Return(value) => Ok(value),
            BlockExit::Fell(last) => Ok(last.unwrap_or(Value::Null)),
        }
    }

    // === plumbing ===

    fn emit(&mut self, kind: TraceEventKind, span: Option<&Span>, data: Option<serde_json::Value>) {
        let Some(sink) = self.sink.as_mut() else { return };
        let event = TraceEvent {
            ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            run_id: self.run_id.to_owned(),
            kind,
            span: span.cloned(),
            data,
        };
        sink.emit(&event);
    }

    fn budget_err(&self, err: &BudgetError, span: &Span) -> Unwind {
        Unwind::Error(RuntimeError::new(ErrorCode::Budget, err.to_string()).with_span(span.clone()))
    }

    /// Cancellation and wall-clock check.
    fn checkpoint(&mut self, span: &Span) -> Result<(), Unwind> {
        if self.cancel.is_cancelled() {
            return Err(Unwind::Cancelled(
                RuntimeError::new(ErrorCode::Cancelled, "execution cancelled by host").with_span(span.clone()),
            ));
        }
        self.budget.check_time().map_err(|e| self.budget_err(&e, span))
    }

    /// Checkpoint plus one tick of the shared iteration budget.
    fn iter_checkpoint(&mut self, span: &Span) -> Result<(), Unwind> {
        self.checkpoint(span)?;
        self.budget.on_iteration().map_err(|e| self.budget_err(&e, span))
    }

    // === statements ===

    fn exec_block(&mut self, stmts: &'p [Stmt], env: &Rc<Scope>) -> Result<BlockExit, Unwind> {
        let mut last = None;
        for stmt in stmts {
            self.checkpoint(&stmt.span)?;
            match &stmt.kind {
                StmtKind::Let { name, value, .. } => {
                    let v = self.expr(value, env)?;
                    env.bind(name.clone(), v);
                }
                StmtKind::FnDecl { name, params, body, .. } => {
                    self.functions.insert(
                        name.clone(),
                        UserFn {
                            params,
                            body,
                            closure: Rc::clone(env),
                        },
                    );
                }
                StmtKind::Return { value } => {
                    let v = self.expr(value, env)?;
                    return Ok(BlockExit::Return(v));
                }
                StmtKind::Expr { expr, target } => {
                    let v = self.expr(expr, env)?;
                    if let Some(path) = target {
                        env.bind(path.head().name.clone(), wrap_target(path, v.clone()));
                    }
                    last = Some(v);
                }
            }
        }
        Ok(BlockExit::Fell(last))
    }

    // === expressions ===

    fn expr(&mut self, expr: &'p Expr, env: &Rc<Scope>) -> Result<Value, Unwind> {
        match &expr.kind {
            ExprKind::Int(n) => Ok(Value::Number(*n as f64)),
            ExprKind::Float(n) => Ok(Value::Number(*n)),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Str(s) => Ok(Value::String(s.clone())),
            ExprKind::Null => Ok(Value::Null),
            ExprKind::Path(path) => self.eval_path(path, env),
            ExprKind::Record(entries) => Ok(Value::Record(self.build_record(entries, env)?)),
            ExprKind::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.expr(item, env)?);
                }
                Ok(Value::List(out))
            }
            ExprKind::Binary { op, lhs, rhs } => self.eval_binary(expr, *op, lhs, rhs, env),
            ExprKind::Unary { op: UnOp::Neg, expr: inner } => {
                let v = self.expr(inner, env)?;
                match v {
                    Value::Number(n) => Ok(Value::Number(-n)),
                    other => Err(rt(
                        ErrorCode::Type,
                        format!("cannot negate {}", other.kind()),
                        &expr.span,
                    )),
                }
            }
            ExprKind::IfInline { cond, then, els } => {
                let c = self.expr(cond, env)?;
                if c.truthy() { self.expr(then, env) } else { self.expr(els, env) }
            }
            ExprKind::IfBlock {
                cond,
                then_body,
                else_body,
            } => {
                let c = self.expr(cond, env)?;
                let body = if c.truthy() {
                    Some(then_body.as_slice())
                } else {
                    else_body.as_deref()
                };
                match body {
                    Some(stmts) => {
                        let child = Scope::child(env);
                        Ok(block_value(self.exec_block(stmts, &child)?))
                    }
                    None => Ok(Value::Null),
                }
            }
            ExprKind::For { list, bind, body } => self.eval_for(expr, list, bind, body, env),
            ExprKind::FilterBlock { list, bind, body } => self.eval_filter(expr, list, bind, body, env),
            ExprKind::Loop {
                init,
                times,
                bind,
                body,
            } => self.eval_loop(expr, init, times, bind, body, env),
            ExprKind::Match {
                subject,
                ok_arm,
                err_arm,
            } => {
                let record = match self.expr(subject, env)? {
                    Value::Record(record) => record,
                    other => {
                        return Err(rt(
                            ErrorCode::MatchNotRecord,
                            format!("`match` expects a record, got {}", other.kind()),
                            &expr.span,
                        ));
                    }
                };
                self.emit(TraceEventKind::MatchStart, Some(&expr.span), None);
                let chosen = if let (Some(arm), Some(v)) = (ok_arm.as_ref(), record.get("ok")) {
                    Some((arm, v.clone()))
                } else if let (Some(arm), Some(v)) = (err_arm.as_ref(), record.get("err")) {
                    Some((arm, v.clone()))
                } else {
                    None
                };
                let Some((arm, value)) = chosen else {
                    return Err(rt(
                        ErrorCode::MatchNoArm,
                        "`match` subject has no `ok` or `err` key with a matching arm",
                        &expr.span,
                    ));
                };
                let child = Scope::child(env);
                child.bind(arm.bind.clone(), value);
                let result = block_value(self.exec_block(&arm.body, &child)?);
                self.emit(TraceEventKind::MatchEnd, Some(&expr.span), None);
                Ok(result)
            }
            ExprKind::Try {
                body,
                bind,
                catch_body,
                ..
            } => {
                self.emit(TraceEventKind::TryStart, Some(&expr.span), None);
                let child = Scope::child(env);
                let value = match self.exec_block(body, &child) {
                    Ok(exit) => block_value(exit),
                    // Cancellation passes through try/catch untouched.
                    Err(Unwind::Cancelled(e)) => return Err(Unwind::Cancelled(e)),
                    Err(Unwind::Error(error)) => {
                        let catch_env = Scope::child(env);
                        catch_env.bind(bind.clone(), error.to_value());
                        block_value(self.exec_block(catch_body, &catch_env)?)
                    }
                };
                self.emit(TraceEventKind::TryEnd, Some(&expr.span), None);
                Ok(value)
            }
            ExprKind::FnCall { name, name_span, args } => match name.as_str() {
                "map" => self.eval_map(expr, args, env),
                "reduce" => self.eval_reduce(expr, args, env),
                _ => {
                    if self.functions.contains_key(name) {
                        self.eval_user_call(name, args, env, &expr.span)
                    } else if self.stdlib.contains(name) {
                        self.eval_stdlib_call(name, args, env, &expr.span)
                    } else {
                        Err(rt(ErrorCode::UnknownFn, format!("unknown function `{name}`"), name_span))
                    }
                }
            },
            ExprKind::ToolCall {
                mode,
                tool,
                tool_span,
                args,
            } => self.eval_tool(expr, *mode, tool, tool_span, args, env),
            ExprKind::Assert { args } => self.eval_evidence(expr, EvidenceKind::Assert, args, env),
            ExprKind::Check { args } => self.eval_evidence(expr, EvidenceKind::Check, args, env),
        }
    }

    fn eval_path(&mut self, path: &IdentPath, env: &Rc<Scope>) -> Result<Value, Unwind> {
        let head = path.head();
        let mut value = env
            .lookup(&head.name)
            .ok_or_else(|| rt(ErrorCode::Unbound, format!("`{}` is not defined", head.name), &head.span))?;
        for seg in &path.segments[1..] {
            match value {
                Value::Record(record) => {
                    value = record.get(&seg.name).cloned().ok_or_else(|| {
                        rt(ErrorCode::Path, format!("record has no field `{}`", seg.name), &seg.span)
                    })?;
                }
                other => {
                    return Err(rt(
                        ErrorCode::Path,
                        format!("cannot access field `{}` on {}", seg.name, other.kind()),
                        &seg.span,
                    ));
                }
            }
        }
        Ok(value)
    }

    /// Evaluates record entries left-to-right: field pairs overwrite
    /// earlier keys in place, spreads copy a record's entries in order.
    fn build_record(&mut self, entries: &'p [RecordEntry], env: &Rc<Scope>) -> Result<Record, Unwind> {
        let mut record = Record::new();
        for entry in entries {
            match entry {
                RecordEntry::Field { key, value, .. } => {
                    let v = self.expr(value, env)?;
                    record.set(key.clone(), v);
                }
                RecordEntry::Spread { value, span } => {
                    let v = self.expr(value, env)?;
                    match v {
                        Value::Record(spread) => {
                            for (k, v) in spread {
                                record.set(k, v);
                            }
                        }
                        other => {
                            return Err(rt(ErrorCode::Type, format!("cannot spread {}", other.kind()), span));
                        }
                    }
                }
            }
        }
        Ok(record)
    }

    fn eval_binary(
        &mut self,
        expr: &'p Expr,
        op: BinOp,
        lhs: &'p Expr,
        rhs: &'p Expr,
        env: &Rc<Scope>,
    ) -> Result<Value, Unwind> {
        let l = self.expr(lhs, env)?;
        let r = self.expr(rhs, env)?;
        let type_err = |msg: String| rt(ErrorCode::Type, msg, &expr.span);
        match op {
            BinOp::Add => match (l, r) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                (a, b) => Err(type_err(format!("cannot add {} and {}", a.kind(), b.kind()))),
            },
            BinOp::Sub => match (l, r) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
                (a, b) => Err(type_err(format!("cannot subtract {} and {}", a.kind(), b.kind()))),
            },
            BinOp::Mul => match (l, r) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
                (a, b) => Err(type_err(format!("cannot multiply {} and {}", a.kind(), b.kind()))),
            },
            BinOp::Div => match (l, r) {
                (Value::Number(_), Value::Number(b)) if b == 0.0 => Err(type_err("division by zero".to_owned())),
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
                (a, b) => Err(type_err(format!("cannot divide {} and {}", a.kind(), b.kind()))),
            },
            BinOp::Mod => match (l, r) {
                (Value::Number(_), Value::Number(b)) if b == 0.0 => Err(type_err("modulo by zero".to_owned())),
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a % b)),
                (a, b) => Err(type_err(format!("cannot take modulo of {} and {}", a.kind(), b.kind()))),
            },
            BinOp::Eq => Ok(Value::Bool(l.deep_eq(&r))),
            BinOp::Ne => Ok(Value::Bool(!l.deep_eq(&r))),
            BinOp::Gt | BinOp::Lt | BinOp::Ge | BinOp::Le => {
                let ordering = match (&l, &r) {
                    (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                    (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                    (a, b) => {
                        return Err(type_err(format!("cannot compare {} and {}", a.kind(), b.kind())));
                    }
                };
                let holds = ordering.is_some_and(|ord| match op {
                    BinOp::Gt => ord.is_gt(),
                    BinOp::Lt => ord.is_lt(),
                    BinOp::Ge => ord.is_ge(),
                    BinOp::Le => ord.is_le(),
                    _ => unreachable!(),
                });
                Ok(Value::Bool(holds))
            }
        }
    }

    fn eval_for(
        &mut self,
        expr: &'p Expr,
        list: &'p Expr,
        bind: &'p str,
        body: &'p [Stmt],
        env: &Rc<Scope>,
    ) -> Result<Value, Unwind> {
        let items = match self.expr(list, env)? {
            Value::List(items) => items,
            other => {
                return Err(rt(
                    ErrorCode::ForNotList,
                    format!("`for` expects a list, got {}", other.kind()),
                    &list.span,
                ));
            }
        };
        self.emit(TraceEventKind::ForStart, Some(&expr.span), Some(json!({ "count": items.len() })));
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            self.iter_checkpoint(&expr.span)?;
            let child = Scope::child(env);
            child.bind(bind.to_owned(), item);
            out.push(block_value(self.exec_block(body, &child)?));
        }
        self.emit(TraceEventKind::ForEnd, Some(&expr.span), Some(json!({ "count": out.len() })));
        Ok(Value::List(out))
    }

    fn eval_filter(
        &mut self,
        expr: &'p Expr,
        list: &'p Expr,
        bind: &'p str,
        body: &'p [Stmt],
        env: &Rc<Scope>,
    ) -> Result<Value, Unwind> {
        let items = match self.expr(list, env)? {
            Value::List(items) => items,
            other => {
                return Err(rt(
                    ErrorCode::ForNotList,
                    format!("`filter` expects a list, got {}", other.kind()),
                    &list.span,
                ));
            }
        };
        self.emit(
            TraceEventKind::FilterStart,
            Some(&expr.span),
            Some(json!({ "count": items.len() })),
        );
        let mut kept = Vec::new();
        for item in items {
            self.iter_checkpoint(&expr.span)?;
            let child = Scope::child(env);
            child.bind(bind.to_owned(), item.clone());
            let verdict = block_value(self.exec_block(body, &child)?);
            // A record-valued predicate is judged by its first field, which
            // keeps `{ ok: ... }`-wrapper programs working.
            let keep = match &verdict {
                Value::Record(record) if !record.is_empty() => {
                    record.first().is_some_and(|(_, v)| v.truthy())
                }
                other => other.truthy(),
            };
            if keep {
                kept.push(item);
            }
        }
        self.emit(
            TraceEventKind::FilterEnd,
            Some(&expr.span),
            Some(json!({ "kept": kept.len() })),
        );
        Ok(Value::List(kept))
    }

    fn eval_loop(
        &mut self,
        expr: &'p Expr,
        init: &'p Expr,
        times: &'p Expr,
        bind: &'p str,
        body: &'p [Stmt],
        env: &Rc<Scope>,
    ) -> Result<Value, Unwind> {
        let mut acc = self.expr(init, env)?;
        let times_value = self.expr(times, env)?;
        let Some(n) = times_value.as_number() else {
            return Err(rt(
                ErrorCode::Type,
                format!("`times` must be a number, got {}", times_value.kind()),
                &times.span,
            ));
        };
        if n < 0.0 || n.fract() != 0.0 || !n.is_finite() {
            return Err(rt(
                ErrorCode::Type,
                "`times` must be a non-negative integer",
                &times.span,
            ));
        }
        let n = n as u64;
        self.emit(TraceEventKind::LoopStart, Some(&expr.span), Some(json!({ "times": n })));
        for _ in 0..n {
            self.iter_checkpoint(&expr.span)?;
            let child = Scope::child(env);
            child.bind(bind.to_owned(), acc.clone());
            acc = block_value(self.exec_block(body, &child)?);
        }
        self.emit(TraceEventKind::LoopEnd, Some(&expr.span), None);
        Ok(acc)
    }

    // === calls ===

    /// `map { in, fn }` — intercepted ahead of stdlib dispatch because it
    /// invokes a user function.
    fn eval_map(&mut self, expr: &'p Expr, args: &'p [RecordEntry], env: &Rc<Scope>) -> Result<Value, Unwind> {
        let args = self.build_record(args, env)?;
        let (items, fn_name) = iteration_args(&args, "map", &expr.span)?;
        let func = self
            .functions
            .get(&fn_name)
            .cloned()
            .ok_or_else(|| rt(ErrorCode::UnknownFn, format!("unknown function `{fn_name}`"), &expr.span))?;
        self.emit(
            TraceEventKind::MapStart,
            Some(&expr.span),
            Some(json!({ "fn": fn_name, "count": items.len() })),
        );
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            self.iter_checkpoint(&expr.span)?;
            let child = Scope::child(&func.closure);
            bind_map_element(&func, item, &child, &expr.span)?;
            out.push(block_value(self.exec_block(func.body, &child)?));
        }
        self.emit(TraceEventKind::MapEnd, Some(&expr.span), Some(json!({ "fn": fn_name })));
        Ok(Value::List(out))
    }

    /// `reduce { in, init, fn }` — the function must take exactly two
    /// parameters, `(accumulator, element)`.
    fn eval_reduce(&mut self, expr: &'p Expr, args: &'p [RecordEntry], env: &Rc<Scope>) -> Result<Value, Unwind> {
        let args = self.build_record(args, env)?;
        let (items, fn_name) = iteration_args(&args, "reduce", &expr.span)?;
        let init = args
            .get("init")
            .cloned()
            .ok_or_else(|| rt(ErrorCode::Type, "`reduce` requires field `init`", &expr.span))?;
        let func = self
            .functions
            .get(&fn_name)
            .cloned()
            .ok_or_else(|| rt(ErrorCode::UnknownFn, format!("unknown function `{fn_name}`"), &expr.span))?;
        if func.params.len() != 2 {
            return Err(rt(
                ErrorCode::Type,
                format!("`reduce` function `{fn_name}` must take exactly two parameters"),
                &expr.span,
            ));
        }
        self.emit(
            TraceEventKind::ReduceStart,
            Some(&expr.span),
            Some(json!({ "fn": fn_name, "count": items.len() })),
        );
        let mut acc = init;
        for item in items {
            self.iter_checkpoint(&expr.span)?;
            let child = Scope::child(&func.closure);
            child.bind(func.params[0].clone(), acc.clone());
            child.bind(func.params[1].clone(), item);
            acc = block_value(self.exec_block(func.body, &child)?);
        }
        self.emit(TraceEventKind::ReduceEnd, Some(&expr.span), Some(json!({ "fn": fn_name })));
        Ok(acc)
    }

    fn eval_user_call(
        &mut self,
        name: &str,
        args: &'p [RecordEntry],
        env: &Rc<Scope>,
        span: &Span,
    ) -> Result<Value, Unwind> {
        self.emit(TraceEventKind::FnCallStart, Some(span), Some(json!({ "fn": name })));
        let args = self.build_record(args, env)?;
        let func = self
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| rt(ErrorCode::UnknownFn, format!("unknown function `{name}`"), span))?;
        let child = Scope::child(&func.closure);
        // Parameters bind from same-named argument fields; missing fields
        // default to null, extra fields are ignored.
        for param in func.params {
            child.bind(param.clone(), args.get(param).cloned().unwrap_or(Value::Null));
        }
        let value = block_value(self.exec_block(func.body, &child)?);
        self.emit(TraceEventKind::FnCallEnd, Some(span), Some(json!({ "fn": name })));
        Ok(value)
    }

    fn eval_stdlib_call(
        &mut self,
        name: &str,
        args: &'p [RecordEntry],
        env: &Rc<Scope>,
        span: &Span,
    ) -> Result<Value, Unwind> {
        let args = self.build_record(args, env)?;
        let stdlib = self.stdlib;
        let func = stdlib
            .get(name)
            .ok_or_else(|| rt(ErrorCode::UnknownFn, format!("unknown function `{name}`"), span))?;
        let value =
            (func.execute)(&args).map_err(|e| rt(ErrorCode::Fn, format!("{name}: {}", e.message), span))?;
        self.budget.check_time().map_err(|e| self.budget_err(&e, span))?;
        Ok(value)
    }

    fn eval_tool(
        &mut self,
        expr: &'p Expr,
        mode: CallMode,
        tool: &str,
        tool_span: &Span,
        args: &'p [RecordEntry],
        env: &Rc<Scope>,
    ) -> Result<Value, Unwind> {
        let tools = self.tools;
        let Some(def) = tools.get(tool) else {
            return Err(rt(ErrorCode::UnknownTool, format!("unknown tool `{tool}`"), tool_span));
        };
        if mode == CallMode::Read && def.mode == ToolMode::Effect {
            return Err(rt(
                ErrorCode::CallEffect,
                format!("tool `{tool}` has effect mode and requires `do`"),
                tool_span,
            ));
        }
        if let Err(denied) = self.caps.check(&def.capability_id) {
            return Err(rt(ErrorCode::CapDenied, denied.to_string(), tool_span));
        }
        let args = self.build_record(args, env)?;
        if let Some(schema) = &def.input_schema
            && let Err(message) = schema.validate(&args)
        {
            return Err(rt(
                ErrorCode::ToolArgs,
                format!("invalid arguments for `{tool}`: {message}"),
                &expr.span,
            ));
        }
        self.budget.on_tool_call().map_err(|e| self.budget_err(&e, &expr.span))?;
        self.emit(
            TraceEventKind::ToolStart,
            Some(&expr.span),
            Some(json!({ "tool": tool, "mode": def.mode.as_ref() })),
        );
        let started = Instant::now();
        let result = (def.execute)(self.cancel, &args);
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match result {
            Err(error) => {
                self.emit(
                    TraceEventKind::ToolEnd,
                    Some(&expr.span),
                    Some(json!({ "tool": tool, "outcome": "err", "elapsed_ms": elapsed_ms })),
                );
                Err(rt(ErrorCode::Tool, error.message, &expr.span))
            }
            Ok(value) => {
                self.emit(
                    TraceEventKind::ToolEnd,
                    Some(&expr.span),
                    Some(json!({ "tool": tool, "outcome": "ok", "elapsed_ms": elapsed_ms })),
                );
                // A record result with a numeric `bytes` field counts
                // against the bytes-written budget.
                if let Value::Record(record) = &value
                    && let Some(Value::Number(bytes)) = record.get("bytes")
                {
                    let bytes = if bytes.is_finite() && *bytes > 0.0 { *bytes as u64 } else { 0 };
                    self.budget.on_bytes(bytes).map_err(|e| self.budget_err(&e, &expr.span))?;
                }
                self.checkpoint(&expr.span)?;
                Ok(value)
            }
        }
    }

    fn eval_evidence(
        &mut self,
        expr: &'p Expr,
        kind: EvidenceKind,
        args: &'p [RecordEntry],
        env: &Rc<Scope>,
    ) -> Result<Value, Unwind> {
        let args = self.build_record(args, env)?;
        let that = args.get("that").cloned().unwrap_or(Value::Null);
        let msg = args.get("msg").map(Value::stringify).unwrap_or_default();
        let details = args.get("details").cloned();
        let ok = that.truthy();
        let entry = Evidence {
            kind,
            ok,
            msg: msg.clone(),
            details,
            span: expr.span.clone(),
        };
        let value = entry.to_value();
        self.emit(
            TraceEventKind::Evidence,
            Some(&expr.span),
            Some(json!({ "kind": kind.as_ref(), "ok": ok, "msg": msg })),
        );
        self.evidence.push(entry);
        if kind == EvidenceKind::Assert && !ok {
            return Err(rt(ErrorCode::Assert, format!("assertion failed: {msg}"), &expr.span));
        }
        Ok(value)
    }
}

/// Pulls `in` (a list) and `fn` (a function-name string) out of a
/// `map`/`reduce` argument record.
fn iteration_args(args: &Record, form: &str, span: &Span) -> Result<(Vec<Value>, String), Unwind> {
    let items = match args.get("in") {
        Some(Value::List(items)) => items.clone(),
        Some(other) => {
            return Err(rt(
                ErrorCode::Type,
                format!("`{form}` expects a list in `in`, got {}", other.kind()),
                span,
            ));
        }
        None => return Err(rt(ErrorCode::Type, format!("`{form}` requires field `in`"), span)),
    };
    let fn_name = match args.get("fn") {
        Some(Value::String(name)) => name.clone(),
        Some(other) => {
            return Err(rt(
                ErrorCode::Type,
                format!("`{form}` field `fn` must be a function name string, got {}", other.kind()),
                span,
            ));
        }
        None => return Err(rt(ErrorCode::Type, format!("`{form}` requires field `fn`"), span)),
    };
    Ok((items, fn_name))
}

/// Binds one mapped element: a single parameter takes the element itself;
/// multiple parameters destructure a record element by field name, with
/// missing fields bound to null.
fn bind_map_element(func: &UserFn<'_>, item: Value, child: &Rc<Scope>, span: &Span) -> Result<(), Unwind> {
    match func.params {
        [] => Ok(()),
        [single] => {
            child.bind(single.clone(), item);
            Ok(())
        }
        params => match item {
            Value::Record(record) => {
                for param in params {
                    child.bind(param.clone(), record.get(param).cloned().unwrap_or(Value::Null));
                }
                Ok(())
            }
            other => Err(rt(
                ErrorCode::Type,
                format!("cannot destructure {} across {} parameters", other.kind(), params.len()),
                span,
            )),
        },
    }
}

/// Realizes an arrow-target binding: `v -> a.b.c` binds `a = {b: {c: v}}`.
fn wrap_target(path: &IdentPath, value: Value) -> Value {
    let mut wrapped = value;
    for seg in path.segments[1..].iter().rev() {
        let mut record = Record::new();
        record.set(seg.name.clone(), wrapped);
        wrapped = Value::Record(record);
    }
    wrapped
}

//! Static semantic checks, run after parsing and before execution.
//!
//! The validator never executes anything; it walks every body with the
//! scope nesting the evaluator will use and returns the complete list of
//! findings. Execution only proceeds on an empty list.

use ahash::AHashSet;

use crate::{
    ast::{CallMode, Expr, ExprKind, Header, Program, RecordEntry, Stmt, StmtKind},
    budget::Budget,
    capability::KNOWN_CAPABILITIES,
    diag::{Diagnostic, ErrorCode, Span},
    tools::{ToolMode, ToolRegistry},
};

/// Validates a parsed program against the given tool registry.
///
/// The registry is consulted for the static mode and capability checks;
/// tools it does not know are left for runtime dispatch (`E_UNKNOWN_TOOL`).
pub fn validate(program: &Program, tools: &ToolRegistry) -> Vec<Diagnostic> {
    let mut v = Validator {
        tools,
        diags: Vec::new(),
        scopes: vec![AHashSet::new()],
        declared_caps: AHashSet::new(),
        fn_names: AHashSet::new(),
    };
    v.headers(&program.headers);
    v.collect_fn_names(&program.stmts);
    v.block(&program.stmts, None);
    v.diags
}

struct Validator<'a> {
    tools: &'a ToolRegistry,
    diags: Vec<Diagnostic>,
    /// One entry per live scope; names bound by `let`, `fn`, parameters,
    /// iteration/arm/catch bindings, and `->` targets.
    scopes: Vec<AHashSet<String>>,
    /// Capability ids declared `true` in the `cap` header.
    declared_caps: AHashSet<String>,
    /// Every `fn` name seen so far, program-wide.
    fn_names: AHashSet<String>,
}

impl Validator<'_> {
    fn report(&mut self, code: ErrorCode, message: impl Into<String>, span: &Span) {
        self.diags.push(Diagnostic::new(code, message).with_span(span.clone()));
    }

    // === headers ===

    fn headers(&mut self, headers: &[Header]) {
        for header in headers {
            match header {
                Header::Cap { entries, .. } => self.cap_header(entries),
                Header::Budget { entries, .. } => self.budget_header(entries),
                Header::Import { .. } => {}
            }
        }
    }

    fn cap_header(&mut self, entries: &[RecordEntry]) {
        for entry in entries {
            match entry {
                RecordEntry::Spread { span, .. } => {
                    self.report(ErrorCode::UnknownCap, "spread is not allowed in a `cap` header", span);
                }
                RecordEntry::Field { key, key_span, value } => {
                    if !KNOWN_CAPABILITIES.contains(&key.as_str()) {
                        self.report(
                            ErrorCode::UnknownCap,
                            format!("unknown capability `{key}`"),
                            key_span,
                        );
                        continue;
                    }
                    match value.kind {
                        ExprKind::Bool(true) => {
                            self.declared_caps.insert(key.clone());
                        }
                        ExprKind::Bool(false) => {}
                        _ => {
                            self.report(
                                ErrorCode::UnknownCap,
                                format!("capability `{key}` flag must be a boolean literal"),
                                &value.span,
                            );
                        }
                    }
                }
            }
        }
    }

    fn budget_header(&mut self, entries: &[RecordEntry]) {
        for entry in entries {
            match entry {
                RecordEntry::Spread { span, .. } => {
                    self.report(ErrorCode::UnknownBudget, "spread is not allowed in a `budget` header", span);
                }
                RecordEntry::Field { key, key_span, value } => {
                    if !Budget::KEYS.contains(&key.as_str()) {
                        self.report(
                            ErrorCode::UnknownBudget,
                            format!("unknown budget field `{key}`"),
                            key_span,
                        );
                        continue;
                    }
                    match value.kind {
                        ExprKind::Int(n) if n >= 0 => {}
                        _ => {
                            self.report(
                                ErrorCode::UnknownBudget,
                                format!("budget field `{key}` must be a non-negative integer literal"),
                                &value.span,
                            );
                        }
                    }
                }
            }
        }
    }

    // === program-wide fn duplicate check ===

    fn collect_fn_names(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            match &stmt.kind {
                StmtKind::FnDecl { name, name_span, body, .. } => {
                    if !self.fn_names.insert(name.clone()) {
                        self.report(
                            ErrorCode::FnDup,
                            format!("function `{name}` is declared more than once"),
                            name_span,
                        );
                    }
                    self.collect_fn_names(body);
                }
                StmtKind::Let { value, .. } | StmtKind::Return { value } => self.collect_fn_names_expr(value),
                StmtKind::Expr { expr, .. } => self.collect_fn_names_expr(expr),
            }
        }
    }

    fn collect_fn_names_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::IfBlock {
                then_body, else_body, ..
            } => {
                self.collect_fn_names(then_body);
                if let Some(body) = else_body {
                    self.collect_fn_names(body);
                }
            }
            ExprKind::For { body, .. } | ExprKind::FilterBlock { body, .. } | ExprKind::Loop { body, .. } => {
                self.collect_fn_names(body);
            }
            ExprKind::Match { ok_arm, err_arm, .. } => {
                if let Some(arm) = ok_arm {
                    self.collect_fn_names(&arm.body);
                }
                if let Some(arm) = err_arm {
                    self.collect_fn_names(&arm.body);
                }
            }
            ExprKind::Try { body, catch_body, .. } => {
                self.collect_fn_names(body);
                self.collect_fn_names(catch_body);
            }
            _ => {}
        }
    }

    // === scopes ===

    fn push_scope(&mut self) {
        self.scopes.push(AHashSet::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn bind(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_owned());
        }
    }

    fn is_bound(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|scope| scope.contains(name))
    }

    // === statements ===

    /// Checks a statement block in the current scope. `fn_name` is set for
    /// function bodies, which must end in a terminal `return`.
    fn block(&mut self, stmts: &[Stmt], fn_name: Option<&str>) {
        // Names introduced by `let`/`fn` in this block, for E_DUP_BINDING.
        let mut declared: AHashSet<&str> = AHashSet::new();

        for (i, stmt) in stmts.iter().enumerate() {
            if matches!(stmt.kind, StmtKind::Return { .. }) && i + 1 != stmts.len() {
                self.report(
                    ErrorCode::ReturnNotLast,
                    "`return` must be the last statement of its block",
                    &stmt.span,
                );
            }
            match &stmt.kind {
                StmtKind::Let { name, name_span, value } => {
                    self.expr(value);
                    if !declared.insert(name) {
                        self.report(
                            ErrorCode::DupBinding,
                            format!("`{name}` is declared twice in the same block"),
                            name_span,
                        );
                    }
                    self.bind(name);
                }
                StmtKind::FnDecl {
                    name,
                    name_span,
                    params,
                    body,
                } => {
                    if !declared.insert(name) {
                        self.report(
                            ErrorCode::DupBinding,
                            format!("`{name}` is declared twice in the same block"),
                            name_span,
                        );
                    }
                    self.push_scope();
                    let mut seen_params: AHashSet<&str> = AHashSet::new();
                    for param in params {
                        if !seen_params.insert(param) {
                            self.report(
                                ErrorCode::DupBinding,
                                format!("parameter `{param}` is declared twice"),
                                name_span,
                            );
                        }
                        self.bind(param);
                    }
                    self.block(body, Some(name));
                    self.pop_scope();
                }
                StmtKind::Return { value } => self.expr(value),
                StmtKind::Expr { expr, target } => {
                    self.expr(expr);
                    if let Some(path) = target {
                        self.bind(&path.head().name);
                    }
                }
            }
        }

        if let Some(name) = fn_name {
            let ends_with_return = stmts.last().is_some_and(|s| matches!(s.kind, StmtKind::Return { .. }));
            if !ends_with_return {
                let span = stmts.last().map(|s| s.span.clone());
                let diag = Diagnostic::new(
                    ErrorCode::NoReturn,
                    format!("function `{name}` must end with a `return` statement"),
                );
                self.diags.push(match span {
                    Some(span) => diag.with_span(span),
                    None => diag,
                });
            }
        }
    }

    // === expressions ===

    fn entries(&mut self, entries: &[RecordEntry]) {
        for entry in entries {
            match entry {
                RecordEntry::Field { value, .. } | RecordEntry::Spread { value, .. } => self.expr(value),
            }
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Int(_) | ExprKind::Float(_) | ExprKind::Bool(_) | ExprKind::Str(_) | ExprKind::Null => {}
            ExprKind::Path(path) => {
                let head = path.head();
                if !self.is_bound(&head.name) {
                    self.report(
                        ErrorCode::Unbound,
                        format!("`{}` is not defined in any enclosing scope", head.name),
                        &head.span,
                    );
                }
            }
            ExprKind::Record(entries) => self.entries(entries),
            ExprKind::List(items) => {
                for item in items {
                    self.expr(item);
                }
            }
            ExprKind::ToolCall {
                mode,
                tool,
                tool_span,
                args,
            } => {
                self.entries(args);
                if let Some(def) = self.tools.get(tool) {
                    if *mode == CallMode::Read && def.mode == ToolMode::Effect {
                        self.report(
                            ErrorCode::CallEffect,
                            format!("tool `{tool}` has effect mode and requires `do`"),
                            tool_span,
                        );
                    }
                    if !self.declared_caps.contains(&def.capability_id) {
                        self.report(
                            ErrorCode::UndeclaredCap,
                            format!(
                                "tool `{tool}` needs capability `{}`, which the `cap` header does not declare",
                                def.capability_id
                            ),
                            tool_span,
                        );
                    }
                }
            }
            ExprKind::Assert { args } | ExprKind::Check { args } | ExprKind::FnCall { args, .. } => {
                self.entries(args);
            }
            ExprKind::IfInline { cond, then, els } => {
                self.expr(cond);
                self.expr(then);
                self.expr(els);
            }
            ExprKind::IfBlock {
                cond,
                then_body,
                else_body,
            } => {
                self.expr(cond);
                self.push_scope();
                self.block(then_body, None);
                self.pop_scope();
                if let Some(body) = else_body {
                    self.push_scope();
                    self.block(body, None);
                    self.pop_scope();
                }
            }
            ExprKind::For { list, bind, body } | ExprKind::FilterBlock { list, bind, body } => {
                self.expr(list);
                self.push_scope();
                self.bind(bind);
                self.block(body, None);
                self.pop_scope();
            }
            ExprKind::Loop { init, times, bind, body } => {
                self.expr(init);
                self.expr(times);
                self.push_scope();
                self.bind(bind);
                self.block(body, None);
                self.pop_scope();
            }
            ExprKind::Match {
                subject,
                ok_arm,
                err_arm,
            } => {
                self.expr(subject);
                for arm in [ok_arm, err_arm].into_iter().flatten() {
                    self.push_scope();
                    self.bind(&arm.bind);
                    self.block(&arm.body, None);
                    self.pop_scope();
                }
            }
            ExprKind::Try {
                body,
                bind,
                catch_body,
                ..
            } => {
                self.push_scope();
                self.block(body, None);
                self.pop_scope();
                self.push_scope();
                self.bind(bind);
                self.block(catch_body, None);
                self.pop_scope();
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.expr(lhs);
                self.expr(rhs);
            }
            ExprKind::Unary { expr: inner, .. } => self.expr(inner),
        }
    }
}

//! The abstract syntax tree consumed by the validator and evaluator.
//!
//! Nodes are created by the parser and immutable afterwards. Every node
//! carries the span of the source region it covers.

use smallvec::SmallVec;

use crate::diag::Span;

/// A parsed program: ordered headers followed by ordered statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub headers: Vec<Header>,
    pub stmts: Vec<Stmt>,
}

/// Program prologue declarations.
#[derive(Debug, Clone, PartialEq)]
pub enum Header {
    /// `cap { fs.read: true }` — capability flags.
    Cap { entries: Vec<RecordEntry>, span: Span },
    /// `budget { timeMs: 1000 }` — budget fields.
    Budget { entries: Vec<RecordEntry>, span: Span },
    /// `import "path" as alias` — reserved for future use; parsed, ignored.
    Import { path: String, alias: String, span: Span },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `let name = expr`
    Let { name: String, name_span: Span, value: Expr },
    /// `expr` or `expr -> target`
    Expr { expr: Expr, target: Option<IdentPath> },
    /// `return expr`
    Return { value: Expr },
    /// `fn name { params } { body }`
    FnDecl {
        name: String,
        name_span: Span,
        params: Vec<String>,
        body: Vec<Stmt>,
    },
}

/// One segment of a dotted identifier path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSeg {
    pub name: String,
    pub span: Span,
}

/// A non-empty dotted path. The first segment is a binding name; the rest
/// are record field accesses. Paths are short, so segments live inline.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentPath {
    pub segments: SmallVec<[PathSeg; 4]>,
}

impl IdentPath {
    #[must_use]
    pub fn head(&self) -> &PathSeg {
        &self.segments[0]
    }

    /// The dotted rendering, e.g. `a.b.c`.
    #[must_use]
    pub fn dotted(&self) -> String {
        let mut out = String::new();
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push_str(&seg.name);
        }
        out
    }
}

/// One entry of a record expression, in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordEntry {
    /// `key: expr` — the key may be dotted (`fs.read`) and is a plain string.
    Field { key: String, key_span: Span, value: Expr },
    /// `...expr` — the expression must evaluate to a record.
    Spread { value: Expr, span: Span },
}

/// Tool invocation mode: `call?` reads, `do` effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    Read,
    Effect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

impl BinOp {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
}

/// One arm of a `match` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub bind: String,
    pub bind_span: Span,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Null,
    Path(IdentPath),
    Record(Vec<RecordEntry>),
    List(Vec<Expr>),
    /// `call? tool.name { args }` or `do tool.name { args }`.
    ToolCall {
        mode: CallMode,
        tool: String,
        tool_span: Span,
        args: Vec<RecordEntry>,
    },
    /// `assert { that: ..., msg: ... }`
    Assert { args: Vec<RecordEntry> },
    /// `check { that: ..., msg: ... }`
    Check { args: Vec<RecordEntry> },
    /// `name { args }` — stdlib or user function call; the name may be dotted.
    FnCall {
        name: String,
        name_span: Span,
        args: Vec<RecordEntry>,
    },
    /// `if { cond: c, then: t, else: e }`
    IfInline {
        cond: Box<Expr>,
        then: Box<Expr>,
        els: Box<Expr>,
    },
    /// `if (cond) { ... } else { ... }`
    IfBlock {
        cond: Box<Expr>,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
    },
    /// `for { in: list, as: "name" } { body }`
    For {
        list: Box<Expr>,
        bind: String,
        body: Vec<Stmt>,
    },
    /// `match (subject) { ok { v } { ... } err { e } { ... } }`
    Match {
        subject: Box<Expr>,
        ok_arm: Option<MatchArm>,
        err_arm: Option<MatchArm>,
    },
    /// `try { body } catch name { body }`
    Try {
        body: Vec<Stmt>,
        bind: String,
        bind_span: Span,
        catch_body: Vec<Stmt>,
    },
    /// `filter { in: list, as: "name" } { predicate }`
    FilterBlock {
        list: Box<Expr>,
        bind: String,
        body: Vec<Stmt>,
    },
    /// `loop { init: v, times: n, as: "name" } { body }`
    Loop {
        init: Box<Expr>,
        times: Box<Expr>,
        bind: String,
        body: Vec<Stmt>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary { op: UnOp, expr: Box<Expr> },
}

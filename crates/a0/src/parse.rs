//! Parser: token stream → [`Program`] AST.
//!
//! Recursive descent with explicit precedence climbing: a single
//! non-associative comparison over left-associative additive over
//! left-associative multiplicative over unary over primary. No error
//! recovery is attempted; the first unexpected token aborts with an
//! `E_PARSE` diagnostic, and a well-tokenized construct with a missing
//! required field (inline `if` without `then`, `for` without `as`) aborts
//! with `E_AST`.

use smallvec::SmallVec;

use crate::{
    ast::{
        BinOp, CallMode, Expr, ExprKind, Header, IdentPath, MatchArm, PathSeg, Program, RecordEntry, Stmt, StmtKind,
        UnOp,
    },
    diag::{Diagnostic, ErrorCode, Span},
    token::{Keyword, Token, TokenKind},
};

/// Maximum expression nesting depth, preventing stack overflow on
/// adversarial input like `((((...))))`.
const MAX_NESTING_DEPTH: u32 = 200;

type PResult<T> = Result<T, Diagnostic>;

/// Parses a token stream (as produced by [`crate::lex::lex`]) into a program.
pub fn parse(tokens: Vec<Token>) -> Result<Program, Diagnostic> {
    Parser {
        tokens,
        pos: 0,
        depth: 0,
    }
    .program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: u32,
}

impl Parser {
    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn prev_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span.clone()
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.kind() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> PResult<Token> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&kind.describe()))
        }
    }

    fn unexpected(&self, expected: &str) -> Diagnostic {
        let tok = self.peek();
        Diagnostic::new(
            ErrorCode::Parse,
            format!("unexpected {}; expected {expected}", tok.kind.describe()),
        )
        .with_span(tok.span.clone())
    }

    fn malformed(&self, message: impl Into<String>, span: Span) -> Diagnostic {
        Diagnostic::new(ErrorCode::Ast, message).with_span(span)
    }

    // === program structure ===

    fn program(mut self) -> PResult<Program> {
        let mut headers = Vec::new();
        loop {
            match self.kind() {
                TokenKind::Kw(Keyword::Cap) => {
                    let kw = self.advance();
                    self.expect(&TokenKind::LBrace)?;
                    let (entries, end) = self.record_body()?;
                    headers.push(Header::Cap {
                        entries,
                        span: kw.span.to(&end),
                    });
                }
                TokenKind::Kw(Keyword::Budget) => {
                    let kw = self.advance();
                    self.expect(&TokenKind::LBrace)?;
                    let (entries, end) = self.record_body()?;
                    headers.push(Header::Budget {
                        entries,
                        span: kw.span.to(&end),
                    });
                }
                TokenKind::Kw(Keyword::Import) => {
                    let kw = self.advance();
                    let path = match self.kind() {
                        TokenKind::Str(_) => {
                            let tok = self.advance();
                            match tok.kind {
                                TokenKind::Str(s) => s,
                                _ => unreachable!(),
                            }
                        }
                        _ => return Err(self.unexpected("import path string")),
                    };
                    self.expect(&TokenKind::Kw(Keyword::As))?;
                    let alias = self.ident("import alias")?.0;
                    headers.push(Header::Import {
                        path,
                        alias,
                        span: kw.span.to(&self.prev_span()),
                    });
                }
                _ => break,
            }
        }
        let mut stmts = Vec::new();
        while !self.at(&TokenKind::Eof) {
            stmts.push(self.stmt()?);
        }
        Ok(Program { headers, stmts })
    }

    fn stmt(&mut self) -> PResult<Stmt> {
        match self.kind() {
            TokenKind::Kw(Keyword::Let) => {
                let kw = self.advance();
                let (name, name_span) = self.ident("binding name")?;
                self.expect(&TokenKind::Assign)?;
                let value = self.expr()?;
                let span = kw.span.to(&value.span);
                Ok(Stmt {
                    kind: StmtKind::Let { name, name_span, value },
                    span,
                })
            }
            TokenKind::Kw(Keyword::Fn) => {
                let kw = self.advance();
                let (name, name_span) = self.ident("function name")?;
                self.expect(&TokenKind::LBrace)?;
                let mut params = Vec::new();
                while !self.at(&TokenKind::RBrace) {
                    params.push(self.ident("parameter name")?.0);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RBrace)?;
                let (body, end) = self.block()?;
                let span = kw.span.to(&end);
                Ok(Stmt {
                    kind: StmtKind::FnDecl {
                        name,
                        name_span,
                        params,
                        body,
                    },
                    span,
                })
            }
            TokenKind::Kw(Keyword::Return) => {
                let kw = self.advance();
                let value = self.expr()?;
                let span = kw.span.to(&value.span);
                Ok(Stmt {
                    kind: StmtKind::Return { value },
                    span,
                })
            }
            _ => {
                let expr = self.expr()?;
                let target = if self.eat(&TokenKind::Arrow) {
                    Some(self.ident_path()?)
                } else {
                    None
                };
                let span = expr.span.to(&self.prev_span());
                Ok(Stmt {
                    kind: StmtKind::Expr { expr, target },
                    span,
                })
            }
        }
    }

    /// `{ stmt* }`, returning the body and the closing brace span.
    fn block(&mut self) -> PResult<(Vec<Stmt>, Span)> {
        self.expect(&TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            if self.at(&TokenKind::Eof) {
                return Err(self.unexpected("`}`"));
            }
            stmts.push(self.stmt()?);
        }
        let end = self.expect(&TokenKind::RBrace)?;
        Ok((stmts, end.span))
    }

    // === expressions ===

    fn expr(&mut self) -> PResult<Expr> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            let span = self.peek().span.clone();
            self.depth -= 1;
            return Err(Diagnostic::new(ErrorCode::Parse, "expression nesting too deep").with_span(span));
        }
        let result = self.expr_inner();
        self.depth -= 1;
        result
    }

    fn expr_inner(&mut self) -> PResult<Expr> {
        match self.kind() {
            TokenKind::Kw(Keyword::If) => self.if_expr(),
            TokenKind::Kw(Keyword::For) => self.for_expr(),
            TokenKind::Kw(Keyword::Match) => self.match_expr(),
            TokenKind::Kw(Keyword::Try) => self.try_expr(),
            TokenKind::Kw(Keyword::Filter) => self.filter_expr(),
            TokenKind::Kw(Keyword::Loop) => self.loop_expr(),
            TokenKind::CallQuery => self.tool_call(CallMode::Read),
            TokenKind::Kw(Keyword::Do) => self.tool_call(CallMode::Effect),
            TokenKind::Kw(Keyword::Assert) => {
                let kw = self.advance();
                self.expect(&TokenKind::LBrace)?;
                let (args, end) = self.record_body()?;
                Ok(Expr {
                    kind: ExprKind::Assert { args },
                    span: kw.span.to(&end),
                })
            }
            TokenKind::Kw(Keyword::Check) => {
                let kw = self.advance();
                self.expect(&TokenKind::LBrace)?;
                let (args, end) = self.record_body()?;
                Ok(Expr {
                    kind: ExprKind::Check { args },
                    span: kw.span.to(&end),
                })
            }
            _ => self.comparison(),
        }
    }

    /// A single, non-associative comparison.
    fn comparison(&mut self) -> PResult<Expr> {
        let lhs = self.additive()?;
        let op = match self.kind() {
            TokenKind::Gt => BinOp::Gt,
            TokenKind::Lt => BinOp::Lt,
            TokenKind::Ge => BinOp::Ge,
            TokenKind::Le => BinOp::Le,
            TokenKind::EqEq => BinOp::Eq,
            TokenKind::NotEq => BinOp::Ne,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.additive()?;
        let span = lhs.span.to(&rhs.span);
        Ok(Expr {
            kind: ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        })
    }

    fn additive(&mut self) -> PResult<Expr> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.multiplicative()?;
            let span = lhs.span.to(&rhs.span);
            lhs = Expr {
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            };
        }
    }

    fn multiplicative(&mut self) -> PResult<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.unary()?;
            let span = lhs.span.to(&rhs.span);
            lhs = Expr {
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            };
        }
    }

    fn unary(&mut self) -> PResult<Expr> {
        if self.at(&TokenKind::Minus) {
            let op = self.advance();
            let expr = self.unary()?;
            let span = op.span.to(&expr.span);
            return Ok(Expr {
                kind: ExprKind::Unary {
                    op: UnOp::Neg,
                    expr: Box::new(expr),
                },
                span,
            });
        }
        self.primary()
    }

    fn primary(&mut self) -> PResult<Expr> {
        match self.kind().clone() {
            TokenKind::LParen => {
                self.advance();
                let expr = self.expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBrace => {
                let open = self.advance();
                let (entries, end) = self.record_body()?;
                Ok(Expr {
                    kind: ExprKind::Record(entries),
                    span: open.span.to(&end),
                })
            }
            TokenKind::LBracket => {
                let open = self.advance();
                let mut elements = Vec::new();
                while !self.at(&TokenKind::RBracket) {
                    elements.push(self.expr()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                let end = self.expect(&TokenKind::RBracket)?;
                Ok(Expr {
                    kind: ExprKind::List(elements),
                    span: open.span.to(&end.span),
                })
            }
            TokenKind::Int(v) => {
                let tok = self.advance();
                Ok(Expr {
                    kind: ExprKind::Int(v),
                    span: tok.span,
                })
            }
            TokenKind::Float(v) => {
                let tok = self.advance();
                Ok(Expr {
                    kind: ExprKind::Float(v),
                    span: tok.span,
                })
            }
            TokenKind::Str(v) => {
                let tok = self.advance();
                Ok(Expr {
                    kind: ExprKind::Str(v),
                    span: tok.span,
                })
            }
            TokenKind::Kw(Keyword::True) => {
                let tok = self.advance();
                Ok(Expr {
                    kind: ExprKind::Bool(true),
                    span: tok.span,
                })
            }
            TokenKind::Kw(Keyword::False) => {
                let tok = self.advance();
                Ok(Expr {
                    kind: ExprKind::Bool(false),
                    span: tok.span,
                })
            }
            TokenKind::Kw(Keyword::Null) => {
                let tok = self.advance();
                Ok(Expr {
                    kind: ExprKind::Null,
                    span: tok.span,
                })
            }
            TokenKind::Ident(_) => {
                let path = self.ident_path()?;
                let path_span = path.head().span.to(&self.prev_span());
                // A trailing record turns the path into a function call.
                if self.at(&TokenKind::LBrace) {
                    self.advance();
                    let (args, end) = self.record_body()?;
                    return Ok(Expr {
                        kind: ExprKind::FnCall {
                            name: path.dotted(),
                            name_span: path_span.clone(),
                            args,
                        },
                        span: path_span.to(&end),
                    });
                }
                Ok(Expr {
                    kind: ExprKind::Path(path),
                    span: path_span,
                })
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    // === keyword forms ===

    fn if_expr(&mut self) -> PResult<Expr> {
        let kw = self.advance();
        match self.kind() {
            TokenKind::LParen => {
                self.advance();
                let cond = self.expr()?;
                self.expect(&TokenKind::RParen)?;
                let (then_body, mut end) = self.block()?;
                let else_body = if self.eat(&TokenKind::Kw(Keyword::Else)) {
                    let (body, else_end) = self.block()?;
                    end = else_end;
                    Some(body)
                } else {
                    None
                };
                Ok(Expr {
                    kind: ExprKind::IfBlock {
                        cond: Box::new(cond),
                        then_body,
                        else_body,
                    },
                    span: kw.span.to(&end),
                })
            }
            TokenKind::LBrace => {
                self.advance();
                let (mut entries, end) = self.record_body()?;
                let span = kw.span.to(&end);
                let cond = self.config_expr(&mut entries, "cond", "if", &span)?;
                let then = self.config_expr(&mut entries, "then", "if", &span)?;
                let els = self.config_expr(&mut entries, "else", "if", &span)?;
                Ok(Expr {
                    kind: ExprKind::IfInline {
                        cond: Box::new(cond),
                        then: Box::new(then),
                        els: Box::new(els),
                    },
                    span,
                })
            }
            _ => Err(self.unexpected("`(` or `{` after `if`")),
        }
    }

    fn for_expr(&mut self) -> PResult<Expr> {
        let kw = self.advance();
        self.expect(&TokenKind::LBrace)?;
        let (mut entries, cfg_end) = self.record_body()?;
        let cfg_span = kw.span.to(&cfg_end);
        let list = self.config_expr(&mut entries, "in", "for", &cfg_span)?;
        let bind = self.config_str(&mut entries, "as", "for", &cfg_span)?;
        let (body, end) = self.block()?;
        Ok(Expr {
            kind: ExprKind::For {
                list: Box::new(list),
                bind,
                body,
            },
            span: kw.span.to(&end),
        })
    }

    fn filter_expr(&mut self) -> PResult<Expr> {
        let kw = self.advance();
        self.expect(&TokenKind::LBrace)?;
        let (mut entries, cfg_end) = self.record_body()?;
        let cfg_span = kw.span.to(&cfg_end);
        // `filter { ... } { body }` is the block form; a bare `filter { ... }`
        // is the stdlib function call.
        if self.at(&TokenKind::LBrace) {
            let list = self.config_expr(&mut entries, "in", "filter", &cfg_span)?;
            let bind = self.config_str(&mut entries, "as", "filter", &cfg_span)?;
            let (body, end) = self.block()?;
            return Ok(Expr {
                kind: ExprKind::FilterBlock {
                    list: Box::new(list),
                    bind,
                    body,
                },
                span: kw.span.to(&end),
            });
        }
        Ok(Expr {
            kind: ExprKind::FnCall {
                name: "filter".to_owned(),
                name_span: kw.span.clone(),
                args: entries,
            },
            span: cfg_span,
        })
    }

    fn loop_expr(&mut self) -> PResult<Expr> {
        let kw = self.advance();
        self.expect(&TokenKind::LBrace)?;
        let (mut entries, cfg_end) = self.record_body()?;
        let cfg_span = kw.span.to(&cfg_end);
        let init = self.config_expr(&mut entries, "init", "loop", &cfg_span)?;
        let times = self.config_expr(&mut entries, "times", "loop", &cfg_span)?;
        let bind = self.config_str(&mut entries, "as", "loop", &cfg_span)?;
        let (body, end) = self.block()?;
        Ok(Expr {
            kind: ExprKind::Loop {
                init: Box::new(init),
                times: Box::new(times),
                bind,
                body,
            },
            span: kw.span.to(&end),
        })
    }

    fn match_expr(&mut self) -> PResult<Expr> {
        let kw = self.advance();
        self.expect(&TokenKind::LParen)?;
        let subject = self.expr()?;
        self.expect(&TokenKind::RParen)?;
        self.expect(&TokenKind::LBrace)?;
        let mut ok_arm: Option<MatchArm> = None;
        let mut err_arm: Option<MatchArm> = None;
        while !self.at(&TokenKind::RBrace) {
            let (tag, tag_span) = self.ident("`ok` or `err`")?;
            self.expect(&TokenKind::LBrace)?;
            let (bind, bind_span) = self.ident("arm binding name")?;
            self.expect(&TokenKind::RBrace)?;
            let (body, _) = self.block()?;
            let arm = MatchArm { bind, bind_span, body };
            match tag.as_str() {
                "ok" => {
                    if ok_arm.replace(arm).is_some() {
                        return Err(Diagnostic::new(ErrorCode::Parse, "duplicate `ok` arm").with_span(tag_span));
                    }
                }
                "err" => {
                    if err_arm.replace(arm).is_some() {
                        return Err(Diagnostic::new(ErrorCode::Parse, "duplicate `err` arm").with_span(tag_span));
                    }
                }
                other => {
                    return Err(
                        Diagnostic::new(ErrorCode::Parse, format!("expected `ok` or `err` arm, found `{other}`"))
                            .with_span(tag_span),
                    );
                }
            }
        }
        let end = self.expect(&TokenKind::RBrace)?;
        let span = kw.span.to(&end.span);
        if ok_arm.is_none() && err_arm.is_none() {
            return Err(self.malformed("`match` requires at least one `ok` or `err` arm", span));
        }
        Ok(Expr {
            kind: ExprKind::Match {
                subject: Box::new(subject),
                ok_arm,
                err_arm,
            },
            span,
        })
    }

    fn try_expr(&mut self) -> PResult<Expr> {
        let kw = self.advance();
        let (body, _) = self.block()?;
        self.expect(&TokenKind::Kw(Keyword::Catch))?;
        let (bind, bind_span) = self.ident("catch binding name")?;
        let (catch_body, end) = self.block()?;
        Ok(Expr {
            kind: ExprKind::Try {
                body,
                bind,
                bind_span,
                catch_body,
            },
            span: kw.span.to(&end),
        })
    }

    fn tool_call(&mut self, mode: CallMode) -> PResult<Expr> {
        let kw = self.advance();
        let (first, first_span) = self.ident("tool name")?;
        let mut tool = first;
        let mut tool_span = first_span;
        while self.eat(&TokenKind::Dot) {
            let (seg, seg_span) = self.path_atom()?;
            tool.push('.');
            tool.push_str(&seg);
            tool_span = tool_span.to(&seg_span);
        }
        self.expect(&TokenKind::LBrace)?;
        let (args, end) = self.record_body()?;
        Ok(Expr {
            kind: ExprKind::ToolCall {
                mode,
                tool,
                tool_span,
                args,
            },
            span: kw.span.to(&end),
        })
    }

    // === shared pieces ===

    /// Record entries after the opening `{`, consuming the closing `}`.
    fn record_body(&mut self) -> PResult<(Vec<RecordEntry>, Span)> {
        let mut entries = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            if self.at(&TokenKind::Ellipsis) {
                let spread = self.advance();
                let value = self.expr()?;
                let span = spread.span.to(&value.span);
                entries.push(RecordEntry::Spread { value, span });
            } else {
                let (mut key, key_start) = self.path_atom()?;
                let mut key_span = key_start;
                while self.eat(&TokenKind::Dot) {
                    let (seg, seg_span) = self.path_atom()?;
                    key.push('.');
                    key.push_str(&seg);
                    key_span = key_span.to(&seg_span);
                }
                self.expect(&TokenKind::Colon)?;
                let value = self.expr()?;
                entries.push(RecordEntry::Field { key, key_span, value });
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(&TokenKind::RBrace)?;
        Ok((entries, end.span))
    }

    /// An identifier-or-keyword atom, as allowed in record keys and in path
    /// segments after the first.
    fn path_atom(&mut self) -> PResult<(String, Span)> {
        match self.kind() {
            TokenKind::Ident(_) => {
                let tok = self.advance();
                match tok.kind {
                    TokenKind::Ident(name) => Ok((name, tok.span)),
                    _ => unreachable!(),
                }
            }
            TokenKind::Kw(kw) => {
                let name = kw.as_str().to_owned();
                let tok = self.advance();
                Ok((name, tok.span))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// A plain identifier (keywords rejected).
    fn ident(&mut self, what: &str) -> PResult<(String, Span)> {
        match self.kind() {
            TokenKind::Ident(_) => {
                let tok = self.advance();
                match tok.kind {
                    TokenKind::Ident(name) => Ok((name, tok.span)),
                    _ => unreachable!(),
                }
            }
            _ => Err(self.unexpected(what)),
        }
    }

    /// Dotted identifier path: first segment an identifier, later segments
    /// identifier-or-keyword atoms.
    fn ident_path(&mut self) -> PResult<IdentPath> {
        let (name, span) = self.ident("identifier")?;
        let mut segments: SmallVec<[PathSeg; 4]> = SmallVec::new();
        segments.push(PathSeg { name, span });
        while self.eat(&TokenKind::Dot) {
            let (name, span) = self.path_atom()?;
            segments.push(PathSeg { name, span });
        }
        Ok(IdentPath { segments })
    }

    /// Removes `key` from a keyword-form configuration record, requiring it
    /// to be present.
    fn config_expr(&mut self, entries: &mut Vec<RecordEntry>, key: &str, form: &str, span: &Span) -> PResult<Expr> {
        let found = entries.iter().position(
            |entry| matches!(entry, RecordEntry::Field { key: k, .. } if k == key),
        );
        match found {
            Some(idx) => match entries.remove(idx) {
                RecordEntry::Field { value, .. } => Ok(value),
                RecordEntry::Spread { .. } => unreachable!(),
            },
            None => Err(self.malformed(format!("`{form}` requires field `{key}`"), span.clone())),
        }
    }

    /// Like [`Self::config_expr`] but the value must be a string literal
    /// (binding names are fixed at parse time).
    fn config_str(&mut self, entries: &mut Vec<RecordEntry>, key: &str, form: &str, span: &Span) -> PResult<String> {
        let value = self.config_expr(entries, key, form, span)?;
        match value.kind {
            ExprKind::Str(s) => Ok(s),
            _ => Err(self.malformed(format!("`{form}` field `{key}` must be a string literal"), value.span)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::lex;

    fn program(src: &str) -> Program {
        parse(lex(src, "t.a0").unwrap()).unwrap()
    }

    fn only_expr(src: &str) -> Expr {
        let mut program = program(src);
        assert_eq!(program.stmts.len(), 1);
        match program.stmts.remove(0).kind {
            StmtKind::Expr { expr, .. } => expr,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expr = only_expr("2 + 3 * 4");
        let ExprKind::Binary { op: BinOp::Add, rhs, .. } = expr.kind else {
            panic!("expected addition at the root");
        };
        assert!(matches!(rhs.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn additive_operators_are_left_associative() {
        let expr = only_expr("1 - 2 - 3");
        let ExprKind::Binary { op: BinOp::Sub, lhs, .. } = expr.kind else {
            panic!("expected subtraction at the root");
        };
        assert!(matches!(lhs.kind, ExprKind::Binary { op: BinOp::Sub, .. }));
    }

    #[test]
    fn comparison_sits_above_arithmetic() {
        let expr = only_expr("1 + 2 < 3 * 4");
        let ExprKind::Binary { op: BinOp::Lt, lhs, rhs } = expr.kind else {
            panic!("expected comparison at the root");
        };
        assert!(matches!(lhs.kind, ExprKind::Binary { op: BinOp::Add, .. }));
        assert!(matches!(rhs.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn call_modes_map_to_read_and_effect() {
        let expr = only_expr("call? fs.read { path: \"x\" }");
        assert!(matches!(
            expr.kind,
            ExprKind::ToolCall { mode: CallMode::Read, ref tool, .. } if tool == "fs.read"
        ));
        let expr = only_expr("do fs.write { }");
        assert!(matches!(
            expr.kind,
            ExprKind::ToolCall { mode: CallMode::Effect, ref tool, .. } if tool == "fs.write"
        ));
    }

    #[test]
    fn trailing_record_makes_a_path_a_call() {
        assert!(matches!(only_expr("foo").kind, ExprKind::Path(_)));
        assert!(matches!(
            only_expr("foo { a: 1 }").kind,
            ExprKind::FnCall { ref name, .. } if name == "foo"
        ));
        assert!(matches!(
            only_expr("str.split { in: \"a\", sep: \",\" }").kind,
            ExprKind::FnCall { ref name, .. } if name == "str.split"
        ));
    }

    #[test]
    fn filter_form_depends_on_a_trailing_block() {
        assert!(matches!(
            only_expr("filter { in: [1], as: \"n\" } { return n }").kind,
            ExprKind::FilterBlock { .. }
        ));
        assert!(matches!(
            only_expr("filter { in: [1], by: \"keep\" }").kind,
            ExprKind::FnCall { ref name, .. } if name == "filter"
        ));
    }

    #[test]
    fn dotted_record_keys_collapse_to_one_string() {
        let expr = only_expr("{ fs.read: true }");
        let ExprKind::Record(entries) = expr.kind else {
            panic!("expected record");
        };
        assert!(matches!(
            entries.as_slice(),
            [RecordEntry::Field { key, .. }] if key == "fs.read"
        ));
    }

    #[test]
    fn headers_collect_in_order() {
        let program = program("cap { fs.read: true }\nbudget { timeMs: 5 }\nimport \"x\" as y\nreturn 1");
        assert_eq!(program.headers.len(), 3);
        assert!(matches!(program.headers[0], Header::Cap { .. }));
        assert!(matches!(program.headers[1], Header::Budget { .. }));
        assert!(matches!(
            &program.headers[2],
            Header::Import { path, alias, .. } if path == "x" && alias == "y"
        ));
    }

    #[test]
    fn arrow_targets_attach_to_expression_statements() {
        let program = program("1 + 2 -> out.sum");
        assert!(matches!(
            &program.stmts[0].kind,
            StmtKind::Expr { target: Some(path), .. } if path.dotted() == "out.sum"
        ));
    }

    #[test]
    fn spans_cover_whole_expressions() {
        let expr = only_expr("1 + 2");
        assert_eq!((expr.span.start_line, expr.span.start_col), (1, 1));
        assert_eq!((expr.span.end_line, expr.span.end_col), (1, 6));
    }
}

//! Lexer: UTF-8 source text → token stream.
//!
//! Longest-match scanning with a keyword table consulted only after a
//! greedy identifier scan, so a keyword prefix of a longer identifier
//! (`capture`, `fora`) lexes as one identifier. On the first unrecognized
//! character a single `E_LEX` diagnostic is returned and scanning stops.

use std::sync::Arc;

use crate::{
    diag::{Diagnostic, ErrorCode, Span},
    token::{Keyword, Token, TokenKind},
};

/// Lexes `source` into a token vector terminated by an `Eof` token.
pub fn lex(source: &str, file: &str) -> Result<Vec<Token>, Diagnostic> {
    Lexer::new(source, file).run()
}

struct Lexer<'a> {
    src: &'a str,
    file: Arc<str>,
    /// Byte offset of the next unread character.
    pos: usize,
    line: u32,
    col: u32,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str, file: &str) -> Self {
        Self {
            src,
            file: Arc::from(file),
            pos: 0,
            line: 1,
            col: 1,
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek2(&self) -> Option<char> {
        self.src[self.pos..].chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn mark(&self) -> (u32, u32) {
        (self.line, self.col)
    }

    fn span_from(&self, start: (u32, u32)) -> Span {
        Span::new(&self.file, start.0, start.1, self.line, self.col)
    }

    fn span_here(&self) -> Span {
        Span::new(&self.file, self.line, self.col, self.line, self.col + 1)
    }

    fn push(&mut self, kind: TokenKind, start: (u32, u32)) {
        let span = self.span_from(start);
        self.tokens.push(Token { kind, span });
    }

    fn error(&self, message: impl Into<String>, span: Span) -> Diagnostic {
        Diagnostic::new(ErrorCode::Lex, message).with_span(span)
    }

    fn run(mut self) -> Result<Vec<Token>, Diagnostic> {
        loop {
            self.skip_trivia();
            let Some(ch) = self.peek() else {
                break;
            };
            match ch {
                'a'..='z' | 'A'..='Z' | '_' => self.lex_word(),
                '0'..='9' => self.lex_number()?,
                '"' => self.lex_string()?,
                _ => self.lex_punct()?,
            }
        }
        let eof = self.mark();
        self.push(TokenKind::Eof, eof);
        Ok(self.tokens)
    }

    /// Whitespace and `#` line comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_word(&mut self) {
        let start = self.mark();
        let from = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let text = &self.src[from..self.pos];
        // `call` followed immediately by `?` extends to the compound token.
        if text == "call" && self.peek() == Some('?') {
            self.bump();
            self.push(TokenKind::CallQuery, start);
            return;
        }
        let kind = match Keyword::from_str(text) {
            Some(kw) => TokenKind::Kw(kw),
            None => TokenKind::Ident(text.to_owned()),
        };
        self.push(kind, start);
    }

    fn lex_number(&mut self) -> Result<(), Diagnostic> {
        let start = self.mark();
        let from = self.pos;
        while matches!(self.peek(), Some('0'..='9')) {
            self.bump();
        }
        let mut is_float = false;
        // A `.` only belongs to the number when a digit follows; otherwise it
        // is field access or spread and stays in the stream.
        if self.peek() == Some('.') && matches!(self.peek2(), Some('0'..='9')) {
            is_float = true;
            self.bump();
            while matches!(self.peek(), Some('0'..='9')) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let exp_digit = match self.peek2() {
                Some('+' | '-') => self.src[self.pos..].chars().nth(2),
                other => other,
            };
            if matches!(exp_digit, Some('0'..='9')) {
                is_float = true;
                self.bump();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.bump();
                }
                while matches!(self.peek(), Some('0'..='9')) {
                    self.bump();
                }
            }
        }
        let text = &self.src[from..self.pos];
        let kind = if is_float {
            match text.parse::<f64>() {
                Ok(v) => TokenKind::Float(v),
                Err(_) => return Err(self.error(format!("invalid float literal `{text}`"), self.span_from(start))),
            }
        } else {
            match text.parse::<i64>() {
                Ok(v) => TokenKind::Int(v),
                Err(_) => {
                    return Err(self.error(
                        format!("integer literal `{text}` is out of 64-bit range"),
                        self.span_from(start),
                    ));
                }
            }
        };
        self.push(kind, start);
        Ok(())
    }

    /// JSON-syntax string: double-quoted, `\" \\ \/ \b \f \n \r \t \uXXXX`,
    /// no raw newlines.
    fn lex_string(&mut self) -> Result<(), Diagnostic> {
        let start = self.mark();
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            let at = self.span_here();
            match self.bump() {
                None => return Err(self.error("unterminated string literal", self.span_from(start))),
                Some('"') => break,
                Some('\n') => return Err(self.error("raw newline in string literal", at)),
                Some('\\') => {
                    let esc_at = self.span_here();
                    match self.bump() {
                        Some('"') => value.push('"'),
                        Some('\\') => value.push('\\'),
                        Some('/') => value.push('/'),
                        Some('b') => value.push('\u{0008}'),
                        Some('f') => value.push('\u{000C}'),
                        Some('n') => value.push('\n'),
                        Some('r') => value.push('\r'),
                        Some('t') => value.push('\t'),
                        Some('u') => {
                            let ch = self.lex_unicode_escape(&esc_at)?;
                            value.push(ch);
                        }
                        Some(other) => {
                            return Err(self.error(format!("invalid escape `\\{other}`"), esc_at));
                        }
                        None => return Err(self.error("unterminated string literal", self.span_from(start))),
                    }
                }
                Some(c) => value.push(c),
            }
        }
        self.push(TokenKind::Str(value), start);
        Ok(())
    }

    /// Reads the four hex digits of a `\uXXXX` escape (the `\u` prefix is
    /// already consumed), pairing UTF-16 surrogates when needed.
    fn lex_unicode_escape(&mut self, at: &Span) -> Result<char, Diagnostic> {
        let unit = self.hex4(at)?;
        if (0xD800..=0xDBFF).contains(&unit) {
            // High surrogate: the low half must follow as another \uXXXX.
            if !(self.eat('\\') && self.eat('u')) {
                return Err(self.error("unpaired surrogate in \\u escape", at.clone()));
            }
            let low = self.hex4(at)?;
            if !(0xDC00..=0xDFFF).contains(&low) {
                return Err(self.error("unpaired surrogate in \\u escape", at.clone()));
            }
            let code = 0x10000 + ((u32::from(unit) - 0xD800) << 10) + (u32::from(low) - 0xDC00);
            return char::from_u32(code).ok_or_else(|| self.error("invalid \\u escape", at.clone()));
        }
        if (0xDC00..=0xDFFF).contains(&unit) {
            return Err(self.error("unpaired surrogate in \\u escape", at.clone()));
        }
        char::from_u32(u32::from(unit)).ok_or_else(|| self.error("invalid \\u escape", at.clone()))
    }

    fn hex4(&mut self, at: &Span) -> Result<u16, Diagnostic> {
        let mut value: u16 = 0;
        for _ in 0..4 {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("expected four hex digits after \\u", at.clone()))?;
            value = (value << 4) | u16::try_from(digit).unwrap_or(0);
        }
        Ok(value)
    }

    fn lex_punct(&mut self) -> Result<(), Diagnostic> {
        let start = self.mark();
        let at = self.span_here();
        let ch = self.bump().unwrap_or('\0');
        let kind = match ch {
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ':' => TokenKind::Colon,
            ',' => TokenKind::Comma,
            '+' => TokenKind::Plus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            // Longest match first for every multi-character operator.
            '-' => {
                if self.eat('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }
            '>' => {
                if self.eat('=') {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '<' => {
                if self.eat('=') {
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '=' => {
                if self.eat('=') {
                    TokenKind::EqEq
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                if self.eat('=') {
                    TokenKind::NotEq
                } else {
                    return Err(self.error("unexpected character `!`", at));
                }
            }
            '.' => {
                if self.peek() == Some('.') {
                    self.bump();
                    if self.eat('.') {
                        TokenKind::Ellipsis
                    } else {
                        return Err(self.error("unexpected `..` (spread is written `...`)", at));
                    }
                } else {
                    TokenKind::Dot
                }
            }
            other => return Err(self.error(format!("unexpected character `{other}`"), at)),
        };
        self.push(kind, start);
        Ok(())
    }
}

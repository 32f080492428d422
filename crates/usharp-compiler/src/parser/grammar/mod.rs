//! Recursive-descent parser core.
//!
//! The parser owns the token stream and the diagnostics it collects.
//! Member-level errors synchronize to the next declaration boundary so one
//! bad method does not hide the rest of the class.

mod expressions;
mod items;
mod statements;

use crate::diagnostics::Diagnostics;
use crate::parser::ast::ClassDecl;
use crate::parser::lexer::{lex, Token};
use crate::Span;

/// Parse one source class.
///
/// Returns the AST only when no errors were collected; partial trees are
/// never handed to the binder.
pub fn parse(source: &str) -> Result<ClassDecl, Diagnostics> {
    let (tokens, lex_errors) = lex(source);

    let mut diags = Diagnostics::new();
    for span in lex_errors {
        diags.error(span, "unexpected character");
    }

    let mut parser = Parser::new(tokens, source.len(), diags);
    let class = parser.parse_class();
    let diags = parser.finish();

    match class {
        Some(class) if !diags.has_errors() => Ok(class),
        _ => Err(diags),
    }
}

pub(crate) struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    diags: Diagnostics,
    eof: Span,
}

impl Parser {
    fn new(tokens: Vec<(Token, Span)>, source_len: usize, diags: Diagnostics) -> Self {
        Self {
            tokens,
            pos: 0,
            diags,
            eof: Span::new(source_len, source_len),
        }
    }

    fn finish(self) -> Diagnostics {
        self.diags
    }

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    pub(crate) fn peek_at(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|(t, _)| t)
    }

    /// Span of the current token, or the end of input.
    pub(crate) fn span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| *s)
            .unwrap_or(self.eof)
    }

    pub(crate) fn prev_span(&self) -> Span {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .map(|(_, s)| *s)
            .unwrap_or(self.eof)
    }

    pub(crate) fn bump(&mut self) -> Option<(Token, Span)> {
        let item = self.tokens.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    pub(crate) fn at(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    /// Consume the token when it matches.
    pub(crate) fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume a specific token or report an error.
    pub(crate) fn expect(&mut self, token: &Token, what: &str) -> Result<Span, ()> {
        if self.at(token) {
            let span = self.span();
            self.pos += 1;
            Ok(span)
        } else {
            self.error_here(format!("expected {what}"));
            Err(())
        }
    }

    /// Consume an identifier or report an error.
    pub(crate) fn expect_ident(&mut self, what: &str) -> Result<(String, Span), ()> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                let span = self.span();
                self.pos += 1;
                Ok((name, span))
            }
            _ => {
                self.error_here(format!("expected {what}"));
                Err(())
            }
        }
    }

    pub(crate) fn error_here(&mut self, message: impl Into<String>) {
        let span = self.span();
        self.diags.error(span, message);
    }

    pub(crate) fn error_at(&mut self, span: Span, message: impl Into<String>) {
        self.diags.error(span, message);
    }

    /// Skip to the next member boundary after an error: past the matching
    /// close brace of a method body, or past the next semicolon.
    pub(crate) fn sync_to_member(&mut self) {
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match token {
                Token::LBrace => depth += 1,
                Token::RBrace => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    if depth == 0 {
                        self.pos += 1;
                        return;
                    }
                }
                Token::Semi if depth == 0 => {
                    self.pos += 1;
                    return;
                }
                _ => {}
            }
            self.pos += 1;
        }
    }
}

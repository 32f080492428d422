//! Expression parsing: precedence climbing plus postfix forms.

use crate::parser::ast::{BinaryOp, Expr, InterpPart, TypeRef, UnaryOp};
use crate::parser::lexer::{lex, unescape, Token};
use crate::Span;

use super::Parser;

impl Parser {
    pub(crate) fn parse_expr(&mut self) -> Result<Expr, ()> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ()> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::OrOr) {
            let rhs = self.parse_and()?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ()> {
        let mut lhs = self.parse_equality()?;
        while self.eat(&Token::AndAnd) {
            let rhs = self.parse_equality()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, ()> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::Ne,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_relational()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Expr, ()> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_additive()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, ()> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ()> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    pub(crate) fn parse_unary(&mut self) -> Result<Expr, ()> {
        let op = match self.peek() {
            Some(Token::Minus) => Some(UnaryOp::Neg),
            Some(Token::Not) => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.span();
            self.pos += 1;
            let expr = self.parse_unary()?;
            let span = start.cover(expr.span());
            return Ok(Expr::Unary {
                op,
                expr: Box::new(expr),
                span,
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ()> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.eat(&Token::Dot) {
                let (name, name_span) = self.expect_ident("member name")?;
                if self.at(&Token::LParen) {
                    let (args, end) = self.parse_args()?;
                    let span = expr.span().cover(end);
                    expr = Expr::Call {
                        recv: Some(Box::new(expr)),
                        name,
                        args,
                        span,
                    };
                } else {
                    let span = expr.span().cover(name_span);
                    expr = Expr::Member {
                        recv: Box::new(expr),
                        name,
                        span,
                    };
                }
            } else if self.at(&Token::LBracket) {
                self.pos += 1;
                let index = self.parse_expr()?;
                let end = self.expect(&Token::RBracket, "']'")?;
                let span = expr.span().cover(end);
                expr = Expr::Index {
                    arr: Box::new(expr),
                    index: Box::new(index),
                    span,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn parse_args(&mut self) -> Result<(Vec<Expr>, Span), ()> {
        self.expect(&Token::LParen, "'('")?;
        let mut args = Vec::new();
        if !self.at(&Token::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        let end = self.expect(&Token::RParen, "')'")?;
        Ok((args, end))
    }

    fn parse_primary(&mut self) -> Result<Expr, ()> {
        let span = self.span();
        match self.peek().cloned() {
            Some(Token::IntLit(value)) => {
                self.pos += 1;
                Ok(Expr::IntLit {
                    value,
                    long: false,
                    span,
                })
            }
            Some(Token::LongLit(value)) => {
                self.pos += 1;
                Ok(Expr::IntLit {
                    value,
                    long: true,
                    span,
                })
            }
            Some(Token::SingleLit(value)) => {
                self.pos += 1;
                Ok(Expr::FloatLit {
                    value: value as f64,
                    single: true,
                    span,
                })
            }
            Some(Token::DoubleLit(value)) => {
                self.pos += 1;
                Ok(Expr::FloatLit {
                    value,
                    single: false,
                    span,
                })
            }
            Some(Token::True) => {
                self.pos += 1;
                Ok(Expr::BoolLit { value: true, span })
            }
            Some(Token::False) => {
                self.pos += 1;
                Ok(Expr::BoolLit { value: false, span })
            }
            Some(Token::Null) => {
                self.pos += 1;
                Ok(Expr::NullLit { span })
            }
            Some(Token::This) => {
                self.pos += 1;
                Ok(Expr::This { span })
            }
            Some(Token::StringLit(value)) => {
                self.pos += 1;
                Ok(Expr::StringLit { value, span })
            }
            Some(Token::InterpLit(raw)) => {
                self.pos += 1;
                let parts = self.split_interpolation(&raw, span)?;
                Ok(Expr::InterpString { parts, span })
            }
            Some(Token::Ident(name)) => {
                self.pos += 1;
                if self.at(&Token::LParen) {
                    let (args, end) = self.parse_args()?;
                    Ok(Expr::Call {
                        recv: None,
                        name,
                        args,
                        span: span.cover(end),
                    })
                } else {
                    Ok(Expr::Ident { name, span })
                }
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(expr)
            }
            Some(Token::New) => self.parse_new(),
            _ => {
                self.error_here("expected expression");
                Err(())
            }
        }
    }

    /// `new T[len]`, `new T[len][]` (jagged) or `new T[] { items }`.
    fn parse_new(&mut self) -> Result<Expr, ()> {
        let start = self.expect(&Token::New, "'new'")?;
        let elem_start = self.span();
        let name = match self.peek() {
            Some(token) if token.is_type_keyword() => {
                let name = token.type_keyword_name().expect("type keyword").to_string();
                self.pos += 1;
                name
            }
            Some(Token::Ident(n)) => {
                let name = n.clone();
                self.pos += 1;
                name
            }
            _ => {
                self.error_here("expected element type after 'new'");
                return Err(());
            }
        };

        self.expect(&Token::LBracket, "'['")?;

        if self.eat(&Token::RBracket) {
            // `new T[] { ... }`, with extra `[]` pairs raising element rank
            let extra_rank = self.parse_rank_suffix();
            self.expect(&Token::LBrace, "'{'")?;
            let mut items = Vec::new();
            if !self.at(&Token::RBrace) {
                loop {
                    items.push(self.parse_expr()?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
            }
            let end = self.expect(&Token::RBrace, "'}'")?;
            Ok(Expr::NewArray {
                elem: TypeRef {
                    name,
                    rank: extra_rank,
                    span: elem_start,
                },
                len: None,
                items: Some(items),
                span: start.cover(end),
            })
        } else {
            let len = self.parse_expr()?;
            let mut end = self.expect(&Token::RBracket, "']'")?;
            let extra_rank = self.parse_rank_suffix();
            if extra_rank > 0 {
                end = self.prev_span();
            }
            Ok(Expr::NewArray {
                elem: TypeRef {
                    name,
                    rank: extra_rank,
                    span: elem_start,
                },
                len: Some(Box::new(len)),
                items: None,
                span: start.cover(end),
            })
        }
    }

    fn parse_rank_suffix(&mut self) -> u8 {
        let mut rank = 0u8;
        while self.at(&Token::LBracket) && self.peek_at(1) == Some(&Token::RBracket) {
            self.pos += 2;
            rank += 1;
        }
        rank
    }

    /// Split the raw inner text of `$"..."` into text and expression parts.
    fn split_interpolation(&mut self, raw: &str, span: Span) -> Result<Vec<InterpPart>, ()> {
        let mut parts = Vec::new();
        let mut text = String::new();
        let mut chars = raw.char_indices().peekable();

        while let Some((idx, c)) = chars.next() {
            match c {
                '\\' => {
                    text.push(c);
                    if let Some((_, next)) = chars.next() {
                        text.push(next);
                    }
                }
                '{' => {
                    if !text.is_empty() {
                        match unescape(&text) {
                            Some(t) => parts.push(InterpPart::Text(t)),
                            None => {
                                self.error_at(span, "invalid escape in string");
                                return Err(());
                            }
                        }
                        text.clear();
                    }

                    let rest = &raw[idx + 1..];
                    let Some(close) = rest.find('}') else {
                        self.error_at(span, "unterminated interpolation hole");
                        return Err(());
                    };
                    let inner = &rest[..close];
                    let offset = span.start + 2 + idx + 1;
                    let expr = self.parse_sub_expression(inner, offset, span)?;
                    parts.push(InterpPart::Expr(expr));

                    // Skip the hole contents and the closing brace
                    while let Some(&(i, _)) = chars.peek() {
                        if i > idx + close + 1 {
                            break;
                        }
                        chars.next();
                    }
                }
                '}' => {
                    self.error_at(span, "unmatched '}' in interpolated string");
                    return Err(());
                }
                _ => text.push(c),
            }
        }

        if !text.is_empty() {
            match unescape(&text) {
                Some(t) => parts.push(InterpPart::Text(t)),
                None => {
                    self.error_at(span, "invalid escape in string");
                    return Err(());
                }
            }
        }

        Ok(parts)
    }

    /// Parse one interpolation hole as an expression, offsetting spans back
    /// into the enclosing source.
    fn parse_sub_expression(
        &mut self,
        inner: &str,
        offset: usize,
        hole_span: Span,
    ) -> Result<Expr, ()> {
        let (mut tokens, lex_errors) = lex(inner);
        if !lex_errors.is_empty() {
            self.error_at(hole_span, "unexpected character in interpolation hole");
            return Err(());
        }
        for (_, span) in &mut tokens {
            span.start += offset;
            span.end += offset;
        }

        let mut sub = Parser::new(tokens, offset + inner.len(), crate::Diagnostics::new());
        let expr = sub.parse_expr();
        let consumed_all = sub.peek().is_none();
        let sub_diags = sub.finish();

        for diag in sub_diags.iter() {
            self.error_at(diag.span, diag.message.clone());
        }
        let expr = expr?;
        if !consumed_all {
            self.error_at(hole_span, "trailing tokens in interpolation hole");
            return Err(());
        }
        Ok(expr)
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    let span = lhs.span().cover(rhs.span());
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        span,
    }
}

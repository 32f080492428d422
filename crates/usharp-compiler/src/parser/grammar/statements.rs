//! Block and statement parsing.

use crate::parser::ast::{BinaryOp, Block, Stmt, Visibility};
use crate::parser::lexer::Token;

use super::Parser;

impl Parser {
    pub(crate) fn parse_block(&mut self) -> Result<Block, ()> {
        let start = self.expect(&Token::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.at(&Token::RBrace) && self.peek().is_some() {
            stmts.push(self.parse_stmt()?);
        }
        let end = self.expect(&Token::RBrace, "'}'")?;
        Ok(Block {
            stmts,
            span: start.cover(end),
        })
    }

    /// A braced block, or a single statement wrapped in one.
    fn parse_block_or_single(&mut self) -> Result<Block, ()> {
        if self.at(&Token::LBrace) {
            return self.parse_block();
        }
        let stmt = self.parse_stmt()?;
        let span = stmt.span();
        Ok(Block {
            stmts: vec![stmt],
            span,
        })
    }

    pub(crate) fn parse_stmt(&mut self) -> Result<Stmt, ()> {
        match self.peek() {
            Some(Token::If) => self.parse_if(),
            Some(Token::While) => self.parse_while(),
            Some(Token::For) => self.parse_for(),
            Some(Token::Return) => self.parse_return(),
            Some(Token::PlusPlus) | Some(Token::MinusMinus) => {
                let start = self.span();
                let decrement = matches!(self.bump(), Some((Token::MinusMinus, _)));
                let target = self.parse_unary()?;
                let end = self.expect(&Token::Semi, "';'")?;
                Ok(Stmt::IncDec {
                    target,
                    decrement,
                    span: start.cover(end),
                })
            }
            _ if self.decl_lookahead() == Some(DeclKind::LocalFunc) => self.parse_local_func(),
            _ if self.decl_lookahead() == Some(DeclKind::Local) => self.parse_local(),
            _ => self.parse_expr_like_stmt(true),
        }
    }

    /// Decide whether the upcoming tokens declare a local (`T x ...`) or a
    /// local function (`T x(...)`), without consuming anything.
    fn decl_lookahead(&self) -> Option<DeclKind> {
        let mut i = 0usize;
        match self.peek_at(i) {
            Some(token) if token.is_type_keyword() => {}
            Some(Token::Ident(_)) => {}
            _ => return None,
        }
        i += 1;

        while self.peek_at(i) == Some(&Token::LBracket)
            && self.peek_at(i + 1) == Some(&Token::RBracket)
        {
            i += 2;
        }

        match self.peek_at(i) {
            Some(Token::Ident(_)) => {}
            _ => return None,
        }
        i += 1;

        match self.peek_at(i) {
            Some(Token::LParen) => Some(DeclKind::LocalFunc),
            _ => Some(DeclKind::Local),
        }
    }

    fn parse_local(&mut self) -> Result<Stmt, ()> {
        let start = self.span();
        let ty = self.parse_type_ref()?;
        let (name, name_span) = self.expect_ident("local name")?;
        let init = if self.eat(&Token::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let end = self.expect(&Token::Semi, "';'")?;
        Ok(Stmt::Local {
            ty,
            name,
            name_span,
            init,
            span: start.cover(end),
        })
    }

    fn parse_local_func(&mut self) -> Result<Stmt, ()> {
        let start = self.span();
        let ret = self.parse_type_ref()?;
        let (name, name_span) = self.expect_ident("function name")?;
        let method =
            self.parse_method_rest(Visibility::Private, ret, name, name_span, start)?;
        Ok(Stmt::LocalFunc(method))
    }

    fn parse_if(&mut self) -> Result<Stmt, ()> {
        let start = self.expect(&Token::If, "'if'")?;
        self.expect(&Token::LParen, "'('")?;
        let cond = self.parse_expr()?;
        self.expect(&Token::RParen, "')'")?;
        let then = self.parse_block_or_single()?;

        let mut els = None;
        let mut end = then.span;
        if self.eat(&Token::Else) {
            let block = self.parse_block_or_single()?;
            end = block.span;
            els = Some(block);
        }

        Ok(Stmt::If {
            cond,
            then,
            els,
            span: start.cover(end),
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, ()> {
        let start = self.expect(&Token::While, "'while'")?;
        self.expect(&Token::LParen, "'('")?;
        let cond = self.parse_expr()?;
        self.expect(&Token::RParen, "')'")?;
        let body = self.parse_block_or_single()?;
        let span = start.cover(body.span);
        Ok(Stmt::While { cond, body, span })
    }

    fn parse_for(&mut self) -> Result<Stmt, ()> {
        let start = self.expect(&Token::For, "'for'")?;
        self.expect(&Token::LParen, "'('")?;

        let init = if self.eat(&Token::Semi) {
            None
        } else if self.decl_lookahead() == Some(DeclKind::Local) {
            Some(Box::new(self.parse_local()?))
        } else {
            Some(Box::new(self.parse_expr_like_stmt(true)?))
        };

        let cond = if self.at(&Token::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(&Token::Semi, "';'")?;

        let step = if self.at(&Token::RParen) {
            None
        } else {
            Some(Box::new(self.parse_step_stmt()?))
        };
        self.expect(&Token::RParen, "')'")?;

        let body = self.parse_block_or_single()?;
        let span = start.cover(body.span);
        Ok(Stmt::For {
            init,
            cond,
            step,
            body,
            span,
        })
    }

    /// The step slot of a `for` header: assignment or increment, no `;`.
    fn parse_step_stmt(&mut self) -> Result<Stmt, ()> {
        if matches!(self.peek(), Some(Token::PlusPlus) | Some(Token::MinusMinus)) {
            let start = self.span();
            let decrement = matches!(self.bump(), Some((Token::MinusMinus, _)));
            let target = self.parse_unary()?;
            let span = start.cover(target.span());
            return Ok(Stmt::IncDec {
                target,
                decrement,
                span,
            });
        }
        self.parse_expr_like_stmt(false)
    }

    fn parse_return(&mut self) -> Result<Stmt, ()> {
        let start = self.expect(&Token::Return, "'return'")?;
        let value = if self.at(&Token::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        let end = self.expect(&Token::Semi, "';'")?;
        Ok(Stmt::Return {
            value,
            span: start.cover(end),
        })
    }

    /// Expression statement, assignment or postfix increment.
    fn parse_expr_like_stmt(&mut self, eat_semi: bool) -> Result<Stmt, ()> {
        let start = self.span();
        let expr = self.parse_expr()?;

        let assign_op = match self.peek() {
            Some(Token::Assign) => Some(None),
            Some(Token::PlusAssign) => Some(Some(BinaryOp::Add)),
            Some(Token::MinusAssign) => Some(Some(BinaryOp::Sub)),
            Some(Token::StarAssign) => Some(Some(BinaryOp::Mul)),
            Some(Token::SlashAssign) => Some(Some(BinaryOp::Div)),
            _ => None,
        };

        let stmt = if let Some(op) = assign_op {
            self.pos += 1;
            let value = self.parse_expr()?;
            let span = start.cover(value.span());
            Stmt::Assign {
                target: expr,
                op,
                value,
                span,
            }
        } else if matches!(self.peek(), Some(Token::PlusPlus) | Some(Token::MinusMinus)) {
            let decrement = matches!(self.bump(), Some((Token::MinusMinus, _)));
            let span = start.cover(self.prev_span());
            Stmt::IncDec {
                target: expr,
                decrement,
                span,
            }
        } else {
            Stmt::Expr(expr)
        };

        if eat_semi {
            self.expect(&Token::Semi, "';'")?;
        }
        Ok(stmt)
    }
}

#[derive(PartialEq, Eq)]
enum DeclKind {
    Local,
    LocalFunc,
}

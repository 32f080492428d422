//! Class, attribute, field and method parsing.

use crate::parser::ast::{
    AttrArg, AttributeUse, ClassDecl, FieldDecl, MethodDecl, Param, TypeRef, Visibility,
};
use crate::parser::lexer::Token;
use crate::Span;

use super::Parser;

impl Parser {
    pub(crate) fn parse_class(&mut self) -> Option<ClassDecl> {
        let start = self.span();

        let _visibility = self.parse_visibility();
        if self.expect(&Token::Class, "'class'").is_err() {
            return None;
        }
        let (name, name_span) = self.expect_ident("class name").ok()?;

        let mut base = None;
        let mut base_span = name_span;
        if self.eat(&Token::Colon) {
            let (base_name, span) = self.expect_ident("base type name").ok()?;
            base = Some(base_name);
            base_span = span;
        }

        self.expect(&Token::LBrace, "'{'").ok()?;

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !self.at(&Token::RBrace) && self.peek().is_some() {
            match self.parse_member() {
                Ok(Member::Field(field)) => fields.push(field),
                Ok(Member::Method(method)) => methods.push(method),
                Err(()) => self.sync_to_member(),
            }
        }
        let end = self.span();
        self.expect(&Token::RBrace, "'}'").ok()?;

        if self.peek().is_some() {
            self.error_here("expected end of input after class body");
            return None;
        }

        Some(ClassDecl {
            name,
            name_span,
            base,
            base_span,
            fields,
            methods,
            span: start.cover(end),
        })
    }

    fn parse_visibility(&mut self) -> Option<Visibility> {
        if self.eat(&Token::Public) {
            Some(Visibility::Public)
        } else if self.eat(&Token::Private) {
            Some(Visibility::Private)
        } else {
            None
        }
    }

    fn parse_member(&mut self) -> Result<Member, ()> {
        let start = self.span();
        let attrs = self.parse_attributes()?;
        let visibility = self.parse_visibility().unwrap_or_default();
        let ty = self.parse_type_ref()?;
        let (name, name_span) = self.expect_ident("member name")?;

        if self.at(&Token::LParen) {
            let method = self.parse_method_rest(visibility, ty, name, name_span, start)?;
            Ok(Member::Method(method))
        } else {
            let init = if self.eat(&Token::Assign) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            let end = self.expect(&Token::Semi, "';'")?;
            Ok(Member::Field(FieldDecl {
                attrs,
                visibility,
                ty,
                name,
                name_span,
                init,
                span: start.cover(end),
            }))
        }
    }

    pub(crate) fn parse_method_rest(
        &mut self,
        visibility: Visibility,
        ret: TypeRef,
        name: String,
        name_span: Span,
        start: Span,
    ) -> Result<MethodDecl, ()> {
        self.expect(&Token::LParen, "'('")?;
        let mut params = Vec::new();
        if !self.at(&Token::RParen) {
            loop {
                let param_start = self.span();
                let ty = self.parse_type_ref()?;
                let (name, name_span) = self.expect_ident("parameter name")?;
                params.push(Param {
                    ty,
                    name,
                    span: param_start.cover(name_span),
                });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen, "')'")?;

        let body = self.parse_block()?;
        let span = start.cover(body.span);

        Ok(MethodDecl {
            visibility,
            ret,
            name,
            name_span,
            params,
            body,
            span,
        })
    }

    fn parse_attributes(&mut self) -> Result<Vec<AttributeUse>, ()> {
        let mut attrs = Vec::new();
        while self.at(&Token::LBracket) {
            let start = self.span();
            self.expect(&Token::LBracket, "'['")?;
            let (name, _) = self.expect_ident("attribute name")?;

            let mut args = Vec::new();
            if self.eat(&Token::LParen) {
                if !self.at(&Token::RParen) {
                    loop {
                        args.push(self.parse_attr_arg()?);
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&Token::RParen, "')'")?;
            }

            let end = self.expect(&Token::RBracket, "']'")?;
            attrs.push(AttributeUse {
                name,
                args,
                span: start.cover(end),
            });
        }
        Ok(attrs)
    }

    fn parse_attr_arg(&mut self) -> Result<AttrArg, ()> {
        let negative = self.eat(&Token::Minus);
        match self.bump() {
            Some((Token::IntLit(v), _)) | Some((Token::LongLit(v), _)) => {
                Ok(AttrArg::Int(if negative { -v } else { v }))
            }
            Some((Token::DoubleLit(v), _)) => Ok(AttrArg::Float(if negative { -v } else { v })),
            Some((Token::SingleLit(v), _)) => {
                Ok(AttrArg::Float(if negative { -v as f64 } else { v as f64 }))
            }
            Some((Token::StringLit(s), _)) if !negative => Ok(AttrArg::Str(s)),
            Some((Token::True, _)) if !negative => Ok(AttrArg::Bool(true)),
            Some((Token::False, _)) if !negative => Ok(AttrArg::Bool(false)),
            Some((Token::Ident(name), _)) if !negative => Ok(AttrArg::Ident(name)),
            _ => {
                self.error_at(self.prev_span(), "expected attribute argument");
                Err(())
            }
        }
    }

    /// Parse `Name` / `int` with any number of `[]` suffixes.
    pub(crate) fn parse_type_ref(&mut self) -> Result<TypeRef, ()> {
        let start = self.span();
        let name = match self.peek() {
            Some(token) if token.is_type_keyword() => {
                let name = token.type_keyword_name().expect("type keyword").to_string();
                self.pos += 1;
                name
            }
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                name
            }
            _ => {
                self.error_here("expected type");
                return Err(());
            }
        };

        let mut rank = 0u8;
        let mut end = start;
        while self.at(&Token::LBracket) && self.peek_at(1) == Some(&Token::RBracket) {
            self.pos += 1;
            end = self.span();
            self.pos += 1;
            rank += 1;
        }

        Ok(TypeRef {
            name,
            rank,
            span: start.cover(end),
        })
    }
}

pub(crate) enum Member {
    Field(FieldDecl),
    Method(MethodDecl),
}

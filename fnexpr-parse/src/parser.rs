#![forbid(unsafe_code)]

use std::mem;

use fnexpr_ast::{span_between, BinOp, Expr, ExprKind, Ident, Span, UnaryOp};
use fnexpr_lex::{MAX_INT_MAGNITUDE, Token, TokenKind};

use crate::error::ParseError;

pub struct Parser<'a> {
    tokens: &'a [Token],
    idx: usize,
    /// When set, errors are collected and replaced by `ExprKind::Error` nodes.
    recover: bool,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            idx: 0,
            recover: false,
            errors: Vec::new(),
        }
    }

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_cmp_expr()
    }

    pub fn parse_expr_eof(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expr()?;
        if !self.at(TokenKind::Eof) {
            return Err(self.unexpected("end of input"));
        }
        Ok(expr)
    }

    /// Parse a whole expression while attempting to recover from errors.
    ///
    /// Every malformed operand becomes an `ExprKind::Error` node; the returned
    /// list holds one `ParseError` per recovery point, in source order.
    pub fn parse_expr_with_recovery(&mut self) -> (Expr, Vec<ParseError>) {
        self.recover = true;
        self.errors.clear();

        let expr = match self.parse_expr() {
            Ok(expr) => expr,
            Err(err) => {
                let span = err.span;
                self.errors.push(err);
                Expr::error(span)
            }
        };
        if !self.at(TokenKind::Eof) {
            let err = self.unexpected("end of input");
            self.errors.push(err);
        }

        self.recover = false;
        (expr, mem::take(&mut self.errors))
    }

    fn parse_cmp_expr(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_add_expr()?;
        let op = match self.peek_kind() {
            Some(TokenKind::EqEq) => Some(BinOp::Eq),
            Some(TokenKind::Lt) => Some(BinOp::Lt),
            Some(TokenKind::Gt) => Some(BinOp::Gt),
            Some(TokenKind::Le) => Some(BinOp::Le),
            Some(TokenKind::Ge) => Some(BinOp::Ge),
            _ => None,
        };

        let Some(op) = op else { return Ok(left) };
        self.next();
        let right = self.parse_add_expr()?;
        let expr = binary(left, op, right);

        // Chained comparisons like `a < b < c` are rejected; the comparison
        // functions return bool, which has no ordering overloads.
        if matches!(
            self.peek_kind(),
            Some(TokenKind::EqEq | TokenKind::Lt | TokenKind::Gt | TokenKind::Le | TokenKind::Ge)
        ) {
            let span = self.peek_span().unwrap_or(expr.span);
            return Err(ParseError {
                message: "chained comparisons are not supported; use parentheses".to_string(),
                span,
            });
        }

        Ok(expr)
    }

    fn parse_add_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_mul_expr()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinOp::Add,
                Some(TokenKind::Minus) => BinOp::Sub,
                _ => break,
            };
            self.next();
            let right = self.parse_mul_expr()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_mul_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary_expr()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinOp::Mul,
                Some(TokenKind::Slash) => BinOp::Div,
                _ => break,
            };
            self.next();
            let right = self.parse_unary_expr()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr, ParseError> {
        if let Some(TokenKind::Minus) = self.peek_kind() {
            let minus_span = self.peek_span().unwrap_or_else(|| span_between(0, 0));
            self.next();
            if let Some(literal) = self.take_negated_max_magnitude(minus_span) {
                return Ok(literal);
            }
            let expr = self.parse_unary_expr()?;
            let span = join(minus_span, expr.span);
            return Ok(Expr {
                span,
                kind: ExprKind::Unary {
                    op: UnaryOp::Neg,
                    expr: Box::new(expr),
                },
            });
        }
        self.parse_power_expr()
    }

    /// `-2147483648` as one literal, unless the digits bind tighter than the
    /// minus (`-2147483648 ** 2`, `-2147483648.x`).
    fn take_negated_max_magnitude(&mut self, minus_span: Span) -> Option<Expr> {
        let Some(Token {
            kind: TokenKind::Int(MAX_INT_MAGNITUDE),
            span,
        }) = self.peek().cloned()
        else {
            return None;
        };
        let follows = self.tokens.get(self.idx + 1).map(|t| &t.kind);
        if matches!(follows, Some(TokenKind::StarStar | TokenKind::Dot)) {
            return None;
        }
        self.next();
        Some(Expr::new(join(minus_span, span), ExprKind::IntLit(i32::MIN)))
    }

    // `**` is right-associative and its right operand may itself be negated:
    // `2 ** -1`, `-2 ** 2 == -(2 ** 2)`.
    fn parse_power_expr(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_postfix_expr()?;
        if !self.at(TokenKind::StarStar) {
            return Ok(base);
        }
        self.next();
        let exponent = self.parse_unary_expr()?;
        Ok(binary(base, BinOp::Pow, exponent))
    }

    fn parse_postfix_expr(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary_expr()?;
        while self.at(TokenKind::Dot) {
            self.next();
            let name = self.expect_ident()?;
            if self.at(TokenKind::LParen) {
                self.next();
                let args = self.parse_args()?;
                let rp_span = self.expect_closing_paren()?;
                let span = join(expr.span, rp_span);
                expr = Expr {
                    span,
                    kind: ExprKind::MethodCall {
                        receiver: Box::new(expr),
                        name,
                        args,
                    },
                };
            } else {
                let span = join(expr.span, name.span);
                expr = Expr {
                    span,
                    kind: ExprKind::Attribute {
                        base: Box::new(expr),
                        name,
                    },
                };
            }
        }
        Ok(expr)
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.at(TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if self.at(TokenKind::Comma) {
                self.next();
                continue;
            }
            break;
        }
        Ok(args)
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, ParseError> {
        let Some(tok) = self.peek().cloned() else {
            return Err(ParseError {
                message: "unexpected end of input".to_string(),
                span: span_between(0, 0),
            });
        };

        match tok.kind {
            TokenKind::Int(n) => {
                let Ok(value) = i32::try_from(n) else {
                    return Err(ParseError {
                        message: format!("integer literal {n} is out of range"),
                        span: tok.span,
                    });
                };
                self.next();
                Ok(Expr::new(tok.span, ExprKind::IntLit(value)))
            }
            TokenKind::Float(f) => {
                self.next();
                Ok(Expr::new(tok.span, ExprKind::FloatLit(f)))
            }
            TokenKind::String(s) => {
                self.next();
                Ok(Expr::new(tok.span, ExprKind::StringLit(s)))
            }
            TokenKind::Ident(name) => {
                self.next();
                let ident = Ident::new(tok.span, name);
                if !self.at(TokenKind::LParen) {
                    return Ok(Expr::new(tok.span, ExprKind::Ident(ident)));
                }
                self.next();
                let args = self.parse_args()?;
                let rp_span = self.expect_closing_paren()?;
                Ok(Expr::new(
                    join(tok.span, rp_span),
                    ExprKind::Call { name: ident, args },
                ))
            }
            TokenKind::LParen => {
                self.next();
                let expr = self.parse_expr()?;
                self.expect_closing_paren()?;
                Ok(expr)
            }
            _ => {
                let err = ParseError {
                    message: format!("expected an expression, found {}", tok.kind.describe()),
                    span: tok.span,
                };
                self.recover_operand(err)
            }
        }
    }

    /// In recovery mode: record `err`, skip to the next `,` / `)` / end of
    /// input and stand in an error node for the missing operand.
    fn recover_operand(&mut self, err: ParseError) -> Result<Expr, ParseError> {
        if !self.recover {
            return Err(err);
        }
        let span = err.span;
        self.errors.push(err);
        while !matches!(
            self.peek_kind(),
            None | Some(TokenKind::Comma | TokenKind::RParen | TokenKind::Eof)
        ) {
            self.next();
        }
        Ok(Expr::error(span))
    }

    fn expect_closing_paren(&mut self) -> Result<Span, ParseError> {
        if self.at(TokenKind::RParen) {
            let span = self.peek_span().unwrap_or_else(|| span_between(0, 0));
            self.next();
            return Ok(span);
        }
        let err = self.unexpected("')'");
        if self.recover {
            let span = err.span;
            self.errors.push(err);
            return Ok(span);
        }
        Err(err)
    }

    fn expect_ident(&mut self) -> Result<Ident, ParseError> {
        let tok = self.expect_any()?;
        match tok.kind {
            TokenKind::Ident(name) => Ok(Ident {
                span: tok.span,
                node: name,
            }),
            other => Err(ParseError {
                message: format!("expected identifier, found {}", other.describe()),
                span: tok.span,
            }),
        }
    }

    fn expect_any(&mut self) -> Result<Token, ParseError> {
        self.next().ok_or_else(|| ParseError {
            message: "unexpected end of input".to_string(),
            span: span_between(0, 0),
        })
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let (found, span) = match self.peek() {
            Some(tok) => (tok.kind.describe(), tok.span),
            None => ("end of input".to_string(), span_between(0, 0)),
        };
        ParseError {
            message: format!("expected {expected}, found {found}"),
            span,
        }
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind()
            .is_some_and(|k| mem::discriminant(k) == mem::discriminant(&kind))
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.idx)?.clone();
        self.idx += 1;
        Some(tok)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.idx)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn peek_span(&self) -> Option<Span> {
        self.peek().map(|t| t.span)
    }
}

fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
    let span = join(left.span, right.span);
    Expr {
        span,
        kind: ExprKind::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
    }
}

fn join(a: Span, b: Span) -> Span {
    let a0: usize = a.offset();
    let b0: usize = b.offset();
    let b1 = b0 + b.len();
    if b0 >= a0 {
        span_between(a0, b1.max(a0 + a.len()))
    } else {
        let a1 = a0 + a.len();
        span_between(b0, a1)
    }
}

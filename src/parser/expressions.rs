//! Expression parsing.
//!
//! The grammar hands each precedence level an already-parsed unary seed:
//! `Expr = Unary EqExpr`, and every operator tail parses `Unary` before
//! descending. Multiplication binds tightest, then addition, then the
//! logical connectives, and equality/relational operators bind loosest:
//! logical operators bind tighter than comparisons here, unlike C.

use crate::ast::{BinaryOp, ExprId, ExprKind, LitKind, UnaryOp, Value};
use crate::scanner::TokenKind;
use crate::types::Type;

use super::{ParseResult, Parser, EXPR_START};

fn rel_op(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Eq => Some(BinaryOp::Eq),
        TokenKind::Neq => Some(BinaryOp::Neq),
        TokenKind::Lt => Some(BinaryOp::Lt),
        TokenKind::Leq => Some(BinaryOp::Leq),
        TokenKind::Gt => Some(BinaryOp::Gt),
        TokenKind::Geq => Some(BinaryOp::Geq),
        _ => None,
    }
}

fn log_op(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::And => Some(BinaryOp::And),
        TokenKind::Or => Some(BinaryOp::Or),
        TokenKind::Xor => Some(BinaryOp::Xor),
        _ => None,
    }
}

fn add_op(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Plus => Some(BinaryOp::Add),
        TokenKind::Minus => Some(BinaryOp::Sub),
        _ => None,
    }
}

fn mul_op(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Star => Some(BinaryOp::Mul),
        TokenKind::Slash => Some(BinaryOp::Div),
        TokenKind::Percent => Some(BinaryOp::Rem),
        _ => None,
    }
}

impl<'a> Parser<'a> {
    pub(crate) fn expr(&mut self) -> ParseResult<ExprId> {
        let seed = self.unary()?;
        self.eq_expr(seed)
    }

    fn eq_expr(&mut self, seed: ExprId) -> ParseResult<ExprId> {
        let mut left = self.log_expr(seed)?;
        while let Some(op) = rel_op(self.la.kind) {
            let token = self.la.clone();
            self.get()?;
            let unary = self.unary()?;
            let right = self.log_expr(unary)?;
            left = self.alloc_expr(
                ExprKind::Binary {
                    op,
                    lhs: left,
                    rhs: right,
                },
                token,
            );
        }
        Ok(left)
    }

    fn log_expr(&mut self, seed: ExprId) -> ParseResult<ExprId> {
        let mut left = self.add_expr(seed)?;
        while let Some(op) = log_op(self.la.kind) {
            let token = self.la.clone();
            self.get()?;
            let unary = self.unary()?;
            let right = self.add_expr(unary)?;
            left = self.alloc_expr(
                ExprKind::Binary {
                    op,
                    lhs: left,
                    rhs: right,
                },
                token,
            );
        }
        Ok(left)
    }

    fn add_expr(&mut self, seed: ExprId) -> ParseResult<ExprId> {
        let mut left = self.mul_expr(seed)?;
        while let Some(op) = add_op(self.la.kind) {
            let token = self.la.clone();
            self.get()?;
            let unary = self.unary()?;
            let right = self.mul_expr(unary)?;
            left = self.alloc_expr(
                ExprKind::Binary {
                    op,
                    lhs: left,
                    rhs: right,
                },
                token,
            );
        }
        Ok(left)
    }

    fn mul_expr(&mut self, seed: ExprId) -> ParseResult<ExprId> {
        let mut left = seed;
        while let Some(op) = mul_op(self.la.kind) {
            let token = self.la.clone();
            self.get()?;
            let right = self.unary()?;
            left = self.alloc_expr(
                ExprKind::Binary {
                    op,
                    lhs: left,
                    rhs: right,
                },
                token,
            );
        }
        Ok(left)
    }

    pub(crate) fn unary(&mut self) -> ParseResult<ExprId> {
        let token = self.la.clone();
        match self.la.kind {
            TokenKind::Minus => {
                self.get()?;
                let operand = self.unary()?;
                Ok(self.alloc_expr(
                    ExprKind::Unary {
                        op: UnaryOp::Neg,
                        operand,
                    },
                    token,
                ))
            }
            TokenKind::Bang => {
                self.get()?;
                let operand = self.unary()?;
                Ok(self.alloc_expr(
                    ExprKind::Unary {
                        op: UnaryOp::Not,
                        operand,
                    },
                    token,
                ))
            }
            TokenKind::LBrace => {
                // look past the brace before committing to the cast form
                if self.peek_kind()? != TokenKind::Int {
                    self.syn_err("'int' expected");
                }
                self.get()?;
                if self.check(TokenKind::Int) {
                    self.get()?;
                }
                self.expect(TokenKind::RBrace)?;
                let operand = self.unary()?;
                Ok(self.alloc_expr(
                    ExprKind::Cast {
                        target: Type::INT,
                        operand,
                    },
                    token,
                ))
            }
            TokenKind::Ident => self.designator(),
            TokenKind::LParen => {
                self.get()?;
                let inner = self.expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::IntLit => {
                self.get()?;
                Ok(self.alloc_expr(ExprKind::Literal(LitKind::Int), token))
            }
            TokenKind::RealLit => {
                self.get()?;
                Ok(self.alloc_expr(ExprKind::Literal(LitKind::Real), token))
            }
            TokenKind::StringLit => {
                self.get()?;
                Ok(self.alloc_expr(ExprKind::Literal(LitKind::Str), token))
            }
            TokenKind::True => {
                self.get()?;
                Ok(self.alloc_expr(ExprKind::Literal(LitKind::True), token))
            }
            TokenKind::False => {
                self.get()?;
                Ok(self.alloc_expr(ExprKind::Literal(LitKind::False), token))
            }
            _ => {
                self.syn_err("invalid expression");
                Ok(self.alloc_expr(ExprKind::Const(Value::Int(0)), token))
            }
        }
    }

    /// `ident { '.' ident }` optionally followed by call arguments or an
    /// indexer; a dotted name stays one reference, resolved later against
    /// the scope chain.
    fn designator(&mut self) -> ParseResult<ExprId> {
        let token = self.la.clone();
        let mut name = String::from(self.la.text.as_str());
        self.get()?;
        while self.check(TokenKind::Dot) {
            self.get()?;
            let part = self.expect_ident()?;
            name.push('.');
            name.push_str(&part);
        }

        if self.check(TokenKind::LParen) {
            self.get()?;
            let mut args = Vec::new();
            if EXPR_START.contains(&self.la.kind) {
                args.push(self.expr()?);
                while self.check(TokenKind::Comma) {
                    self.get()?;
                    args.push(self.expr()?);
                }
            }
            self.expect(TokenKind::RParen)?;
            Ok(self.alloc_expr(
                ExprKind::Call {
                    name: name.into(),
                    args,
                    target: None,
                },
                token,
            ))
        } else if self.check(TokenKind::LBracket) {
            self.get()?;
            let base = self.alloc_expr(
                ExprKind::Name {
                    name: name.into(),
                    binding: None,
                },
                token.clone(),
            );
            let mut indices = vec![self.expr()?];
            while self.check(TokenKind::Comma) {
                self.get()?;
                indices.push(self.expr()?);
            }
            self.expect(TokenKind::RBracket)?;
            Ok(self.alloc_expr(ExprKind::Index { base, indices }, token))
        } else {
            Ok(self.alloc_expr(
                ExprKind::Name {
                    name: name.into(),
                    binding: None,
                },
                token,
            ))
        }
    }
}

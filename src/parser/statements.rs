//! Statement and block parsing.

use crate::ast::{ForDir, StmtId, StmtKind};
use crate::scanner::TokenKind;

use super::{ParseResult, Parser, EXPR_START, STMT_FOLLOW, STMT_START};

impl<'a> Parser<'a> {
    /// `begin { Stmt } end`
    pub(crate) fn block(&mut self) -> ParseResult<StmtId> {
        let token = self.la.clone();
        self.expect(TokenKind::Begin)?;
        let mut list = Vec::new();
        loop {
            if self.check(TokenKind::End) || self.check(TokenKind::Eof) {
                break;
            }
            if STMT_START.contains(&self.la.kind) {
                list.push(self.statement()?);
            } else {
                self.syn_err("statement expected");
                while !STMT_START.contains(&self.la.kind)
                    && !matches!(self.la.kind, TokenKind::End | TokenKind::Eof)
                {
                    self.get()?;
                }
            }
        }
        self.expect(TokenKind::End)?;
        Ok(self.alloc_stmt(StmtKind::Block(list), token))
    }

    pub(crate) fn statement(&mut self) -> ParseResult<StmtId> {
        let token = self.la.clone();
        match self.la.kind {
            TokenKind::Begin => self.block(),
            TokenKind::Return => {
                self.get()?;
                let expr = if EXPR_START.contains(&self.la.kind) {
                    Some(self.expr()?)
                } else {
                    None
                };
                self.expect_weak(TokenKind::Semicolon, STMT_FOLLOW)?;
                Ok(self.alloc_stmt(StmtKind::Return(expr), token))
            }
            TokenKind::If => {
                self.get()?;
                self.expect(TokenKind::LParen)?;
                let cond = self.expr()?;
                self.expect(TokenKind::RParen)?;
                let then_branch = self.statement()?;
                let else_branch = if self.check(TokenKind::Else) {
                    self.get()?;
                    Some(self.statement()?)
                } else {
                    None
                };
                Ok(self.alloc_stmt(
                    StmtKind::If {
                        cond,
                        then_branch,
                        else_branch,
                    },
                    token,
                ))
            }
            TokenKind::While => {
                self.get()?;
                self.expect(TokenKind::LParen)?;
                let cond = self.expr()?;
                self.expect(TokenKind::RParen)?;
                let body = self.statement()?;
                Ok(self.alloc_stmt(StmtKind::While { cond, body }, token))
            }
            TokenKind::Do => {
                self.get()?;
                let body = self.statement()?;
                self.expect(TokenKind::While)?;
                self.expect(TokenKind::LParen)?;
                let cond = self.expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(self.alloc_stmt(StmtKind::DoWhile { body, cond }, token))
            }
            TokenKind::For => {
                self.get()?;
                let var = self.expr()?;
                self.expect(TokenKind::Assign)?;
                let from = self.expr()?;
                let dir = match self.la.kind {
                    TokenKind::To => {
                        self.get()?;
                        ForDir::Up
                    }
                    TokenKind::Downto => {
                        self.get()?;
                        ForDir::Down
                    }
                    _ => {
                        self.syn_err("'to' or 'downto' expected");
                        ForDir::Up
                    }
                };
                let to = self.expr()?;
                self.expect(TokenKind::Do)?;
                let body = self.statement()?;
                Ok(self.alloc_stmt(
                    StmtKind::For {
                        var,
                        from,
                        to,
                        dir,
                        body,
                    },
                    token,
                ))
            }
            // CallOrAssign: an expression, optionally the target of '='; the
            // evaluator verifies assignability of the left side.
            _ => {
                let lhs = self.expr()?;
                let stmt = if self.check(TokenKind::Assign) {
                    self.get()?;
                    let rhs = self.expr()?;
                    self.alloc_stmt(StmtKind::Assign { lhs, rhs }, token)
                } else {
                    self.alloc_stmt(StmtKind::Call(lhs), token)
                };
                self.expect_weak(TokenKind::Semicolon, STMT_FOLLOW)?;
                Ok(stmt)
            }
        }
    }
}

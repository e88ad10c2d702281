//! Statement typing, `returns` analysis, and dead-code removal.

use crate::ast::{ExprKind, FuncId, Stmt, StmtId, StmtKind, Value};
use crate::scope::ScopeId;
use crate::types::Type;

use super::Evaluator;

impl<'a> Evaluator<'a> {
    pub(crate) fn eval_stmt(&mut self, scope: ScopeId, func: FuncId, id: StmtId) {
        let kind = self.prog.stmts[id].kind.clone();
        let token = self.prog.stmts[id].token.clone();
        match kind {
            StmtKind::Block(list) => {
                let mut returns = false;
                let mut kept = Vec::with_capacity(list.len());
                for &s in &list {
                    if returns {
                        let tok = self.prog.stmts[s].token.clone();
                        self.warn_at(&tok, "unreachable code detected");
                        break;
                    }
                    self.eval_stmt(scope, func, s);
                    if self.prog.stmts[s].returns {
                        returns = true;
                    }
                    kept.push(s);
                }
                self.prog.stmts[id].kind = StmtKind::Block(kept);
                self.prog.stmts[id].returns = returns;
            }

            StmtKind::Assign { lhs, rhs } => {
                let lt = self.eval_expr(scope, lhs);
                if !self.prog.exprs[lhs].is_assignable() {
                    let ltok = self.prog.exprs[lhs].token.clone();
                    self.error_at(&ltok, "target of assignment is not a variable");
                }
                let rt = self.eval_expr(scope, rhs);
                if lt.is_unsupported() || rt.is_unsupported() || rt == lt {
                    // nothing to insert; failures were already reported
                } else if rt.coerces_to(&lt) {
                    let rhs = self.coerce(rhs, &lt);
                    self.prog.stmts[id].kind = StmtKind::Assign { lhs, rhs };
                } else {
                    self.error_at(&token, "incompatible types in assignment");
                }
                self.prog.stmts[id].returns = false;
            }

            StmtKind::Call(expr) => {
                self.eval_expr(scope, expr);
                if !matches!(self.prog.exprs[expr].kind, ExprKind::Call { .. }) {
                    let ty = self.ty_of(expr);
                    if !ty.is_unsupported() {
                        self.error_at(&token, "only calls may be used as statements");
                    }
                }
                self.prog.stmts[id].returns = false;
            }

            StmtKind::Return(expr) => {
                let ret = self.prog.funcs[func].ret.clone();
                match expr {
                    Some(e) => {
                        let ty = self.eval_expr(scope, e);
                        if ret.is_void() {
                            self.error_at(&token, "void function cannot return a value");
                        } else if ty.is_unsupported() || ty == ret {
                            // fine as is
                        } else if ty.coerces_to(&ret) {
                            let e = self.coerce(e, &ret);
                            self.prog.stmts[id].kind = StmtKind::Return(Some(e));
                        } else {
                            self.error_at(&token, "incompatible return type");
                        }
                    }
                    None => {
                        if !ret.is_void() {
                            self.error_at(&token, "function must return a value");
                        }
                    }
                }
                self.prog.stmts[id].returns = true;
            }

            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.check_condition(scope, cond);
                self.eval_stmt(scope, func, then_branch);
                if let Some(e) = else_branch {
                    self.eval_stmt(scope, func, e);
                }
                // a constant condition replaces the whole statement with the
                // taken branch (or nothing)
                if let Some(Value::Bool(b)) = self.const_value(cond) {
                    let replacement = if b {
                        Some(then_branch)
                    } else {
                        else_branch
                    };
                    match replacement {
                        Some(taken) => {
                            let taken = self.prog.stmts[taken].clone();
                            self.prog.stmts[id] = taken;
                        }
                        None => {
                            self.prog.stmts[id] = Stmt {
                                kind: StmtKind::Block(Vec::new()),
                                token,
                                returns: false,
                            };
                        }
                    }
                    return;
                }
                let then_returns = self.prog.stmts[then_branch].returns;
                let else_returns = else_branch
                    .map(|e| self.prog.stmts[e].returns)
                    .unwrap_or(false);
                self.prog.stmts[id].returns = then_returns && else_returns;
            }

            StmtKind::While { cond, body } => {
                self.check_condition(scope, cond);
                self.eval_stmt(scope, func, body);
                if let Some(Value::Bool(false)) = self.const_value(cond) {
                    self.prog.stmts[id] = Stmt {
                        kind: StmtKind::Block(Vec::new()),
                        token,
                        returns: false,
                    };
                    return;
                }
                self.prog.stmts[id].returns = false;
            }

            StmtKind::DoWhile { body, cond } => {
                self.eval_stmt(scope, func, body);
                self.check_condition(scope, cond);
                let body_returns = self.prog.stmts[body].returns;
                // the body runs once regardless, so a constant-false
                // condition leaves just the body behind
                if let Some(Value::Bool(false)) = self.const_value(cond) {
                    let body = self.prog.stmts[body].clone();
                    self.prog.stmts[id] = body;
                    return;
                }
                self.prog.stmts[id].returns = body_returns;
            }

            StmtKind::For {
                var,
                from,
                to,
                dir: _,
                body,
            } => {
                let vt = self.eval_expr(scope, var);
                let vtok = self.prog.exprs[var].token.clone();
                if !self.prog.exprs[var].is_assignable() {
                    self.error_at(&vtok, "for-loop variable must be assignable");
                } else if !vt.is_unsupported() && vt != Type::INT {
                    self.error_at(&vtok, "for-loop variable must be of type int");
                }
                for bound in [from, to] {
                    let bt = self.eval_expr(scope, bound);
                    if !bt.is_unsupported() && bt != Type::INT {
                        let btok = self.prog.exprs[bound].token.clone();
                        self.error_at(&btok, "for-loop bound must be of type int");
                    }
                }
                self.eval_stmt(scope, func, body);
                self.prog.stmts[id].returns = false;
            }
        }
    }

    fn check_condition(&mut self, scope: ScopeId, cond: crate::ast::ExprId) {
        let ty = self.eval_expr(scope, cond);
        if !ty.is_unsupported() && ty != Type::BOOL {
            let tok = self.prog.exprs[cond].token.clone();
            self.error_at(&tok, "condition must be of type bool");
        }
    }
}

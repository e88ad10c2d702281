//! Statement emission.

use crate::ast::{ForDir, StmtId, StmtKind};

use super::super::context::FunctionContext;
use super::super::il::{Assembler, Inst};
use super::super::Emitter;

impl<'a, A: Assembler> Emitter<'a, A> {
    pub(crate) fn emit_stmt(&mut self, ctx: &FunctionContext, id: StmtId) {
        let kind = self.prog.stmts[id].kind.clone();
        match kind {
            StmtKind::Block(list) => {
                for &s in &list {
                    self.emit_stmt(ctx, s);
                }
            }

            StmtKind::Assign { lhs, rhs } => {
                self.emit_assign(ctx, lhs, |e| e.emit_expr(ctx, rhs));
            }

            StmtKind::Call(expr) => {
                self.emit_expr(ctx, expr);
                if !self.expr_ty(expr).is_void() {
                    self.asm.emit(Inst::Pop);
                }
            }

            StmtKind::Return(expr) => {
                if let Some(e) = expr {
                    self.emit_expr(ctx, e);
                }
                self.asm.emit(Inst::Ret);
            }

            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.emit_expr(ctx, cond);
                match else_branch {
                    Some(else_branch) => {
                        let alt = self.asm.define_label();
                        let done = self.asm.define_label();
                        self.asm.emit(Inst::Brfalse(alt));
                        self.emit_stmt(ctx, then_branch);
                        self.asm.emit(Inst::Br(done));
                        self.asm.mark_label(alt);
                        self.emit_stmt(ctx, else_branch);
                        self.asm.mark_label(done);
                    }
                    None => {
                        let done = self.asm.define_label();
                        self.asm.emit(Inst::Brfalse(done));
                        self.emit_stmt(ctx, then_branch);
                        self.asm.mark_label(done);
                    }
                }
            }

            StmtKind::While { cond, body } => {
                let top = self.asm.define_label();
                let done = self.asm.define_label();
                self.asm.mark_label(top);
                self.emit_expr(ctx, cond);
                self.asm.emit(Inst::Brfalse(done));
                self.emit_stmt(ctx, body);
                self.asm.emit(Inst::Br(top));
                self.asm.mark_label(done);
            }

            StmtKind::DoWhile { body, cond } => {
                let top = self.asm.define_label();
                self.asm.mark_label(top);
                self.emit_stmt(ctx, body);
                self.emit_expr(ctx, cond);
                self.asm.emit(Inst::Brtrue(top));
            }

            // assign initial; loop: load var; load final; exit on overshoot;
            // body; step by one; back to loop
            StmtKind::For {
                var,
                from,
                to,
                dir,
                body,
            } => {
                self.emit_assign(ctx, var, |e| e.emit_expr(ctx, from));
                let top = self.asm.define_label();
                let done = self.asm.define_label();
                self.asm.mark_label(top);
                self.emit_expr(ctx, var);
                self.emit_expr(ctx, to);
                self.asm.emit(match dir {
                    ForDir::Up => Inst::Bgt(done),
                    ForDir::Down => Inst::Blt(done),
                });
                self.emit_stmt(ctx, body);
                self.emit_assign(ctx, var, |e| {
                    e.emit_expr(ctx, var);
                    e.asm.emit(Inst::LdcI4(1));
                    e.asm.emit(match dir {
                        ForDir::Up => Inst::Add,
                        ForDir::Down => Inst::Sub,
                    });
                });
                self.asm.emit(Inst::Br(top));
                self.asm.mark_label(done);
            }
        }
    }
}

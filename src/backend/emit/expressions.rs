//! Expression emission.

use crate::ast::{BinaryOp, ExprId, ExprKind, UnaryOp, Value, VarBinding};
use crate::types::{Primitive, Type};

use super::super::context::FunctionContext;
use super::super::il::{ArraySig, Assembler, Callee, FieldRef, Inst};
use super::super::Emitter;

impl<'a, A: Assembler> Emitter<'a, A> {
    pub(crate) fn expr_ty(&self, id: ExprId) -> &Type {
        self.prog.exprs[id]
            .ty
            .as_ref()
            .expect("expression was not evaluated before emission")
    }

    /// Emit code leaving the expression's value on the stack.
    pub(crate) fn emit_expr(&mut self, ctx: &FunctionContext, id: ExprId) {
        let kind = self.prog.exprs[id].kind.clone();
        match kind {
            ExprKind::Const(v) => match v {
                Value::Int(n) => self.asm.emit(Inst::LdcI4(n)),
                Value::Double(d) => self.asm.emit(Inst::LdcR8(d)),
                Value::Str(s) => self.asm.emit(Inst::Ldstr(s)),
                Value::Bool(b) => self.asm.emit(Inst::LdcI4(b as i32)),
            },
            ExprKind::Literal(_) => unreachable!("literals are rewritten during evaluation"),
            ExprKind::Name { binding, .. } => {
                let binding = binding.expect("name was not resolved during evaluation");
                self.emit_load_binding(ctx, &binding);
            }
            ExprKind::Index { base, indices } => {
                let sig = ArraySig::of(self.expr_ty(base))
                    .expect("indexed expression is not an array");
                self.emit_expr(ctx, base);
                for &ix in &indices {
                    self.emit_expr(ctx, ix);
                }
                self.asm.emit(Inst::Call(Callee::ArrayGet(sig)));
            }
            ExprKind::Call { args, target, .. } => {
                for &a in &args {
                    self.emit_expr(ctx, a);
                }
                let callee = match target.expect("call was not resolved during evaluation") {
                    crate::ast::CallTarget::Function(f) => Callee::Method(self.methods[&f]),
                    crate::ast::CallTarget::External(m) => Callee::External(m),
                };
                self.asm.emit(Inst::Call(callee));
            }
            ExprKind::Unary { op, operand } => {
                self.emit_expr(ctx, operand);
                match op {
                    UnaryOp::Neg => self.asm.emit(Inst::Neg),
                    UnaryOp::Not => {
                        self.asm.emit(Inst::LdcI4(0));
                        self.asm.emit(Inst::Ceq);
                    }
                }
            }
            ExprKind::Cast { target, operand } => {
                self.emit_expr(ctx, operand);
                match target {
                    Type::Primitive(Primitive::Double) => self.asm.emit(Inst::ConvR8),
                    Type::Primitive(Primitive::Int) => self.asm.emit(Inst::ConvI4),
                    _ => unreachable!("cast target verified during evaluation"),
                }
            }
            ExprKind::Binary { op, lhs, rhs } => self.emit_binary(ctx, id, op, lhs, rhs),
        }
    }

    fn emit_binary(
        &mut self,
        ctx: &FunctionContext,
        id: ExprId,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    ) {
        match op {
            // short-circuit forms branch over the right operand and push the
            // short-circuited value instead
            BinaryOp::And => {
                self.emit_expr(ctx, lhs);
                let short = self.asm.define_label();
                let done = self.asm.define_label();
                self.asm.emit(Inst::Brfalse(short));
                self.emit_expr(ctx, rhs);
                self.asm.emit(Inst::Br(done));
                self.asm.mark_label(short);
                self.asm.emit(Inst::LdcI4(0));
                self.asm.mark_label(done);
            }
            BinaryOp::Or => {
                self.emit_expr(ctx, lhs);
                let short = self.asm.define_label();
                let done = self.asm.define_label();
                self.asm.emit(Inst::Brtrue(short));
                self.emit_expr(ctx, rhs);
                self.asm.emit(Inst::Br(done));
                self.asm.mark_label(short);
                self.asm.emit(Inst::LdcI4(1));
                self.asm.mark_label(done);
            }
            BinaryOp::Xor => {
                self.emit_expr(ctx, lhs);
                self.emit_expr(ctx, rhs);
                self.asm.emit(Inst::Xor);
            }
            BinaryOp::Add => {
                self.emit_expr(ctx, lhs);
                self.emit_expr(ctx, rhs);
                if *self.expr_ty(id) == Type::STRING {
                    self.asm.emit(Inst::Call(Callee::StringConcat));
                } else {
                    self.asm.emit(Inst::Add);
                }
            }
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                self.emit_expr(ctx, lhs);
                self.emit_expr(ctx, rhs);
                self.asm.emit(match op {
                    BinaryOp::Sub => Inst::Sub,
                    BinaryOp::Mul => Inst::Mul,
                    BinaryOp::Div => Inst::Div,
                    _ => Inst::Rem,
                });
            }
            BinaryOp::Eq => {
                self.emit_expr(ctx, lhs);
                self.emit_expr(ctx, rhs);
                self.asm.emit(Inst::Ceq);
            }
            BinaryOp::Lt => {
                self.emit_expr(ctx, lhs);
                self.emit_expr(ctx, rhs);
                self.asm.emit(Inst::Clt);
            }
            BinaryOp::Gt => {
                self.emit_expr(ctx, lhs);
                self.emit_expr(ctx, rhs);
                self.asm.emit(Inst::Cgt);
            }
            // the negated comparisons compare their base result with zero
            BinaryOp::Neq => {
                self.emit_expr(ctx, lhs);
                self.emit_expr(ctx, rhs);
                self.asm.emit(Inst::Ceq);
                self.asm.emit(Inst::LdcI4(0));
                self.asm.emit(Inst::Ceq);
            }
            BinaryOp::Leq => {
                self.emit_expr(ctx, lhs);
                self.emit_expr(ctx, rhs);
                self.asm.emit(Inst::Cgt);
                self.asm.emit(Inst::LdcI4(0));
                self.asm.emit(Inst::Ceq);
            }
            BinaryOp::Geq => {
                self.emit_expr(ctx, lhs);
                self.emit_expr(ctx, rhs);
                self.asm.emit(Inst::Clt);
                self.asm.emit(Inst::LdcI4(0));
                self.asm.emit(Inst::Ceq);
            }
        }
    }

    pub(crate) fn emit_load_binding(&mut self, ctx: &FunctionContext, binding: &VarBinding) {
        match binding {
            VarBinding::Var(v) => match self.prog.vars[*v].storage {
                crate::ast::Storage::Param(i) => self.asm.emit(Inst::Ldarg(i)),
                crate::ast::Storage::Local => self.asm.emit(Inst::Ldloc(ctx.slot(*v))),
                crate::ast::Storage::Global => self
                    .asm
                    .emit(Inst::Ldsfld(FieldRef::Static(self.globals[v]))),
            },
            VarBinding::External(f) => {
                self.asm.emit(Inst::Ldsfld(FieldRef::External(f.clone())))
            }
        }
    }

    pub(crate) fn emit_store_binding(&mut self, ctx: &FunctionContext, binding: &VarBinding) {
        match binding {
            VarBinding::Var(v) => match self.prog.vars[*v].storage {
                crate::ast::Storage::Param(i) => self.asm.emit(Inst::Starg(i)),
                crate::ast::Storage::Local => self.asm.emit(Inst::Stloc(ctx.slot(*v))),
                crate::ast::Storage::Global => self
                    .asm
                    .emit(Inst::Stsfld(FieldRef::Static(self.globals[v]))),
            },
            VarBinding::External(f) => {
                self.asm.emit(Inst::Stsfld(FieldRef::External(f.clone())))
            }
        }
    }

    /// Emit a store into any assignable expression; `emit_value` runs at the
    /// point where the value belongs on the stack (after the array and its
    /// indices for an indexed store).
    pub(crate) fn emit_assign(
        &mut self,
        ctx: &FunctionContext,
        lhs: ExprId,
        emit_value: impl FnOnce(&mut Self),
    ) {
        let kind = self.prog.exprs[lhs].kind.clone();
        match kind {
            ExprKind::Name { binding, .. } => {
                let binding = binding.expect("name was not resolved during evaluation");
                emit_value(self);
                self.emit_store_binding(ctx, &binding);
            }
            ExprKind::Index { base, indices } => {
                let sig = ArraySig::of(self.expr_ty(base))
                    .expect("indexed expression is not an array");
                self.emit_expr(ctx, base);
                for &ix in &indices {
                    self.emit_expr(ctx, ix);
                }
                emit_value(self);
                self.asm.emit(Inst::Call(Callee::ArraySet(sig)));
            }
            _ => unreachable!("assignment target verified during evaluation"),
        }
    }
}

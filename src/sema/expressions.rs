//! Expression typing, resolution, and folding.

use smol_str::SmolStr;

use crate::ast::{
    self, BinaryOp, CallTarget, ExprId, ExprKind, LitKind, UnaryOp, Value, VarBinding,
};
use crate::scanner::Token;
use crate::scope::{CallLookup, ResolveError, ScopeId, VarLookup};
use crate::types::{Primitive, Type};

use super::{decode_string, fold_binary, Evaluator, FoldError};

impl<'a> Evaluator<'a> {
    /// Type an expression, rewriting it in place where resolution results,
    /// coercions, or folds apply. The returned type is also recorded on the
    /// node; it is `Unsupported` when typing failed.
    pub(crate) fn eval_expr(&mut self, scope: ScopeId, id: ExprId) -> Type {
        let kind = self.prog.exprs[id].kind.clone();
        let token = self.prog.exprs[id].token.clone();
        let ty = match kind {
            ExprKind::Const(v) => v.ty(),
            ExprKind::Literal(lit) => self.eval_literal(id, lit, &token),
            ExprKind::Name { name, .. } => self.eval_name(scope, id, &name),
            ExprKind::Index { base, indices } => self.eval_index(scope, base, &indices, &token),
            ExprKind::Call { name, args, .. } => self.eval_call(scope, id, &name, args, &token),
            ExprKind::Unary { op, operand } => self.eval_unary(id, scope, op, operand, &token),
            ExprKind::Cast { target, operand } => {
                self.eval_cast(id, scope, &target, operand, &token)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.eval_binary(id, scope, op, lhs, rhs, &token)
            }
        };
        self.prog.exprs[id].ty = Some(ty.clone());
        ty
    }

    /// Parse the literal's token text into a typed constant. Malformed
    /// values default to zero and record an error.
    fn eval_literal(&mut self, id: ExprId, lit: LitKind, token: &Token) -> Type {
        let (value, ty) = match lit {
            LitKind::Int => {
                let v = match ast::parse_int_literal(&token.text) {
                    Some(v) => v,
                    None => {
                        self.error_at(token, "invalid integer constant");
                        0
                    }
                };
                (Value::Int(v), Type::INT)
            }
            LitKind::Real => {
                let text = token
                    .text
                    .strip_suffix(['d', 'D'])
                    .unwrap_or(token.text.as_str());
                let v = match text.parse::<f64>() {
                    Ok(v) => v,
                    Err(_) => {
                        self.error_at(token, "invalid real constant");
                        0.0
                    }
                };
                (Value::Double(v), Type::DOUBLE)
            }
            LitKind::Str => (Value::Str(decode_string(&token.text)), Type::STRING),
            LitKind::True => (Value::Bool(true), Type::BOOL),
            LitKind::False => (Value::Bool(false), Type::BOOL),
        };
        self.prog.exprs[id].kind = ExprKind::Const(value);
        ty
    }

    fn eval_name(&mut self, scope: ScopeId, id: ExprId, name: &SmolStr) -> Type {
        let prog = &mut *self.prog;
        let res = prog
            .scopes
            .resolve_var(scope, name, &prog.vars, self.provider);
        match res {
            Ok(VarLookup::Var(v)) => {
                let ty = prog.vars[v].ty.clone();
                prog.exprs[id].kind = ExprKind::Name {
                    name: name.clone(),
                    binding: Some(VarBinding::Var(v)),
                };
                ty
            }
            Ok(VarLookup::External(field)) => {
                let ty = field.ty.clone();
                prog.exprs[id].kind = ExprKind::Name {
                    name: name.clone(),
                    binding: Some(VarBinding::External(field)),
                };
                if ty.is_unsupported() {
                    let token = self.prog.exprs[id].token.clone();
                    self.error_at(&token, format!("'{name}' has an unsupported type"));
                }
                ty
            }
            Err(_) => {
                let token = self.prog.exprs[id].token.clone();
                self.error_at(&token, format!("undeclared identifier '{name}'"));
                Type::UNSUPPORTED
            }
        }
    }

    /// The base must be an array whose rank equals the indexer count and
    /// every index must be `int`; the result is the element primitive. The
    /// grammar admits only one indexer chain, so `a[i][j]` never reaches
    /// here; `a[i,j]` is the only multi-dimensional form.
    fn eval_index(
        &mut self,
        scope: ScopeId,
        base: ExprId,
        indices: &[ExprId],
        token: &Token,
    ) -> Type {
        let base_ty = self.eval_expr(scope, base);
        for &ix in indices {
            let t = self.eval_expr(scope, ix);
            if t != Type::INT && !t.is_unsupported() {
                let itok = self.prog.exprs[ix].token.clone();
                self.error_at(&itok, "array index must be of type int");
            }
        }
        if base_ty.is_unsupported() {
            return Type::UNSUPPORTED;
        }
        match base_ty {
            Type::Array { elem, ref sizes } if sizes.len() == indices.len() => {
                Type::Primitive(elem)
            }
            Type::Array { .. } => {
                self.error_at(token, "incorrect number of array indices");
                Type::UNSUPPORTED
            }
            _ => {
                self.error_at(token, format!("cannot index a value of type '{base_ty}'"));
                Type::UNSUPPORTED
            }
        }
    }

    fn eval_call(
        &mut self,
        scope: ScopeId,
        id: ExprId,
        name: &SmolStr,
        args: Vec<ExprId>,
        token: &Token,
    ) -> Type {
        let mut arg_tys = Vec::with_capacity(args.len());
        for &a in &args {
            arg_tys.push(self.eval_expr(scope, a));
        }
        if arg_tys.iter().any(Type::is_unsupported) {
            return Type::UNSUPPORTED;
        }

        let prog = &mut *self.prog;
        let res = prog.scopes.resolve_call(
            scope,
            name,
            &arg_tys,
            &prog.funcs,
            &prog.vars,
            self.provider,
        );
        let (params, ret, target) = match res {
            Ok(CallLookup::Function(f)) => {
                let params: Vec<Type> = prog.funcs[f]
                    .params
                    .iter()
                    .map(|&p| prog.vars[p].ty.clone())
                    .collect();
                (params, prog.funcs[f].ret.clone(), CallTarget::Function(f))
            }
            Ok(CallLookup::External(m)) => {
                if m.ret.is_unsupported() {
                    self.error_at(token, format!("'{name}' has an unsupported return type"));
                }
                (m.params.clone(), m.ret.clone(), CallTarget::External(m))
            }
            Err(ResolveError::Ambiguous) => {
                self.error_at(token, format!("ambiguous call to '{name}'"));
                return Type::UNSUPPORTED;
            }
            Err(ResolveError::NotFound) => {
                self.error_at(token, format!("cannot resolve call to '{name}'"));
                return Type::UNSUPPORTED;
            }
        };

        // merely-compatible arguments get a synthetic widening cast
        let mut new_args = Vec::with_capacity(args.len());
        for (&a, p) in args.iter().zip(params.iter()) {
            new_args.push(self.coerce(a, p));
        }
        self.prog.exprs[id].kind = ExprKind::Call {
            name: name.clone(),
            args: new_args,
            target: Some(target),
        };
        ret
    }

    fn eval_unary(
        &mut self,
        id: ExprId,
        scope: ScopeId,
        op: UnaryOp,
        operand: ExprId,
        token: &Token,
    ) -> Type {
        let ty = self.eval_expr(scope, operand);
        if ty.is_unsupported() {
            return Type::UNSUPPORTED;
        }
        match op {
            UnaryOp::Neg => {
                if !ty.is_numeric() {
                    self.error_at(
                        token,
                        format!("operator '-' cannot be applied to an operand of type '{ty}'"),
                    );
                    return Type::UNSUPPORTED;
                }
                if let Some(v) = self.const_value(operand) {
                    let folded = match v {
                        Value::Int(i) => Value::Int(i.wrapping_neg()),
                        Value::Double(d) => Value::Double(-d),
                        _ => return ty,
                    };
                    self.prog.exprs[id].kind = ExprKind::Const(folded);
                }
                ty
            }
            UnaryOp::Not => {
                if ty != Type::BOOL {
                    self.error_at(
                        token,
                        format!("operator '!' cannot be applied to an operand of type '{ty}'"),
                    );
                    return Type::UNSUPPORTED;
                }
                if let Some(Value::Bool(b)) = self.const_value(operand) {
                    self.prog.exprs[id].kind = ExprKind::Const(Value::Bool(!b));
                }
                Type::BOOL
            }
        }
    }

    fn eval_cast(
        &mut self,
        id: ExprId,
        scope: ScopeId,
        target: &Type,
        operand: ExprId,
        token: &Token,
    ) -> Type {
        let ty = self.eval_expr(scope, operand);
        if ty.is_unsupported() {
            return Type::UNSUPPORTED;
        }
        if &ty == target {
            self.warn_at(token, "cast to the same type");
            let inner = self.prog.exprs[operand].clone();
            self.prog.exprs[id] = inner;
            return ty;
        }
        if ty.casts_to(target) {
            if let Some(v) = self.const_value(operand) {
                let folded = match (v, target) {
                    (Value::Int(i), Type::Primitive(Primitive::Double)) => {
                        Some(Value::Double(i as f64))
                    }
                    (Value::Double(d), Type::Primitive(Primitive::Int)) => {
                        Some(Value::Int(d as i32))
                    }
                    _ => None,
                };
                if let Some(folded) = folded {
                    self.prog.exprs[id].kind = ExprKind::Const(folded);
                }
            }
            return target.clone();
        }
        self.error_at(token, format!("cannot cast '{ty}' to '{target}'"));
        Type::UNSUPPORTED
    }

    fn eval_binary(
        &mut self,
        id: ExprId,
        scope: ScopeId,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        token: &Token,
    ) -> Type {
        let lt = self.eval_expr(scope, lhs);
        let rt = self.eval_expr(scope, rhs);
        if lt.is_unsupported() || rt.is_unsupported() {
            return Type::UNSUPPORTED;
        }

        // unify operand types through the one implicit widening
        let (lhs, rhs, common) = if lt == rt {
            (lhs, rhs, lt)
        } else if lt.coerces_to(&rt) {
            let l = self.coerce(lhs, &rt);
            self.prog.exprs[id].kind = ExprKind::Binary { op, lhs: l, rhs };
            (l, rhs, rt)
        } else if rt.coerces_to(&lt) {
            let r = self.coerce(rhs, &lt);
            self.prog.exprs[id].kind = ExprKind::Binary { op, lhs, rhs: r };
            (lhs, r, lt)
        } else {
            self.error_at(token, "incompatible types");
            return Type::UNSUPPORTED;
        };

        let prim = match common.primitive() {
            Some(p) => p,
            None => {
                self.error_at(
                    token,
                    format!(
                        "operator '{}' cannot be applied to operands of type '{common}'",
                        op.symbol()
                    ),
                );
                return Type::UNSUPPORTED;
            }
        };
        let admissible = match op {
            BinaryOp::Add => matches!(prim, Primitive::Int | Primitive::Double | Primitive::String),
            BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Lt
            | BinaryOp::Leq
            | BinaryOp::Gt
            | BinaryOp::Geq => matches!(prim, Primitive::Int | Primitive::Double),
            BinaryOp::Rem => prim == Primitive::Int,
            BinaryOp::Eq | BinaryOp::Neq => matches!(
                prim,
                Primitive::Bool | Primitive::Int | Primitive::Double | Primitive::String
            ),
            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => prim == Primitive::Bool,
        };
        if !admissible {
            self.error_at(
                token,
                format!(
                    "operator '{}' cannot be applied to operands of type '{common}'",
                    op.symbol()
                ),
            );
            return Type::UNSUPPORTED;
        }

        let result = if op.yields_bool() {
            Type::BOOL
        } else {
            common
        };

        if let (Some(a), Some(b)) = (self.const_value(lhs), self.const_value(rhs)) {
            match fold_binary(op, &a, &b) {
                Ok(Some(v)) => self.prog.exprs[id].kind = ExprKind::Const(v),
                Ok(None) => {}
                Err(FoldError::DivisionByZero) => {
                    self.error_at(token, "division by zero");
                }
            }
        }
        result
    }
}

//! Semantic analysis and constant folding.
//!
//! The evaluator walks every function body, resolving names against the
//! scope chain, checking and recording types, inserting implicit coercions,
//! folding constants, and removing dead code, all by rewriting AST nodes in
//! place. Errors accumulate in the sink and evaluation continues past them;
//! an ill-typed expression takes the `Unsupported` type so downstream
//! decisions degrade instead of cascading.
//!
//! ## Module Structure
//!
//! - `expressions`: per-expression typing, resolution, and folding
//! - `statements`: statement typing, `returns` analysis, dead-code removal

mod expressions;
mod statements;

use crate::ast::{BinaryOp, ExprId, ExprKind, FuncId, Program, Stmt, StmtKind, Value};
use crate::diag::DiagSink;
use crate::reflect::TypeProvider;
use crate::scanner::Token;
use crate::types::Type;

/// Analyze and rewrite the whole program. Diagnostics land in `diag`; the
/// caller gates emission on the sink's error count.
pub fn evaluate(prog: &mut Program, provider: &dyn TypeProvider, diag: &mut DiagSink) {
    let mut eval = Evaluator {
        prog,
        diag,
        provider,
    };
    eval.run();
}

pub(crate) struct Evaluator<'a> {
    pub(crate) prog: &'a mut Program,
    pub(crate) diag: &'a mut DiagSink,
    pub(crate) provider: &'a dyn TypeProvider,
}

impl<'a> Evaluator<'a> {
    fn run(&mut self) {
        let funcs: Vec<FuncId> = self.prog.funcs.iter().map(|(id, _)| id).collect();
        for func in funcs {
            self.eval_function(func);
        }
    }

    fn eval_function(&mut self, func: FuncId) {
        let (scope, body, ret, token) = {
            let f = &self.prog.funcs[func];
            (f.scope, f.body, f.ret.clone(), f.token.clone())
        };
        self.eval_stmt(scope, func, body);

        if !self.prog.stmts[body].returns {
            if ret.is_void() {
                // falling off the end of a void body still needs a Ret
                let synthetic = self.prog.stmts.alloc(Stmt {
                    kind: StmtKind::Return(None),
                    token,
                    returns: true,
                });
                if let StmtKind::Block(list) = &mut self.prog.stmts[body].kind {
                    list.push(synthetic);
                }
                self.prog.stmts[body].returns = true;
            } else {
                self.error_at(&token, "not all code paths return a value");
            }
        }
    }

    pub(crate) fn error_at(&mut self, token: &Token, msg: impl Into<String>) {
        self.diag.error(token.line, token.col, msg);
    }

    pub(crate) fn warn_at(&mut self, token: &Token, msg: impl Into<String>) {
        self.diag.warning(token.line, token.col, msg);
    }

    pub(crate) fn ty_of(&self, id: ExprId) -> Type {
        self.prog.exprs[id].ty.clone().unwrap_or(Type::UNSUPPORTED)
    }

    pub(crate) fn const_value(&self, id: ExprId) -> Option<Value> {
        match &self.prog.exprs[id].kind {
            ExprKind::Const(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Make `id` produce `target`, assuming compatibility was already
    /// checked. Constants convert in place; anything else is wrapped in a
    /// synthetic cast node.
    pub(crate) fn coerce(&mut self, id: ExprId, target: &Type) -> ExprId {
        let ty = self.ty_of(id);
        if &ty == target {
            return id;
        }
        if let Some(Value::Int(i)) = self.const_value(id) {
            if *target == Type::DOUBLE {
                self.prog.exprs[id].kind = ExprKind::Const(Value::Double(i as f64));
                self.prog.exprs[id].ty = Some(Type::DOUBLE);
                return id;
            }
        }
        let token = self.prog.exprs[id].token.clone();
        self.prog.exprs.alloc(crate::ast::Expr {
            kind: ExprKind::Cast {
                target: target.clone(),
                operand: id,
            },
            token,
            ty: Some(target.clone()),
        })
    }
}

/// Decode a raw string lexeme (quotes included) into its value.
pub(crate) fn decode_string(raw: &str) -> String {
    let inner = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('0') => out.push('\0'),
            Some('a') => out.push('\x07'),
            Some('b') => out.push('\x08'),
            Some('f') => out.push('\x0C'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('v') => out.push('\x0B'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

pub(crate) enum FoldError {
    DivisionByZero,
}

/// Fold two constants under the host's semantics for the operand primitive:
/// wrapping 32-bit integer arithmetic, IEEE doubles, string concatenation
/// and content comparison.
pub(crate) fn fold_binary(op: BinaryOp, a: &Value, b: &Value) -> Result<Option<Value>, FoldError> {
    let v = match (a, b) {
        (Value::Int(x), Value::Int(y)) => match op {
            BinaryOp::Add => Some(Value::Int(x.wrapping_add(*y))),
            BinaryOp::Sub => Some(Value::Int(x.wrapping_sub(*y))),
            BinaryOp::Mul => Some(Value::Int(x.wrapping_mul(*y))),
            BinaryOp::Div => {
                if *y == 0 {
                    return Err(FoldError::DivisionByZero);
                }
                Some(Value::Int(x.wrapping_div(*y)))
            }
            BinaryOp::Rem => {
                if *y == 0 {
                    return Err(FoldError::DivisionByZero);
                }
                Some(Value::Int(x.wrapping_rem(*y)))
            }
            BinaryOp::Eq => Some(Value::Bool(x == y)),
            BinaryOp::Neq => Some(Value::Bool(x != y)),
            BinaryOp::Lt => Some(Value::Bool(x < y)),
            BinaryOp::Leq => Some(Value::Bool(x <= y)),
            BinaryOp::Gt => Some(Value::Bool(x > y)),
            BinaryOp::Geq => Some(Value::Bool(x >= y)),
            _ => None,
        },
        (Value::Double(x), Value::Double(y)) => match op {
            BinaryOp::Add => Some(Value::Double(x + y)),
            BinaryOp::Sub => Some(Value::Double(x - y)),
            BinaryOp::Mul => Some(Value::Double(x * y)),
            BinaryOp::Div => Some(Value::Double(x / y)),
            BinaryOp::Eq => Some(Value::Bool(x == y)),
            BinaryOp::Neq => Some(Value::Bool(x != y)),
            BinaryOp::Lt => Some(Value::Bool(x < y)),
            BinaryOp::Leq => Some(Value::Bool(x <= y)),
            BinaryOp::Gt => Some(Value::Bool(x > y)),
            BinaryOp::Geq => Some(Value::Bool(x >= y)),
            _ => None,
        },
        (Value::Str(x), Value::Str(y)) => match op {
            BinaryOp::Add => Some(Value::Str(format!("{x}{y}"))),
            BinaryOp::Eq => Some(Value::Bool(x == y)),
            BinaryOp::Neq => Some(Value::Bool(x != y)),
            _ => None,
        },
        (Value::Bool(x), Value::Bool(y)) => match op {
            BinaryOp::And => Some(Value::Bool(*x && *y)),
            BinaryOp::Or => Some(Value::Bool(*x || *y)),
            BinaryOp::Xor => Some(Value::Bool(x != y)),
            BinaryOp::Eq => Some(Value::Bool(x == y)),
            BinaryOp::Neq => Some(Value::Bool(x != y)),
            _ => None,
        },
        _ => None,
    };
    Ok(v)
}

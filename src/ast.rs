//! Abstract syntax tree.
//!
//! Nodes live in arenas and refer to each other by index; the evaluator
//! rewrites nodes in place by index replacement (folding a binary into a
//! constant, dropping dead branches). Every node keeps the token that
//! produced it for diagnostics. Expressions carry a `ty` slot that is `None`
//! out of the parser and always `Some` after evaluation.

use la_arena::{Arena, Idx};
use smol_str::SmolStr;

use crate::reflect::{ExternalField, ExternalMethod};
use crate::scanner::Token;
use crate::scope::{ScopeId, ScopeTree};
use crate::types::Type;

pub type ExprId = Idx<Expr>;
pub type StmtId = Idx<Stmt>;
pub type VarId = Idx<Variable>;
pub type FuncId = Idx<Function>;

// ── Expressions ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Neq,
    Lt,
    Leq,
    Gt,
    Geq,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Leq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Geq => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
        }
    }

    /// Relational and logical operators produce `bool` regardless of their
    /// operand type.
    pub fn yields_bool(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::Neq
                | BinaryOp::Lt
                | BinaryOp::Leq
                | BinaryOp::Gt
                | BinaryOp::Geq
                | BinaryOp::And
                | BinaryOp::Or
                | BinaryOp::Xor
        )
    }
}

/// Shape of an unevaluated literal; the evaluator parses the token text and
/// rewrites the node into a `Const`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    Int,
    Real,
    Str,
    True,
    False,
}

/// A compile-time constant value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Double(f64),
    Str(String),
    Bool(bool),
}

/// Parse an integer literal lexeme, decimal or `0x`/`0X` hex.
pub fn parse_int_literal(text: &str) -> Option<i32> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i32::from_str_radix(hex, 16).ok();
    }
    text.parse::<i32>().ok()
}

impl Value {
    pub fn ty(&self) -> Type {
        match self {
            Value::Int(_) => Type::INT,
            Value::Double(_) => Type::DOUBLE,
            Value::Str(_) => Type::STRING,
            Value::Bool(_) => Type::BOOL,
        }
    }
}

/// Where a name resolved to; recorded in place by the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum VarBinding {
    Var(VarId),
    External(ExternalField),
}

/// What a call resolved to; recorded in place by the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum CallTarget {
    Function(FuncId),
    External(ExternalMethod),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(LitKind),
    Const(Value),
    Name {
        name: SmolStr,
        binding: Option<VarBinding>,
    },
    Index {
        base: ExprId,
        indices: Vec<ExprId>,
    },
    Call {
        name: SmolStr,
        args: Vec<ExprId>,
        target: Option<CallTarget>,
    },
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    Cast {
        target: Type,
        operand: ExprId,
    },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub token: Token,
    pub ty: Option<Type>,
}

impl Expr {
    pub fn new(kind: ExprKind, token: Token) -> Expr {
        Expr {
            kind,
            token,
            ty: None,
        }
    }

    /// Whether the expression may appear on the left of an assignment.
    pub fn is_assignable(&self) -> bool {
        matches!(self.kind, ExprKind::Name { .. } | ExprKind::Index { .. })
    }
}

// ── Statements ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForDir {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Block(Vec<StmtId>),
    Assign {
        lhs: ExprId,
        rhs: ExprId,
    },
    /// An expression in statement position; its value, if any, is discarded.
    Call(ExprId),
    Return(Option<ExprId>),
    If {
        cond: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },
    While {
        cond: ExprId,
        body: StmtId,
    },
    DoWhile {
        body: StmtId,
        cond: ExprId,
    },
    For {
        var: ExprId,
        from: ExprId,
        to: ExprId,
        dir: ForDir,
        body: StmtId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub token: Token,
    /// Every path through the statement ends in a `return`.
    pub returns: bool,
}

impl Stmt {
    pub fn new(kind: StmtKind, token: Token) -> Stmt {
        Stmt {
            kind,
            token,
            returns: false,
        }
    }
}

// ── Declarations ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Global,
    Param(u16),
    Local,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: SmolStr,
    pub ty: Type,
    pub token: Token,
    pub storage: Storage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: SmolStr,
    pub ret: Type,
    pub params: Vec<VarId>,
    pub body: StmtId,
    pub scope: ScopeId,
    pub token: Token,
}

// ── Program ───────────────────────────────────────────────────────

/// The unit of compilation: arenas, scope tree, and the synthetic `Main`
/// built from the program body.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub name: SmolStr,
    pub exprs: Arena<Expr>,
    pub stmts: Arena<Stmt>,
    pub vars: Arena<Variable>,
    pub funcs: Arena<Function>,
    pub scopes: ScopeTree,
    pub main: FuncId,
}

// ── Pretty printer ────────────────────────────────────────────────

/// Render the whole program back to source syntax, expressions fully
/// parenthesized so the precedence chosen by the parser survives a reparse.
pub fn pretty(program: &Program) -> String {
    let mut p = Printer {
        program,
        buf: String::new(),
        indent: 0,
    };
    p.print_program();
    p.buf
}

/// Render a single expression fully parenthesized.
pub fn pretty_expr(program: &Program, id: ExprId) -> String {
    let mut p = Printer {
        program,
        buf: String::new(),
        indent: 0,
    };
    p.print_expr(id);
    p.buf
}

struct Printer<'a> {
    program: &'a Program,
    buf: String,
    indent: usize,
}

impl<'a> Printer<'a> {
    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.buf.push_str("    ");
        }
    }

    fn writeln(&mut self, s: &str) {
        self.write_indent();
        self.buf.push_str(s);
        self.buf.push('\n');
    }

    fn print_var_rows(&mut self, vars: &[VarId]) {
        for (i, &g) in vars.iter().enumerate() {
            let v = &self.program.vars[g];
            self.write_indent();
            if i == 0 {
                self.buf.push_str("var ");
            } else {
                self.buf.push_str("    ");
            }
            self.buf.push_str(&format!("{} {};\n", v.ty, v.name));
        }
    }

    fn print_program(&mut self) {
        self.writeln(&format!("program {};", self.program.name));
        let globals: Vec<VarId> = self
            .program
            .vars
            .iter()
            .filter(|(_, v)| v.storage == Storage::Global)
            .map(|(id, _)| id)
            .collect();
        self.print_var_rows(&globals);
        let funcs: Vec<(FuncId, Function)> = self
            .program
            .funcs
            .iter()
            .map(|(id, f)| (id, f.clone()))
            .collect();
        for (id, f) in &funcs {
            if *id == self.program.main {
                continue;
            }
            self.print_function(f);
        }
        self.print_stmt(self.program.funcs[self.program.main].body);
    }

    fn print_function(&mut self, f: &Function) {
        self.write_indent();
        self.buf.push_str(&format!("function {}(", f.name));
        for (i, &p) in f.params.iter().enumerate() {
            let v = &self.program.vars[p];
            if i > 0 {
                self.buf.push_str(", ");
            }
            self.buf.push_str(&format!("{} {}", v.ty, v.name));
        }
        self.buf.push(')');
        if !f.ret.is_void() {
            self.buf.push_str(&format!(" : {}", f.ret));
        }
        self.buf.push('\n');
        let locals = self.program.scopes.locals_of(f.scope).to_vec();
        self.print_var_rows(&locals);
        self.print_stmt(f.body);
    }

    fn print_stmt(&mut self, id: StmtId) {
        let stmt = self.program.stmts[id].clone();
        match &stmt.kind {
            StmtKind::Block(stmts) => {
                self.writeln("begin");
                self.indent += 1;
                for &s in stmts {
                    self.print_stmt(s);
                }
                self.indent -= 1;
                self.writeln("end");
            }
            StmtKind::Assign { lhs, rhs } => {
                self.write_indent();
                self.print_expr(*lhs);
                self.buf.push_str(" = ");
                self.print_expr(*rhs);
                self.buf.push_str(";\n");
            }
            StmtKind::Call(e) => {
                self.write_indent();
                self.print_expr(*e);
                self.buf.push_str(";\n");
            }
            StmtKind::Return(e) => {
                self.write_indent();
                self.buf.push_str("return");
                if let Some(e) = e {
                    self.buf.push(' ');
                    self.print_expr(*e);
                }
                self.buf.push_str(";\n");
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.write_indent();
                self.buf.push_str("if (");
                self.print_expr(*cond);
                self.buf.push_str(")\n");
                self.indent += 1;
                self.print_stmt(*then_branch);
                self.indent -= 1;
                if let Some(e) = else_branch {
                    self.writeln("else");
                    self.indent += 1;
                    self.print_stmt(*e);
                    self.indent -= 1;
                }
            }
            StmtKind::While { cond, body } => {
                self.write_indent();
                self.buf.push_str("while (");
                self.print_expr(*cond);
                self.buf.push_str(")\n");
                self.indent += 1;
                self.print_stmt(*body);
                self.indent -= 1;
            }
            StmtKind::DoWhile { body, cond } => {
                self.writeln("do");
                self.indent += 1;
                self.print_stmt(*body);
                self.indent -= 1;
                self.write_indent();
                self.buf.push_str("while (");
                self.print_expr(*cond);
                self.buf.push_str(")\n");
            }
            StmtKind::For {
                var,
                from,
                to,
                dir,
                body,
            } => {
                self.write_indent();
                self.buf.push_str("for ");
                self.print_expr(*var);
                self.buf.push_str(" = ");
                self.print_expr(*from);
                self.buf.push_str(match dir {
                    ForDir::Up => " to ",
                    ForDir::Down => " downto ",
                });
                self.print_expr(*to);
                self.buf.push_str(" do\n");
                self.indent += 1;
                self.print_stmt(*body);
                self.indent -= 1;
            }
        }
    }

    fn print_expr(&mut self, id: ExprId) {
        let expr = self.program.exprs[id].clone();
        match &expr.kind {
            ExprKind::Literal(_) => self.buf.push_str(expr.token.text.as_str()),
            ExprKind::Const(v) => match v {
                Value::Int(n) => self.buf.push_str(&n.to_string()),
                Value::Double(d) => self.buf.push_str(&format!("{d:?}")),
                Value::Str(s) => self.buf.push_str(&format!("{s:?}")),
                Value::Bool(b) => self.buf.push_str(if *b { "true" } else { "false" }),
            },
            ExprKind::Name { name, .. } => self.buf.push_str(name),
            ExprKind::Index { base, indices } => {
                self.print_expr(*base);
                self.buf.push('[');
                for (i, &ix) in indices.iter().enumerate() {
                    if i > 0 {
                        self.buf.push_str(", ");
                    }
                    self.print_expr(ix);
                }
                self.buf.push(']');
            }
            ExprKind::Call { name, args, .. } => {
                self.buf.push_str(name);
                self.buf.push('(');
                for (i, &a) in args.iter().enumerate() {
                    if i > 0 {
                        self.buf.push_str(", ");
                    }
                    self.print_expr(a);
                }
                self.buf.push(')');
            }
            ExprKind::Unary { op, operand } => {
                self.buf.push_str(match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Not => "!",
                });
                self.buf.push('(');
                self.print_expr(*operand);
                self.buf.push(')');
            }
            ExprKind::Cast { target, operand } => {
                self.buf.push_str(&format!("{{{target}}} ("));
                self.print_expr(*operand);
                self.buf.push(')');
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.buf.push('(');
                self.print_expr(*lhs);
                self.buf.push_str(&format!(" {} ", op.symbol()));
                self.print_expr(*rhs);
                self.buf.push(')');
            }
        }
    }
}

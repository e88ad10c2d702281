//! Token stream to syntax tree.
//!
//! An LL(1) recursive-descent parser over one lookahead token `la`, with the
//! last consumed token kept in `t` for diagnostics. Syntactic errors are
//! reported to the sink and recovery is local: error reports are suppressed
//! until enough tokens have been consumed since the last one, and weakly
//! expected terminals skip ahead to a follow set. Declarations are inserted
//! into their enclosing scopes as the parse proceeds; no names are resolved
//! and nothing is typed here.

mod expressions;
mod statements;

use la_arena::Arena;
use smol_str::SmolStr;

use crate::ast::{self, Expr, Function, Program, Stmt, Storage, Variable};
use crate::diag::DiagSink;
use crate::scanner::{ScanError, Scanner, Token, TokenKind};
use crate::scope::{ScopeId, ScopeTree};
use crate::types::{Primitive, Type};

pub type ParseResult<T> = Result<T, ScanError>;

/// Tokens that must be consumed after a reported error before the next
/// report; keeps one mistake from cascading.
const MIN_ERR_DIST: u32 = 2;

pub(crate) const TYPE_START: &[TokenKind] = &[
    TokenKind::Int,
    TokenKind::Double,
    TokenKind::StringKw,
    TokenKind::Bool,
];

pub(crate) const EXPR_START: &[TokenKind] = &[
    TokenKind::Minus,
    TokenKind::Bang,
    TokenKind::LBrace,
    TokenKind::Ident,
    TokenKind::LParen,
    TokenKind::IntLit,
    TokenKind::RealLit,
    TokenKind::StringLit,
    TokenKind::True,
    TokenKind::False,
];

pub(crate) const STMT_START: &[TokenKind] = &[
    TokenKind::Begin,
    TokenKind::Return,
    TokenKind::If,
    TokenKind::While,
    TokenKind::Do,
    TokenKind::For,
    TokenKind::Minus,
    TokenKind::Bang,
    TokenKind::LBrace,
    TokenKind::Ident,
    TokenKind::LParen,
    TokenKind::IntLit,
    TokenKind::RealLit,
    TokenKind::StringLit,
    TokenKind::True,
    TokenKind::False,
];

/// Follow set for the semicolon closing a variable-declaration row.
pub(crate) const DECL_FOLLOW: &[TokenKind] = &[
    TokenKind::Int,
    TokenKind::Double,
    TokenKind::StringKw,
    TokenKind::Bool,
    TokenKind::Var,
    TokenKind::Function,
    TokenKind::Begin,
    TokenKind::End,
    TokenKind::Ident,
];

/// Follow set for the semicolon closing a statement.
pub(crate) const STMT_FOLLOW: &[TokenKind] = &[
    TokenKind::Begin,
    TokenKind::End,
    TokenKind::Return,
    TokenKind::If,
    TokenKind::Else,
    TokenKind::While,
    TokenKind::Do,
    TokenKind::For,
    TokenKind::Ident,
    TokenKind::Minus,
    TokenKind::Bang,
    TokenKind::LBrace,
];

pub struct Parser<'a> {
    scanner: Scanner,
    diag: &'a mut DiagSink,
    /// Last consumed token.
    pub(crate) t: Token,
    /// Lookahead token.
    pub(crate) la: Token,
    err_dist: u32,
    pub(crate) exprs: Arena<Expr>,
    pub(crate) stmts: Arena<Stmt>,
    pub(crate) vars: Arena<Variable>,
    pub(crate) funcs: Arena<Function>,
    pub(crate) scopes: ScopeTree,
    program_scope: ScopeId,
}

impl<'a> Parser<'a> {
    /// `libraries` are the external references the global scope will consult,
    /// in resolution order.
    pub fn new(scanner: Scanner, libraries: Vec<String>, diag: &'a mut DiagSink) -> Parser<'a> {
        let mut scopes = ScopeTree::new();
        let global = scopes.push_global(libraries);
        let program_scope = scopes.push_program(global);
        Parser {
            scanner,
            diag,
            t: Token::eof(),
            la: Token::eof(),
            err_dist: MIN_ERR_DIST,
            exprs: Arena::new(),
            stmts: Arena::new(),
            vars: Arena::new(),
            funcs: Arena::new(),
            scopes,
            program_scope,
        }
    }

    // ── token plumbing ────────────────────────────────────────────

    pub(crate) fn get(&mut self) -> ParseResult<()> {
        let next = self.scanner.scan()?;
        self.t = std::mem::replace(&mut self.la, next);
        self.err_dist += 1;
        Ok(())
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.la.kind == kind
    }

    pub(crate) fn syn_err(&mut self, msg: &str) {
        if self.err_dist >= MIN_ERR_DIST {
            self.diag.error(self.la.line, self.la.col, msg);
        }
        self.err_dist = 0;
    }

    pub(crate) fn sem_err(&mut self, token: &Token, msg: &str) {
        self.diag.error(token.line, token.col, msg);
    }

    pub(crate) fn expect(&mut self, kind: TokenKind) -> ParseResult<()> {
        if self.check(kind) {
            self.get()
        } else {
            self.syn_err(&format!("{} expected", kind.describe()));
            Ok(())
        }
    }

    /// Expect a terminal in a weak position: on a mismatch, report and then
    /// consume tokens until one is in the follow set before continuing.
    pub(crate) fn expect_weak(&mut self, kind: TokenKind, follow: &[TokenKind]) -> ParseResult<()> {
        if self.check(kind) {
            return self.get();
        }
        self.syn_err(&format!("{} expected", kind.describe()));
        while !follow.contains(&self.la.kind)
            && self.la.kind != kind
            && self.la.kind != TokenKind::Eof
        {
            self.get()?;
        }
        if self.check(kind) {
            self.get()?;
        }
        Ok(())
    }

    pub(crate) fn expect_ident(&mut self) -> ParseResult<SmolStr> {
        if self.check(TokenKind::Ident) {
            self.get()?;
            Ok(self.t.text.clone())
        } else {
            self.syn_err("identifier expected");
            Ok(SmolStr::from("?"))
        }
    }

    pub(crate) fn alloc_expr(&mut self, kind: ast::ExprKind, token: Token) -> ast::ExprId {
        self.exprs.alloc(Expr::new(kind, token))
    }

    pub(crate) fn alloc_stmt(&mut self, kind: ast::StmtKind, token: Token) -> ast::StmtId {
        self.stmts.alloc(Stmt::new(kind, token))
    }

    // ── declarations ──────────────────────────────────────────────

    /// Parse the whole compilation unit. The program body becomes the
    /// synthetic void `Main`.
    pub fn parse(mut self) -> ParseResult<Program> {
        self.get()?;
        self.expect(TokenKind::Program)?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::Semicolon)?;

        loop {
            match self.la.kind {
                TokenKind::Function => self.func_decl()?,
                TokenKind::Var => {
                    let scope = self.program_scope;
                    self.var_decls(scope, Storage::Global)?;
                }
                TokenKind::Begin | TokenKind::Eof => break,
                _ => {
                    self.syn_err("declaration or 'begin' expected");
                    while !matches!(
                        self.la.kind,
                        TokenKind::Function | TokenKind::Var | TokenKind::Begin | TokenKind::Eof
                    ) {
                        self.get()?;
                    }
                }
            }
        }

        let main_scope = self.scopes.push_local(self.program_scope);
        let body_token = self.la.clone();
        let body = if self.check(TokenKind::Begin) {
            self.block()?
        } else {
            self.syn_err("'begin' expected");
            self.alloc_stmt(ast::StmtKind::Block(Vec::new()), body_token.clone())
        };
        if !self.check(TokenKind::Eof) {
            self.syn_err("end of file expected");
        }

        let main = self.funcs.alloc(Function {
            name: SmolStr::from("Main"),
            ret: Type::VOID,
            params: Vec::new(),
            body,
            scope: main_scope,
            token: body_token,
        });

        Ok(Program {
            name,
            exprs: self.exprs,
            stmts: self.stmts,
            vars: self.vars,
            funcs: self.funcs,
            scopes: self.scopes,
            main,
        })
    }

    fn func_decl(&mut self) -> ParseResult<()> {
        let token = self.la.clone();
        self.expect(TokenKind::Function)?;
        let name = self.expect_ident()?;
        let scope = self.scopes.push_local(self.program_scope);

        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if TYPE_START.contains(&self.la.kind) {
            loop {
                let ty = self.parse_type()?;
                let ptok = self.la.clone();
                let pname = self.expect_ident()?;
                let id =
                    self.declare_var(scope, pname, ty, ptok, Storage::Param(params.len() as u16));
                params.push(id);
                if self.check(TokenKind::Comma) {
                    self.get()?;
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;

        let ret = if self.check(TokenKind::Colon) {
            self.get()?;
            self.parse_type()?
        } else {
            Type::VOID
        };
        self.scopes.set_return_type(scope, ret.clone());

        while self.check(TokenKind::Var) {
            self.var_decls(scope, Storage::Local)?;
        }
        let body = self.block()?;

        let id = self.funcs.alloc(Function {
            name,
            ret,
            params,
            body,
            scope,
            token,
        });
        self.scopes.add_function(self.program_scope, id);
        Ok(())
    }

    /// `var Type ident {',' ident} ';' { Type ident {',' ident} ';' }`.
    /// The leading keyword opens the section, further rows start with a type.
    fn var_decls(&mut self, scope: ScopeId, storage: Storage) -> ParseResult<()> {
        self.expect(TokenKind::Var)?;
        loop {
            let ty = self.parse_type()?;
            loop {
                let token = self.la.clone();
                let name = self.expect_ident()?;
                self.declare_var(scope, name, ty.clone(), token, storage);
                if self.check(TokenKind::Comma) {
                    self.get()?;
                } else {
                    break;
                }
            }
            self.expect_weak(TokenKind::Semicolon, DECL_FOLLOW)?;
            if !TYPE_START.contains(&self.la.kind) {
                break;
            }
        }
        Ok(())
    }

    fn declare_var(
        &mut self,
        scope: ScopeId,
        name: SmolStr,
        ty: Type,
        token: Token,
        storage: Storage,
    ) -> ast::VarId {
        if self.scopes.declares(scope, &name, &self.vars) {
            let msg = format!("'{name}' is already declared");
            self.sem_err(&token, &msg);
        }
        let id = self.vars.alloc(Variable {
            name,
            ty,
            token,
            storage,
        });
        match storage {
            Storage::Global => self.scopes.add_global(scope, id),
            Storage::Param(_) => self.scopes.add_param(scope, id),
            Storage::Local => self.scopes.add_local(scope, id),
        }
        id
    }

    pub(crate) fn parse_type(&mut self) -> ParseResult<Type> {
        let prim = match self.la.kind {
            TokenKind::Int => Some(Primitive::Int),
            TokenKind::Double => Some(Primitive::Double),
            TokenKind::StringKw => Some(Primitive::String),
            TokenKind::Bool => Some(Primitive::Bool),
            _ => None,
        };
        let prim = match prim {
            Some(p) => {
                self.get()?;
                p
            }
            None => {
                self.syn_err("type expected");
                Primitive::Int
            }
        };

        if self.check(TokenKind::LBracket) {
            self.get()?;
            let mut sizes = vec![self.array_size()?];
            while self.check(TokenKind::Comma) {
                self.get()?;
                sizes.push(self.array_size()?);
            }
            self.expect(TokenKind::RBracket)?;
            return Ok(Type::Array { elem: prim, sizes });
        }
        Ok(Type::Primitive(prim))
    }

    fn array_size(&mut self) -> ParseResult<u32> {
        if self.check(TokenKind::IntLit) {
            let token = self.la.clone();
            let value = match ast::parse_int_literal(&token.text) {
                Some(v) if v >= 0 => v as u32,
                _ => {
                    self.sem_err(&token, "invalid array size");
                    0
                }
            };
            self.get()?;
            Ok(value)
        } else {
            self.syn_err("integer literal expected");
            Ok(0)
        }
    }

    /// One peek past the lookahead, leaving the stream untouched.
    pub(crate) fn peek_kind(&mut self) -> ParseResult<TokenKind> {
        let tok = self.scanner.peek()?;
        self.scanner.reset_peek();
        Ok(tok.kind)
    }
}

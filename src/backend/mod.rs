//! Bytecode emission.
//!
//! Two passes over the evaluated program: the declaration pass reserves a
//! method handle for every function and a static holder field for every
//! global (plus a static initializer when array-typed globals need
//! instantiating), so bodies can reference forward; the emission pass then
//! walks each body and produces the instruction stream. Resolution results
//! recorded on the AST by the evaluator are used as-is; nothing is looked
//! up again here.

pub mod context;
pub mod il;
pub mod image;

mod emit;

use std::collections::HashMap;

use crate::ast::{FuncId, Program, Storage, VarId};
use crate::types::Type;

use context::FunctionContext;
use il::{ArraySig, Assembler, FieldHandle, FieldRef, Inst, MethodHandle};

/// Translate an evaluated, error-free program into `asm`. The caller owns
/// gating: this must only run when the sink counted zero errors.
pub fn emit_program<A: Assembler>(prog: &Program, asm: &mut A) {
    let mut emitter = Emitter {
        prog,
        asm,
        methods: HashMap::new(),
        globals: HashMap::new(),
        static_init: None,
    };
    emitter.declare_all();
    emitter.emit_all();
}

pub(crate) struct Emitter<'a, A: Assembler> {
    pub(crate) prog: &'a Program,
    pub(crate) asm: &'a mut A,
    pub(crate) methods: HashMap<FuncId, MethodHandle>,
    pub(crate) globals: HashMap<VarId, FieldHandle>,
    static_init: Option<MethodHandle>,
}

impl<'a, A: Assembler> Emitter<'a, A> {
    fn declare_all(&mut self) {
        self.asm.begin_assembly(&self.prog.name);

        for (id, f) in self.prog.funcs.iter() {
            let params: Vec<Type> = f
                .params
                .iter()
                .map(|&p| self.prog.vars[p].ty.clone())
                .collect();
            let handle = self.asm.declare_method(&f.name, &params, &f.ret);
            self.methods.insert(id, handle);
        }

        let mut has_array_global = false;
        for (id, v) in self.prog.vars.iter() {
            if v.storage != Storage::Global {
                continue;
            }
            let handle = self.asm.declare_global(&v.name, &v.ty);
            self.globals.insert(id, handle);
            if matches!(v.ty, Type::Array { .. }) {
                has_array_global = true;
            }
        }

        if has_array_global {
            let init = self.asm.declare_method(".init", &[], &Type::VOID);
            self.asm.set_static_initializer(init);
            self.static_init = Some(init);
        }
    }

    fn emit_all(&mut self) {
        let funcs: Vec<FuncId> = self.prog.funcs.iter().map(|(id, _)| id).collect();
        for func in funcs {
            self.emit_function(func);
        }
        if let Some(init) = self.static_init {
            self.emit_static_initializer(init);
        }
        self.asm.set_entry_point(self.methods[&self.prog.main]);
    }

    fn emit_function(&mut self, func: FuncId) {
        let f = &self.prog.funcs[func];
        self.asm.begin_method(self.methods[&func]);

        let mut ctx = FunctionContext::new();
        let locals: Vec<VarId> = self.prog.scopes.locals_of(f.scope).to_vec();
        for &local in &locals {
            let slot = self.asm.declare_local(&self.prog.vars[local].ty);
            ctx.assign_slot(local, slot);
        }
        // array-typed locals exist before the first statement runs
        for &local in &locals {
            if let Type::Array { elem, ref sizes } = self.prog.vars[local].ty {
                for &s in sizes {
                    self.asm.emit(Inst::LdcI4(s as i32));
                }
                self.asm.emit(Inst::Newobj(ArraySig {
                    elem,
                    rank: sizes.len() as u8,
                }));
                self.asm.emit(Inst::Stloc(ctx.slot(local)));
            }
        }

        self.emit_stmt(&ctx, f.body);
        self.asm.end_method();
    }

    fn emit_static_initializer(&mut self, init: MethodHandle) {
        self.asm.begin_method(init);
        for (id, v) in self.prog.vars.iter() {
            if v.storage != Storage::Global {
                continue;
            }
            if let Type::Array { elem, ref sizes } = v.ty {
                for &s in sizes {
                    self.asm.emit(Inst::LdcI4(s as i32));
                }
                self.asm.emit(Inst::Newobj(ArraySig {
                    elem,
                    rank: sizes.len() as u8,
                }));
                self.asm.emit(Inst::Stsfld(FieldRef::Static(self.globals[&id])));
            }
        }
        self.asm.emit(Inst::Ret);
        self.asm.end_method();
    }
}

//! Default assembler: an executable image encoder.
//!
//! Records declarations and per-method instruction streams, then encodes a
//! self-describing binary image. Branch targets are labels while recording
//! and become relative byte offsets during encoding (relative to the end of
//! the branch instruction). A human-readable listing of the same streams is
//! available for the `.il` side file.
//!
//! Image layout: magic `VXIL`, format version, assembly name, entry-point
//! and static-initializer method indices, the global table, then the method
//! table with encoded bodies.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::types::{Primitive, Type};

use super::il::{ArraySig, Assembler, Callee, FieldHandle, FieldRef, Inst, Label, MethodHandle};

pub const IMAGE_MAGIC: &[u8; 4] = b"VXIL";
pub const IMAGE_VERSION: u16 = 1;

const NO_METHOD: u32 = u32::MAX;

/// One recorded code-stream entry: an instruction or a label mark.
#[derive(Debug, Clone, PartialEq)]
pub enum Code {
    Inst(Inst),
    Mark(Label),
}

#[derive(Debug, Clone)]
struct MethodDef {
    name: String,
    params: Vec<Type>,
    ret: Type,
    locals: Vec<Type>,
    code: Vec<Code>,
    labels: u32,
}

#[derive(Debug, Clone)]
struct GlobalDef {
    name: String,
    ty: Type,
}

#[derive(Debug, Default)]
pub struct ImageAssembler {
    name: String,
    globals: Vec<GlobalDef>,
    methods: Vec<MethodDef>,
    entry: Option<MethodHandle>,
    static_init: Option<MethodHandle>,
    current: Option<usize>,
}

impl ImageAssembler {
    pub fn new() -> ImageAssembler {
        ImageAssembler::default()
    }

    fn current_method(&mut self) -> &mut MethodDef {
        let idx = self.current.expect("no method is open for emission");
        &mut self.methods[idx]
    }

    /// The recorded stream of one method, marks included; test surface.
    pub fn code_of(&self, method: MethodHandle) -> &[Code] {
        &self.methods[method.0 as usize].code
    }

    pub fn method_names(&self) -> Vec<&str> {
        self.methods.iter().map(|m| m.name.as_str()).collect()
    }

    // ── listing ───────────────────────────────────────────────────

    /// Render the whole image as text, one method per section.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, ".assembly {}", self.name);
        for g in &self.globals {
            let _ = writeln!(out, ".global {} {}", g.ty, g.name);
        }
        for (i, m) in self.methods.iter().enumerate() {
            let params: Vec<String> = m.params.iter().map(|t| t.to_string()).collect();
            let _ = writeln!(out, "\n.method {} {}({})", m.ret, m.name, params.join(", "));
            if self.entry == Some(MethodHandle(i as u32)) {
                let _ = writeln!(out, "  .entrypoint");
            }
            if !m.locals.is_empty() {
                let locals: Vec<String> = m.locals.iter().map(|t| t.to_string()).collect();
                let _ = writeln!(out, "  .locals ({})", locals.join(", "));
            }
            for code in &m.code {
                match code {
                    Code::Mark(l) => {
                        let _ = writeln!(out, "  L{}:", l.0);
                    }
                    Code::Inst(inst) => {
                        let _ = writeln!(out, "    {}", render_inst(inst));
                    }
                }
            }
        }
        out
    }
}

fn render_inst(inst: &Inst) -> String {
    match inst {
        Inst::LdcI4(n) if (0..=8).contains(n) => format!("ldc.i4.{n}"),
        Inst::LdcI4(n) => format!("ldc.i4 {n}"),
        Inst::LdcR8(d) => format!("ldc.r8 {d:?}"),
        Inst::Ldstr(s) => format!("ldstr {s:?}"),
        Inst::Add => "add".into(),
        Inst::Sub => "sub".into(),
        Inst::Mul => "mul".into(),
        Inst::Div => "div".into(),
        Inst::Rem => "rem".into(),
        Inst::Neg => "neg".into(),
        Inst::Xor => "xor".into(),
        Inst::Ceq => "ceq".into(),
        Inst::Cgt => "cgt".into(),
        Inst::Clt => "clt".into(),
        Inst::ConvR8 => "conv.r8".into(),
        Inst::ConvI4 => "conv.i4".into(),
        Inst::Pop => "pop".into(),
        Inst::Ret => "ret".into(),
        Inst::Br(l) => format!("br L{}", l.0),
        Inst::Brtrue(l) => format!("brtrue L{}", l.0),
        Inst::Brfalse(l) => format!("brfalse L{}", l.0),
        Inst::Bgt(l) => format!("bgt L{}", l.0),
        Inst::Blt(l) => format!("blt L{}", l.0),
        Inst::Ldloc(i) => format!("ldloc {i}"),
        Inst::Stloc(i) => format!("stloc {i}"),
        Inst::Ldarg(i) => format!("ldarg {i}"),
        Inst::Starg(i) => format!("starg {i}"),
        Inst::Ldsfld(f) => format!("ldsfld {}", render_field(f)),
        Inst::Stsfld(f) => format!("stsfld {}", render_field(f)),
        Inst::Newobj(sig) => format!("newobj {}[{}]", sig.elem, sig.rank),
        Inst::Call(c) => match c {
            Callee::Method(m) => format!("call #{}", m.0),
            Callee::External(m) => format!("call [{}]{}.{}", m.library, m.owner, m.name),
            Callee::ArrayGet(sig) => format!("call {}[{}]::Get", sig.elem, sig.rank),
            Callee::ArraySet(sig) => format!("call {}[{}]::Set", sig.elem, sig.rank),
            Callee::StringConcat => "call string::Concat".into(),
        },
    }
}

fn render_field(f: &FieldRef) -> String {
    match f {
        FieldRef::Static(h) => format!("${}", h.0),
        FieldRef::External(f) => format!("[{}]{}.{}", f.library, f.owner, f.name),
    }
}

impl Assembler for ImageAssembler {
    fn begin_assembly(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn declare_method(&mut self, name: &str, params: &[Type], ret: &Type) -> MethodHandle {
        self.methods.push(MethodDef {
            name: name.to_string(),
            params: params.to_vec(),
            ret: ret.clone(),
            locals: Vec::new(),
            code: Vec::new(),
            labels: 0,
        });
        MethodHandle(self.methods.len() as u32 - 1)
    }

    fn declare_global(&mut self, name: &str, ty: &Type) -> FieldHandle {
        self.globals.push(GlobalDef {
            name: name.to_string(),
            ty: ty.clone(),
        });
        FieldHandle(self.globals.len() as u32 - 1)
    }

    fn begin_method(&mut self, method: MethodHandle) {
        self.current = Some(method.0 as usize);
    }

    fn declare_local(&mut self, ty: &Type) -> u16 {
        let m = self.current_method();
        m.locals.push(ty.clone());
        m.locals.len() as u16 - 1
    }

    fn define_label(&mut self) -> Label {
        let m = self.current_method();
        m.labels += 1;
        Label(m.labels - 1)
    }

    fn mark_label(&mut self, label: Label) {
        self.current_method().code.push(Code::Mark(label));
    }

    fn emit(&mut self, inst: Inst) {
        self.current_method().code.push(Code::Inst(inst));
    }

    fn end_method(&mut self) {
        self.current = None;
    }

    fn set_entry_point(&mut self, method: MethodHandle) {
        self.entry = Some(method);
    }

    fn set_static_initializer(&mut self, method: MethodHandle) {
        self.static_init = Some(method);
    }

    fn finish(&mut self) -> Vec<u8> {
        let mut w = Writer::default();
        w.bytes(IMAGE_MAGIC);
        w.u16(IMAGE_VERSION);
        w.str16(&self.name);
        w.u32(self.entry.map(|m| m.0).unwrap_or(NO_METHOD));
        w.u32(self.static_init.map(|m| m.0).unwrap_or(NO_METHOD));

        w.u32(self.globals.len() as u32);
        for g in &self.globals {
            w.str16(&g.name);
            w.ty(&g.ty);
        }

        w.u32(self.methods.len() as u32);
        for m in &self.methods {
            w.str16(&m.name);
            w.u16(m.params.len() as u16);
            for p in &m.params {
                w.ty(p);
            }
            w.ty(&m.ret);
            w.u16(m.locals.len() as u16);
            for l in &m.locals {
                w.ty(l);
            }
            let body = encode_body(&m.code);
            w.u32(body.len() as u32);
            w.bytes(&body);
        }
        w.buf
    }
}

// ── encoding ──────────────────────────────────────────────────────

#[derive(Default)]
struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }
    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }
    fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }
    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }
    fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }
    fn f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }
    fn str16(&mut self, s: &str) {
        self.u16(s.len() as u16);
        self.bytes(s.as_bytes());
    }

    fn prim(&mut self, p: Primitive) {
        self.u8(match p {
            Primitive::Bool => 0,
            Primitive::Int => 1,
            Primitive::Double => 2,
            Primitive::String => 3,
            Primitive::Void => 4,
            Primitive::Unsupported => 5,
        });
    }

    fn ty(&mut self, t: &Type) {
        match t {
            Type::Primitive(p) => {
                self.u8(0);
                self.prim(*p);
            }
            Type::Array { elem, sizes } => {
                self.u8(1);
                self.prim(*elem);
                self.u8(sizes.len() as u8);
                for &s in sizes {
                    self.u32(s);
                }
            }
        }
    }
}

mod op {
    pub const POP: u8 = 0x0A;
    pub const RET: u8 = 0x0B;
    pub const ADD: u8 = 0x10;
    pub const SUB: u8 = 0x11;
    pub const MUL: u8 = 0x12;
    pub const DIV: u8 = 0x13;
    pub const REM: u8 = 0x14;
    pub const NEG: u8 = 0x15;
    pub const XOR: u8 = 0x16;
    pub const CEQ: u8 = 0x17;
    pub const CGT: u8 = 0x18;
    pub const CLT: u8 = 0x19;
    pub const CONV_R8: u8 = 0x1A;
    pub const CONV_I4: u8 = 0x1B;
    /// Base of the `ldc.i4.0` .. `ldc.i4.8` short forms.
    pub const LDC_I4_SHORT: u8 = 0x20;
    pub const LDC_I4: u8 = 0x29;
    pub const LDC_R8: u8 = 0x2A;
    pub const LDSTR: u8 = 0x2B;
    pub const LDLOC: u8 = 0x30;
    pub const STLOC: u8 = 0x31;
    pub const LDARG: u8 = 0x32;
    pub const STARG: u8 = 0x33;
    pub const LDSFLD: u8 = 0x34;
    pub const STSFLD: u8 = 0x35;
    pub const NEWOBJ: u8 = 0x38;
    pub const CALL: u8 = 0x39;
    pub const BR: u8 = 0x40;
    pub const BRTRUE: u8 = 0x41;
    pub const BRFALSE: u8 = 0x42;
    pub const BGT: u8 = 0x43;
    pub const BLT: u8 = 0x44;
}

fn field_ref_size(f: &FieldRef) -> usize {
    match f {
        FieldRef::Static(_) => 1 + 4,
        FieldRef::External(f) => 1 + 2 + f.library.len() + 2 + f.owner.len() + 2 + f.name.len(),
    }
}

fn callee_size(c: &Callee) -> usize {
    match c {
        Callee::Method(_) => 1 + 4,
        Callee::External(m) => {
            1 + 2 + m.library.len() + 2 + m.owner.len() + 2 + m.name.len() + 1
        }
        Callee::ArrayGet(_) | Callee::ArraySet(_) => 1 + 2,
        Callee::StringConcat => 1,
    }
}

fn inst_size(inst: &Inst) -> usize {
    match inst {
        Inst::LdcI4(n) if (0..=8).contains(n) => 1,
        Inst::LdcI4(_) => 1 + 4,
        Inst::LdcR8(_) => 1 + 8,
        Inst::Ldstr(s) => 1 + 2 + s.len(),
        Inst::Add
        | Inst::Sub
        | Inst::Mul
        | Inst::Div
        | Inst::Rem
        | Inst::Neg
        | Inst::Xor
        | Inst::Ceq
        | Inst::Cgt
        | Inst::Clt
        | Inst::ConvR8
        | Inst::ConvI4
        | Inst::Pop
        | Inst::Ret => 1,
        Inst::Br(_) | Inst::Brtrue(_) | Inst::Brfalse(_) | Inst::Bgt(_) | Inst::Blt(_) => 1 + 4,
        Inst::Ldloc(_) | Inst::Stloc(_) | Inst::Ldarg(_) | Inst::Starg(_) => 1 + 2,
        Inst::Ldsfld(f) | Inst::Stsfld(f) => 1 + field_ref_size(f),
        Inst::Newobj(_) => 1 + 2,
        Inst::Call(c) => 1 + callee_size(c),
    }
}

/// Two passes: lay out byte offsets and record label positions, then write
/// with branch operands resolved relative to the end of each instruction.
fn encode_body(code: &[Code]) -> Vec<u8> {
    let mut offsets: HashMap<Label, i32> = HashMap::new();
    let mut pos = 0usize;
    for c in code {
        match c {
            Code::Mark(l) => {
                offsets.insert(*l, pos as i32);
            }
            Code::Inst(inst) => pos += inst_size(inst),
        }
    }

    let mut w = Writer::default();
    let mut pos = 0usize;
    for c in code {
        let inst = match c {
            Code::Mark(_) => continue,
            Code::Inst(inst) => inst,
        };
        pos += inst_size(inst);
        let target = |l: &Label| offsets.get(l).copied().unwrap_or(0) - pos as i32;
        match inst {
            Inst::LdcI4(n) if (0..=8).contains(n) => w.u8(op::LDC_I4_SHORT + *n as u8),
            Inst::LdcI4(n) => {
                w.u8(op::LDC_I4);
                w.i32(*n);
            }
            Inst::LdcR8(d) => {
                w.u8(op::LDC_R8);
                w.f64(*d);
            }
            Inst::Ldstr(s) => {
                w.u8(op::LDSTR);
                w.str16(s);
            }
            Inst::Add => w.u8(op::ADD),
            Inst::Sub => w.u8(op::SUB),
            Inst::Mul => w.u8(op::MUL),
            Inst::Div => w.u8(op::DIV),
            Inst::Rem => w.u8(op::REM),
            Inst::Neg => w.u8(op::NEG),
            Inst::Xor => w.u8(op::XOR),
            Inst::Ceq => w.u8(op::CEQ),
            Inst::Cgt => w.u8(op::CGT),
            Inst::Clt => w.u8(op::CLT),
            Inst::ConvR8 => w.u8(op::CONV_R8),
            Inst::ConvI4 => w.u8(op::CONV_I4),
            Inst::Pop => w.u8(op::POP),
            Inst::Ret => w.u8(op::RET),
            Inst::Br(l) => {
                w.u8(op::BR);
                w.i32(target(l));
            }
            Inst::Brtrue(l) => {
                w.u8(op::BRTRUE);
                w.i32(target(l));
            }
            Inst::Brfalse(l) => {
                w.u8(op::BRFALSE);
                w.i32(target(l));
            }
            Inst::Bgt(l) => {
                w.u8(op::BGT);
                w.i32(target(l));
            }
            Inst::Blt(l) => {
                w.u8(op::BLT);
                w.i32(target(l));
            }
            Inst::Ldloc(i) => {
                w.u8(op::LDLOC);
                w.u16(*i);
            }
            Inst::Stloc(i) => {
                w.u8(op::STLOC);
                w.u16(*i);
            }
            Inst::Ldarg(i) => {
                w.u8(op::LDARG);
                w.u16(*i);
            }
            Inst::Starg(i) => {
                w.u8(op::STARG);
                w.u16(*i);
            }
            Inst::Ldsfld(f) => {
                w.u8(op::LDSFLD);
                write_field_ref(&mut w, f);
            }
            Inst::Stsfld(f) => {
                w.u8(op::STSFLD);
                write_field_ref(&mut w, f);
            }
            Inst::Newobj(sig) => {
                w.u8(op::NEWOBJ);
                write_array_sig(&mut w, sig);
            }
            Inst::Call(c) => {
                w.u8(op::CALL);
                write_callee(&mut w, c);
            }
        }
    }
    w.buf
}

fn write_array_sig(w: &mut Writer, sig: &ArraySig) {
    w.prim(sig.elem);
    w.u8(sig.rank);
}

fn write_field_ref(w: &mut Writer, f: &FieldRef) {
    match f {
        FieldRef::Static(h) => {
            w.u8(0);
            w.u32(h.0);
        }
        FieldRef::External(f) => {
            w.u8(1);
            w.str16(&f.library);
            w.str16(&f.owner);
            w.str16(&f.name);
        }
    }
}

fn write_callee(w: &mut Writer, c: &Callee) {
    match c {
        Callee::Method(m) => {
            w.u8(0);
            w.u32(m.0);
        }
        Callee::External(m) => {
            w.u8(1);
            w.str16(&m.library);
            w.str16(&m.owner);
            w.str16(&m.name);
            w.u8(m.params.len() as u8);
        }
        Callee::ArrayGet(sig) => {
            w.u8(2);
            write_array_sig(w, sig);
        }
        Callee::ArraySet(sig) => {
            w.u8(3);
            write_array_sig(w, sig);
        }
        Callee::StringConcat => w.u8(4),
    }
}

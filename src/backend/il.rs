//! The managed IL target surface.
//!
//! Instructions, labels, and member handles for a typed stack machine with
//! statics, strings, and rectangular arrays. The assembler is an injectable
//! capability: the emitter only talks to this trait, and the default
//! implementation in `image` turns the stream into a persistent executable.

use crate::reflect::{ExternalField, ExternalMethod};
use crate::types::{Primitive, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldHandle(pub u32);

/// A branch target inside one method body; marked at a position and
/// resolved to an offset when the body is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub u32);

/// A static field reference: a holder field of this program, or a field of
/// an external type reached by reflection.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRef {
    Static(FieldHandle),
    External(ExternalField),
}

/// Element type and rank of a rectangular array, as needed by its
/// constructor and accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArraySig {
    pub elem: Primitive,
    pub rank: u8,
}

impl ArraySig {
    pub fn of(ty: &Type) -> Option<ArraySig> {
        match ty {
            Type::Array { elem, sizes } => Some(ArraySig {
                elem: *elem,
                rank: sizes.len() as u8,
            }),
            Type::Primitive(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    /// A method of this program.
    Method(MethodHandle),
    /// An external static method.
    External(ExternalMethod),
    /// `arr.Get(i, ...)` on a rectangular array.
    ArrayGet(ArraySig),
    /// `arr.Set(i, ..., value)` on a rectangular array.
    ArraySet(ArraySig),
    /// The runtime's string concatenation helper; `+` on strings lowers to
    /// this.
    StringConcat,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inst {
    /// Integer constant; values 0 through 8 encode as short forms.
    LdcI4(i32),
    LdcR8(f64),
    Ldstr(String),
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Neg,
    Xor,
    Ceq,
    Cgt,
    Clt,
    ConvR8,
    ConvI4,
    Pop,
    Ret,
    Br(Label),
    Brtrue(Label),
    Brfalse(Label),
    Bgt(Label),
    Blt(Label),
    Ldloc(u16),
    Stloc(u16),
    Ldarg(u16),
    Starg(u16),
    Ldsfld(FieldRef),
    Stsfld(FieldRef),
    /// Invoke the array constructor; the dimension lengths are on the stack.
    Newobj(ArraySig),
    Call(Callee),
}

/// The bytecode assembler capability: accepts declarations and instruction
/// emission, and persists an executable image at the end.
pub trait Assembler {
    fn begin_assembly(&mut self, name: &str);
    fn declare_method(&mut self, name: &str, params: &[Type], ret: &Type) -> MethodHandle;
    fn declare_global(&mut self, name: &str, ty: &Type) -> FieldHandle;
    fn begin_method(&mut self, method: MethodHandle);
    fn declare_local(&mut self, ty: &Type) -> u16;
    fn define_label(&mut self) -> Label;
    fn mark_label(&mut self, label: Label);
    fn emit(&mut self, inst: Inst);
    fn end_method(&mut self);
    fn set_entry_point(&mut self, method: MethodHandle);
    fn set_static_initializer(&mut self, method: MethodHandle);
    /// Encode the finished image.
    fn finish(&mut self) -> Vec<u8>;
}

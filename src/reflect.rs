//! Reflective type provider capability.
//!
//! The global scope resolves qualified names against external precompiled
//! libraries, but it does not know how types and members are enumerated: it
//! holds an opaque provider yielding type, field, and method descriptors.
//! The built-in registry implements the standard library that every
//! compilation references implicitly; tests stub their own providers.

use std::collections::HashMap;

use smol_str::SmolStr;

use crate::types::{Primitive, Type};

/// Name of the implicit standard-library reference.
pub const CORE_LIBRARY: &str = "core";

/// A public static field of an external type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDesc {
    pub name: SmolStr,
    pub ty: Type,
}

/// A public static method of an external type. Parameter or return types the
/// compiler does not model are reported as `Unsupported`.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDesc {
    pub name: SmolStr,
    pub params: Vec<Type>,
    pub ret: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDesc {
    pub full_name: SmolStr,
    pub fields: Vec<FieldDesc>,
    pub methods: Vec<MethodDesc>,
}

impl TypeDesc {
    pub fn new(full_name: impl Into<SmolStr>) -> TypeDesc {
        TypeDesc {
            full_name: full_name.into(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn field(mut self, name: &str, ty: Type) -> TypeDesc {
        self.fields.push(FieldDesc {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn method(mut self, name: &str, params: &[Type], ret: Type) -> TypeDesc {
        self.methods.push(MethodDesc {
            name: name.into(),
            params: params.to_vec(),
            ret,
        });
        self
    }
}

/// The injectable boundary between the compiler and the host's metadata
/// machinery.
pub trait TypeProvider {
    fn find_type(&self, library: &str, full_name: &str) -> Option<&TypeDesc>;
}

/// A resolved reference to an external static field, carried through the AST
/// into emitted instructions.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalField {
    pub library: SmolStr,
    pub owner: SmolStr,
    pub name: SmolStr,
    pub ty: Type,
}

/// A resolved reference to an external static method.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalMethod {
    pub library: SmolStr,
    pub owner: SmolStr,
    pub name: SmolStr,
    pub params: Vec<Type>,
    pub ret: Type,
}

/// Descriptor registry keyed by library reference.
#[derive(Debug, Default)]
pub struct Registry {
    libraries: HashMap<String, Vec<TypeDesc>>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    pub fn add_type(&mut self, library: &str, desc: TypeDesc) {
        self.libraries.entry(library.to_string()).or_default().push(desc);
    }

    /// The standard library shipped with the compiler: console output and a
    /// small math surface, enough for programs to observe their results.
    pub fn standard() -> Registry {
        let mut reg = Registry::new();
        let console = TypeDesc::new("Console")
            .method("Write", &[Type::INT], Type::VOID)
            .method("Write", &[Type::DOUBLE], Type::VOID)
            .method("Write", &[Type::STRING], Type::VOID)
            .method("Write", &[Type::BOOL], Type::VOID)
            .method("WriteLine", &[], Type::VOID)
            .method("WriteLine", &[Type::INT], Type::VOID)
            .method("WriteLine", &[Type::DOUBLE], Type::VOID)
            .method("WriteLine", &[Type::STRING], Type::VOID)
            .method("WriteLine", &[Type::BOOL], Type::VOID)
            .method("ReadLine", &[], Type::STRING);
        let math = TypeDesc::new("Math")
            .field("Pi", Type::DOUBLE)
            .field("E", Type::DOUBLE)
            .method("Sqrt", &[Type::DOUBLE], Type::DOUBLE)
            .method("Abs", &[Type::INT], Type::INT)
            .method("Abs", &[Type::DOUBLE], Type::DOUBLE)
            .method("Pow", &[Type::DOUBLE, Type::DOUBLE], Type::DOUBLE)
            // exposed with a parameter type the compiler does not model;
            // overload resolution must skip it
            .method(
                "Round",
                &[Type::Primitive(Primitive::Unsupported)],
                Type::DOUBLE,
            )
            .method("Round", &[Type::DOUBLE], Type::DOUBLE);
        reg.add_type(CORE_LIBRARY, console);
        reg.add_type(CORE_LIBRARY, math);
        reg
    }
}

impl TypeProvider for Registry {
    fn find_type(&self, library: &str, full_name: &str) -> Option<&TypeDesc> {
        self.libraries
            .get(library)?
            .iter()
            .find(|t| t.full_name == full_name)
    }
}

//! Cross-cutting type model shared by every compilation phase.

use std::fmt;
use std::hash::{Hash, Hasher};

use smol_str::SmolStr;

/// The primitive kinds the language models. `Unsupported` is the sentinel
/// produced when an external member has a type the compiler does not model;
/// expressions of that type never participate in further type-directed
/// decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    Int,
    Double,
    String,
    Void,
    Unsupported,
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Int => "int",
            Primitive::Double => "double",
            Primitive::String => "string",
            Primitive::Void => "void",
            Primitive::Unsupported => "<unsupported>",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A language type: a primitive, or a rectangular fixed-size array of a
/// primitive. Jagged arrays cannot be expressed.
#[derive(Debug, Clone, Eq)]
pub enum Type {
    Primitive(Primitive),
    Array { elem: Primitive, sizes: Vec<u32> },
}

impl Type {
    pub const BOOL: Type = Type::Primitive(Primitive::Bool);
    pub const INT: Type = Type::Primitive(Primitive::Int);
    pub const DOUBLE: Type = Type::Primitive(Primitive::Double);
    pub const STRING: Type = Type::Primitive(Primitive::String);
    pub const VOID: Type = Type::Primitive(Primitive::Void);
    pub const UNSUPPORTED: Type = Type::Primitive(Primitive::Unsupported);

    pub fn primitive(&self) -> Option<Primitive> {
        match self {
            Type::Primitive(p) => Some(*p),
            Type::Array { .. } => None,
        }
    }

    /// Number of dimensions; zero for non-arrays.
    pub fn rank(&self) -> usize {
        match self {
            Type::Primitive(_) => 0,
            Type::Array { sizes, .. } => sizes.len(),
        }
    }

    pub fn element(&self) -> Option<Primitive> {
        match self {
            Type::Array { elem, .. } => Some(*elem),
            Type::Primitive(_) => None,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Type::Primitive(Primitive::Unsupported))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Primitive(Primitive::Void))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Type::Primitive(Primitive::Int) | Type::Primitive(Primitive::Double)
        )
    }

    /// The one implicit widening of the coercion lattice: `int` to `double`.
    pub fn coerces_to(&self, target: &Type) -> bool {
        matches!(
            (self, target),
            (
                Type::Primitive(Primitive::Int),
                Type::Primitive(Primitive::Double)
            )
        )
    }

    /// Equal or implicitly widenable.
    pub fn compatible_with(&self, target: &Type) -> bool {
        self == target || self.coerces_to(target)
    }

    /// Whether an explicit cast form exists. Besides the implicit widening,
    /// the only recognized cast is the narrowing `double` to `int`.
    pub fn casts_to(&self, target: &Type) -> bool {
        self.compatible_with(target)
            || matches!(
                (self, target),
                (
                    Type::Primitive(Primitive::Double),
                    Type::Primitive(Primitive::Int)
                )
            )
    }
}

/// Array types compare by rank alone: two arrays with the same number of
/// dimensions are interchangeable regardless of element type or sizes.
impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Primitive(a), Type::Primitive(b)) => a == b,
            (Type::Array { sizes: a, .. }, Type::Array { sizes: b, .. }) => a.len() == b.len(),
            _ => false,
        }
    }
}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Type::Primitive(p) => {
                0u8.hash(state);
                p.hash(state);
            }
            Type::Array { sizes, .. } => {
                1u8.hash(state);
                sizes.len().hash(state);
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(p) => write!(f, "{p}"),
            Type::Array { elem, sizes } => {
                write!(f, "{elem}[")?;
                for (i, s) in sizes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{s}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// A callable signature: name, return type, and positional parameter types.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub name: SmolStr,
    pub ret: Type,
    pub params: Vec<Type>,
}

impl Signature {
    /// Same arity and per-argument type equality.
    pub fn matches_exact(&self, args: &[Type]) -> bool {
        self.params.len() == args.len()
            && self.params.iter().zip(args).all(|(p, a)| p == a)
    }

    /// Same arity and each argument equal to or implicitly coercible to the
    /// expected parameter type.
    pub fn accepts(&self, args: &[Type]) -> bool {
        self.params.len() == args.len()
            && self
                .params
                .iter()
                .zip(args)
                .all(|(p, a)| a.compatible_with(p))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.ret, self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{p}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrays_compare_by_rank_only() {
        let a = Type::Array {
            elem: Primitive::Int,
            sizes: vec![2, 3],
        };
        let b = Type::Array {
            elem: Primitive::Double,
            sizes: vec![7, 1],
        };
        let c = Type::Array {
            elem: Primitive::Int,
            sizes: vec![4],
        };
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, Type::INT);
    }

    #[test]
    fn only_int_widens_to_double() {
        assert!(Type::INT.coerces_to(&Type::DOUBLE));
        assert!(!Type::DOUBLE.coerces_to(&Type::INT));
        assert!(!Type::BOOL.coerces_to(&Type::INT));
        assert!(Type::DOUBLE.casts_to(&Type::INT));
        assert!(!Type::STRING.casts_to(&Type::INT));
    }
}

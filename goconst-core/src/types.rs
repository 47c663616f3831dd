//! Constant types: untyped kinds, predeclared basic types and named types.

use std::fmt;
use std::rc::Rc;

/// Predeclared basic types that can hold constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Basic {
    Bool,
    String,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
}

impl Basic {
    /// Looks up a predeclared type name, including the `byte` and `rune` aliases.
    pub fn from_name(name: &str) -> Option<Basic> {
        Some(match name {
            "bool" => Basic::Bool,
            "string" => Basic::String,
            "int" => Basic::Int,
            "int8" => Basic::Int8,
            "int16" => Basic::Int16,
            "int32" | "rune" => Basic::Int32,
            "int64" => Basic::Int64,
            "uint" => Basic::Uint,
            "uint8" | "byte" => Basic::Uint8,
            "uint16" => Basic::Uint16,
            "uint32" => Basic::Uint32,
            "uint64" => Basic::Uint64,
            "uintptr" => Basic::Uintptr,
            "float32" => Basic::Float32,
            "float64" => Basic::Float64,
            "complex64" => Basic::Complex64,
            "complex128" => Basic::Complex128,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Basic::Bool => "bool",
            Basic::String => "string",
            Basic::Int => "int",
            Basic::Int8 => "int8",
            Basic::Int16 => "int16",
            Basic::Int32 => "int32",
            Basic::Int64 => "int64",
            Basic::Uint => "uint",
            Basic::Uint8 => "uint8",
            Basic::Uint16 => "uint16",
            Basic::Uint32 => "uint32",
            Basic::Uint64 => "uint64",
            Basic::Uintptr => "uintptr",
            Basic::Float32 => "float32",
            Basic::Float64 => "float64",
            Basic::Complex64 => "complex64",
            Basic::Complex128 => "complex128",
        }
    }

    pub fn class(self) -> Class {
        match self {
            Basic::Bool => Class::Bool,
            Basic::String => Class::String,
            Basic::Float32 | Basic::Float64 => Class::Float,
            Basic::Complex64 | Basic::Complex128 => Class::Complex,
            _ => Class::Int,
        }
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            Basic::Uint | Basic::Uint8 | Basic::Uint16 | Basic::Uint32 | Basic::Uint64 | Basic::Uintptr
        )
    }

    /// Bit size of integer and float types; `int`, `uint` and `uintptr` follow the target word.
    pub fn bits(self, sizes: Sizes) -> u32 {
        match self {
            Basic::Int8 | Basic::Uint8 => 8,
            Basic::Int16 | Basic::Uint16 => 16,
            Basic::Int32 | Basic::Uint32 | Basic::Float32 => 32,
            Basic::Int64 | Basic::Uint64 | Basic::Float64 | Basic::Complex64 => 64,
            Basic::Complex128 => 128,
            Basic::Int | Basic::Uint | Basic::Uintptr => sizes.word_bits,
            Basic::Bool | Basic::String => 0,
        }
    }
}

/// Kinds of untyped constants, in numeric promotion order where it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Untyped {
    Bool,
    String,
    Int,
    Rune,
    Float,
    Complex,
}

impl Untyped {
    pub fn class(self) -> Class {
        match self {
            Untyped::Bool => Class::Bool,
            Untyped::String => Class::String,
            Untyped::Int | Untyped::Rune => Class::Int,
            Untyped::Float => Class::Float,
            Untyped::Complex => Class::Complex,
        }
    }

    /// Rank among numeric kinds; `None` for bool and string.
    pub fn numeric_rank(self) -> Option<u8> {
        match self {
            Untyped::Int => Some(0),
            Untyped::Rune => Some(1),
            Untyped::Float => Some(2),
            Untyped::Complex => Some(3),
            Untyped::Bool | Untyped::String => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Untyped::Bool => "untyped bool",
            Untyped::String => "untyped string",
            Untyped::Int => "untyped int",
            Untyped::Rune => "untyped rune",
            Untyped::Float => "untyped float",
            Untyped::Complex => "untyped complex",
        }
    }
}

/// Value class shared by untyped kinds and basic types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    Bool,
    String,
    Int,
    Float,
    Complex,
}

impl Class {
    pub fn is_numeric(self) -> bool {
        matches!(self, Class::Int | Class::Float | Class::Complex)
    }

    pub fn is_ordered(self) -> bool {
        matches!(self, Class::Int | Class::Float | Class::String)
    }
}

/// A type declared with `type Name T` in some package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedType {
    /// Package label or import path that declares the type
    pub package: String,
    pub name: String,
    /// Underlying basic type, `None` for structs, slices, interfaces, ...
    pub underlying: Option<Basic>,
}

/// The type of a constant or of a conversion target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Untyped(Untyped),
    Basic(Basic),
    Named(Rc<NamedType>),
    /// Any type that cannot hold a constant (composite, interface, ...)
    Other(String),
}

impl Type {
    pub fn named(package: impl Into<String>, name: impl Into<String>, underlying: Option<Basic>) -> Type {
        Type::Named(Rc::new(NamedType {
            package: package.into(),
            name: name.into(),
            underlying,
        }))
    }

    pub fn is_untyped(&self) -> bool {
        matches!(self, Type::Untyped(_))
    }

    /// Underlying basic type of a typed constant type.
    pub fn basic(&self) -> Option<Basic> {
        match self {
            Type::Basic(b) => Some(*b),
            Type::Named(named) => named.underlying,
            Type::Untyped(_) | Type::Other(_) => None,
        }
    }

    pub fn class(&self) -> Option<Class> {
        match self {
            Type::Untyped(kind) => Some(kind.class()),
            _ => self.basic().map(Basic::class),
        }
    }

    /// Whether a constant may have this type.
    pub fn is_const_type(&self) -> bool {
        self.class().is_some()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Untyped(kind) => f.write_str(kind.name()),
            Type::Basic(b) => f.write_str(b.name()),
            Type::Named(named) => {
                let pkg = named.package.rsplit('/').next().unwrap_or(&named.package);
                if pkg.is_empty() {
                    f.write_str(&named.name)
                } else {
                    write!(f, "{}.{}", pkg, named.name)
                }
            }
            Type::Other(text) => f.write_str(text),
        }
    }
}

/// Target-dependent type sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sizes {
    /// Width of `int`, `uint` and `uintptr`
    pub word_bits: u32,
}

impl Default for Sizes {
    fn default() -> Self {
        Self { word_bits: 64 }
    }
}

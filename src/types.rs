//! Semantic types for Mica.
//!
//! A closed set: the scalar families (signed/unsigned integers, floats),
//! `bool`, `char`, `string`, `nothing`, and named struct types. The generic
//! keywords `int`, `uint`, and `float` are distinct types that default to
//! the 32-bit width at lowering but accept any width of their family during
//! type checking (the equivalence relaxation).

use crate::lexer::TokenKind;
use string_interner::{DefaultStringInterner, DefaultSymbol};

/// The interned-name type used throughout the AST and symbol tables.
pub type Name = DefaultSymbol;

/// A Mica semantic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    Char,
    Str,
    Nothing,
    /// Generic signed integer keyword `int` (32-bit at lowering).
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    /// Generic unsigned integer keyword `uint` (32-bit at lowering).
    UInt,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    /// Generic float keyword `float` (32-bit at lowering).
    Float,
    Float32,
    Float64,
    /// A named struct type; equivalent only to itself.
    Struct(Name),
}

impl Type {
    /// Map a type keyword token to its type. Struct names are identifiers
    /// and resolve through the symbol table instead.
    pub fn from_token(kind: TokenKind) -> Option<Type> {
        match kind {
            TokenKind::Bool => Some(Type::Bool),
            TokenKind::Char => Some(Type::Char),
            TokenKind::String => Some(Type::Str),
            TokenKind::Nothing => Some(Type::Nothing),
            TokenKind::Int => Some(Type::Int),
            TokenKind::Int8 => Some(Type::Int8),
            TokenKind::Int16 => Some(Type::Int16),
            TokenKind::Int32 => Some(Type::Int32),
            TokenKind::Int64 => Some(Type::Int64),
            TokenKind::UInt => Some(Type::UInt),
            TokenKind::UInt8 => Some(Type::UInt8),
            TokenKind::UInt16 => Some(Type::UInt16),
            TokenKind::UInt32 => Some(Type::UInt32),
            TokenKind::UInt64 => Some(Type::UInt64),
            TokenKind::Float => Some(Type::Float),
            TokenKind::Float32 => Some(Type::Float32),
            TokenKind::Float64 => Some(Type::Float64),
            _ => None,
        }
    }

    /// Signed integer family, including the generic `int`.
    pub fn is_signed_int(&self) -> bool {
        matches!(
            self,
            Type::Int | Type::Int8 | Type::Int16 | Type::Int32 | Type::Int64
        )
    }

    /// Unsigned integer family, including the generic `uint`.
    pub fn is_unsigned_int(&self) -> bool {
        matches!(
            self,
            Type::UInt | Type::UInt8 | Type::UInt16 | Type::UInt32 | Type::UInt64
        )
    }

    /// Any integer family member.
    pub fn is_integer(&self) -> bool {
        self.is_signed_int() || self.is_unsigned_int()
    }

    /// Float family, including the generic `float`.
    pub fn is_float(&self) -> bool {
        matches!(self, Type::Float | Type::Float32 | Type::Float64)
    }

    /// The generic family keywords (`int`, `uint`, `float`).
    pub fn is_generic(&self) -> bool {
        matches!(self, Type::Int | Type::UInt | Type::Float)
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Type::Struct(_))
    }

    /// Types that arithmetic operators accept: char plus the numeric
    /// families.
    pub fn supports_arithmetic(&self) -> bool {
        matches!(self, Type::Char) || self.is_integer() || self.is_float()
    }

    /// Types that comparison operators accept: every scalar.
    pub fn supports_comparison(&self) -> bool {
        matches!(self, Type::Bool | Type::Char) || self.is_integer() || self.is_float()
    }

    /// The relaxed equivalence rule: identical types match; differing widths
    /// of one family match when one side is the family's generic keyword;
    /// struct types match only by name.
    pub fn equivalent(&self, other: &Type) -> bool {
        if self == other {
            return true;
        }
        if self.is_signed_int() && other.is_signed_int() {
            return *self == Type::Int || *other == Type::Int;
        }
        if self.is_unsigned_int() && other.is_unsigned_int() {
            return *self == Type::UInt || *other == Type::UInt;
        }
        if self.is_float() && other.is_float() {
            return *self == Type::Float || *other == Type::Float;
        }
        false
    }

    /// Pick the result type for two equivalent operands: the concrete width
    /// wins over a generic keyword; identical types stand as-is.
    pub fn unified(&self, other: &Type) -> Option<Type> {
        if !self.equivalent(other) {
            return None;
        }
        if self == other {
            return Some(*self);
        }
        // Equivalent but different: exactly one side is generic.
        if self.is_generic() {
            Some(*other)
        } else {
            Some(*self)
        }
    }

    /// Render the type's source-level name.
    pub fn name(&self, interner: &DefaultStringInterner) -> String {
        match self {
            Type::Struct(sym) => interner
                .resolve(*sym)
                .unwrap_or("<struct>")
                .to_string(),
            other => other.keyword().to_string(),
        }
    }

    /// The keyword for a non-struct type.
    fn keyword(&self) -> &'static str {
        match self {
            Type::Bool => "bool",
            Type::Char => "char",
            Type::Str => "string",
            Type::Nothing => "nothing",
            Type::Int => "int",
            Type::Int8 => "int8",
            Type::Int16 => "int16",
            Type::Int32 => "int32",
            Type::Int64 => "int64",
            Type::UInt => "uint",
            Type::UInt8 => "uint8",
            Type::UInt16 => "uint16",
            Type::UInt32 => "uint32",
            Type::UInt64 => "uint64",
            Type::Float => "float",
            Type::Float32 => "float32",
            Type::Float64 => "float64",
            Type::Struct(_) => "<struct>",
        }
    }
}

//! Declared types.

use std::fmt;

/// Type annotation attached to a symbol declaration, an array element
/// type, or a host method's return type.
///
/// `Object` is the generic type: an undeclared symbol is an `Object`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ValueType {
    #[default]
    Object,
    Bool,
    Int,
    Long,
    Double,
    Str,
    Array,
    Closure,
    /// Return type of a method that produces no value.
    Void,
}

impl ValueType {
    /// Source-level name used in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Long => "long",
            Self::Double => "double",
            Self::Str => "string",
            Self::Array => "array",
            Self::Closure => "function",
            Self::Void => "void",
        }
    }

    /// Integral types (`int`, `long`).
    pub const fn is_integral(self) -> bool {
        matches!(self, Self::Int | Self::Long)
    }

    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Long | Self::Double)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

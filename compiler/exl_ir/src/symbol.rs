//! Symbol indices.

use std::fmt;

/// Dense index of a parameter or local variable.
///
/// Symbols are allocated by a scope in declaration order: parameters
/// occupy `[0, parameter_count)`, locals and hoisted captures follow.
/// A symbol is also the slot index into the frame built for that scope.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Symbol(u32);

impl Symbol {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Symbol(raw)
    }

    /// Create a symbol from a slot index.
    #[inline]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "scopes never hold more than u32::MAX symbols"
    )]
    pub const fn from_index(index: usize) -> Self {
        Symbol(index as u32)
    }

    /// Slot index into a frame.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

impl From<u32> for Symbol {
    fn from(raw: u32) -> Self {
        Symbol(raw)
    }
}

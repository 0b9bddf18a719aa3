//! AST node identity.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of an AST node produced by the parser.
///
/// The runtime never looks inside the AST. It only needs a stable,
/// cheap identity for two purposes:
/// - closure equality (two closures over the same lambda literal)
/// - attributing operator errors to the call site that raised them
#[derive(Copy, Clone, Eq, PartialEq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Node id used where no AST node is available (host-initiated calls).
    pub const DETACHED: NodeId = NodeId(u32::MAX);

    #[inline]
    pub const fn new(index: u32) -> Self {
        NodeId(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns `false` for [`NodeId::DETACHED`].
    #[inline]
    pub const fn is_attached(self) -> bool {
        self.0 != u32::MAX
    }
}

impl Hash for NodeId {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_attached() {
            write!(f, "NodeId({})", self.0)
        } else {
            write!(f, "NodeId(DETACHED)")
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_attached() {
            write!(f, "#{}", self.0)
        } else {
            write!(f, "#?")
        }
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::DETACHED
    }
}

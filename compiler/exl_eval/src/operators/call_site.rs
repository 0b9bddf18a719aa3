//! Per-node overload cache.

use std::fmt;
use std::sync::Arc;

use exl_ir::{NodeId, Operator};
use parking_lot::RwLock;

use crate::capability::SharedMethod;

#[derive(Clone, Debug)]
struct CachedMethod {
    op: Operator,
    method: SharedMethod,
}

/// The cache slot of one operator node in the AST.
///
/// Remembers the last overload resolved at this node. Concurrent
/// evaluations of the node may overwrite each other's entry; any entry is
/// a previously valid resolution, and a stale one is re-checked with
/// [`MethodHandle::accepts`](crate::MethodHandle::accepts) before use.
pub struct CallSite {
    node: NodeId,
    cache: RwLock<Option<CachedMethod>>,
}

impl CallSite {
    pub fn new(node: NodeId) -> Self {
        CallSite {
            node,
            cache: RwLock::new(None),
        }
    }

    /// A call site for host-initiated operations with no AST node.
    pub fn detached() -> Self {
        Self::new(NodeId::DETACHED)
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The cached method, if it was resolved for `op`.
    pub fn cached(&self, op: Operator) -> Option<SharedMethod> {
        self.cache
            .read()
            .as_ref()
            .filter(|cached| cached.op == op)
            .map(|cached| Arc::clone(&cached.method))
    }

    pub fn store(&self, op: Operator, method: SharedMethod) {
        *self.cache.write() = Some(CachedMethod { op, method });
    }

    pub fn clear(&self) {
        *self.cache.write() = None;
    }
}

impl fmt::Debug for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSite")
            .field("node", &self.node)
            .field("cached", &self.cache.read().as_ref().map(|c| c.op))
            .finish()
    }
}

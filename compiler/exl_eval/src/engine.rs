//! Seams to the tree-walking evaluator.
//!
//! The runtime core never walks the AST itself. A closure hands its lambda
//! and a prepared call frame to an [`Engine`], which evaluates the body and
//! returns its value. Evaluation contexts expose the host variables a
//! script may read.

use std::fmt;
use std::sync::Arc;

use exl_ir::NodeId;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::errors::EvalResult;
use crate::frame::Frame;
use crate::scope::Scope;
use crate::value::Value;

/// Host variables visible to a script.
pub trait Context: Send + Sync {
    fn get(&self, name: &str) -> Option<Value>;

    fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

pub type SharedContext = Arc<dyn Context>;

/// A context with no variables.
#[derive(Copy, Clone, Debug, Default)]
pub struct EmptyContext;

impl Context for EmptyContext {
    fn get(&self, _name: &str) -> Option<Value> {
        None
    }
}

/// A map-backed context the host can populate concurrently.
#[derive(Default)]
pub struct MapContext {
    vars: RwLock<FxHashMap<String, Value>>,
}

impl MapContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, name: &str, value: Value) {
        self.vars.write().insert(name.to_string(), value);
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.vars.write().remove(name)
    }
}

impl Context for MapContext {
    fn get(&self, name: &str) -> Option<Value> {
        self.vars.read().get(name).cloned()
    }

    fn has(&self, name: &str) -> bool {
        self.vars.read().contains_key(name)
    }
}

impl fmt::Debug for MapContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.vars.read().iter()).finish()
    }
}

/// A lambda literal: the AST node of its body and its scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lambda {
    node: NodeId,
    scope: Arc<Scope>,
}

impl Lambda {
    pub fn new(node: NodeId, scope: Arc<Scope>) -> Self {
        Lambda { node, scope }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn scope(&self) -> &Arc<Scope> {
        &self.scope
    }
}

/// Evaluates lambda bodies.
///
/// Swapping the engine of a closure (see `Closure::with_engine`) lets an
/// output layer run the same captured state through an evaluator that
/// also writes to a sink.
pub trait Engine: Send + Sync {
    /// Evaluate `lambda`'s body in `frame`.
    fn evaluate(&self, lambda: &Lambda, frame: Frame, context: &SharedContext) -> EvalResult;
}

pub type SharedEngine = Arc<dyn Engine>;

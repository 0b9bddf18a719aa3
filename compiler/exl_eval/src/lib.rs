//! EXL Eval - runtime core of the EXL expression evaluator.
//!
//! This crate owns everything the tree-walking evaluator needs at run
//! time besides the AST walk itself.
//!
//! # Architecture
//!
//! - `Scope`: static symbol table of a lambda, with hoisting links
//! - `Frame`: values of one activation, with curry-aware argument binding
//! - `LexicalFrame`: block-level liveness and shadow restore over a frame
//! - `Closure`: callable values (capture, curry, chain, self-reference)
//! - `Operators`: overload dispatch with per-call-site caching
//! - `SoftCache`: bounded, reclaimable LRU shared across evaluations
//!
//! The evaluator itself plugs in through [`Engine`]; default operator
//! semantics and host reflection through the traits in `capability`.
//!
//! # Re-exports
//!
//! `Symbol`, `NodeId`, `Operator` and `ValueType` are re-exported from
//! `exl_ir` for convenience.

mod capability;
mod closure;
mod engine;
pub mod errors;
mod frame;
mod lexical;
mod operators;
mod scope;
mod soft_cache;
mod stack;
mod tracing_setup;
mod value;

#[cfg(test)]
mod test_helpers;

pub use exl_ir::{NodeId, Operator, Symbol, ValueType};

pub use capability::{Arithmetic, MethodHandle, MethodResolver, OverloadResolver, SharedMethod};
pub use closure::{Closure, ParamKind, Shape};
pub use engine::{Context, EmptyContext, Engine, Lambda, MapContext, SharedContext, SharedEngine};
pub use errors::{EvalError, EvalErrorKind, EvalResult, HostError};
pub use frame::{Frame, Slot};
pub use lexical::{BlockGuard, LexicalFrame, LexicalScope, SymbolSet};
pub use operators::{Assigned, CallSite, Operators, OperatorsBuilder};
pub use scope::{Scope, SymbolFlags, SymbolInfo};
pub use soft_cache::SoftCache;
pub use stack::ensure_sufficient_stack;
pub use tracing_setup::init_tracing;
pub use value::{ArrayValue, Heap, HostObject, Value};

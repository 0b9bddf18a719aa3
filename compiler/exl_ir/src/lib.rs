//! EXL IR - identifiers and static descriptions shared by the parser,
//! the tree-walking evaluator and the runtime core.
//!
//! Nothing in this crate carries runtime state:
//! - `NodeId`: identity of an AST node (lambda literals, operator call sites)
//! - `Symbol`: dense index of a parameter or local variable within a scope
//! - `Operator`: the overloadable operator catalogue
//! - `ValueType`: declared types of symbols and host method return types

mod node_id;
mod operator;
mod symbol;
mod value_type;

pub use node_id::NodeId;
pub use operator::Operator;
pub use symbol::Symbol;
pub use value_type::ValueType;

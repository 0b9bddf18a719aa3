//! Error types for the runtime core.
//!
//! `EvalErrorKind` is the typed error category; the factory functions at
//! the bottom of this module are the public constructors. Capability
//! implementations (arithmetic, overload and method resolvers) report
//! failures as [`HostError`]; operator dispatch wraps those into
//! `OperatorFailed` together with the operator and the call-site node.

use exl_ir::{NodeId, Operator};
use std::fmt;

use crate::value::Value;

/// Result of evaluation.
pub type EvalResult = Result<Value, EvalError>;

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EvalErrorKind {
    // Declarations
    #[error("'{name}' is already declared in this block")]
    LexicalClash { name: String },
    #[error("final variable '{name}' cannot be redeclared")]
    FinalRedeclared { name: String },
    #[error("parameter '{name}' declared after local variables")]
    ParameterAfterVariable { name: String },

    // Operators
    #[error("null operand for strict operator `{op}`")]
    NullOperand { op: Operator },
    #[error("operator `{op}` failed: {cause}")]
    OperatorFailed { op: Operator, cause: String },
    #[error("operator `{op}` has no default implementation")]
    UnsupportedOperator { op: Operator },

    /// Failure raised by the host outside operator dispatch (typically by
    /// an engine evaluating a lambda body).
    #[error("{message}")]
    Host { message: String },
}

/// Evaluation error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    /// AST node the error is attributed to, when known.
    pub node: Option<NodeId>,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind) -> Self {
        EvalError { kind, node: None }
    }

    /// Attribute this error to an AST node.
    ///
    /// Detached nodes leave the error unattributed.
    #[must_use]
    pub fn at(mut self, node: NodeId) -> Self {
        if node.is_attached() {
            self.node = Some(node);
        }
        self
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Some(node) => write!(f, "{} (at {node})", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for EvalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// Failure reported by a host capability.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HostError {
    pub message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        HostError {
            message: message.into(),
        }
    }
}

impl From<HostError> for EvalError {
    fn from(err: HostError) -> Self {
        EvalError::new(EvalErrorKind::Host {
            message: err.message,
        })
    }
}

// Factory functions

#[cold]
pub fn lexical_clash(name: &str) -> EvalError {
    EvalError::new(EvalErrorKind::LexicalClash {
        name: name.to_string(),
    })
}

#[cold]
pub fn final_redeclared(name: &str) -> EvalError {
    EvalError::new(EvalErrorKind::FinalRedeclared {
        name: name.to_string(),
    })
}

#[cold]
pub fn parameter_after_variable(name: &str) -> EvalError {
    EvalError::new(EvalErrorKind::ParameterAfterVariable {
        name: name.to_string(),
    })
}

#[cold]
pub fn null_operand(op: Operator) -> EvalError {
    EvalError::new(EvalErrorKind::NullOperand { op })
}

#[cold]
pub fn operator_failed(op: Operator, cause: &dyn fmt::Display) -> EvalError {
    EvalError::new(EvalErrorKind::OperatorFailed {
        op,
        cause: cause.to_string(),
    })
}

#[cold]
pub fn unsupported_operator(op: Operator) -> EvalError {
    EvalError::new(EvalErrorKind::UnsupportedOperator { op })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_includes_node() {
        let err = null_operand(Operator::Add).at(NodeId::new(4));
        assert_eq!(err.to_string(), "null operand for strict operator `+` (at #4)");
    }

    #[test]
    fn test_detached_node_is_dropped() {
        let err = lexical_clash("x").at(NodeId::DETACHED);
        assert_eq!(err.node, None);
        assert_eq!(err.to_string(), "'x' is already declared in this block");
    }

    #[test]
    fn test_operator_failed_carries_cause() {
        let err = operator_failed(Operator::SelfAdd, &HostError::new("boom"));
        assert_eq!(
            err.kind,
            EvalErrorKind::OperatorFailed {
                op: Operator::SelfAdd,
                cause: "boom".to_string(),
            }
        );
        assert_eq!(err.to_string(), "operator `+=` failed: boom");
    }

    #[test]
    fn test_host_error_conversion() {
        let err: EvalError = HostError::new("no such field").into();
        assert_eq!(
            err.kind,
            EvalErrorKind::Host {
                message: "no such field".to_string()
            }
        );
    }
}

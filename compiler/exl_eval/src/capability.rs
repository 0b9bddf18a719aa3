//! Host capabilities consumed by operator dispatch.
//!
//! - [`Arithmetic`]: default operator semantics and coercions
//! - [`OverloadResolver`]: host-defined operator overloads
//! - [`MethodResolver`]: reflective lookup for duck-typed fallbacks
//!
//! Resolvers hand back [`MethodHandle`]s, invoked with an optional
//! receiver and positional arguments.

use std::fmt;
use std::sync::Arc;

use exl_ir::{Operator, ValueType};

use crate::errors::HostError;
use crate::value::Value;

/// Default semantics for operators no overload claims.
///
/// The tri-state pattern hooks return `Ok(None)` for "don't know", which
/// lets dispatch continue down its fallback chain.
pub trait Arithmetic: Send + Sync {
    /// Whether this arithmetic rejects null operands at all.
    fn strict(&self) -> bool {
        true
    }

    /// Whether `op` rejects null operands. Equality, `empty`, `size` and
    /// `=~` accept null whatever the arithmetic's strictness.
    fn is_strict(&self, op: Operator) -> bool {
        !matches!(
            op,
            Operator::Eq | Operator::Empty | Operator::Size | Operator::Contains
        ) && self.strict()
    }

    fn to_boolean(&self, value: &Value) -> Result<bool, HostError>;
    fn to_int(&self, value: &Value) -> Result<i32, HostError>;
    fn to_long(&self, value: &Value) -> Result<i64, HostError>;
    fn to_double(&self, value: &Value) -> Result<f64, HostError>;

    /// Apply a binary operator.
    fn binary(&self, op: Operator, left: &Value, right: &Value) -> Result<Value, HostError>;

    fn increment(&self, value: &Value) -> Result<Value, HostError>;
    fn decrement(&self, value: &Value) -> Result<Value, HostError>;

    fn equals(&self, left: &Value, right: &Value) -> Result<bool, HostError>;

    fn contains(&self, container: &Value, value: &Value) -> Result<Option<bool>, HostError>;
    fn starts_with(&self, left: &Value, right: &Value) -> Result<Option<bool>, HostError>;
    fn ends_with(&self, left: &Value, right: &Value) -> Result<Option<bool>, HostError>;

    /// `None` when the arithmetic does not know the value's emptiness.
    fn is_empty(&self, value: &Value) -> Option<bool>;

    fn size(&self, value: &Value) -> Option<i64>;

    /// Dereference a pointer-like value.
    fn indirect(&self, value: &Value) -> Option<Value> {
        let _ = value;
        None
    }

    /// Store through a pointer-like value; returns the stored value.
    fn indirect_assign(&self, target: &Value, value: &Value) -> Option<Value> {
        let _ = (target, value);
        None
    }

    /// The narrowest numeric representation of `value`.
    fn narrow(&self, value: &Value) -> Value {
        value.clone()
    }
}

/// A resolved, invokable host method.
pub trait MethodHandle: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Invoke with `receiver` (`None` for static methods).
    fn invoke(&self, receiver: Option<&Value>, args: &[Value]) -> Result<Value, HostError>;

    /// Whether a cached handle still applies to these arguments.
    fn accepts(&self, args: &[Value]) -> bool {
        let _ = args;
        true
    }

    fn return_type(&self) -> ValueType;

    fn is_static(&self) -> bool;

    /// Methods that merely expose the arithmetic's default behavior. They
    /// are never treated as user overloads.
    fn is_builtin(&self) -> bool {
        false
    }
}

pub type SharedMethod = Arc<dyn MethodHandle>;

/// Finds operator overloads declared by host types.
pub trait OverloadResolver: Send + Sync {
    /// Cheap pre-check: does any host type overload `op`?
    fn overloads(&self, op: Operator) -> bool;

    /// The overload of `op` applicable to `args`.
    fn get_operator(&self, op: Operator, args: &[Value]) -> Option<SharedMethod>;
}

/// Reflective method and constructor lookup.
pub trait MethodResolver: Send + Sync {
    /// The instance method `name` of `target` applicable to `args`.
    fn get_method(&self, target: &Value, name: &str, args: &[Value]) -> Option<SharedMethod>;

    /// Every method `name` of `target`, static ones included on request.
    fn get_methods(&self, target: &Value, name: &str, include_static: bool) -> Vec<SharedMethod>;

    fn get_constructors(&self, type_name: &str) -> Vec<SharedMethod> {
        let _ = type_name;
        Vec::new()
    }
}

//! Calling-convention tags chosen when a closure is built.

use exl_ir::{Symbol, ValueType};

use crate::frame::Frame;
use crate::value::Value;

/// Declared kind of a single remaining parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Int,
    Long,
    Double,
    Generic,
}

impl ParamKind {
    fn of(declared: Option<ValueType>) -> Self {
        match declared {
            Some(ValueType::Int) => ParamKind::Int,
            Some(ValueType::Long) => ParamKind::Long,
            Some(ValueType::Double) => ParamKind::Double,
            _ => ParamKind::Generic,
        }
    }
}

/// Number (and for one parameter, kind) of unbound parameters.
///
/// Only steers argument coercion in the shaped entry points; every shape
/// executes through the same path.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    Nullary,
    Unary(ParamKind),
    Binary,
    /// Three or more parameters, or a variadic tail.
    Nary,
}

impl Shape {
    pub(super) fn of(frame: &Frame) -> Self {
        let scope = frame.scope();
        if scope.is_var_args() {
            return Shape::Nary;
        }
        match scope.arg_count().saturating_sub(frame.curried()) {
            0 => Shape::Nullary,
            1 => Shape::Unary(ParamKind::of(
                scope.declared_type(Symbol::from_index(frame.curried())),
            )),
            2 => Shape::Binary,
            _ => Shape::Nary,
        }
    }

    pub(super) fn int_arg(self, arg: i32) -> Value {
        match self {
            Shape::Unary(ParamKind::Long) => Value::Long(i64::from(arg)),
            Shape::Unary(ParamKind::Double) => Value::Double(f64::from(arg)),
            _ => Value::Int(arg),
        }
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "a long passed to a double parameter converts like an implicit widening"
    )]
    pub(super) fn long_arg(self, arg: i64) -> Value {
        match self {
            Shape::Unary(ParamKind::Int) => match i32::try_from(arg) {
                Ok(narrow) => Value::Int(narrow),
                Err(_) => Value::Long(arg),
            },
            Shape::Unary(ParamKind::Double) => Value::Double(arg as f64),
            _ => Value::Long(arg),
        }
    }
}

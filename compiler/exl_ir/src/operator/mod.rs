//! Overloadable operators.
//!
//! Every operator the evaluator may route through host overloads is listed
//! here with its source symbol, the method name a host overload is looked up
//! by, its arity, and, for assignment forms, the operator it desugars to.

use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Mod,

    // Bitwise
    And,
    Or,
    Xor,
    ShiftLeft,
    ShiftRight,
    ShiftRightUnsigned,

    // Comparison
    Eq,
    Lt,
    Le,
    Gt,
    Ge,

    // Pattern matching
    Contains,
    StartsWith,
    EndsWith,

    // Unary
    Not,
    Complement,
    Negate,
    Positivize,
    Empty,
    Size,

    // Compound assignment
    SelfAdd,
    SelfSubtract,
    SelfMultiply,
    SelfDivide,
    SelfMod,
    SelfAnd,
    SelfOr,
    SelfXor,
    SelfShiftLeft,
    SelfShiftRight,
    SelfShiftRightUnsigned,

    // Increment / decrement
    Increment,
    Decrement,
    IncrementAndGet,
    GetAndIncrement,
    DecrementAndGet,
    GetAndDecrement,

    // Indirection
    Indirect,
    IndirectAssign,
}

impl Operator {
    /// Every operator, in declaration order.
    pub const ALL: [Operator; 44] = [
        Self::Add,
        Self::Subtract,
        Self::Multiply,
        Self::Divide,
        Self::Mod,
        Self::And,
        Self::Or,
        Self::Xor,
        Self::ShiftLeft,
        Self::ShiftRight,
        Self::ShiftRightUnsigned,
        Self::Eq,
        Self::Lt,
        Self::Le,
        Self::Gt,
        Self::Ge,
        Self::Contains,
        Self::StartsWith,
        Self::EndsWith,
        Self::Not,
        Self::Complement,
        Self::Negate,
        Self::Positivize,
        Self::Empty,
        Self::Size,
        Self::SelfAdd,
        Self::SelfSubtract,
        Self::SelfMultiply,
        Self::SelfDivide,
        Self::SelfMod,
        Self::SelfAnd,
        Self::SelfOr,
        Self::SelfXor,
        Self::SelfShiftLeft,
        Self::SelfShiftRight,
        Self::SelfShiftRightUnsigned,
        Self::Increment,
        Self::Decrement,
        Self::IncrementAndGet,
        Self::GetAndIncrement,
        Self::DecrementAndGet,
        Self::GetAndDecrement,
        Self::Indirect,
        Self::IndirectAssign,
    ];

    /// Returns the source-level symbol for this operator.
    ///
    /// Used in error messages to show the exact operator that failed.
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Add | Self::Positivize => "+",
            Self::Subtract | Self::Negate => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Mod => "%",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
            Self::ShiftLeft => "<<",
            Self::ShiftRight => ">>",
            Self::ShiftRightUnsigned => ">>>",
            Self::Eq => "==",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Contains => "=~",
            Self::StartsWith => "=^",
            Self::EndsWith => "=$",
            Self::Not => "!",
            Self::Complement => "~",
            Self::Empty => "empty",
            Self::Size => "size",
            Self::SelfAdd => "+=",
            Self::SelfSubtract => "-=",
            Self::SelfMultiply => "*=",
            Self::SelfDivide => "/=",
            Self::SelfMod => "%=",
            Self::SelfAnd => "&=",
            Self::SelfOr => "|=",
            Self::SelfXor => "^=",
            Self::SelfShiftLeft => "<<=",
            Self::SelfShiftRight => ">>=",
            Self::SelfShiftRightUnsigned => ">>>=",
            Self::Increment => "+1",
            Self::Decrement => "-1",
            Self::IncrementAndGet => "++.",
            Self::GetAndIncrement => ".++",
            Self::DecrementAndGet => "--.",
            Self::GetAndDecrement => ".--",
            Self::Indirect => "*.",
            Self::IndirectAssign => "*.=",
        }
    }

    /// Name of the host method implementing an overload of this operator.
    pub const fn method_name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
            Self::Mod => "mod",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::ShiftLeft => "shift_left",
            Self::ShiftRight => "shift_right",
            Self::ShiftRightUnsigned => "shift_right_unsigned",
            Self::Eq => "equals",
            Self::Lt => "less_than",
            Self::Le => "less_than_or_equal",
            Self::Gt => "greater_than",
            Self::Ge => "greater_than_or_equal",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::Not => "not",
            Self::Complement => "complement",
            Self::Negate => "negate",
            Self::Positivize => "positivize",
            Self::Empty => "empty",
            Self::Size => "size",
            Self::SelfAdd => "self_add",
            Self::SelfSubtract => "self_subtract",
            Self::SelfMultiply => "self_multiply",
            Self::SelfDivide => "self_divide",
            Self::SelfMod => "self_mod",
            Self::SelfAnd => "self_and",
            Self::SelfOr => "self_or",
            Self::SelfXor => "self_xor",
            Self::SelfShiftLeft => "self_shift_left",
            Self::SelfShiftRight => "self_shift_right",
            Self::SelfShiftRightUnsigned => "self_shift_right_unsigned",
            Self::Increment => "increment",
            Self::Decrement => "decrement",
            Self::IncrementAndGet => "increment_and_get",
            Self::GetAndIncrement => "get_and_increment",
            Self::DecrementAndGet => "decrement_and_get",
            Self::GetAndDecrement => "get_and_decrement",
            Self::Indirect => "indirect",
            Self::IndirectAssign => "indirect_assign",
        }
    }

    /// Number of operands the operator consumes.
    pub const fn arity(self) -> usize {
        match self {
            Self::Not
            | Self::Complement
            | Self::Negate
            | Self::Positivize
            | Self::Empty
            | Self::Size
            | Self::Increment
            | Self::Decrement
            | Self::IncrementAndGet
            | Self::GetAndIncrement
            | Self::DecrementAndGet
            | Self::GetAndDecrement
            | Self::Indirect => 1,
            _ => 2,
        }
    }

    /// The operator an assignment form desugars to (`+=` to `+`, `x++` to
    /// `+1`). `None` for every non-assignment operator.
    pub const fn base(self) -> Option<Operator> {
        match self {
            Self::SelfAdd => Some(Self::Add),
            Self::SelfSubtract => Some(Self::Subtract),
            Self::SelfMultiply => Some(Self::Multiply),
            Self::SelfDivide => Some(Self::Divide),
            Self::SelfMod => Some(Self::Mod),
            Self::SelfAnd => Some(Self::And),
            Self::SelfOr => Some(Self::Or),
            Self::SelfXor => Some(Self::Xor),
            Self::SelfShiftLeft => Some(Self::ShiftLeft),
            Self::SelfShiftRight => Some(Self::ShiftRight),
            Self::SelfShiftRightUnsigned => Some(Self::ShiftRightUnsigned),
            Self::IncrementAndGet | Self::GetAndIncrement => Some(Self::Increment),
            Self::DecrementAndGet | Self::GetAndDecrement => Some(Self::Decrement),
            _ => None,
        }
    }

    /// Compound assignment and increment/decrement forms.
    pub const fn is_assignment(self) -> bool {
        self.base().is_some()
    }

    /// `x++` / `x--`: the expression yields the operand before the update.
    pub const fn is_postfix(self) -> bool {
        matches!(self, Self::GetAndIncrement | Self::GetAndDecrement)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_symbol())
    }
}
